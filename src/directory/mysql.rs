use chrono::{NaiveDate, NaiveTime};
use sqlx::MySqlPool;

use super::Directory;
use crate::error::VacationError;
use crate::model::directory::{ApproverCandidate, Holiday, HolidayKind, UserProfile};

/// Reads the platform's `users`, `holidays` and `departments` tables.
#[derive(Clone)]
pub struct MySqlDirectory {
    pool: MySqlPool,
}

impl MySqlDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl Directory for MySqlDirectory {
    async fn get_user(&self, user_id: u64) -> Result<UserProfile, VacationError> {
        let row = sqlx::query_as::<_, (u64, NaiveTime, NaiveTime, String)>(
            r#"
            SELECT id, work_start, work_end, country_code
            FROM users
            WHERE id = ? AND deleted = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (user_id, work_start, work_end, country_code) =
            row.ok_or_else(|| VacationError::not_found("user", user_id))?;
        Ok(UserProfile {
            user_id,
            work_start,
            work_end,
            country_code,
        })
    }

    async fn list_holidays(
        &self,
        country_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, VacationError> {
        let rows = sqlx::query_as::<_, (NaiveDate, String, String)>(
            r#"
            SELECT holiday_date, name, holiday_type
            FROM holidays
            WHERE country_code = ? AND holiday_date BETWEEN ? AND ?
            ORDER BY holiday_date
            "#,
        )
        .bind(country_code)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(date, name, kind)| {
                let kind = kind.parse::<HolidayKind>().map_err(|_| {
                    VacationError::invariant(format!("unknown holiday type '{kind}' on {date}"))
                })?;
                Ok(Holiday { date, name, kind })
            })
            .collect()
    }

    async fn approver_chain(&self, user_id: u64) -> Result<Vec<ApproverCandidate>, VacationError> {
        let rows = sqlx::query_as::<_, (u64, u64)>(
            r#"
            WITH RECURSIVE chain AS (
                SELECT d.id, d.parent_id, d.head_user_id, CAST(0 AS UNSIGNED) AS depth
                FROM departments d
                JOIN users u ON u.department_id = d.id
                WHERE u.id = ? AND u.deleted = FALSE
                UNION ALL
                SELECT p.id, p.parent_id, p.head_user_id, c.depth + 1
                FROM departments p
                JOIN chain c ON p.id = c.parent_id
            )
            SELECT head_user_id, depth
            FROM chain
            WHERE head_user_id IS NOT NULL
            ORDER BY depth
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(head_user_id, depth)| ApproverCandidate {
                head_user_id,
                level: u32::try_from(depth).unwrap_or(u32::MAX),
            })
            .collect())
    }
}
