//! In-memory directory for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveTime};

use super::Directory;
use crate::error::VacationError;
use crate::model::directory::{ApproverCandidate, Holiday, HolidayKind, UserProfile};

#[derive(Default)]
pub struct FixedDirectory {
    users: HashMap<u64, UserProfile>,
    holidays: Vec<(String, Holiday)>,
    chains: HashMap<u64, Vec<ApproverCandidate>>,
    holiday_calls: Arc<AtomicUsize>,
}

impl FixedDirectory {
    /// Registers a KR user working 09:00-18:00.
    pub fn with_user(mut self, user_id: u64) -> Self {
        self.users.insert(
            user_id,
            UserProfile {
                user_id,
                work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                work_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                country_code: "KR".into(),
            },
        );
        self
    }

    pub fn with_holiday(mut self, country: &str, date: NaiveDate, kind: HolidayKind) -> Self {
        self.holidays.push((
            country.into(),
            Holiday {
                date,
                name: format!("holiday {date}"),
                kind,
            },
        ));
        self
    }

    /// `heads` are listed most local first.
    pub fn with_chain(mut self, user_id: u64, heads: &[u64]) -> Self {
        let chain = heads
            .iter()
            .zip(0u32..)
            .map(|(&head_user_id, level)| ApproverCandidate {
                head_user_id,
                level,
            })
            .collect();
        self.chains.insert(user_id, chain);
        self
    }

    pub fn holiday_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.holiday_calls)
    }
}

impl Directory for FixedDirectory {
    async fn get_user(&self, user_id: u64) -> Result<UserProfile, VacationError> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| VacationError::not_found("user", user_id))
    }

    async fn list_holidays(
        &self,
        country_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, VacationError> {
        self.holiday_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .holidays
            .iter()
            .filter(|(country, h)| country == country_code && start <= h.date && h.date <= end)
            .map(|(_, h)| h.clone())
            .collect())
    }

    async fn approver_chain(&self, user_id: u64) -> Result<Vec<ApproverCandidate>, VacationError> {
        Ok(self.chains.get(&user_id).cloned().unwrap_or_default())
    }
}
