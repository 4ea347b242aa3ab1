use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use moka::future::Cache;

use super::Directory;
use crate::error::VacationError;
use crate::model::directory::{ApproverCandidate, Holiday, UserProfile};

/// Keeps whole-year holiday calendars in memory, keyed by (country, year).
/// User and department lookups go straight through.
pub struct CachedDirectory<D> {
    inner: D,
    holidays: Cache<(String, i32), Arc<Vec<Holiday>>>,
}

impl<D: Directory> CachedDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            holidays: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    async fn year(&self, country_code: &str, year: i32) -> Result<Arc<Vec<Holiday>>, VacationError> {
        let key = (country_code.to_string(), year);
        if let Some(hit) = self.holidays.get(&key).await {
            return Ok(hit);
        }

        let (Some(first), Some(last)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) else {
            return Err(VacationError::validation(format!("year {year} is out of range")));
        };
        let loaded = Arc::new(self.inner.list_holidays(country_code, first, last).await?);
        self.holidays.insert(key, Arc::clone(&loaded)).await;
        tracing::debug!(country_code, year, count = loaded.len(), "Holiday calendar cached");
        Ok(loaded)
    }
}

impl<D: Directory> Directory for CachedDirectory<D> {
    async fn get_user(&self, user_id: u64) -> Result<UserProfile, VacationError> {
        self.inner.get_user(user_id).await
    }

    async fn list_holidays(
        &self,
        country_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, VacationError> {
        let mut out = Vec::new();
        for year in start.year()..=end.year() {
            let calendar = self.year(country_code, year).await?;
            out.extend(
                calendar
                    .iter()
                    .filter(|h| start <= h.date && h.date <= end)
                    .cloned(),
            );
        }
        Ok(out)
    }

    async fn approver_chain(&self, user_id: u64) -> Result<Vec<ApproverCandidate>, VacationError> {
        self.inner.approver_chain(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fixed::FixedDirectory;
    use crate::model::directory::HolidayKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[actix_web::test]
    async fn loads_each_year_once() {
        let fixed = FixedDirectory::default()
            .with_holiday("KR", date(2025, 3, 3), HolidayKind::Substitute)
            .with_holiday("KR", date(2025, 12, 25), HolidayKind::Public)
            .with_holiday("KR", date(2026, 1, 1), HolidayKind::Public);
        let calls = fixed.holiday_calls();
        let cached = CachedDirectory::new(fixed, Duration::from_secs(60));

        let march = cached
            .list_holidays("KR", date(2025, 3, 1), date(2025, 3, 31))
            .await
            .unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        // same year is served from memory, next year is loaded once
        let span = cached
            .list_holidays("KR", date(2025, 12, 1), date(2026, 1, 31))
            .await
            .unwrap();
        assert_eq!(span.len(), 2);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
