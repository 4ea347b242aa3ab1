use chrono::{Datelike, Days, NaiveDate};

use crate::model::policy::{RepeatUnit, RepetitionRule};
use crate::vacation::calendar::ymd_clamped;

impl RepetitionRule {
    /// The `k`-th fire date counted from the first fire (k = 0).
    ///
    /// Month based units always step from the first fire date so the
    /// anchor day is kept: a day-31 rule lands on the 28th/29th/30th in
    /// short months and returns to the 31st afterwards.
    pub fn nth_fire(&self, k: u32) -> Option<NaiveDate> {
        let first = self.first_fire_at.date();
        let steps = k.checked_mul(self.interval)?;

        let Some(months_per_step) = self.unit.months() else {
            return first.checked_add_days(Days::new(u64::from(steps)));
        };

        let month_index = i64::from(first.year()) * 12
            + i64::from(first.month0())
            + i64::from(steps) * i64::from(months_per_step);
        let year = i32::try_from(month_index.div_euclid(12)).ok()?;
        let mut month = u32::try_from(month_index.rem_euclid(12)).ok()? + 1;
        if self.unit == RepeatUnit::Yearly {
            if let Some(fixed) = self.fixed_month {
                month = fixed;
            }
        }
        let day = self.fixed_day.unwrap_or_else(|| first.day());
        ymd_clamped(year, month, day)
    }

    /// Fire dates within `[from, to]`, never earlier than the first fire.
    pub fn fires_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        let mut fires = Vec::new();
        if self.interval == 0 {
            return fires;
        }
        let floor = from.max(self.first_fire_at.date());

        for k in 0.. {
            let Some(fire) = self.nth_fire(k) else { break };
            if fire > to {
                break;
            }
            if fire >= floor {
                fires.push(fire);
            }
        }
        fires
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(unit: RepeatUnit, first: NaiveDate) -> RepetitionRule {
        RepetitionRule {
            unit,
            interval: 1,
            fixed_month: None,
            fixed_day: None,
            first_fire_at: first.and_hms_opt(0, 0, 0).unwrap(),
            forever: true,
            max_count: None,
        }
    }

    #[test]
    fn monthly_day_31_clamps_in_short_months() {
        let r = rule(RepeatUnit::Monthly, date(2025, 1, 31));
        let fires = r.fires_between(date(2025, 1, 1), date(2025, 5, 31));
        assert_eq!(
            fires,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30),
                date(2025, 5, 31),
            ]
        );
    }

    #[test]
    fn leap_years_keep_the_29th() {
        let r = rule(RepeatUnit::Yearly, date(2024, 2, 29));
        assert_eq!(r.nth_fire(1), Some(date(2025, 2, 28)));
        assert_eq!(r.nth_fire(4), Some(date(2028, 2, 29)));
    }

    #[test]
    fn quarterly_and_half_yearly_step_in_months() {
        let mut q = rule(RepeatUnit::Quarterly, date(2025, 1, 15));
        assert_eq!(q.nth_fire(1), Some(date(2025, 4, 15)));
        assert_eq!(q.nth_fire(4), Some(date(2026, 1, 15)));

        q.unit = RepeatUnit::HalfYearly;
        q.interval = 2;
        assert_eq!(q.nth_fire(1), Some(date(2026, 1, 15)));
    }

    #[test]
    fn daily_interval_counts_days() {
        let mut r = rule(RepeatUnit::Daily, date(2025, 2, 27));
        r.interval = 2;
        let fires = r.fires_between(date(2025, 2, 1), date(2025, 3, 5));
        assert_eq!(
            fires,
            vec![date(2025, 2, 27), date(2025, 3, 1), date(2025, 3, 3), date(2025, 3, 5)]
        );
    }

    #[test]
    fn yearly_fixed_month_and_day_override_the_anchor() {
        let mut r = rule(RepeatUnit::Yearly, date(2025, 3, 15));
        r.fixed_month = Some(1);
        r.fixed_day = Some(1);
        // 2025-01-01 precedes the first fire and is skipped
        let fires = r.fires_between(date(2025, 1, 1), date(2027, 6, 1));
        assert_eq!(fires, vec![date(2026, 1, 1), date(2027, 1, 1)]);
    }

    #[test]
    fn window_floor_and_ceiling_are_inclusive() {
        let r = rule(RepeatUnit::Monthly, date(2025, 1, 10));
        let fires = r.fires_between(date(2025, 3, 10), date(2025, 4, 10));
        assert_eq!(fires, vec![date(2025, 3, 10), date(2025, 4, 10)]);
        assert!(r.fires_between(date(2025, 3, 11), date(2025, 4, 9)).is_empty());
    }
}
