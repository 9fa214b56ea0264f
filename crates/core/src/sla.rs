//! Working-hours deadline arithmetic.
//!
//! A deadline is computed by clamping the start into the working window,
//! rolling weekends forward, then consuming the hour budget one working day
//! at a time. All times are the business's local clock.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// Business-hours calendar. The window runs `window_start..window_end`
/// (whole hours); one working day absorbs `day_capacity_hours` of budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkCalendar {
    pub window_start: u32,
    pub window_end: u32,
    pub day_capacity_hours: u32,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self { window_start: 9, window_end: 17, day_capacity_hours: 9 }
    }
}

impl WorkCalendar {
    /// Absolute deadline `budget_hours` working hours after `start`.
    pub fn deadline_after(&self, start: DateTime<Utc>, budget_hours: u32) -> DateTime<Utc> {
        let mut deadline = start;
        if deadline.hour() >= self.window_end {
            deadline = self.at_opening(deadline) + Duration::days(1);
        } else if deadline.hour() <= self.window_start {
            deadline = self.at_opening(deadline);
        }
        deadline = self.roll_off_weekend(deadline);

        let mut budget = budget_hours;
        while budget > self.day_capacity_hours {
            deadline += Duration::days(1);
            budget -= self.day_capacity_hours;
            deadline = self.roll_off_weekend(deadline);
        }
        deadline + Duration::hours(i64::from(budget))
    }

    /// Same date at one hour past window start, minutes and seconds cleared.
    fn at_opening(&self, moment: DateTime<Utc>) -> DateTime<Utc> {
        let opening = moment
            .date_naive()
            .and_hms_opt(self.window_start + 1, 0, 0)
            .unwrap_or_else(|| moment.naive_utc());
        Utc.from_utc_datetime(&opening)
    }

    fn roll_off_weekend(&self, moment: DateTime<Utc>) -> DateTime<Utc> {
        let weekday = moment.weekday().num_days_from_monday();
        if weekday > 4 {
            moment + Duration::days(i64::from(7 - weekday))
        } else {
            moment
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn friday_evening_budget_lands_tuesday_morning() {
        // 2024-06-07 is a Friday. 17:00 is past the window, so work starts
        // Monday 10:00; ten hours is one full day plus one hour.
        let calendar = WorkCalendar::default();
        let deadline = calendar.deadline_after(at(2024, 6, 7, 17, 0), 10);
        assert_eq!(deadline, at(2024, 6, 11, 11, 0));
        assert_eq!(deadline.weekday(), chrono::Weekday::Tue);
    }

    #[test]
    fn early_morning_clamps_to_opening() {
        let calendar = WorkCalendar::default();
        // Monday 07:30 clamps to 10:00 the same day.
        let deadline = calendar.deadline_after(at(2024, 6, 3, 7, 30), 2);
        assert_eq!(deadline, at(2024, 6, 3, 12, 0));
    }

    #[test]
    fn midday_start_keeps_minutes() {
        let calendar = WorkCalendar::default();
        let deadline = calendar.deadline_after(at(2024, 6, 3, 12, 45), 3);
        assert_eq!(deadline, at(2024, 6, 3, 15, 45));
    }

    #[test]
    fn saturday_start_rolls_to_monday() {
        let calendar = WorkCalendar::default();
        // Saturday 2024-06-08 midday rolls to Monday midday, then +4h.
        let deadline = calendar.deadline_after(at(2024, 6, 8, 12, 0), 4);
        assert_eq!(deadline, at(2024, 6, 10, 16, 0));
    }

    #[test]
    fn full_day_budget_stays_within_one_day() {
        let calendar = WorkCalendar::default();
        // Exactly one day of capacity does not spill into the next day.
        let deadline = calendar.deadline_after(at(2024, 6, 3, 7, 0), 9);
        assert_eq!(deadline, at(2024, 6, 3, 19, 0));
    }

    #[test]
    fn multi_day_budget_skips_weekend_days() {
        let calendar = WorkCalendar::default();
        // Thursday 10:00 + 27h: Thu -> Fri -> Mon, then +9h.
        let deadline = calendar.deadline_after(at(2024, 6, 6, 10, 0), 27);
        assert_eq!(deadline, at(2024, 6, 10, 19, 0));
    }
}
