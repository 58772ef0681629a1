use chrono::{DateTime, Duration, Utc};
use reminder_types::{RecurrenceInterval, is_storable_due_time};

/// Due time of the next occurrence, or `None` when there is nothing to recur on
/// or the series would run past the last storable year.
///
/// Offsets are fixed durations. `Monthly` is 30 days, not a calendar month.
pub fn next_due(
    due_at: DateTime<Utc>,
    interval: Option<RecurrenceInterval>,
) -> Option<DateTime<Utc>> {
    let offset = match interval? {
        RecurrenceInterval::Daily => Duration::days(1),
        RecurrenceInterval::Weekly => Duration::weeks(1),
        RecurrenceInterval::Monthly => Duration::days(30),
    };
    due_at
        .checked_add_signed(offset)
        .filter(|next| is_storable_due_time(*next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 7, 30, 0).unwrap()
    }

    #[rstest]
    #[case(RecurrenceInterval::Daily, Duration::hours(24))]
    #[case(RecurrenceInterval::Weekly, Duration::hours(7 * 24))]
    #[case(RecurrenceInterval::Monthly, Duration::hours(30 * 24))]
    fn fixed_offsets(#[case] interval: RecurrenceInterval, #[case] offset: Duration) {
        assert_eq!(next_due(base(), Some(interval)), Some(base() + offset));
    }

    #[test]
    fn monthly_ignores_calendar_length() {
        // Jan 31 + 30 days lands on Mar 1 in a leap year, not Feb 29 / Feb 28
        let next = next_due(base(), Some(RecurrenceInterval::Monthly)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap());
    }

    #[test]
    fn series_ends_at_the_last_storable_year() {
        let late = Utc.with_ymd_and_hms(9999, 12, 20, 0, 0, 0).unwrap();
        assert_eq!(next_due(late, Some(RecurrenceInterval::Monthly)), None);
        assert!(next_due(late, Some(RecurrenceInterval::Daily)).is_some());
    }

    #[test]
    fn missing_interval_yields_nothing() {
        assert_eq!(next_due(base(), None), None);
    }
}
