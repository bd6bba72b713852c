//! Pure date arithmetic behind schedule generation and rewrites.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::AppError;

/// Every calendar day of `month` in `year`.
pub fn month_days(year: i32, month: u32) -> Result<Vec<NaiveDate>, AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::field("month", "The month must be between 1 and 12"))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::field("year", "The year is out of range"))?;

    Ok(first.iter_days().take_while(|d| *d < next_month).collect())
}

/// Start of the rewrite window: never earlier than `today`.
pub fn future_start(from: NaiveDate, today: NaiveDate) -> NaiveDate {
    from.max(today)
}

/// Whether `date` is kept by an optional weekday filter.
pub fn weekday_selected(date: NaiveDate, weekdays: Option<&[Weekday]>) -> bool {
    match weekdays {
        Some(days) if !days.is_empty() => days.contains(&date.weekday()),
        _ => true,
    }
}

/// `date` moved forward by `days`, or a field error past the calendar's end.
pub fn days_after(field: &str, date: NaiveDate, days: u64) -> Result<NaiveDate, AppError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| AppError::field(field, "The date is out of range"))
}

/// Map each day after the source week, up to and including `until`, onto the
/// source day with the same offset modulo seven. Days before `today` are
/// skipped. Returns (target, source).
pub fn week_pattern_targets(
    source_week_start: NaiveDate,
    until: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<(NaiveDate, NaiveDate)>, AppError> {
    let first_target = days_after("source_week_start", source_week_start, 7)?;
    if until < first_target {
        return Err(AppError::field(
            "until",
            "The until date must be after the source week",
        ));
    }

    Ok(future_start(first_target, today)
        .iter_days()
        .take_while(|d| *d <= until)
        .filter_map(|target| {
            let offset = (target - source_week_start).num_days() % 7;
            let source = source_week_start.checked_add_days(Days::new(offset as u64))?;
            Some((target, source))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_row_per_calendar_day() {
        assert_eq!(month_days(2024, 2).unwrap().len(), 29);
        assert_eq!(month_days(2026, 2).unwrap().len(), 28);
        assert_eq!(month_days(2026, 4).unwrap().len(), 30);

        let december = month_days(2026, 12).unwrap();
        assert_eq!(december.len(), 31);
        assert_eq!(december.first(), Some(&date(2026, 12, 1)));
        assert_eq!(december.last(), Some(&date(2026, 12, 31)));
    }

    #[test]
    fn invalid_month_is_a_field_error() {
        assert!(matches!(month_days(2026, 13), Err(AppError::Validation(_))));
        assert!(matches!(month_days(2026, 0), Err(AppError::Validation(_))));
    }

    #[test]
    fn future_window_never_starts_in_the_past() {
        let today = date(2026, 10, 18);
        assert_eq!(future_start(date(2026, 10, 1), today), today);
        assert_eq!(future_start(date(2026, 11, 1), today), date(2026, 11, 1));
    }

    #[test]
    fn weekday_filter() {
        let monday = date(2026, 10, 19);
        assert!(weekday_selected(monday, None));
        assert!(weekday_selected(monday, Some(&[])));
        assert!(weekday_selected(monday, Some(&[Weekday::Mon, Weekday::Tue])));
        assert!(!weekday_selected(monday, Some(&[Weekday::Sat])));
    }

    #[test]
    fn week_pattern_repeats_by_offset() {
        let start = date(2026, 10, 5); // Monday
        let targets = week_pattern_targets(start, date(2026, 10, 25), start).unwrap();

        assert_eq!(targets.len(), 14);
        assert_eq!(targets[0], (date(2026, 10, 12), start));
        assert_eq!(targets[6], (date(2026, 10, 18), date(2026, 10, 11)));
        assert_eq!(targets[7], (date(2026, 10, 19), start));
        assert!(targets.iter().all(|(t, s)| t.weekday() == s.weekday()));
    }

    #[test]
    fn week_pattern_needs_a_later_until() {
        let start = date(2026, 10, 5);
        assert!(week_pattern_targets(start, date(2026, 10, 11), start).is_err());
    }

    #[test]
    fn week_pattern_never_writes_past_days() {
        let start = date(2026, 10, 5);
        let today = date(2026, 10, 21); // Wednesday of the second copied week
        let targets = week_pattern_targets(start, date(2026, 10, 25), today).unwrap();

        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0], (today, date(2026, 10, 7)));
        assert!(targets.iter().all(|(t, _)| *t >= today));
    }

    #[test]
    fn dates_at_the_end_of_the_calendar_are_errors() {
        let last = NaiveDate::MAX;
        assert!(matches!(days_after("until", last, 1), Err(AppError::Validation(_))));
        assert!(week_pattern_targets(last, last, last).is_err());
    }
}
