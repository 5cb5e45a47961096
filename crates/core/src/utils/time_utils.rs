use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Moves `instant` forward by `months`, placing it on `anchor_day` of the
/// target month or on that month's last day when it is shorter.
///
/// The time of day is kept. Returns `None` on calendar overflow.
pub fn add_months_clamped(
    instant: DateTime<Utc>,
    months: u32,
    anchor_day: u32,
) -> Option<DateTime<Utc>> {
    let total = instant.year() as i64 * 12 + instant.month0() as i64 + months as i64;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    let day = anchor_day.clamp(1, days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(instant.time()).and_utc())
}

pub fn add_days(instant: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    instant.checked_add_signed(Duration::try_days(days)?)
}
