//! Start and reset calculations for quota windows

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

use crate::core::models::TimeInterval;
use crate::utils::{AccountingError, Result};

/// Drops sub-second precision from a timestamp.
///
/// Rolling window starts are computed from a seconds-precision instant so
/// that repeated evaluations within the same second resolve to the same
/// window (and therefore the same cache entry).
pub fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos()))
}

/// Computes the start of the window ending at `now` for the given interval.
///
/// Rolling units subtract the interval span from `now` (truncated to whole
/// seconds). Calendar units snap backwards to an aligned boundary:
/// multi-day intervals count days from 1970-01-01, multi-week intervals
/// count weeks from the first epoch Monday (1970-01-05), and multi-month
/// intervals count months from year zero, so a quarterly limit always
/// starts on January, April, July, or October 1st.
pub fn window_start(
    now: DateTime<Utc>,
    unit: TimeInterval,
    value: u32,
) -> Result<DateTime<Utc>> {
    let span = interval_span(unit, value)?;
    let truncated = truncate_to_second(now);

    let start = match unit {
        TimeInterval::Second | TimeInterval::Minute | TimeInterval::Hour => {
            truncated - Duration::seconds(span)
        }
        TimeInterval::Day => {
            let day_start = start_of_day(truncated);
            let days = days_since_epoch(day_start);
            day_start - Duration::days(days.rem_euclid(i64::from(value)))
        }
        TimeInterval::Week => {
            let day_start = start_of_day(truncated);
            let monday = day_start
                - Duration::days(i64::from(day_start.weekday().num_days_from_monday()));
            if value == 1 {
                monday
            } else {
                // Weeks are numbered from the first epoch Monday, 1970-01-05
                // (day 4), so any Monday is a whole number of weeks away.
                let weeks = (days_since_epoch(monday) - 4).div_euclid(7);
                monday - Duration::weeks(weeks.rem_euclid(i64::from(value)))
            }
        }
        TimeInterval::Month => {
            let months = total_months(truncated);
            let block = months.div_euclid(i64::from(value)) * i64::from(value);
            month_boundary(block)?
        }
    };

    Ok(start)
}

/// Computes when the window beginning at `window_start` ends.
///
/// For calendar windows this is the next aligned boundary. For rolling
/// windows it is the earliest instant at which usage recorded at the start
/// of the window has aged out, which makes it a retry hint rather than a
/// hard boundary.
pub fn window_reset(
    window_start: DateTime<Utc>,
    unit: TimeInterval,
    value: u32,
) -> Result<DateTime<Utc>> {
    let span = interval_span(unit, value)?;

    let reset = match unit {
        TimeInterval::Second | TimeInterval::Minute | TimeInterval::Hour => {
            window_start + Duration::seconds(span)
        }
        TimeInterval::Day => window_start + Duration::days(i64::from(value)),
        TimeInterval::Week => window_start + Duration::weeks(i64::from(value)),
        TimeInterval::Month => month_boundary(total_months(window_start) + i64::from(value))?,
    };

    Ok(reset)
}

/// Interval span in seconds, rejecting a zero `interval_value`.
///
/// Month spans use a nominal 30-day length; callers only rely on the exact
/// value for rolling units and on the zero check for calendar units.
fn interval_span(unit: TimeInterval, value: u32) -> Result<i64> {
    if value == 0 {
        return Err(AccountingError::Validation(format!(
            "interval_value must be positive for {} windows",
            unit
        )));
    }
    Ok(unit.nominal_secs().saturating_mul(i64::from(value)))
}

fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn days_since_epoch(t: DateTime<Utc>) -> i64 {
    t.signed_duration_since(DateTime::UNIX_EPOCH).num_days()
}

/// Zero-indexed month count from year zero.
fn total_months(t: DateTime<Utc>) -> i64 {
    i64::from(t.year()) * 12 + i64::from(t.month0())
}

/// First instant of the month identified by a zero-indexed month count.
fn month_boundary(months: i64) -> Result<DateTime<Utc>> {
    let year = i32::try_from(months.div_euclid(12)).map_err(|_| {
        AccountingError::Validation(format!("month boundary out of range: {}", months))
    })?;
    let month = months.rem_euclid(12) as u32 + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| {
            AccountingError::Validation(format!(
                "invalid month boundary: year {} month {}",
                year, month
            ))
        })
}
