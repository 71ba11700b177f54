//! Relative date template resolution
//!
//! Request URLs may carry `{today}` or `{Ndaysago}` placeholders in
//! their `start-date`/`end-date` parameters. These are resolved to
//! concrete `YYYY-MM-DD` dates at fetch time, in the configured
//! timezone so that "today" rolls over at local midnight rather than
//! UTC midnight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static START_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"start-date=\{(\d+)daysago\}").unwrap());
static END_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"end-date=\{(\d+)daysago\}").unwrap());

const TODAY_TEMPLATE: &str = "{today}";

/// Resolve all date templates in a request URL against the current time.
pub fn resolve_request_dates(request: &str, timezone: &str) -> String {
    resolve_request_dates_at(request, timezone, Utc::now())
}

/// Template resolution against an explicit instant.
pub fn resolve_request_dates_at(request: &str, timezone: &str, now: DateTime<Utc>) -> String {
    let mut resolved = request.to_string();
    apply_relative(&mut resolved, &START_DATE_RE, "start-date", timezone, now);
    apply_relative(&mut resolved, &END_DATE_RE, "end-date", timezone, now);
    if resolved.contains(TODAY_TEMPLATE) {
        let today = local_date(now, timezone).format("%Y-%m-%d").to_string();
        resolved = resolved.replace(TODAY_TEMPLATE, &today);
    }
    resolved
}

fn apply_relative(
    resolved: &mut String,
    pattern: &Regex,
    param: &str,
    timezone: &str,
    now: DateTime<Utc>,
) {
    let Some(caps) = pattern.captures(resolved) else {
        return;
    };
    let template = caps[0].to_string();
    let days: i64 = caps[1].parse().unwrap_or(0);
    let date = local_date(now - Duration::days(days), timezone);
    let replacement = format!("{param}={}", date.format("%Y-%m-%d"));
    *resolved = resolved.replace(&template, &replacement);
}

/// Calendar date of `utc` in the named timezone. Unknown names fall
/// back to UTC.
pub fn local_date(utc: DateTime<Utc>, timezone: &str) -> NaiveDate {
    match standard_offset_hours(timezone) {
        None => utc.date_naive(),
        Some(standard) => {
            let local_standard = utc.naive_utc() + Duration::hours(standard);
            let offset = if in_daylight_saving(local_standard) {
                standard + 1
            } else {
                standard
            };
            (utc.naive_utc() + Duration::hours(offset)).date()
        }
    }
}

/// Standard (winter) UTC offsets for the supported North American
/// timezone names.
fn standard_offset_hours(timezone: &str) -> Option<i64> {
    match timezone.to_ascii_lowercase().as_str() {
        "atlantic" => Some(-4),
        "eastern" => Some(-5),
        "central" => Some(-6),
        "mountain" => Some(-7),
        "pacific" => Some(-8),
        _ => None,
    }
}

/// US DST window: 02:00 on the second Sunday of March until 01:00 on
/// the first Sunday of November, evaluated in local standard time.
fn in_daylight_saving(local: NaiveDateTime) -> bool {
    let year = local.year();
    let Some(march) = NaiveDate::from_ymd_opt(year, 3, 8).and_then(|d| d.and_hms_opt(2, 0, 0))
    else {
        return false;
    };
    let Some(november) = NaiveDate::from_ymd_opt(year, 11, 1).and_then(|d| d.and_hms_opt(1, 0, 0))
    else {
        return false;
    };
    let dst_start = first_sunday_on_or_after(march);
    let dst_end = first_sunday_on_or_after(november);
    dst_start <= local && local < dst_end
}

fn first_sunday_on_or_after(moment: NaiveDateTime) -> NaiveDateTime {
    let days_ahead = 6 - i64::from(moment.weekday().num_days_from_monday());
    moment + Duration::days(days_ahead)
}

// ============================================================================
// Tests
// ============================================================================
