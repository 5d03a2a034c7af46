//! Converts relative post-age labels ("5m", "2 hours", "just now") into
//! absolute timestamps.
//!
//! Anything the resolver cannot read is mapped to a point far in the past so
//! that a horizon check treats it as expired rather than as new.

use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

static AMOUNT_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([a-z]+)").expect("valid amount/unit regex"));
static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid integer regex"));

/// Age assigned to labels that cannot be resolved.
const UNPARSEABLE_AGE_DAYS: i64 = 365;

/// Resolves `label` relative to `now`.
#[must_use]
pub fn resolve_relative_time(label: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = normalize_label(label);
    let unparseable = now - TimeDelta::days(UNPARSEABLE_AGE_DAYS);

    if text
        .split_whitespace()
        .any(|word| word == "now" || word.starts_with("second"))
    {
        return now;
    }

    if let Some(caps) = AMOUNT_UNIT.captures(&text) {
        if let Ok(amount) = caps[1].parse::<i64>() {
            let offset = match &caps[2] {
                "s" | "sec" | "secs" => Some(TimeDelta::zero()),
                "m" | "min" | "mins" | "minute" | "minutes" => TimeDelta::try_minutes(amount),
                "h" | "hr" | "hrs" | "hour" | "hours" => TimeDelta::try_hours(amount),
                "d" | "day" | "days" => TimeDelta::try_days(amount),
                _ => None,
            };
            if let Some(offset) = offset {
                return now.checked_sub_signed(offset).unwrap_or(unparseable);
            }
        }
    }

    let amount = FIRST_INTEGER
        .captures(&text)
        .and_then(|caps| caps[1].parse::<i64>().ok());
    let offset = amount.and_then(|n| {
        if text.contains("minute") {
            TimeDelta::try_minutes(n)
        } else if text.contains("hour") {
            TimeDelta::try_hours(n)
        } else if text.contains("day") {
            TimeDelta::try_days(n)
        } else {
            None
        }
    });

    offset
        .and_then(|offset| now.checked_sub_signed(offset))
        .unwrap_or(unparseable)
}

/// [`resolve_relative_time`] against the current wall-clock time.
#[must_use]
pub fn resolve_relative_time_now(label: &str) -> DateTime<Utc> {
    resolve_relative_time(label, Utc::now())
}

/// Lowercases the label and strips the `·` separators the feed renders
/// around timestamps.
pub(crate) fn normalize_label(label: &str) -> String {
    label.replace('·', " ").trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn abbreviated_labels() {
        assert_eq!(resolve_relative_time("5m", now()), now() - TimeDelta::minutes(5));
        assert_eq!(resolve_relative_time("2h", now()), now() - TimeDelta::hours(2));
        assert_eq!(resolve_relative_time("3d", now()), now() - TimeDelta::days(3));
    }

    #[test]
    fn spelled_out_labels() {
        assert_eq!(
            resolve_relative_time("15 minutes ago", now()),
            now() - TimeDelta::minutes(15)
        );
        assert_eq!(
            resolve_relative_time("1 hour ago", now()),
            now() - TimeDelta::hours(1)
        );
        assert_eq!(
            resolve_relative_time("2 days ago", now()),
            now() - TimeDelta::days(2)
        );
    }

    #[test]
    fn just_now_and_seconds_resolve_to_now() {
        assert_eq!(resolve_relative_time("just now", now()), now());
        assert_eq!(resolve_relative_time("Now", now()), now());
        assert_eq!(resolve_relative_time("30 seconds ago", now()), now());
        assert_eq!(resolve_relative_time("45s", now()), now());
    }

    #[test]
    fn separator_noise_and_case_are_ignored() {
        assert_eq!(
            resolve_relative_time(" · 7H ", now()),
            now() - TimeDelta::hours(7)
        );
    }

    #[test]
    fn unparseable_labels_are_treated_as_a_year_old() {
        let sentinel = now() - TimeDelta::days(365);
        assert_eq!(resolve_relative_time("August 10", now()), sentinel);
        assert_eq!(resolve_relative_time("", now()), sentinel);
        assert_eq!(resolve_relative_time("an hour ago", now()), sentinel);
        assert_eq!(resolve_relative_time("2mo", now()), sentinel);
        assert_eq!(resolve_relative_time("unknown", now()), sentinel);
    }

    #[test]
    fn out_of_range_amounts_are_treated_as_a_year_old() {
        let sentinel = now() - TimeDelta::days(365);
        assert_eq!(resolve_relative_time("100000000 days", now()), sentinel);
        assert_eq!(resolve_relative_time("9999999999h", now()), sentinel);
        assert_eq!(resolve_relative_time("about 100000000 days ago", now()), sentinel);
    }

    #[test]
    fn unparseable_is_older_than_any_realistic_horizon() {
        let resolved = resolve_relative_time("Aug 10, 2025", now());
        assert!(now() - resolved > TimeDelta::hours(24 * 30));
    }

    #[test]
    fn wall_clock_variant_is_within_a_second() {
        let before = Utc::now();
        let resolved = resolve_relative_time_now("5m");
        let expected = before - TimeDelta::minutes(5);
        assert!((resolved - expected).abs() <= TimeDelta::seconds(1));
    }
}
