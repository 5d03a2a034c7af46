//! Cron expression handling.
//!
//! Task schedules are stored as standard five-field cron expressions
//! (`minute hour day-of-month month day-of-week`) and validated here before
//! they are accepted. The job scheduler expects a leading seconds field, so
//! [`CronSchedule::job_expression`] prepends `0`.

use chrono::{DateTime, TimeDelta, Utc};
use croner::Cron;

use crate::error::CoreError;

/// Upper bound on occurrences walked when looking for a missed fire.
const MAX_MISSED_SCAN: usize = 10_000;

/// A validated five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
}

impl CronSchedule {
    /// Validates and normalizes a five-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCron`] if the expression does not have
    /// exactly five fields or does not parse.
    pub fn parse(expression: &str) -> Result<Self, CoreError> {
        let normalized = expression.split_whitespace().collect::<Vec<_>>().join(" ");
        let fields = normalized.split(' ').filter(|f| !f.is_empty()).count();
        if fields != 5 {
            return Err(CoreError::InvalidCron {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, found {fields}"),
            });
        }

        Cron::new(&normalized)
            .parse()
            .map_err(|e| CoreError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: normalized,
        })
    }

    /// The normalized five-field expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The six-field form (seconds pinned to `0`) used when registering jobs.
    #[must_use]
    pub fn job_expression(&self) -> String {
        format!("0 {}", self.expression)
    }

    /// Returns the first fire time strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron()?.find_next_occurrence(&after, false).ok()
    }

    /// Returns the most recent fire time in `(last_run, now]` if it is no
    /// older than `grace`.
    ///
    /// Fires older than `grace` are abandoned; only the latest one within the
    /// window is reported so a restart runs a missed task at most once.
    #[must_use]
    pub fn missed_fire(
        &self,
        last_run: DateTime<Utc>,
        now: DateTime<Utc>,
        grace: TimeDelta,
    ) -> Option<DateTime<Utc>> {
        let cron = self.cron()?;
        let window_start = now - grace;
        let mut cursor = if last_run > window_start {
            last_run
        } else {
            window_start
        };

        let mut latest = None;
        for _ in 0..MAX_MISSED_SCAN {
            let Ok(next) = cron.find_next_occurrence(&cursor, false) else {
                break;
            };
            if next > now {
                break;
            }
            latest = Some(next);
            cursor = next;
        }

        latest.filter(|fire| *fire > last_run && now - *fire <= grace)
    }

    fn cron(&self) -> Option<Cron> {
        Cron::new(&self.expression).parse().ok()
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Validates a cron expression at a configuration boundary.
///
/// # Errors
///
/// Returns [`CoreError::InvalidCron`] if the expression is not a valid
/// five-field cron expression.
pub fn validate_cron(expression: &str) -> Result<String, CoreError> {
    CronSchedule::parse(expression).map(|s| s.expression)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 12, h, m, 0).unwrap()
    }

    #[test]
    fn parse_accepts_five_field_expressions() {
        for expr in ["0 * * * *", "0 */3 * * *", "0 */12 * * *", "0 9 * * *"] {
            assert!(CronSchedule::parse(expr).is_ok(), "{expr} should parse");
        }
    }

    #[test]
    fn parse_normalizes_whitespace() {
        let schedule = CronSchedule::parse("  0   9 * *  * ").unwrap();
        assert_eq!(schedule.expression(), "0 9 * * *");
    }

    #[test]
    fn parse_rejects_six_field_expressions() {
        let result = CronSchedule::parse("0 0 9 * * *");
        assert!(
            matches!(result, Err(CoreError::InvalidCron { ref reason, .. }) if reason.contains("5 fields")),
            "got: {result:?}"
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(CronSchedule::parse("every hour").is_err());
        assert!(CronSchedule::parse("61 * * * *").is_err());
        assert!(CronSchedule::parse("").is_err());
    }

    #[test]
    fn job_expression_pins_seconds() {
        let schedule = CronSchedule::parse("0 */3 * * *").unwrap();
        assert_eq!(schedule.job_expression(), "0 0 */3 * * *");
    }

    #[test]
    fn next_after_returns_following_fire() {
        let schedule = CronSchedule::parse("0 * * * *").unwrap();
        assert_eq!(schedule.next_after(at(10, 15)), Some(at(11, 0)));
    }

    #[test]
    fn missed_fire_within_grace_is_reported() {
        let schedule = CronSchedule::parse("0 * * * *").unwrap();
        // last ran at 09:00, process was down for the 10:00 fire, now 10:20
        let missed = schedule.missed_fire(at(9, 0), at(10, 20), TimeDelta::hours(1));
        assert_eq!(missed, Some(at(10, 0)));
    }

    #[test]
    fn missed_fire_beyond_grace_is_abandoned() {
        let schedule = CronSchedule::parse("0 9 * * *").unwrap();
        let missed = schedule.missed_fire(at(8, 0), at(11, 30), TimeDelta::hours(1));
        assert_eq!(missed, None);
    }

    #[test]
    fn missed_fire_reports_only_the_latest() {
        let schedule = CronSchedule::parse("*/10 * * * *").unwrap();
        let missed = schedule.missed_fire(at(9, 0), at(9, 35), TimeDelta::hours(1));
        assert_eq!(missed, Some(at(9, 30)));
    }

    #[test]
    fn no_missed_fire_when_last_run_is_after_latest_fire() {
        let schedule = CronSchedule::parse("0 * * * *").unwrap();
        let missed = schedule.missed_fire(at(10, 5), at(10, 20), TimeDelta::hours(1));
        assert_eq!(missed, None);
    }

    #[test]
    fn validate_cron_returns_normalized_expression() {
        assert_eq!(validate_cron("0  9 * * *").unwrap(), "0 9 * * *");
        assert!(validate_cron("nope").is_err());
    }
}
