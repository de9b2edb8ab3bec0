//! Repeat policies and cron normalization, grounded on
//! `openintent-intent::scheduler`'s `normalize_cron_expr`/`parse_schedule`
//! pair (`SPEC_FULL.md` §4.5).

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use taskforge_core::{Result, TaskforgeError};

/// How a scheduled entry's next fire time is derived from its current one.
#[derive(Clone)]
pub enum RepeatPolicy {
    /// Fires exactly once.
    Once,
    /// Fires every `step`, starting at the entry's initial fire time.
    FixedInterval { step: Duration },
    /// Fires on a parsed cron schedule.
    Cron { schedule: cron::Schedule },
}

impl RepeatPolicy {
    /// Compute the next fire time after `current`, or `None` if this policy
    /// has no further occurrence.
    #[must_use]
    pub fn advance(&self, current: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Once => None,
            Self::FixedInterval { step } => {
                let step = chrono::Duration::from_std(*step).unwrap_or(chrono::Duration::zero());
                Some(current + step)
            }
            Self::Cron { schedule } => schedule.after(&current).next(),
        }
    }
}

/// Normalize a cron expression to the 6/7-field format the `cron` crate
/// expects, prepending a `0` seconds field to standard 5-field input.
#[must_use]
pub fn normalize_cron_expr(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// Parse a cron expression, accepting 5-, 6-, or 7-field input.
pub fn parse_schedule(expr: &str) -> Result<cron::Schedule> {
    let normalized = normalize_cron_expr(expr);
    cron::Schedule::from_str(&normalized).map_err(|err| TaskforgeError::ConfigurationError {
        reason: format!("invalid cron expression `{expr}`: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_cron_is_normalized_and_parses() {
        assert!(parse_schedule("*/5 * * * *").is_ok());
    }

    #[test]
    fn six_field_cron_passes_through() {
        assert!(parse_schedule("0 30 9 * * 1-5").is_ok());
    }

    #[test]
    fn garbage_cron_is_a_configuration_error() {
        let result = parse_schedule("not a cron");
        assert!(matches!(result, Err(TaskforgeError::ConfigurationError { .. })));
    }

    #[test]
    fn fixed_interval_advances_by_step() {
        let policy = RepeatPolicy::FixedInterval {
            step: Duration::from_secs(60),
        };
        let now = Utc::now();
        let next = policy.advance(now).unwrap();
        assert_eq!((next - now).num_seconds(), 60);
    }

    #[test]
    fn once_never_advances() {
        assert!(RepeatPolicy::Once.advance(Utc::now()).is_none());
    }
}
