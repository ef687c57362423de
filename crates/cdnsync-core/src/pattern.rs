//! Minute-of-hour recurrence patterns.
//!
//! A task's schedule is a set of minutes within the hour. The sync file may
//! spell it out (`minutes: [0, 30]`) or give a step (`every: 15`), which
//! expands over `0..=59` the same way a stepped cron field does.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LAST_MINUTE: u32 = 59;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("minute pattern is empty")]
    Empty,

    #[error("minute {0} is out of range 0-59")]
    MinuteOutOfRange(u32),

    #[error("step {0} is out of range 1-59")]
    StepOutOfRange(u32),

    #[error("malformed pattern {0}; expected `minutes: [..]` or `every: N`")]
    Malformed(String),
}

/// Pattern exactly as written in the sync file, before validation.
///
/// Anything that fits neither form lands in `Invalid` so that one bad entry
/// never fails the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPattern {
    Minutes { minutes: Vec<u32> },
    Every { every: u32 },
    Invalid(serde_yaml::Value),
}

/// Validated, non-empty set of minutes in `0..=59`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinutePattern {
    minutes: BTreeSet<u32>,
}

impl MinutePattern {
    /// Build a pattern from an explicit list of minutes. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Empty`] for an empty list and
    /// [`PatternError::MinuteOutOfRange`] for any minute above 59.
    pub fn from_minutes<I>(minutes: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut set = BTreeSet::new();
        for minute in minutes {
            if minute > LAST_MINUTE {
                return Err(PatternError::MinuteOutOfRange(minute));
            }
            set.insert(minute);
        }
        if set.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self { minutes: set })
    }

    /// Every `step` minutes starting at minute 0.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::StepOutOfRange`] unless `1 <= step <= 59`.
    pub fn every(step: u32) -> Result<Self, PatternError> {
        if step == 0 || step > LAST_MINUTE {
            return Err(PatternError::StepOutOfRange(step));
        }
        Self::from_minutes((0..=LAST_MINUTE).step_by(step as usize))
    }

    #[must_use]
    pub fn matches(&self, minute: u32) -> bool {
        self.minutes.contains(&minute)
    }

    pub fn minutes(&self) -> impl Iterator<Item = u32> + '_ {
        self.minutes.iter().copied()
    }

    /// Six-field cron expression (seconds first) firing at second 0 of each
    /// minute in the pattern, every hour of every day.
    #[must_use]
    pub fn cron_expression(&self) -> String {
        format!("0 {self} * * * *")
    }
}

impl fmt::Display for MinutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .minutes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

impl TryFrom<&RawPattern> for MinutePattern {
    type Error = PatternError;

    fn try_from(raw: &RawPattern) -> Result<Self, Self::Error> {
        match raw {
            RawPattern::Minutes { minutes } => Self::from_minutes(minutes.iter().copied()),
            RawPattern::Every { every } => Self::every(*every),
            RawPattern::Invalid(value) => Err(PatternError::Malformed(describe(value))),
        }
    }
}

fn describe(value: &serde_yaml::Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(yaml) => format!("`{}`", yaml.trim().replace('\n', ", ")),
        Err(_) => format!("{value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_minutes_are_sorted_and_deduplicated() {
        let pattern = MinutePattern::from_minutes([30, 0, 30]).unwrap();
        assert_eq!(pattern.minutes().collect::<Vec<_>>(), vec![0, 30]);
        assert_eq!(pattern.to_string(), "0,30");
    }

    #[test]
    fn matches_only_configured_minutes() {
        let pattern = MinutePattern::from_minutes([0, 30]).unwrap();
        for minute in 0..=LAST_MINUTE {
            assert_eq!(
                pattern.matches(minute),
                minute == 0 || minute == 30,
                "minute {minute}"
            );
        }
    }

    #[test]
    fn step_expands_over_the_hour() {
        let pattern = MinutePattern::every(15).unwrap();
        assert_eq!(pattern.minutes().collect::<Vec<_>>(), vec![0, 15, 30, 45]);

        let uneven = MinutePattern::every(25).unwrap();
        assert_eq!(uneven.minutes().collect::<Vec<_>>(), vec![0, 25, 50]);
    }

    #[test]
    fn step_of_one_covers_every_minute() {
        let pattern = MinutePattern::every(1).unwrap();
        assert_eq!(pattern.minutes().count(), 60);
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert_eq!(
            MinutePattern::from_minutes(Vec::new()),
            Err(PatternError::Empty)
        );
        assert_eq!(
            MinutePattern::from_minutes([5, 60]),
            Err(PatternError::MinuteOutOfRange(60))
        );
        assert_eq!(MinutePattern::every(0), Err(PatternError::StepOutOfRange(0)));
        assert_eq!(
            MinutePattern::every(60),
            Err(PatternError::StepOutOfRange(60))
        );
    }

    #[test]
    fn cron_expression_lists_minutes() {
        let pattern = MinutePattern::from_minutes([45, 15]).unwrap();
        assert_eq!(pattern.cron_expression(), "0 15,45 * * * *");
    }

    #[test]
    fn raw_pattern_deserializes_both_forms() {
        let minutes: RawPattern = serde_json::from_str(r#"{"minutes":[0,30]}"#).unwrap();
        assert_eq!(
            minutes,
            RawPattern::Minutes {
                minutes: vec![0, 30]
            }
        );

        let every: RawPattern = serde_json::from_str(r#"{"every":10}"#).unwrap();
        assert_eq!(every, RawPattern::Every { every: 10 });

        let pattern = MinutePattern::try_from(&every).unwrap();
        assert_eq!(pattern.to_string(), "0,10,20,30,40,50");
    }

    #[test]
    fn wrong_shape_is_kept_and_rejected_on_conversion() {
        for yaml in ["minute: 15", "every: -5", "every: x", "hourly: true", "15"] {
            let raw: RawPattern = serde_yaml::from_str(yaml).unwrap();
            assert!(matches!(raw, RawPattern::Invalid(_)), "{yaml}: {raw:?}");

            let err = MinutePattern::try_from(&raw).unwrap_err();
            assert!(matches!(err, PatternError::Malformed(_)), "{yaml}: {err}");
        }

        let raw: RawPattern = serde_yaml::from_str("minute: 15").unwrap();
        let err = MinutePattern::try_from(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed pattern `minute: 15`; expected `minutes: [..]` or `every: N`"
        );
    }
}
