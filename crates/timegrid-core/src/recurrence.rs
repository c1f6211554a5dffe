//! Recurrence rule parsing and window expansion.
//!
//! Supports the restricted RFC-5545 subset the entry editor writes:
//! `FREQ=DAILY|WEEKLY|MONTHLY`. Other RRULE parts (INTERVAL, COUNT, UNTIL,
//! BYDAY, ...) are ignored rather than interpreted. Expansion walks the UTC
//! calendar days of a display window and emits one synthetic occurrence per
//! matching day at the anchor's time-of-day; occurrences are never written
//! back to storage.
//!
//! An entry flagged recurring whose rule does not parse expands as a single
//! occurrence at its anchor. That fallback keeps the calendar rendering in
//! the face of partially-migrated data, and it is logged at WARN so the bad
//! rule is visible in diagnostics instead of silently shadowing occurrences.

use chrono::{DateTime, Datelike, Days, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::TimeEntry;

/// Recurrence frequency, the only RRULE part this system interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    /// Every calendar day.
    Daily,
    /// Every day matching the anchor's weekday.
    Weekly,
    /// Every day matching the anchor's day-of-month. Months without that
    /// day (29/30/31 anchors in shorter months) produce no occurrence; no
    /// rollover or clamping is applied.
    Monthly,
}

impl Frequency {
    fn parse(value: &str) -> Result<Self, RuleError> {
        match value.to_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            other => Err(RuleError::UnsupportedFrequency(other.to_string())),
        }
    }
}

/// Parsed recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
}

/// Error from parsing a rule string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule has no FREQ part")]
    MissingFrequency,
    #[error("unsupported FREQ value: {0}")]
    UnsupportedFrequency(String),
    #[error("malformed rule part: {0}")]
    MalformedPart(String),
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    /// Parse an RRULE string such as `"FREQ=WEEKLY"` or
    /// `"RRULE:FREQ=DAILY;INTERVAL=2"`. Parts other than `FREQ` are ignored.
    fn from_str(rule: &str) -> Result<Self, RuleError> {
        let rule = rule.strip_prefix("RRULE:").unwrap_or(rule);

        let mut frequency = None;
        for part in rule.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            match part.split_once('=') {
                Some((key, value)) => {
                    if key.to_uppercase() == "FREQ" {
                        frequency = Some(Frequency::parse(value)?);
                    } else {
                        tracing::debug!("Ignoring RRULE part: {}", key);
                    }
                }
                None => return Err(RuleError::MalformedPart(part.to_string())),
            }
        }

        match frequency {
            Some(frequency) => Ok(RecurrenceRule { frequency }),
            None => Err(RuleError::MissingFrequency),
        }
    }
}

/// One synthetic occurrence of an entry inside a display window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub entry_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expand one entry over `[window_start, window_end)`.
///
/// Non-recurring entries yield their effective interval when it overlaps
/// the window. Recurring entries yield one occurrence per matching UTC
/// calendar day whose start falls inside the window, each carrying the
/// entry's original duration. A recurring entry with a missing or
/// malformed rule falls back to the non-recurring path (logged at WARN).
pub fn expand_entry(
    entry: &TimeEntry,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    let (start, end) = entry.interval();

    if !entry.recurring {
        return anchor_only(entry, window_start, window_end);
    }

    let rule = match entry.recurrence_rule.as_deref() {
        Some(raw) => match raw.parse::<RecurrenceRule>() {
            Ok(rule) => rule,
            Err(err) => {
                tracing::warn!(
                    "Malformed recurrence rule {:?} on entry {}: {}; treating as single occurrence",
                    raw,
                    entry.id,
                    err
                );
                return anchor_only(entry, window_start, window_end);
            }
        },
        None => {
            tracing::warn!(
                "Entry {} is flagged recurring but has no rule; treating as single occurrence",
                entry.id
            );
            return anchor_only(entry, window_start, window_end);
        }
    };

    let duration = end - start;
    let time_of_day = start.time();
    let mut occurrences = Vec::new();

    let mut day = window_start.date_naive();
    let last_day = (window_end - Duration::nanoseconds(1)).date_naive();
    while day <= last_day {
        let matches = match rule.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => day.weekday() == start.weekday(),
            Frequency::Monthly => day.day() == start.day(),
        };
        if matches {
            let occ_start = day.and_time(time_of_day).and_utc();
            if occ_start >= window_start && occ_start < window_end {
                occurrences.push(Occurrence {
                    entry_id: entry.id.clone(),
                    start: occ_start,
                    end: occ_start + duration,
                });
            }
        }
        day = day + Days::new(1);
    }

    occurrences
}

fn anchor_only(
    entry: &TimeEntry,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    let (start, end) = entry.interval();
    if start < window_end && end > window_start {
        vec![Occurrence {
            entry_id: entry.id.clone(),
            start,
            end,
        }]
    } else {
        Vec::new()
    }
}
