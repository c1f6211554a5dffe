//! Domain records: time entries, projects, clients, tags, calendars,
//! and read-only external events.
//!
//! TimeEntry is the central type. Its effective display interval is the
//! explicit `start..end` pair when both are set, otherwise
//! `anchor..anchor + duration`. Recurring entries store a rule string; the
//! occurrences derived from it are synthetic and never persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Generate a locally-unique identifier with an entity prefix.
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}-{}", prefix, Utc::now().timestamp(), uuid::Uuid::new_v4())
}

/// A tracked span of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEntry {
    /// Unique identifier
    pub id: String,
    /// Owning project (entry holds the foreign key; projects keep no back-list)
    pub project_id: Option<String>,
    /// Owning calendar, used only for grouping and visibility filtering
    pub calendar_id: Option<String>,
    /// Free-text description
    pub description: String,
    /// Unordered tag names; the entry owns the association
    #[serde(default)]
    pub tags: Vec<String>,
    /// Duration in whole seconds, never negative
    pub duration: i64,
    /// Anchor instant; recurrence expands from its time-of-day
    pub anchor: DateTime<Utc>,
    /// Explicit start instant, when known
    pub start: Option<DateTime<Utc>>,
    /// Explicit end instant, when known
    pub end: Option<DateTime<Utc>>,
    /// Billable flag
    pub billable: bool,
    /// Whether this entry repeats
    pub recurring: bool,
    /// Recurrence rule string, `FREQ=DAILY|WEEKLY|MONTHLY` subset
    pub recurrence_rule: Option<String>,
    /// Base entry for recurrence lineage
    pub parent_id: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Create a new entry anchored at the current instant with zero duration.
    pub fn new(description: impl Into<String>) -> Self {
        let now = Utc::now();
        TimeEntry {
            id: new_id("entry"),
            project_id: None,
            calendar_id: None,
            description: description.into(),
            tags: Vec::new(),
            duration: 0,
            anchor: now,
            start: None,
            end: None,
            billable: false,
            recurring: false,
            recurrence_rule: None,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an entry from an explicit start/end pair.
    ///
    /// Duration is derived from the range; the anchor is the start instant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimeRange` when `end <= start`.
    pub fn from_range(
        description: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        let mut entry = TimeEntry::new(description);
        entry.anchor = start;
        entry.start = Some(start);
        entry.end = Some(end);
        entry.duration = (end - start).num_seconds();
        Ok(entry)
    }

    /// Effective display interval.
    pub fn interval(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => (self.anchor, self.anchor + Duration::seconds(self.duration)),
        }
    }

    /// Whether the effective interval touches `[window_start, window_end)`.
    pub fn overlaps_window(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        let (start, end) = self.interval();
        start < window_end && end > window_start
    }
}

/// A project grouping entries for a client, with an optional billing rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    pub hourly_rate: Option<f64>,
    pub client_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            id: new_id("project"),
            name: name.into(),
            color: "#3B82F6".to_string(),
            hourly_rate: None,
            client_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A billing client referenced by projects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Client {
            id: new_id("client"),
            name: name.into(),
            note: None,
            created_at: Utc::now(),
        }
    }
}

/// A tag record. Entries store tag names directly; this record exists for
/// listing and remote CRUD. The name is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub name: String,
    pub color: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            color: None,
        }
    }
}

/// A native calendar entries can associate with, used purely for grouping
/// and visibility filtering, never for conflict detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    pub color: String,
    pub owner: String,
}

impl Calendar {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Calendar {
            id: new_id("calendar"),
            name: name.into(),
            color: "#10B981".to_string(),
            owner: owner.into(),
        }
    }
}

/// A read-only event from a subscribed external feed. Never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Owning calendar-feed identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_serialization() {
        let mut entry = TimeEntry::new("write report");
        entry.tags = vec!["work".to_string(), "writing".to_string()];
        entry.billable = true;

        let json = serde_json::to_string(&entry).unwrap();
        let decoded: TimeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn from_range_derives_duration() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 10, 30, 0).unwrap();

        let entry = TimeEntry::from_range("meeting", start, end).unwrap();
        assert_eq!(entry.duration, 5400);
        assert_eq!(entry.anchor, start);
        assert_eq!(entry.interval(), (start, end));
    }

    #[test]
    fn from_range_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();

        let err = TimeEntry::from_range("backwards", start, end).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimeRange { .. }));
    }

    #[test]
    fn interval_falls_back_to_anchor_plus_duration() {
        let mut entry = TimeEntry::new("untimed");
        entry.anchor = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        entry.duration = 3600;

        let (start, end) = entry.interval();
        assert_eq!(start, entry.anchor);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
    }

    #[test]
    fn window_overlap_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let entry = TimeEntry::from_range("span", start, end).unwrap();

        // Touching at the boundary does not count as overlap.
        assert!(!entry.overlaps_window(end, end + Duration::hours(1)));
        assert!(!entry.overlaps_window(start - Duration::hours(1), start));
        assert!(entry.overlaps_window(start, end));
    }
}
