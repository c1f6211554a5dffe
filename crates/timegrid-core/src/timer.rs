//! Running-timer tracker.
//!
//! A wall-clock state machine with no internal threads: callers pass the
//! current instant into every command, and elapsed time derives from
//! timestamps. Stopping produces the finished `TimeEntry`; the tracker
//! itself never touches storage beyond its own snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::events::AppEvent;
use crate::model::TimeEntry;
use crate::report::format_hms;
use crate::storage::Database;

const SNAPSHOT_KEY: &str = "timer.tracker";

/// What the running timer will become when stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub description: String,
    pub project_id: Option<String>,
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub billable: bool,
}

/// Timer state machine: `Idle` or `Running` since a start instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Tracker {
    #[default]
    Idle,
    Running {
        started_at: DateTime<Utc>,
        draft: EntryDraft,
    },
}

impl Tracker {
    pub fn new() -> Self {
        Tracker::Idle
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        matches!(self, Tracker::Running { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Tracker::Running { started_at, .. } => Some(*started_at),
            Tracker::Idle => None,
        }
    }

    /// Time tracked so far, `None` while idle.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at().map(|started_at| now - started_at)
    }

    /// Status display such as `⏱ 1:23:45 • write docs`, `None` while idle.
    ///
    /// The label is the draft description, falling back to the project id
    /// and then to the application name.
    pub fn status_line(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Tracker::Running { started_at, draft } => {
                let label = if !draft.description.is_empty() {
                    draft.description.as_str()
                } else if let Some(project_id) = draft.project_id.as_deref() {
                    project_id
                } else {
                    "timegrid"
                };
                let elapsed = (now - *started_at).num_seconds().max(0);
                Some(format!("⏱ {} • {}", format_hms(elapsed), label))
            }
            Tracker::Idle => None,
        }
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Begin tracking at `now`.
    ///
    /// # Errors
    ///
    /// `ValidationError::TimerAlreadyRunning` when a timer is active.
    pub fn start(&mut self, now: DateTime<Utc>, draft: EntryDraft) -> Result<AppEvent, ValidationError> {
        if let Tracker::Running { started_at, .. } = self {
            return Err(ValidationError::TimerAlreadyRunning {
                started_at: *started_at,
            });
        }
        let event = AppEvent::TimerStarted {
            description: draft.description.clone(),
            project_id: draft.project_id.clone(),
            at: now,
        };
        *self = Tracker::Running {
            started_at: now,
            draft,
        };
        Ok(event)
    }

    /// Stop tracking at `now` and build the finished entry.
    ///
    /// The entry spans `started_at..now` with duration in whole seconds and
    /// anchor at the start instant.
    ///
    /// # Errors
    ///
    /// `TimerNotRunning` while idle; `InvalidTimeRange` when `now` is not
    /// after the start instant (the timer stays running).
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(TimeEntry, AppEvent), ValidationError> {
        let (started_at, draft) = match self {
            Tracker::Running { started_at, draft } => (*started_at, draft.clone()),
            Tracker::Idle => return Err(ValidationError::TimerNotRunning),
        };

        let mut entry = TimeEntry::from_range(draft.description, started_at, now)?;
        entry.project_id = draft.project_id;
        entry.calendar_id = draft.calendar_id;
        entry.tags = draft.tags;
        entry.billable = draft.billable;

        *self = Tracker::Idle;
        let event = AppEvent::TimerStopped {
            entry_id: entry.id.clone(),
            duration_secs: entry.duration,
            at: now,
        };
        Ok((entry, event))
    }

    /// Discard the running timer without creating an entry.
    ///
    /// # Errors
    ///
    /// `ValidationError::TimerNotRunning` while idle.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<AppEvent, ValidationError> {
        if !self.is_running() {
            return Err(ValidationError::TimerNotRunning);
        }
        *self = Tracker::Idle;
        Ok(AppEvent::TimerCancelled { at: now })
    }

    // ── Snapshot persistence ────────────────────────────────────────────

    /// Restore the tracker from its database snapshot. A missing snapshot
    /// loads as idle; a corrupt one is logged and discarded.
    pub fn load(db: &Database) -> Result<Self> {
        match db.kv_get(SNAPSHOT_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(tracker) => Ok(tracker),
                Err(err) => {
                    tracing::warn!("Discarding corrupt timer snapshot: {}", err);
                    Ok(Tracker::Idle)
                }
            },
            None => Ok(Tracker::Idle),
        }
    }

    /// Persist the tracker so a running timer survives restarts.
    pub fn persist(&self, db: &Database) -> Result<()> {
        match self {
            Tracker::Running { .. } => db.kv_set(SNAPSHOT_KEY, &serde_json::to_string(self)?),
            Tracker::Idle => db.kv_delete(SNAPSHOT_KEY),
        }
    }
}
