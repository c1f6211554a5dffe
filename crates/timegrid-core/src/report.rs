//! Tracked-time reports.
//!
//! Aggregates stored entries into per-project totals over a date window.
//! All windows are half-open UTC day ranges; grouping and ordering happen
//! in SQL, name resolution and formatting happen here.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::storage::Database;

/// Label used for entries with no project.
pub const NO_PROJECT_LABEL: &str = "(no project)";

/// Render whole seconds as `H:MM:SS`. Negative inputs clamp to zero.
pub fn format_hms(total_seconds: i64) -> String {
    let secs = total_seconds.max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Tracked seconds for one project within the report window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTotal {
    pub project_id: Option<String>,
    /// Resolved project name, the raw id when the project row is gone,
    /// or [`NO_PROJECT_LABEL`].
    pub name: String,
    pub seconds: i64,
}

impl ProjectTotal {
    pub fn hms(&self) -> String {
        format_hms(self.seconds)
    }
}

/// Totals for a date window, largest project first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_seconds: i64,
    pub billable_seconds: i64,
    pub projects: Vec<ProjectTotal>,
}

impl TimeReport {
    pub fn total_hms(&self) -> String {
        format_hms(self.total_seconds)
    }

    pub fn billable_hms(&self) -> String {
        format_hms(self.billable_seconds)
    }
}

/// Report for a single UTC day.
pub fn for_day(db: &Database, date: NaiveDate) -> Result<TimeReport> {
    let next = date + Days::new(1);
    for_range(db, date, next)
}

/// Report for the half-open day range `[start, end)`.
///
/// # Errors
///
/// `ValidationError::InvalidTimeRange` when `end` is not after `start`.
pub fn for_range(db: &Database, start: NaiveDate, end: NaiveDate) -> Result<TimeReport> {
    let start = day_start(start);
    let end = day_start(end);
    if end <= start {
        return Err(ValidationError::InvalidTimeRange { start, end }.into());
    }

    let names: HashMap<String, String> = db
        .list_projects()?
        .into_iter()
        .map(|project| (project.id, project.name))
        .collect();

    let projects = db
        .project_totals(start, end)?
        .into_iter()
        .map(|(project_id, seconds)| {
            let name = match project_id.as_deref() {
                Some(id) => names.get(id).cloned().unwrap_or_else(|| id.to_string()),
                None => NO_PROJECT_LABEL.to_string(),
            };
            ProjectTotal {
                project_id,
                name,
                seconds,
            }
        })
        .collect();

    Ok(TimeReport {
        start,
        end,
        total_seconds: db.total_seconds(start, end)?,
        billable_seconds: db.billable_seconds(start, end)?,
        projects,
    })
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, TimeEntry};
    use chrono::TimeZone;

    fn seeded_db() -> Database {
        let db = Database::open_memory().unwrap();

        let mut writing = Project::new("Writing");
        writing.id = "project-writing".to_string();
        db.insert_project(&writing).unwrap();

        for (description, project, hour, duration, billable) in [
            ("draft", Some("project-writing"), 9, 3600, true),
            ("edit", Some("project-writing"), 11, 1800, false),
            ("email", None, 14, 600, false),
            ("orphan", Some("project-gone"), 15, 300, false),
        ] {
            let mut entry = TimeEntry::new(description);
            entry.project_id = project.map(str::to_string);
            entry.anchor = Utc.with_ymd_and_hms(2024, 1, 3, hour, 0, 0).unwrap();
            entry.duration = duration;
            entry.billable = billable;
            db.insert_entry(&entry).unwrap();
        }

        // Outside the report day.
        let mut late = TimeEntry::new("tomorrow");
        late.anchor = Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap();
        late.duration = 7200;
        db.insert_entry(&late).unwrap();

        db
    }

    #[test]
    fn day_report_groups_and_orders_projects() {
        let db = seeded_db();
        let report = for_day(&db, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()).unwrap();

        assert_eq!(report.total_seconds, 6300);
        assert_eq!(report.billable_seconds, 3600);

        let rows: Vec<(&str, i64)> = report
            .projects
            .iter()
            .map(|p| (p.name.as_str(), p.seconds))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Writing", 5400),
                (NO_PROJECT_LABEL, 600),
                ("project-gone", 300),
            ]
        );
    }

    #[test]
    fn range_report_spans_multiple_days() {
        let db = seeded_db();
        let report = for_range(
            &db,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
        .unwrap();

        assert_eq!(report.total_seconds, 13500);
        assert_eq!(report.billable_seconds, 3600);

        // The untracked day-2 entry folds into the no-project group.
        assert_eq!(report.projects[0].name, NO_PROJECT_LABEL);
        assert_eq!(report.projects[0].seconds, 7800);
    }

    #[test]
    fn empty_window_is_rejected() {
        let db = Database::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let err = for_range(&db, date, date).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Validation(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn format_hms_renders_hours_minutes_seconds() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(5), "0:00:05");
        assert_eq!(format_hms(5400), "1:30:00");
        assert_eq!(format_hms(90061), "25:01:01");
        assert_eq!(format_hms(-30), "0:00:00");
    }
}
