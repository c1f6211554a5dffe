use chrono::{Days, NaiveDate, NaiveTime, Utc};
use clap::Subcommand;
use serde_json::{json, Value};
use timegrid_core::queue::Operation;
use timegrid_core::recurrence::RecurrenceRule;
use timegrid_core::report::format_hms;
use timegrid_core::TimeEntry;

use crate::app::App;
use crate::commands::parse_instant;

#[derive(Subcommand)]
pub enum EntryAction {
    /// Record a time entry
    Add {
        /// What the time was spent on
        description: String,
        /// Start instant, "YYYY-MM-DD HH:MM" (UTC); defaults to now
        #[arg(long)]
        at: Option<String>,
        /// Length in minutes (with --at; default 30)
        #[arg(long)]
        minutes: Option<u32>,
        /// Explicit range start (alternative to --at/--minutes)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Explicit range end
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Project id to book the time on
        #[arg(long)]
        project: Option<String>,
        /// Calendar the entry belongs to
        #[arg(long)]
        calendar: Option<String>,
        /// Attach a tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Mark billable
        #[arg(long)]
        billable: bool,
        /// Recurrence rule, e.g. "FREQ=WEEKLY"
        #[arg(long)]
        recur: Option<String>,
    },
    /// List entries
    List {
        /// Restrict to one UTC day
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Change fields on an entry
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// New duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// Move the entry to a new start instant
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        calendar: Option<String>,
        #[arg(long)]
        billable: Option<bool>,
    },
    /// Delete an entry
    Delete { id: String },
}

pub async fn run(action: EntryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        EntryAction::Add {
            description,
            at,
            minutes,
            from,
            to,
            project,
            calendar,
            tags,
            billable,
            recur,
        } => {
            if from.is_some() && (at.is_some() || minutes.is_some()) {
                return Err("use either --at/--minutes or --from/--to, not both".into());
            }

            let mut entry = match (from, to) {
                (Some(from), Some(to)) => {
                    TimeEntry::from_range(description, parse_instant(&from)?, parse_instant(&to)?)?
                }
                _ => {
                    let mut entry = TimeEntry::new(description);
                    if let Some(at) = at {
                        entry.anchor = parse_instant(&at)?;
                    }
                    entry.duration = i64::from(minutes.unwrap_or(30)) * 60;
                    entry
                }
            };
            entry.project_id = project;
            entry.calendar_id =
                calendar.or_else(|| app.config.view.default_calendar_id.clone());
            entry.tags = tags;
            entry.billable = billable;
            if let Some(rule) = recur {
                if rule.parse::<RecurrenceRule>().is_err() {
                    eprintln!(
                        "warning: unrecognized recurrence rule {rule:?}, \
                         the entry will show as a single occurrence"
                    );
                }
                entry.recurring = true;
                entry.recurrence_rule = Some(rule);
            }

            app.db.insert_entry(&entry)?;
            println!("Added {} ({})", entry.id, format_hms(entry.duration));

            let entry_id = entry.id.clone();
            let report = app
                .submit(Operation::CreateEntry { entry }, Some(("entry", &entry_id)))
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        EntryAction::List { date, json } => {
            let entries = match date {
                Some(date) => {
                    let start = date.and_time(NaiveTime::MIN).and_utc();
                    let end = (date + Days::new(1)).and_time(NaiveTime::MIN).and_utc();
                    app.db.entries_for_window(start, end)?
                }
                None => app.db.list_entries()?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No entries");
            } else {
                for entry in &entries {
                    let mut suffix = String::new();
                    if entry.recurring {
                        suffix.push_str("  [recurring]");
                    }
                    if entry.billable {
                        suffix.push_str("  [billable]");
                    }
                    println!(
                        "{}  {}  {:>8}  {}{}",
                        entry.id,
                        entry.anchor.format("%Y-%m-%d %H:%M"),
                        format_hms(entry.duration),
                        entry.description,
                        suffix
                    );
                }
            }
        }
        EntryAction::Update {
            id,
            description,
            minutes,
            at,
            project,
            calendar,
            billable,
        } => {
            let mut entry = app
                .db
                .get_entry(&id)?
                .ok_or_else(|| format!("no entry with id {id}"))?;
            let mut patch = serde_json::Map::new();

            if let Some(description) = description {
                entry.description = description;
                patch.insert("description".to_string(), json!(entry.description));
            }
            if let Some(minutes) = minutes {
                entry.duration = i64::from(minutes) * 60;
                if let (Some(start), Some(_)) = (entry.start, entry.end) {
                    entry.end = Some(start + chrono::Duration::seconds(entry.duration));
                    patch.insert("end".to_string(), json!(entry.end));
                }
                patch.insert("duration".to_string(), json!(entry.duration));
            }
            if let Some(at) = at {
                let new_anchor = parse_instant(&at)?;
                let delta = new_anchor - entry.anchor;
                entry.anchor = new_anchor;
                patch.insert("anchor".to_string(), json!(entry.anchor));
                if let Some(start) = entry.start {
                    entry.start = Some(start + delta);
                    patch.insert("start".to_string(), json!(entry.start));
                }
                if let Some(end) = entry.end {
                    entry.end = Some(end + delta);
                    patch.insert("end".to_string(), json!(entry.end));
                }
            }
            if let Some(project) = project {
                entry.project_id = Some(project);
                patch.insert("project_id".to_string(), json!(entry.project_id));
            }
            if let Some(calendar) = calendar {
                entry.calendar_id = Some(calendar);
                patch.insert("calendar_id".to_string(), json!(entry.calendar_id));
            }
            if let Some(billable) = billable {
                entry.billable = billable;
                patch.insert("billable".to_string(), json!(billable));
            }
            if patch.is_empty() {
                return Err("nothing to update, pass at least one field flag".into());
            }

            entry.updated_at = Utc::now();
            app.db.update_entry(&entry)?;
            println!("Updated {id}");

            let report = app
                .submit(
                    Operation::UpdateEntry {
                        id,
                        patch: Value::Object(patch),
                    },
                    None,
                )
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        EntryAction::Delete { id } => {
            app.db.delete_entry(&id)?;
            println!("Deleted {id}");

            let report = app.submit(Operation::DeleteEntry { id }, None).await?;
            println!("{}", app.describe_outcome(&report));
        }
    }
    Ok(())
}
