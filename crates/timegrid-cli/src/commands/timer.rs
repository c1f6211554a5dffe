use chrono::Utc;
use clap::Subcommand;
use timegrid_core::queue::Operation;
use timegrid_core::report::format_hms;
use timegrid_core::timer::{EntryDraft, Tracker};

use crate::app::App;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start tracking
    Start {
        /// What the time is being spent on
        description: Option<String>,
        /// Project id to book the time on
        #[arg(long)]
        project: Option<String>,
        /// Calendar for the resulting entry (defaults from config)
        #[arg(long)]
        calendar: Option<String>,
        /// Attach a tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Mark the resulting entry billable
        #[arg(long)]
        billable: bool,
    },
    /// Stop tracking and record the entry
    Stop,
    /// Discard the running timer without recording anything
    Cancel,
    /// Show the running timer
    Status {
        /// Print the raw tracker state as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;
    let mut tracker = Tracker::load(&app.db)?;
    let now = Utc::now();

    match action {
        TimerAction::Start {
            description,
            project,
            calendar,
            tags,
            billable,
        } => {
            let draft = EntryDraft {
                description: description.unwrap_or_default(),
                project_id: project,
                calendar_id: calendar
                    .or_else(|| app.config.view.default_calendar_id.clone()),
                tags,
                billable,
            };
            tracker.start(now, draft)?;
            tracker.persist(&app.db)?;
            if let Some(line) = tracker.status_line(now) {
                println!("{line}");
            }
        }
        TimerAction::Stop => {
            let (entry, _event) = tracker.stop(now)?;
            tracker.persist(&app.db)?;
            app.db.insert_entry(&entry)?;

            if entry.description.is_empty() {
                println!("Recorded {}", format_hms(entry.duration));
            } else {
                println!(
                    "Recorded {} ({})",
                    entry.description,
                    format_hms(entry.duration)
                );
            }

            let entry_id = entry.id.clone();
            let report = app
                .submit(Operation::CreateEntry { entry }, Some(("entry", &entry_id)))
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        TimerAction::Cancel => {
            tracker.cancel(now)?;
            tracker.persist(&app.db)?;
            println!("Timer discarded");
        }
        TimerAction::Status { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&tracker)?);
            } else {
                match tracker.status_line(now) {
                    Some(line) => println!("{line}"),
                    None => println!("No timer running"),
                }
            }
        }
    }
    Ok(())
}
