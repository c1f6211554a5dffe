use clap::Subcommand;
use timegrid_core::Calendar;

use crate::app::App;

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Create a calendar and enable it for views
    Add {
        name: String,
        /// Owner label shown in listings
        #[arg(long, default_value = "local")]
        owner: String,
        /// Display color, e.g. "#10B981"
        #[arg(long)]
        color: Option<String>,
    },
    /// List calendars with their visibility
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show a calendar's entries in views
    Enable { id: String },
    /// Hide a calendar's entries from views
    Disable { id: String },
}

pub fn run(action: CalendarAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        CalendarAction::Add { name, owner, color } => {
            let mut calendar = Calendar::new(name, owner);
            if let Some(color) = color {
                calendar.color = color;
            }
            app.db.insert_calendar(&calendar)?;
            app.config.calendars.enabled.insert(calendar.id.clone());
            app.config.save()?;
            println!("Added {} ({}), enabled", calendar.name, calendar.id);
        }
        CalendarAction::List { json } => {
            let calendars = app.db.list_calendars()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&calendars)?);
            } else if calendars.is_empty() {
                println!("No calendars");
            } else {
                for calendar in &calendars {
                    let state = if app.config.calendars.enabled.contains(&calendar.id) {
                        "enabled"
                    } else {
                        "disabled"
                    };
                    println!(
                        "{}  {}  [{}]  {}",
                        calendar.id, calendar.name, state, calendar.owner
                    );
                }
            }
        }
        CalendarAction::Enable { id } => {
            if app.db.get_calendar(&id)?.is_none() {
                return Err(format!("no calendar with id {id}").into());
            }
            app.config.calendars.enabled.insert(id.clone());
            app.config.save()?;
            println!("Enabled {id}");
        }
        CalendarAction::Disable { id } => {
            app.config.calendars.enabled.remove(&id);
            app.config.save()?;
            println!("Disabled {id}");
        }
    }
    Ok(())
}
