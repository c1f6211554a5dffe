use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use timegrid_core::feed::{EventFeed, HttpFeed};
use timegrid_core::layout::GridMetrics;
use timegrid_core::view::{self, CalendarSelection, ViewKind, ViewRange};
use timegrid_core::ExternalEvent;

use crate::app::App;
use crate::commands::fmt_minute;

#[derive(Subcommand)]
pub enum ViewAction {
    /// One day
    Day {
        /// Day to show (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Monday through Friday of the anchor's week
    Workweek {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Monday through Sunday of the anchor's week
    Week {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: ViewAction) -> Result<(), Box<dyn std::error::Error>> {
    let (kind, date, json) = match action {
        ViewAction::Day { date, json } => (ViewKind::Day, date, json),
        ViewAction::Workweek { date, json } => (ViewKind::WorkWeek, date, json),
        ViewAction::Week { date, json } => (ViewKind::Week, date, json),
    };

    let app = App::open()?;
    let range = ViewRange::new(kind, date.unwrap_or_else(|| Utc::now().date_naive()));
    let (start, end) = range.window();

    let entries = app.db.entries_for_window(start, end)?;
    let events = fetch_events(&app, start, end).await;
    let selection = CalendarSelection::from_config(&app.config.calendars);
    let metrics = GridMetrics {
        pixels_per_minute: app.config.view.pixels_per_minute,
        min_block_height: app.config.view.min_block_height,
    };
    let days = view::compose(&entries, &events, &selection, range, &metrics);

    if json {
        println!("{}", serde_json::to_string_pretty(&days)?);
        return Ok(());
    }

    let marker = view::now_marker(range, Utc::now());
    for (index, day) in days.iter().enumerate() {
        println!("{}", day.date.format("%A %Y-%m-%d"));
        if day.segments.is_empty() {
            println!("  (empty)");
        }
        for segment in &day.segments {
            let columns = if segment.columns > 1 {
                format!("  [{}/{}]", segment.column + 1, segment.columns)
            } else {
                String::new()
            };
            println!(
                "  {}-{}  {}{}",
                fmt_minute(segment.start_minute),
                fmt_minute(segment.end_minute),
                segment.title,
                columns
            );
        }
        if let Some(marker) = marker {
            if marker.day_index == index {
                println!("  -- now {}", fmt_minute(marker.minute));
            }
        }
        println!();
    }
    Ok(())
}

/// Fetch events from every enabled feed; a failing feed is reported and
/// skipped rather than failing the view.
async fn fetch_events(app: &App, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<ExternalEvent> {
    if !app.config.sync.online {
        return Vec::new();
    }
    let mut events = Vec::new();
    for feed in &app.config.sync.feeds {
        if !app.config.calendars.enabled_feeds.contains(&feed.id) {
            continue;
        }
        let client = HttpFeed::new(feed.id.clone(), feed.url.clone(), feed.color.clone());
        match client.events(start, end).await {
            Ok(mut batch) => events.append(&mut batch),
            Err(err) => eprintln!("feed {}: {err}", feed.id),
        }
    }
    events
}
