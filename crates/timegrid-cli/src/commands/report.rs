use chrono::{Datelike, Days, NaiveDate, Utc};
use clap::Subcommand;
use timegrid_core::report::{self, TimeReport};

use crate::app::App;

#[derive(Subcommand)]
pub enum ReportAction {
    /// Today's totals
    Today {
        #[arg(long)]
        json: bool,
    },
    /// Totals for one UTC day
    Day {
        date: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Totals for the week containing a date (defaults to this week)
    Week {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Totals for an inclusive date range
    Range {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ReportAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;

    let (report, json) = match action {
        ReportAction::Today { json } => {
            (report::for_day(&app.db, Utc::now().date_naive())?, json)
        }
        ReportAction::Day { date, json } => (report::for_day(&app.db, date)?, json),
        ReportAction::Week { date, json } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
            (
                report::for_range(&app.db, monday, monday + Days::new(7))?,
                json,
            )
        }
        ReportAction::Range { from, to, json } => {
            (report::for_range(&app.db, from, to + Days::new(1))?, json)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &TimeReport) {
    let first = report.start.date_naive();
    let last = report.end.date_naive().pred_opt().unwrap_or(first);
    if first == last {
        println!("{first}");
    } else {
        println!("{first} .. {last}");
    }

    let width = report
        .projects
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("billable".len());

    println!("{:<width$}  {:>9}", "total", report.total_hms());
    println!("{:<width$}  {:>9}", "billable", report.billable_hms());

    if !report.projects.is_empty() {
        println!();
        for project in &report.projects {
            println!("{:<width$}  {:>9}", project.name, project.hms());
        }
    }
}
