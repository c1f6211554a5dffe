use clap::Subcommand;
use serde_json::json;
use timegrid_core::queue::DrainReport;

use crate::app::App;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show connectivity, queue depth, and pending placeholders
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Replay queued operations now
    Drain,
    /// Mark the client online and sync the queue
    Online,
    /// Mark the client offline; writes queue locally
    Offline,
}

pub async fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        SyncAction::Status { json } => {
            let status = app.queue.status();
            let placeholders = app.db.list_placeholders()?;

            if json {
                let payload = json!({
                    "online": status.online,
                    "pending": status.pending,
                    "in_flight": status.in_flight,
                    "placeholders": placeholders.len(),
                    "server_url": app.config.sync.server_url,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{}", if status.online { "online" } else { "offline" });
                match app.config.sync.server_url.as_deref() {
                    Some(url) => println!("server        {url}"),
                    None => println!("server        (not configured)"),
                }
                println!("queued        {}", status.pending);
                println!("placeholders  {}", placeholders.len());
            }
        }
        SyncAction::Drain => {
            if !app.config.sync.online {
                return Err("client is offline; run 'tg sync online' first".into());
            }
            if app.remote()?.is_none() {
                return Err("no sync server configured; set sync.server_url first".into());
            }
            let report = app.drain().await?;
            print_drain(&app, &report);
        }
        SyncAction::Online => {
            app.config.sync.online = true;
            app.config.save()?;
            app.queue.set_online(true);
            println!("online");

            if !app.queue.is_empty() && app.remote()?.is_some() {
                let report = app.drain().await?;
                print_drain(&app, &report);
            }
        }
        SyncAction::Offline => {
            app.config.sync.online = false;
            app.config.save()?;
            app.queue.set_online(false);
            println!("offline, writes will queue locally");
        }
    }
    Ok(())
}

fn print_drain(app: &App, report: &DrainReport) {
    if !report.ran() {
        println!("nothing synced");
        return;
    }
    println!(
        "synced {}, failed {}, dropped {}",
        report.succeeded, report.failed, report.discarded
    );
    if !app.queue.is_empty() {
        println!("{} operations still queued", app.queue.len());
    }
}
