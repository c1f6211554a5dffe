use clap::Subcommand;
use timegrid_core::storage::{Config, FeedConfig};

#[derive(Subcommand)]
pub enum FeedAction {
    /// Subscribe to an external calendar feed and enable it for views
    Add {
        /// Feed identifier used in listings and filters
        id: String,
        /// Endpoint serving the feed's events as JSON
        url: String,
        /// Display color for the feed's events
        #[arg(long)]
        color: Option<String>,
    },
    /// Drop a feed subscription
    Remove { id: String },
    /// List subscribed feeds with their visibility
    List,
    /// Show a feed's events in views
    Enable { id: String },
    /// Hide a feed's events from views
    Disable { id: String },
}

pub fn run(action: FeedAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        FeedAction::Add { id, url, color } => {
            if config.sync.feeds.iter().any(|feed| feed.id == id) {
                return Err(format!("feed {id} already exists").into());
            }
            config.sync.feeds.push(FeedConfig {
                id: id.clone(),
                url,
                color,
            });
            config.calendars.enabled_feeds.insert(id.clone());
            config.save()?;
            println!("Subscribed to {id}, enabled");
        }
        FeedAction::Remove { id } => {
            let before = config.sync.feeds.len();
            config.sync.feeds.retain(|feed| feed.id != id);
            if config.sync.feeds.len() == before {
                return Err(format!("no feed with id {id}").into());
            }
            config.calendars.enabled_feeds.remove(&id);
            config.save()?;
            println!("Removed {id}");
        }
        FeedAction::List => {
            if config.sync.feeds.is_empty() {
                println!("No feeds");
            } else {
                for feed in &config.sync.feeds {
                    let state = if config.calendars.enabled_feeds.contains(&feed.id) {
                        "enabled"
                    } else {
                        "disabled"
                    };
                    println!("{}  [{}]  {}", feed.id, state, feed.url);
                }
            }
        }
        FeedAction::Enable { id } => {
            if !config.sync.feeds.iter().any(|feed| feed.id == id) {
                return Err(format!("no feed with id {id}").into());
            }
            config.calendars.enabled_feeds.insert(id.clone());
            config.save()?;
            println!("Enabled {id}");
        }
        FeedAction::Disable { id } => {
            config.calendars.enabled_feeds.remove(&id);
            config.save()?;
            println!("Disabled {id}");
        }
    }
    Ok(())
}
