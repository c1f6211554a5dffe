use clap::{CommandFactory, Parser, Subcommand};

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "tg", version, about = "TimeGrid time tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Running timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Time entries
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },
    /// Projects
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Clients
    Client {
        #[command(subcommand)]
        action: commands::client::ClientAction,
    },
    /// Tags
    Tag {
        #[command(subcommand)]
        action: commands::tag::TagAction,
    },
    /// Calendars and their visibility
    Calendar {
        #[command(subcommand)]
        action: commands::calendar::CalendarAction,
    },
    /// External calendar feeds
    Feed {
        #[command(subcommand)]
        action: commands::feed::FeedAction,
    },
    /// Day and week grids
    View {
        #[command(subcommand)]
        action: commands::view::ViewAction,
    },
    /// Tracked-time reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Offline queue and connectivity
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Sync server credentials
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Entry { action } => commands::entry::run(action).await,
        Commands::Project { action } => commands::project::run(action).await,
        Commands::Client { action } => commands::client::run(action).await,
        Commands::Tag { action } => commands::tag::run(action).await,
        Commands::Calendar { action } => commands::calendar::run(action),
        Commands::Feed { action } => commands::feed::run(action),
        Commands::View { action } => commands::view::run(action).await,
        Commands::Report { action } => commands::report::run(action),
        Commands::Sync { action } => commands::sync::run(action).await,
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tg", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_entry_add_with_range() {
        let cli = Cli::try_parse_from([
            "tg",
            "entry",
            "add",
            "write docs",
            "--from",
            "2024-01-03 09:00",
            "--to",
            "2024-01-03 10:30",
            "--tag",
            "writing",
            "--billable",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Entry { .. }));
    }

    #[test]
    fn entry_range_requires_both_ends() {
        let result = Cli::try_parse_from([
            "tg",
            "entry",
            "add",
            "half a range",
            "--from",
            "2024-01-03 09:00",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_view_week_with_date() {
        let cli =
            Cli::try_parse_from(["tg", "view", "week", "--date", "2024-01-03", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::View { .. }));
    }

    #[test]
    fn parses_report_range() {
        let cli = Cli::try_parse_from([
            "tg",
            "report",
            "range",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-07",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Report { .. }));
    }
}
