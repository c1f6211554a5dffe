use clap::Subcommand;
use timegrid_core::storage::token;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the sync server API token
    Login {
        /// API token issued by the sync server
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Check whether a token is stored
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login { token: value } => {
            let value = value.ok_or("--token required")?;
            token::set(&value)?;
            println!("Token stored");
        }
        AuthAction::Logout => {
            token::clear()?;
            println!("Token removed");
        }
        AuthAction::Status => {
            println!(
                "{}",
                if token::get()?.is_some() {
                    "token stored"
                } else {
                    "no token stored"
                }
            );
        }
    }
    Ok(())
}
