use clap::Subcommand;
use serde_json::{json, Value};
use timegrid_core::queue::Operation;
use timegrid_core::Client;

use crate::app::App;

#[derive(Subcommand)]
pub enum ClientAction {
    /// Create a client
    Add {
        name: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// List clients
    List {
        #[arg(long)]
        json: bool,
    },
    /// Change fields on a client
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a client
    Delete { id: String },
}

pub async fn run(action: ClientAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        ClientAction::Add { name, note } => {
            let mut client = Client::new(name);
            client.note = note;

            app.db.insert_client(&client)?;
            println!("Added {} ({})", client.name, client.id);

            let client_id = client.id.clone();
            let report = app
                .submit(
                    Operation::CreateClient { client },
                    Some(("client", &client_id)),
                )
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        ClientAction::List { json } => {
            let clients = app.db.list_clients()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clients)?);
            } else if clients.is_empty() {
                println!("No clients");
            } else {
                for client in &clients {
                    let note = client
                        .note
                        .as_deref()
                        .map(|n| format!("  ({n})"))
                        .unwrap_or_default();
                    println!("{}  {}{}", client.id, client.name, note);
                }
            }
        }
        ClientAction::Update { id, name, note } => {
            let mut client = app
                .db
                .get_client(&id)?
                .ok_or_else(|| format!("no client with id {id}"))?;
            let mut patch = serde_json::Map::new();

            if let Some(name) = name {
                client.name = name;
                patch.insert("name".to_string(), json!(client.name));
            }
            if let Some(note) = note {
                client.note = Some(note);
                patch.insert("note".to_string(), json!(client.note));
            }
            if patch.is_empty() {
                return Err("nothing to update, pass at least one field flag".into());
            }

            app.db.update_client(&client)?;
            println!("Updated {id}");

            let report = app
                .submit(
                    Operation::UpdateClient {
                        id,
                        patch: Value::Object(patch),
                    },
                    None,
                )
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        ClientAction::Delete { id } => {
            app.db.delete_client(&id)?;
            println!("Deleted {id}");

            let report = app.submit(Operation::DeleteClient { id }, None).await?;
            println!("{}", app.describe_outcome(&report));
        }
    }
    Ok(())
}
