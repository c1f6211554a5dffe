use clap::Subcommand;
use timegrid_core::queue::Operation;
use timegrid_core::Tag;

use crate::app::App;

#[derive(Subcommand)]
pub enum TagAction {
    /// Create a tag
    Add {
        name: String,
        /// Display color, e.g. "#10B981"
        #[arg(long)]
        color: Option<String>,
    },
    /// List tags
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a tag
    Delete { name: String },
}

pub async fn run(action: TagAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        TagAction::Add { name, color } => {
            let mut tag = Tag::new(name);
            tag.color = color;

            app.db.insert_tag(&tag)?;
            println!("Added {}", tag.name);

            let report = app.submit(Operation::CreateTag { tag }, None).await?;
            println!("{}", app.describe_outcome(&report));
        }
        TagAction::List { json } => {
            let tags = app.db.list_tags()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else if tags.is_empty() {
                println!("No tags");
            } else {
                for tag in &tags {
                    match &tag.color {
                        Some(color) => println!("{}  {}", tag.name, color),
                        None => println!("{}", tag.name),
                    }
                }
            }
        }
        TagAction::Delete { name } => {
            app.db.delete_tag(&name)?;
            println!("Deleted {name}");

            let report = app.submit(Operation::DeleteTag { name }, None).await?;
            println!("{}", app.describe_outcome(&report));
        }
    }
    Ok(())
}
