use clap::Subcommand;
use serde_json::{json, Value};
use timegrid_core::queue::Operation;
use timegrid_core::Project;

use crate::app::App;

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project
    Add {
        name: String,
        /// Display color, e.g. "#3B82F6"
        #[arg(long)]
        color: Option<String>,
        /// Hourly billing rate
        #[arg(long)]
        rate: Option<f64>,
        /// Owning client id
        #[arg(long)]
        client: Option<String>,
    },
    /// List projects
    List {
        #[arg(long)]
        json: bool,
    },
    /// Change fields on a project
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Delete a project
    Delete { id: String },
}

pub async fn run(action: ProjectAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        ProjectAction::Add {
            name,
            color,
            rate,
            client,
        } => {
            let mut project = Project::new(name);
            if let Some(color) = color {
                project.color = color;
            }
            project.hourly_rate = rate;
            project.client_id = client;

            app.db.insert_project(&project)?;
            println!("Added {} ({})", project.name, project.id);

            let project_id = project.id.clone();
            let report = app
                .submit(
                    Operation::CreateProject { project },
                    Some(("project", &project_id)),
                )
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        ProjectAction::List { json } => {
            let projects = app.db.list_projects()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects");
            } else {
                for project in &projects {
                    let rate = project
                        .hourly_rate
                        .map(|r| format!("  {r}/h"))
                        .unwrap_or_default();
                    println!("{}  {}{}", project.id, project.name, rate);
                }
            }
        }
        ProjectAction::Update {
            id,
            name,
            color,
            rate,
        } => {
            let mut project = app
                .db
                .get_project(&id)?
                .ok_or_else(|| format!("no project with id {id}"))?;
            let mut patch = serde_json::Map::new();

            if let Some(name) = name {
                project.name = name;
                patch.insert("name".to_string(), json!(project.name));
            }
            if let Some(color) = color {
                project.color = color;
                patch.insert("color".to_string(), json!(project.color));
            }
            if let Some(rate) = rate {
                project.hourly_rate = Some(rate);
                patch.insert("hourly_rate".to_string(), json!(rate));
            }
            if patch.is_empty() {
                return Err("nothing to update, pass at least one field flag".into());
            }

            app.db.update_project(&project)?;
            println!("Updated {id}");

            let report = app
                .submit(
                    Operation::UpdateProject {
                        id,
                        patch: Value::Object(patch),
                    },
                    None,
                )
                .await?;
            println!("{}", app.describe_outcome(&report));
        }
        ProjectAction::Delete { id } => {
            app.db.delete_project(&id)?;
            println!("Deleted {id}");

            let report = app.submit(Operation::DeleteProject { id }, None).await?;
            println!("{}", app.describe_outcome(&report));
        }
    }
    Ok(())
}
