//! Project management commands.

use atelier_core::project::{Project, ProjectStatus};
use atelier_core::storage::StudioDb;
use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Hourly rate in cents
        #[arg(long, default_value_t = 0)]
        rate: i64,
        /// Conservative rate in cents, used by the forecast
        #[arg(long)]
        rate_low: Option<i64>,
        /// Scheduling priority (higher schedules sooner)
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// List all projects
    List,
    /// Update a project's status or priority
    Update {
        /// Project id
        id: String,
        /// New status (active, paused, done)
        #[arg(long)]
        status: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<i32>,
    },
    /// Bump a project's last-touched time
    Touch {
        /// Project id
        id: String,
    },
}

pub fn run(action: ProjectAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = StudioDb::open()?;

    match action {
        ProjectAction::Create {
            name,
            rate,
            rate_low,
            priority,
        } => {
            let mut project = Project::new(Uuid::new_v4().to_string(), name, rate);
            project.rate_low = rate_low;
            project.priority = priority;
            db.insert_project(&project)?;
            println!("Project created: {}", project.id);
        }
        ProjectAction::List => {
            let projects = db.list_projects()?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        ProjectAction::Update {
            id,
            status,
            priority,
        } => {
            let mut project = db
                .get_project(&id)?
                .ok_or_else(|| format!("unknown project: {id}"))?;
            if let Some(status) = status {
                project.status = parse_status(&status)?;
            }
            if let Some(priority) = priority {
                project.priority = priority;
            }
            db.update_project(&project)?;
            println!("Project updated: {}", project.id);
        }
        ProjectAction::Touch { id } => {
            if db.get_project(&id)?.is_none() {
                return Err(format!("unknown project: {id}").into());
            }
            db.touch_project(&id, Utc::now())?;
            println!("Project touched: {id}");
        }
    }
    Ok(())
}

fn parse_status(status: &str) -> Result<ProjectStatus, Box<dyn std::error::Error>> {
    match status {
        "active" => Ok(ProjectStatus::Active),
        "paused" => Ok(ProjectStatus::Paused),
        "done" => Ok(ProjectStatus::Done),
        other => Err(format!("unknown status: {other}").into()),
    }
}
