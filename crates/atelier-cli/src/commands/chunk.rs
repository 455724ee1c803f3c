//! Work chunk management commands.

use atelier_core::chunk::{Chunk, ChunkStatus};
use atelier_core::storage::StudioDb;
use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ChunkAction {
    /// Create a new chunk
    Create {
        /// Owning project id
        project_id: String,
        /// Chunk name
        name: String,
        /// Length in hours (1, 2, or 3)
        #[arg(long, default_value_t = 1)]
        hours: u8,
        /// Phase this chunk belongs to
        #[arg(long)]
        phase: Option<String>,
        /// Ordering of the phase within the project
        #[arg(long)]
        phase_order: Option<i32>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// List chunks
    List {
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,
    },
    /// Update a chunk's status or notes
    Update {
        /// Chunk id
        id: String,
        /// New status (pending, in_progress, done)
        #[arg(long)]
        status: Option<String>,
        /// Replace notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a chunk
    Delete {
        /// Chunk id
        id: String,
    },
}

pub fn run(action: ChunkAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = StudioDb::open()?;

    match action {
        ChunkAction::Create {
            project_id,
            name,
            hours,
            phase,
            phase_order,
            description,
        } => {
            if db.get_project(&project_id)?.is_none() {
                return Err(format!("unknown project: {project_id}").into());
            }
            let mut chunk = Chunk::new(Uuid::new_v4().to_string(), project_id, name, hours)?;
            chunk.phase_name = phase;
            chunk.phase_order = phase_order;
            chunk.description = description;
            db.insert_chunk(&chunk)?;
            println!("Chunk created: {}", chunk.id);
        }
        ChunkAction::List { project } => {
            let chunks = db.list_chunks(project.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        }
        ChunkAction::Update { id, status, notes } => {
            let mut chunk = db
                .get_chunk(&id)?
                .ok_or_else(|| format!("unknown chunk: {id}"))?;
            if let Some(status) = status {
                chunk.status = parse_status(&status)?;
                if chunk.status == ChunkStatus::Done {
                    chunk.completed_at = Some(Utc::now());
                }
            }
            if let Some(notes) = notes {
                chunk.notes = Some(notes);
            }
            db.update_chunk(&chunk)?;
            println!("Chunk updated: {}", chunk.id);
        }
        ChunkAction::Delete { id } => {
            if db.delete_chunk(&id)? {
                println!("Chunk deleted: {id}");
            } else {
                return Err(format!("unknown chunk: {id}").into());
            }
        }
    }
    Ok(())
}

fn parse_status(status: &str) -> Result<ChunkStatus, Box<dyn std::error::Error>> {
    match status {
        "pending" => Ok(ChunkStatus::Pending),
        "in_progress" => Ok(ChunkStatus::InProgress),
        "done" => Ok(ChunkStatus::Done),
        other => Err(format!("unknown status: {other} (scheduled is set by publish)").into()),
    }
}
