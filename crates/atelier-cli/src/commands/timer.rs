//! Time log commands.
//!
//! At most one timer runs at a time; `start` refuses when another log
//! is active, and `resume` pauses the active one first.

use atelier_core::storage::StudioDb;
use atelier_core::timelog::TimeLog;
use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a new timer
    Start {
        /// Project to log against
        project_id: String,
        /// Specific chunk being worked on
        #[arg(long)]
        chunk: Option<String>,
    },
    /// Pause the active timer
    Pause,
    /// Resume a paused timer (pauses any active one first)
    Resume {
        /// Time log id
        id: String,
    },
    /// Stop the active timer and lock its duration
    Stop,
    /// Lock a paused timer's duration for invoicing
    Finalize {
        /// Time log id
        id: String,
    },
    /// Override a timer's recorded duration (active or paused only)
    SetDuration {
        /// Time log id
        id: String,
        /// New duration in minutes
        minutes: i64,
    },
    /// Link a finalized timer to an invoice
    Invoice {
        /// Time log id
        id: String,
        /// Invoice identifier
        invoice_id: String,
    },
    /// Show the active timer
    Status,
    /// List time logs
    List {
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = StudioDb::open()?;
    let now = Utc::now();

    match action {
        TimerAction::Start { project_id, chunk } => {
            if db.get_project(&project_id)?.is_none() {
                return Err(format!("unknown project: {project_id}").into());
            }
            let log = TimeLog::start(Uuid::new_v4().to_string(), project_id, chunk, now);
            db.start_time_log(&log)?;
            println!("Timer started: {}", log.id);
        }
        TimerAction::Pause => {
            let mut log = db
                .active_time_log()?
                .ok_or("no active timer")?;
            log.pause(now)?;
            db.save_time_log(&log)?;
            println!(
                "Timer paused: {} ({} min elapsed)",
                log.id,
                log.accumulated_seconds / 60
            );
        }
        TimerAction::Resume { id } => {
            // Resume is exclusive: park whatever is currently running.
            if let Some(mut active) = db.active_time_log()? {
                if active.id != id {
                    active.pause(now)?;
                    db.save_time_log(&active)?;
                    println!("Paused running timer: {}", active.id);
                }
            }
            let mut log = db
                .get_time_log(&id)?
                .ok_or_else(|| format!("unknown time log: {id}"))?;
            log.resume(now)?;
            db.save_time_log(&log)?;
            println!("Timer resumed: {}", log.id);
        }
        TimerAction::Stop => {
            let mut log = db
                .active_time_log()?
                .ok_or("no active timer")?;
            log.stop(now)?;
            db.save_time_log(&log)?;
            println!(
                "Timer stopped: {} ({} min recorded)",
                log.id,
                log.accumulated_seconds / 60
            );
        }
        TimerAction::Finalize { id } => {
            let mut log = db
                .get_time_log(&id)?
                .ok_or_else(|| format!("unknown time log: {id}"))?;
            log.finalize()?;
            db.save_time_log(&log)?;
            println!("Timer finalized: {}", log.id);
        }
        TimerAction::SetDuration { id, minutes } => {
            let mut log = db
                .get_time_log(&id)?
                .ok_or_else(|| format!("unknown time log: {id}"))?;
            log.set_duration(minutes * 60, now)?;
            db.save_time_log(&log)?;
            println!("Duration set: {} ({minutes} min)", log.id);
        }
        TimerAction::Invoice { id, invoice_id } => {
            let mut log = db
                .get_time_log(&id)?
                .ok_or_else(|| format!("unknown time log: {id}"))?;
            log.attach_invoice(invoice_id)?;
            db.save_time_log(&log)?;
            println!("Timer invoiced: {}", log.id);
        }
        TimerAction::Status => match db.active_time_log()? {
            Some(log) => {
                println!(
                    "Active: {} on project {} ({} min elapsed)",
                    log.id,
                    log.project_id,
                    log.elapsed_seconds(now) / 60
                );
            }
            None => println!("No active timer."),
        },
        TimerAction::List { project } => {
            let logs = db.list_time_logs(project.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
    }
    Ok(())
}
