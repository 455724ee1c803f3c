//! Draft schedule commands: generate, review, publish, clear.

use atelier_core::calendar::google::GoogleCalendar;
use atelier_core::chunk::Placement;
use atelier_core::error::CalendarError;
use atelier_core::forecast::forecast;
use atelier_core::publisher::Publisher;
use atelier_core::scheduler::DraftScheduler;
use atelier_core::storage::{Config, StudioDb};
use atelier_core::calendar::{CalendarProvider, Rock};
use chrono::Utc;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Generate a fresh draft, replacing any existing one
    Generate,
    /// Show the current draft's metadata
    Show,
    /// List the current draft's chunk placements
    Chunks,
    /// Publish the current draft to the calendar
    Publish {
        /// Expected draft id; publish fails if the draft changed
        #[arg(long)]
        draft_id: Option<String>,
    },
    /// Discard the current draft
    Clear,
    /// List the busy intervals the next generation would route around
    Rocks,
    /// Project revenue from the current draft
    Forecast,
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut db = StudioDb::open()?;

    match action {
        ScheduleAction::Generate => {
            let scheduler = DraftScheduler::new(config.work_policy());
            let now = Utc::now();
            let rocks = fetch_rocks(&config, &scheduler, now)?;

            let chunks = db.list_pending_chunks()?;
            let projects = db.list_projects()?;
            let outcome = scheduler.generate(&chunks, &projects, &rocks, now);
            db.apply_draft(&outcome)?;

            let draft = &outcome.draft;
            println!("Draft generated: {}", draft.id);
            println!(
                "  {} chunks, {} hours, week of {}",
                draft.chunk_count,
                draft.total_hours,
                draft.week_start.format("%Y-%m-%d")
            );
            println!("  rocks avoided: {}", draft.rocks_avoided);
            if !outcome.unplaced.is_empty() {
                println!(
                    "  warning: {} chunk(s) did not fit within the horizon: {}",
                    outcome.unplaced.len(),
                    outcome.unplaced.join(", ")
                );
            }
        }
        ScheduleAction::Show => match db.current_draft()? {
            Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            None => println!("No draft schedule."),
        },
        ScheduleAction::Chunks => {
            let rows = db.draft_chunks()?;
            if rows.is_empty() {
                println!("No draft placements.");
                return Ok(());
            }
            for row in rows {
                if let Placement::Draft { start, end, .. } = row.chunk.placement {
                    println!(
                        "{}  {} - {}  {}: {}",
                        row.chunk.id,
                        start.format("%a %Y-%m-%d %H:%M"),
                        end.format("%H:%M"),
                        row.project_name,
                        row.chunk.name
                    );
                }
            }
        }
        ScheduleAction::Publish { draft_id } => {
            let calendar = GoogleCalendar::new(&config.calendar)?;
            let report = Publisher::new(&db, &calendar).publish(draft_id.as_deref())?;
            println!(
                "{} chunks published, {} failed",
                report.published,
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  failed: {} ({})", failure.chunk_name, failure.message);
            }
        }
        ScheduleAction::Clear => {
            db.clear_draft()?;
            println!("Draft cleared.");
        }
        ScheduleAction::Rocks => {
            let scheduler = DraftScheduler::new(config.work_policy());
            let rocks = fetch_rocks(&config, &scheduler, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&rocks)?);
        }
        ScheduleAction::Forecast => {
            let chunks = db.list_chunks(None)?;
            let projects = db.list_projects()?;
            let forecast = forecast(&chunks, &projects);
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
    }
    Ok(())
}

/// Fetch rocks for the scheduler's search span. A disconnected
/// calendar degrades to scheduling without rocks, with a warning.
fn fetch_rocks(
    config: &Config,
    scheduler: &DraftScheduler,
    now: chrono::DateTime<Utc>,
) -> Result<Vec<Rock>, Box<dyn std::error::Error>> {
    let (start, end) = scheduler.search_span(now);
    let calendar = GoogleCalendar::new(&config.calendar)?;
    match calendar.list_busy_intervals(start, end) {
        Ok(rocks) => Ok(rocks),
        Err(CalendarError::NotConnected(msg)) => {
            eprintln!("warning: calendar not connected ({msg}); scheduling without rocks");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}
