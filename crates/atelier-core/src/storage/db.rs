//! SQLite-based storage for projects, chunks, drafts, and time logs.
//!
//! Timestamps are stored as RFC3339 text. A chunk's placement is one
//! sum type in memory but maps onto nullable columns here: draft
//! placements fill `draft_start/draft_end/draft_order`, published ones
//! fill `scheduled_start/scheduled_end/calendar_event_id`. The decode
//! precedence is published, then draft, then unplaced.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use crate::chunk::{Chunk, ChunkStatus, Placement};
use crate::draft::DraftSchedule;
use crate::error::{DatabaseError, Result, ScheduleError};
use crate::project::{Project, ProjectStatus};
use crate::scheduler::DraftOutcome;
use crate::timelog::{TimeLog, TimeLogStatus};

// === Helper Functions ===

fn format_chunk_status(status: ChunkStatus) -> &'static str {
    match status {
        ChunkStatus::Pending => "pending",
        ChunkStatus::Scheduled => "scheduled",
        ChunkStatus::InProgress => "in_progress",
        ChunkStatus::Done => "done",
    }
}

fn parse_chunk_status(status_str: &str) -> ChunkStatus {
    match status_str {
        "scheduled" => ChunkStatus::Scheduled,
        "in_progress" => ChunkStatus::InProgress,
        "done" => ChunkStatus::Done,
        _ => ChunkStatus::Pending,
    }
}

fn format_project_status(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Active => "active",
        ProjectStatus::Paused => "paused",
        ProjectStatus::Done => "done",
    }
}

fn parse_project_status(status_str: &str) -> ProjectStatus {
    match status_str {
        "paused" => ProjectStatus::Paused,
        "done" => ProjectStatus::Done,
        _ => ProjectStatus::Active,
    }
}

fn parse_timelog_status(status_str: &str) -> TimeLogStatus {
    match status_str {
        "active" => TimeLogStatus::Active,
        "paused" => TimeLogStatus::Paused,
        "invoiced" => TimeLogStatus::Invoiced,
        _ => TimeLogStatus::Finalized,
    }
}

/// Parse datetime from RFC3339 string with fallback to current time.
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_datetime_opt(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

const CHUNK_COLUMNS: &str = "id, project_id, phase_name, phase_order, name, description, hours, \
     status, draft_start, draft_end, draft_order, scheduled_start, scheduled_end, \
     calendar_event_id, completed_at, notes, created_at, updated_at";

/// Build a Chunk from a database row (CHUNK_COLUMNS order).
fn row_to_chunk(row: &rusqlite::Row) -> std::result::Result<Chunk, rusqlite::Error> {
    let status_str: String = row.get(7)?;
    let draft_start = parse_datetime_opt(row.get(8)?);
    let draft_end = parse_datetime_opt(row.get(9)?);
    let draft_order: Option<i32> = row.get(10)?;
    let scheduled_start = parse_datetime_opt(row.get(11)?);
    let scheduled_end = parse_datetime_opt(row.get(12)?);
    let event_id: Option<String> = row.get(13)?;

    let placement = match (event_id, scheduled_start, scheduled_end) {
        (Some(event_id), Some(start), Some(end)) => Placement::Published {
            start,
            end,
            event_id,
        },
        _ => match (draft_start, draft_end) {
            (Some(start), Some(end)) => Placement::Draft {
                start,
                end,
                order: draft_order.unwrap_or(0),
            },
            _ => Placement::Unplaced,
        },
    };

    let created_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;

    Ok(Chunk {
        id: row.get(0)?,
        project_id: row.get(1)?,
        phase_name: row.get(2)?,
        phase_order: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        hours: row.get::<_, i64>(6)? as u8,
        status: parse_chunk_status(&status_str),
        placement,
        completed_at: parse_datetime_opt(row.get(14)?),
        notes: row.get(15)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn row_to_project(row: &rusqlite::Row) -> std::result::Result<Project, rusqlite::Error> {
    let status_str: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        priority: row.get(2)?,
        rate: row.get(3)?,
        rate_low: row.get(4)?,
        status: parse_project_status(&status_str),
        last_touched_at: parse_datetime_opt(row.get(6)?),
        created_at: parse_datetime_fallback(&created_at),
    })
}

fn row_to_timelog(row: &rusqlite::Row) -> std::result::Result<TimeLog, rusqlite::Error> {
    let status_str: String = row.get(3)?;
    let started_at: String = row.get(4)?;
    Ok(TimeLog {
        id: row.get(0)?,
        project_id: row.get(1)?,
        chunk_id: row.get(2)?,
        status: parse_timelog_status(&status_str),
        started_at: parse_datetime_fallback(&started_at),
        last_resumed_at: parse_datetime_opt(row.get(5)?),
        accumulated_seconds: row.get(6)?,
        invoice_id: row.get(7)?,
        notes: row.get(8)?,
    })
}

/// A draft chunk joined with its project name, in placement order.
#[derive(Debug, Clone)]
pub struct DraftChunkRow {
    pub chunk: Chunk,
    pub project_name: String,
}

/// SQLite database for studio state.
///
/// Stores projects, chunks, schedule drafts, and time logs.
pub struct StudioDb {
    conn: Connection,
}

impl StudioDb {
    /// Open the database at `~/.config/atelier/atelier.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("atelier.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                priority          INTEGER NOT NULL DEFAULT 0,
                rate              INTEGER NOT NULL DEFAULT 0,
                rate_low          INTEGER,
                status            TEXT NOT NULL DEFAULT 'active',
                last_touched_at   TEXT,
                created_at        TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chunks (
                id                TEXT PRIMARY KEY,
                project_id        TEXT NOT NULL,
                phase_name        TEXT,
                phase_order       INTEGER,
                name              TEXT NOT NULL,
                description       TEXT,
                hours             INTEGER NOT NULL,
                status            TEXT NOT NULL DEFAULT 'pending',
                draft_start       TEXT,
                draft_end         TEXT,
                draft_order       INTEGER,
                scheduled_start   TEXT,
                scheduled_end     TEXT,
                calendar_event_id TEXT,
                completed_at      TEXT,
                notes             TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS schedule_drafts (
                id                TEXT PRIMARY KEY,
                week_start        TEXT NOT NULL,
                week_end          TEXT NOT NULL,
                total_hours       INTEGER NOT NULL DEFAULT 0,
                chunk_count       INTEGER NOT NULL DEFAULT 0,
                rocks_avoided     INTEGER NOT NULL DEFAULT 0,
                lunch_breaks      TEXT NOT NULL DEFAULT '[]',
                generated_at      TEXT NOT NULL,
                status            TEXT NOT NULL DEFAULT 'draft'
            );
            CREATE TABLE IF NOT EXISTS time_logs (
                id                  TEXT PRIMARY KEY,
                project_id          TEXT NOT NULL,
                chunk_id            TEXT,
                status              TEXT NOT NULL,
                started_at          TEXT NOT NULL,
                last_resumed_at     TEXT,
                accumulated_seconds INTEGER NOT NULL DEFAULT 0,
                invoice_id          TEXT,
                notes               TEXT
            );",
        )?;

        migrations::migrate(&self.conn)
    }

    // === Projects ===

    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (id, name, priority, rate, rate_low, status, last_touched_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project.id,
                project.name,
                project.priority,
                project.rate,
                project.rate_low,
                format_project_status(project.status),
                project.last_touched_at.map(|t| t.to_rfc3339()),
                project.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, priority, rate, rate_low, status, last_touched_at, created_at
                 FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, priority, rate, rate_low, status, last_touched_at, created_at
             FROM projects ORDER BY priority DESC, name ASC",
        )?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    pub fn update_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "UPDATE projects SET name = ?2, priority = ?3, rate = ?4, rate_low = ?5,
                 status = ?6, last_touched_at = ?7
             WHERE id = ?1",
            params![
                project.id,
                project.name,
                project.priority,
                project.rate,
                project.rate_low,
                format_project_status(project.status),
                project.last_touched_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Bump a project's `last_touched_at`. Called whenever one of its
    /// chunks changes.
    pub fn touch_project(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE projects SET last_touched_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        Ok(())
    }

    // === Chunks ===

    pub fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        let (draft_start, draft_end, draft_order, sched_start, sched_end, event_id) =
            placement_columns(&chunk.placement);
        self.conn.execute(
            "INSERT INTO chunks (id, project_id, phase_name, phase_order, name, description,
                 hours, status, draft_start, draft_end, draft_order, scheduled_start,
                 scheduled_end, calendar_event_id, completed_at, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                chunk.id,
                chunk.project_id,
                chunk.phase_name,
                chunk.phase_order,
                chunk.name,
                chunk.description,
                i64::from(chunk.hours),
                format_chunk_status(chunk.status),
                draft_start,
                draft_end,
                draft_order,
                sched_start,
                sched_end,
                event_id,
                chunk.completed_at.map(|t| t.to_rfc3339()),
                chunk.notes,
                chunk.created_at.to_rfc3339(),
                chunk.updated_at.to_rfc3339(),
            ],
        )?;
        self.touch_project(&chunk.project_id, chunk.created_at)?;
        Ok(())
    }

    pub fn get_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        let sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1");
        let chunk = self
            .conn
            .query_row(&sql, params![id], row_to_chunk)
            .optional()?;
        Ok(chunk)
    }

    pub fn list_chunks(&self, project_id: Option<&str>) -> Result<Vec<Chunk>> {
        let sql = match project_id {
            Some(_) => format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks WHERE project_id = ?1
                 ORDER BY phase_order ASC, created_at ASC"
            ),
            None => format!("SELECT {CHUNK_COLUMNS} FROM chunks ORDER BY created_at ASC"),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let chunks = match project_id {
            Some(pid) => stmt
                .query_map(params![pid], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(chunks)
    }

    /// All pending chunks, the scheduler's raw input.
    pub fn list_pending_chunks(&self) -> Result<Vec<Chunk>> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE status = 'pending'
             ORDER BY created_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let chunks = stmt
            .query_map([], row_to_chunk)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    pub fn update_chunk(&self, chunk: &Chunk) -> Result<()> {
        let (draft_start, draft_end, draft_order, sched_start, sched_end, event_id) =
            placement_columns(&chunk.placement);
        self.conn.execute(
            "UPDATE chunks SET project_id = ?2, phase_name = ?3, phase_order = ?4, name = ?5,
                 description = ?6, hours = ?7, status = ?8, draft_start = ?9, draft_end = ?10,
                 draft_order = ?11, scheduled_start = ?12, scheduled_end = ?13,
                 calendar_event_id = ?14, completed_at = ?15, notes = ?16, updated_at = ?17
             WHERE id = ?1",
            params![
                chunk.id,
                chunk.project_id,
                chunk.phase_name,
                chunk.phase_order,
                chunk.name,
                chunk.description,
                i64::from(chunk.hours),
                format_chunk_status(chunk.status),
                draft_start,
                draft_end,
                draft_order,
                sched_start,
                sched_end,
                event_id,
                chunk.completed_at.map(|t| t.to_rfc3339()),
                chunk.notes,
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.touch_project(&chunk.project_id, Utc::now())?;
        Ok(())
    }

    /// Delete a chunk and bump its parent project.
    pub fn delete_chunk(&self, id: &str) -> Result<bool> {
        let project_id: Option<String> = self
            .conn
            .query_row(
                "SELECT project_id FROM chunks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let deleted = self
            .conn
            .execute("DELETE FROM chunks WHERE id = ?1", params![id])?;
        if let Some(pid) = project_id {
            self.touch_project(&pid, Utc::now())?;
        }
        Ok(deleted > 0)
    }

    // === Draft lifecycle ===

    /// Persist a freshly generated draft, replacing any prior one.
    ///
    /// The previous draft's placements are wiped and its row marked
    /// expired in the same transaction; regeneration never touches
    /// published placements.
    pub fn apply_draft(&mut self, outcome: &DraftOutcome) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "UPDATE chunks SET draft_start = NULL, draft_end = NULL, draft_order = NULL
             WHERE draft_start IS NOT NULL",
            [],
        )?;
        tx.execute(
            "UPDATE schedule_drafts SET status = 'expired' WHERE status = 'draft'",
            [],
        )?;

        let draft = &outcome.draft;
        let lunch_breaks = serde_json::to_string(&draft.lunch_breaks)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        tx.execute(
            "INSERT INTO schedule_drafts (id, week_start, week_end, total_hours, chunk_count,
                 rocks_avoided, lunch_breaks, generated_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'draft')",
            params![
                draft.id,
                draft.week_start.to_rfc3339(),
                draft.week_end.to_rfc3339(),
                draft.total_hours,
                draft.chunk_count,
                draft.rocks_avoided,
                lunch_breaks,
                draft.generated_at.to_rfc3339(),
            ],
        )?;

        for placement in &outcome.placements {
            tx.execute(
                "UPDATE chunks SET draft_start = ?2, draft_end = ?3, draft_order = ?4,
                     updated_at = ?5
                 WHERE id = ?1",
                params![
                    placement.chunk_id,
                    placement.start.to_rfc3339(),
                    placement.end.to_rfc3339(),
                    placement.order,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// The current draft, if one exists.
    pub fn current_draft(&self) -> Result<Option<DraftSchedule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, week_start, week_end, total_hours, chunk_count, rocks_avoided,
                     lunch_breaks, generated_at
                 FROM schedule_drafts WHERE status = 'draft'",
                [],
                |row| {
                    let week_start: String = row.get(1)?;
                    let week_end: String = row.get(2)?;
                    let lunch_breaks: String = row.get(6)?;
                    let generated_at: String = row.get(7)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        week_start,
                        week_end,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        lunch_breaks,
                        generated_at,
                    ))
                },
            )
            .optional()?;

        let Some((id, week_start, week_end, total_hours, chunk_count, rocks_avoided, lunch, generated_at)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(DraftSchedule {
            id,
            week_start: parse_datetime_fallback(&week_start),
            week_end: parse_datetime_fallback(&week_end),
            total_hours,
            chunk_count,
            rocks_avoided,
            lunch_breaks: serde_json::from_str(&lunch).unwrap_or_default(),
            generated_at: parse_datetime_fallback(&generated_at),
        }))
    }

    /// Draft-placed chunks joined with project names, in placement
    /// order.
    pub fn draft_chunks(&self) -> Result<Vec<DraftChunkRow>> {
        let sql = format!(
            "SELECT {}, p.name
             FROM chunks c JOIN projects p ON p.id = c.project_id
             WHERE c.draft_start IS NOT NULL
             ORDER BY c.draft_order ASC",
            CHUNK_COLUMNS
                .split(", ")
                .map(|col| format!("c.{col}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let chunk = row_to_chunk(row)?;
                let project_name: String = row.get(18)?;
                Ok(DraftChunkRow {
                    chunk,
                    project_name,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Drop the current draft: null out every chunk's draft placement
    /// and mark the draft row rejected. Published placements are never
    /// touched.
    ///
    /// # Errors
    /// Returns `NoActiveDraft` if no draft exists.
    pub fn clear_draft(&mut self) -> Result<()> {
        if self.current_draft()?.is_none() {
            return Err(ScheduleError::NoActiveDraft.into());
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE chunks SET draft_start = NULL, draft_end = NULL, draft_order = NULL
             WHERE draft_start IS NOT NULL",
            [],
        )?;
        tx.execute(
            "UPDATE schedule_drafts SET status = 'rejected' WHERE status = 'draft'",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Retire the draft row after publish. The per-chunk commits have
    /// already happened through `mark_published`.
    pub fn accept_draft(&self, draft_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE schedule_drafts SET status = 'accepted' WHERE id = ?1",
            params![draft_id],
        )?;
        Ok(())
    }

    /// Commit one chunk's draft placement as published: copy the slot
    /// into the scheduled columns, record the calendar event, flip the
    /// status, and clear the draft columns.
    pub fn mark_published(
        &self,
        chunk_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE chunks SET scheduled_start = ?2, scheduled_end = ?3, calendar_event_id = ?4,
                 status = 'scheduled', draft_start = NULL, draft_end = NULL, draft_order = NULL,
                 updated_at = ?5
             WHERE id = ?1",
            params![
                chunk_id,
                start.to_rfc3339(),
                end.to_rfc3339(),
                event_id,
                now.to_rfc3339(),
            ],
        )?;
        let project_id: Option<String> = self
            .conn
            .query_row(
                "SELECT project_id FROM chunks WHERE id = ?1",
                params![chunk_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(pid) = project_id {
            self.touch_project(&pid, now)?;
        }
        Ok(())
    }

    // === Time logs ===

    /// Insert a new active time log.
    ///
    /// # Errors
    /// Returns `TimerAlreadyRunning` if another log is active; at most
    /// one timer runs globally.
    pub fn start_time_log(&self, log: &TimeLog) -> Result<()> {
        if let Some(active) = self.active_time_log()? {
            return Err(ScheduleError::TimerAlreadyRunning { id: active.id }.into());
        }
        self.conn.execute(
            "INSERT INTO time_logs (id, project_id, chunk_id, status, started_at,
                 last_resumed_at, accumulated_seconds, invoice_id, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                log.id,
                log.project_id,
                log.chunk_id,
                log.status.as_str(),
                log.started_at.to_rfc3339(),
                log.last_resumed_at.map(|t| t.to_rfc3339()),
                log.accumulated_seconds,
                log.invoice_id,
                log.notes,
            ],
        )?;
        self.touch_project(&log.project_id, log.started_at)?;
        Ok(())
    }

    /// The single active log, if any.
    pub fn active_time_log(&self) -> Result<Option<TimeLog>> {
        let log = self
            .conn
            .query_row(
                "SELECT id, project_id, chunk_id, status, started_at, last_resumed_at,
                     accumulated_seconds, invoice_id, notes
                 FROM time_logs WHERE status = 'active'",
                [],
                row_to_timelog,
            )
            .optional()?;
        Ok(log)
    }

    pub fn get_time_log(&self, id: &str) -> Result<Option<TimeLog>> {
        let log = self
            .conn
            .query_row(
                "SELECT id, project_id, chunk_id, status, started_at, last_resumed_at,
                     accumulated_seconds, invoice_id, notes
                 FROM time_logs WHERE id = ?1",
                params![id],
                row_to_timelog,
            )
            .optional()?;
        Ok(log)
    }

    pub fn list_time_logs(&self, project_id: Option<&str>) -> Result<Vec<TimeLog>> {
        let sql = "SELECT id, project_id, chunk_id, status, started_at, last_resumed_at,
                       accumulated_seconds, invoice_id, notes
                   FROM time_logs";
        let (sql, params): (String, Vec<&dyn rusqlite::ToSql>) = match project_id {
            Some(ref pid) => (
                format!("{sql} WHERE project_id = ?1 ORDER BY started_at DESC"),
                vec![pid as &dyn rusqlite::ToSql],
            ),
            None => (format!("{sql} ORDER BY started_at DESC"), vec![]),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params.as_slice(), row_to_timelog)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Persist a log after a state transition.
    ///
    /// # Errors
    /// Returns `TimerAlreadyRunning` when the log is active and a
    /// different log already is; the single-active invariant is
    /// enforced here, not just at start.
    pub fn save_time_log(&self, log: &TimeLog) -> Result<()> {
        if log.is_active() {
            if let Some(active) = self.active_time_log()? {
                if active.id != log.id {
                    return Err(ScheduleError::TimerAlreadyRunning { id: active.id }.into());
                }
            }
        }
        self.conn.execute(
            "UPDATE time_logs SET status = ?2, last_resumed_at = ?3,
                 accumulated_seconds = ?4, invoice_id = ?5, notes = ?6
             WHERE id = ?1",
            params![
                log.id,
                log.status.as_str(),
                log.last_resumed_at.map(|t| t.to_rfc3339()),
                log.accumulated_seconds,
                log.invoice_id,
                log.notes,
            ],
        )?;
        Ok(())
    }
}

fn placement_columns(
    placement: &Placement,
) -> (
    Option<String>,
    Option<String>,
    Option<i32>,
    Option<String>,
    Option<String>,
    Option<String>,
) {
    match placement {
        Placement::Unplaced => (None, None, None, None, None, None),
        Placement::Draft { start, end, order } => (
            Some(start.to_rfc3339()),
            Some(end.to_rfc3339()),
            Some(*order),
            None,
            None,
            None,
        ),
        Placement::Published {
            start,
            end,
            event_id,
        } => (
            None,
            None,
            None,
            Some(start.to_rfc3339()),
            Some(end.to_rfc3339()),
            Some(event_id.clone()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::PlacedChunk;
    use chrono::{Duration, TimeZone};

    fn db() -> StudioDb {
        StudioDb::open_memory().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn seed_project(db: &StudioDb, id: &str) {
        let project = Project::new(id, format!("Project {id}"), 12_000);
        db.insert_project(&project).unwrap();
    }

    fn seed_chunk(db: &StudioDb, id: &str, project_id: &str, hours: u8) {
        let chunk = Chunk::new(id, project_id, format!("Chunk {id}"), hours).unwrap();
        db.insert_chunk(&chunk).unwrap();
    }

    fn outcome_with(placements: Vec<PlacedChunk>) -> DraftOutcome {
        let mut draft = DraftSchedule::new(t0(), t0() + Duration::days(4));
        draft.chunk_count = placements.len() as i64;
        DraftOutcome {
            draft,
            placements,
            unplaced: Vec::new(),
        }
    }

    fn placed(id: &str, offset_hours: i64, len_hours: i64, order: i32) -> PlacedChunk {
        PlacedChunk {
            chunk_id: id.to_string(),
            start: t0() + Duration::hours(offset_hours),
            end: t0() + Duration::hours(offset_hours + len_hours),
            order,
        }
    }

    #[test]
    fn project_round_trip() {
        let db = db();
        let mut project = Project::new("p1", "Acme", 15_000);
        project.priority = 7;
        project.rate_low = Some(10_000);
        db.insert_project(&project).unwrap();

        let loaded = db.get_project("p1").unwrap().unwrap();
        assert_eq!(loaded.name, "Acme");
        assert_eq!(loaded.priority, 7);
        assert_eq!(loaded.rate, 15_000);
        assert_eq!(loaded.rate_low, Some(10_000));
        assert_eq!(loaded.status, ProjectStatus::Active);
    }

    #[test]
    fn inserting_a_chunk_touches_its_project() {
        let db = db();
        seed_project(&db, "p1");
        assert!(db.get_project("p1").unwrap().unwrap().last_touched_at.is_none());

        seed_chunk(&db, "c1", "p1", 2);
        assert!(db.get_project("p1").unwrap().unwrap().last_touched_at.is_some());
    }

    #[test]
    fn deleting_a_chunk_touches_its_project() {
        let db = db();
        seed_project(&db, "p1");
        seed_chunk(&db, "c1", "p1", 1);
        db.touch_project("p1", t0() - Duration::days(30)).unwrap();

        assert!(db.delete_chunk("c1").unwrap());
        let touched = db.get_project("p1").unwrap().unwrap().last_touched_at.unwrap();
        assert!(touched > t0() - Duration::days(1));
        assert!(db.get_chunk("c1").unwrap().is_none());
    }

    #[test]
    fn chunk_placement_round_trips_through_columns() {
        let db = db();
        seed_project(&db, "p1");

        let mut chunk = Chunk::new("c1", "p1", "Wireframes", 2).unwrap();
        chunk.placement = Placement::Draft {
            start: t0(),
            end: t0() + Duration::hours(2),
            order: 3,
        };
        db.insert_chunk(&chunk).unwrap();
        let loaded = db.get_chunk("c1").unwrap().unwrap();
        assert_eq!(loaded.placement, chunk.placement);

        let mut chunk2 = Chunk::new("c2", "p1", "Build", 1).unwrap();
        chunk2.placement = Placement::Published {
            start: t0(),
            end: t0() + Duration::hours(1),
            event_id: "evt-9".to_string(),
        };
        db.insert_chunk(&chunk2).unwrap();
        let loaded = db.get_chunk("c2").unwrap().unwrap();
        assert_eq!(loaded.placement, chunk2.placement);
    }

    #[test]
    fn apply_draft_places_chunks_and_creates_draft_row() {
        let mut db = db();
        seed_project(&db, "p1");
        seed_chunk(&db, "c1", "p1", 2);
        seed_chunk(&db, "c2", "p1", 1);

        db.apply_draft(&outcome_with(vec![
            placed("c1", 0, 2, 0),
            placed("c2", 2, 1, 1),
        ]))
        .unwrap();

        let draft = db.current_draft().unwrap().unwrap();
        assert_eq!(draft.chunk_count, 2);

        let rows = db.draft_chunks().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chunk.id, "c1");
        assert_eq!(rows[0].project_name, "Project p1");
        assert!(rows[0].chunk.placement.is_draft());
    }

    #[test]
    fn regeneration_replaces_the_previous_draft() {
        let mut db = db();
        seed_project(&db, "p1");
        seed_chunk(&db, "c1", "p1", 2);
        seed_chunk(&db, "c2", "p1", 1);

        db.apply_draft(&outcome_with(vec![placed("c1", 0, 2, 0)]))
            .unwrap();
        let first_id = db.current_draft().unwrap().unwrap().id;

        db.apply_draft(&outcome_with(vec![placed("c2", 0, 1, 0)]))
            .unwrap();
        let second = db.current_draft().unwrap().unwrap();
        assert_ne!(second.id, first_id);

        // Only the new draft's placement survives.
        let rows = db.draft_chunks().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chunk.id, "c2");
        assert_eq!(
            db.get_chunk("c1").unwrap().unwrap().placement,
            Placement::Unplaced
        );
    }

    #[test]
    fn clear_draft_nulls_draft_fields_but_keeps_published() {
        let mut db = db();
        seed_project(&db, "p1");
        for i in 0..5 {
            seed_chunk(&db, &format!("c{i}"), "p1", 1);
        }
        let mut published = Chunk::new("done", "p1", "Earlier work", 1).unwrap();
        published.status = ChunkStatus::Scheduled;
        published.placement = Placement::Published {
            start: t0() - Duration::days(7),
            end: t0() - Duration::days(7) + Duration::hours(1),
            event_id: "evt-old".to_string(),
        };
        db.insert_chunk(&published).unwrap();

        let placements = (0..5i64)
            .map(|i| placed(&format!("c{i}"), i, 1, i as i32))
            .collect();
        db.apply_draft(&outcome_with(placements)).unwrap();

        db.clear_draft().unwrap();

        assert!(db.current_draft().unwrap().is_none());
        for i in 0..5 {
            let chunk = db.get_chunk(&format!("c{i}")).unwrap().unwrap();
            assert_eq!(chunk.placement, Placement::Unplaced);
        }
        // Prior published placement untouched.
        let kept = db.get_chunk("done").unwrap().unwrap();
        assert!(kept.placement.is_published());
    }

    #[test]
    fn clear_without_draft_is_an_error() {
        let mut db = db();
        let err = db.clear_draft().unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Schedule(ScheduleError::NoActiveDraft)
        ));
    }

    #[test]
    fn mark_published_commits_the_draft_slot() {
        let mut db = db();
        seed_project(&db, "p1");
        seed_chunk(&db, "c1", "p1", 2);
        db.apply_draft(&outcome_with(vec![placed("c1", 0, 2, 0)]))
            .unwrap();

        db.mark_published("c1", t0(), t0() + Duration::hours(2), "evt-1", t0())
            .unwrap();

        let chunk = db.get_chunk("c1").unwrap().unwrap();
        assert_eq!(chunk.status, ChunkStatus::Scheduled);
        assert_eq!(
            chunk.placement,
            Placement::Published {
                start: t0(),
                end: t0() + Duration::hours(2),
                event_id: "evt-1".to_string(),
            }
        );
        // No draft placement remains for it.
        assert!(db.draft_chunks().unwrap().is_empty());
    }

    #[test]
    fn single_active_timer_enforced() {
        let db = db();
        seed_project(&db, "p1");
        db.start_time_log(&TimeLog::start("t1", "p1", None, t0()))
            .unwrap();

        let err = db
            .start_time_log(&TimeLog::start("t2", "p1", None, t0()))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Schedule(ScheduleError::TimerAlreadyRunning { .. })
        ));

        // Pausing the first frees the slot.
        let mut log = db.get_time_log("t1").unwrap().unwrap();
        log.pause(t0() + Duration::minutes(10)).unwrap();
        db.save_time_log(&log).unwrap();
        db.start_time_log(&TimeLog::start("t2", "p1", None, t0()))
            .unwrap();
        assert_eq!(db.active_time_log().unwrap().unwrap().id, "t2");
    }

    #[test]
    fn resuming_cannot_create_a_second_active_timer() {
        let db = db();
        seed_project(&db, "p1");
        db.start_time_log(&TimeLog::start("t1", "p1", None, t0()))
            .unwrap();
        let mut t1 = db.get_time_log("t1").unwrap().unwrap();
        t1.pause(t0() + Duration::minutes(5)).unwrap();
        db.save_time_log(&t1).unwrap();
        db.start_time_log(&TimeLog::start("t2", "p1", None, t0()))
            .unwrap();

        // t2 is running; writing t1 back as active must be refused.
        t1.resume(t0() + Duration::minutes(10)).unwrap();
        let err = db.save_time_log(&t1).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Schedule(ScheduleError::TimerAlreadyRunning { .. })
        ));

        let mut t2 = db.active_time_log().unwrap().unwrap();
        t2.pause(t0() + Duration::minutes(12)).unwrap();
        db.save_time_log(&t2).unwrap();

        db.save_time_log(&t1).unwrap();
        assert_eq!(db.active_time_log().unwrap().unwrap().id, "t1");
    }

    #[test]
    fn time_log_round_trip() {
        let db = db();
        seed_project(&db, "p1");
        let mut log = TimeLog::start("t1", "p1", Some("c1".to_string()), t0());
        db.start_time_log(&log).unwrap();

        log.stop(t0() + Duration::minutes(45)).unwrap();
        log.attach_invoice("inv-1").unwrap();
        db.save_time_log(&log).unwrap();

        let loaded = db.get_time_log("t1").unwrap().unwrap();
        assert_eq!(loaded.status, TimeLogStatus::Invoiced);
        assert_eq!(loaded.accumulated_seconds, 45 * 60);
        assert_eq!(loaded.invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(loaded.chunk_id.as_deref(), Some("c1"));
    }
}
