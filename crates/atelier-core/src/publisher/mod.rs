//! Draft publication.
//!
//! Publishing walks the current draft chunk by chunk, creates one
//! calendar event per placement, and commits each success immediately.
//! A failed event write is localized to its chunk: the chunk keeps its
//! draft placement and lands in the failure list, the rest of the
//! publish continues. The draft row is retired after all attempts,
//! success or not, but the publish itself is driven by draft-placed
//! chunks rather than the row, so re-publishing retries whatever is
//! still placed.

use chrono::Utc;

use crate::calendar::CalendarProvider;
use crate::chunk::Placement;
use crate::error::{Result, ScheduleError};
use crate::storage::StudioDb;

/// One chunk whose calendar write failed.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    pub chunk_id: String,
    pub chunk_name: String,
    pub message: String,
}

/// Outcome of a publish run: "N published, M failed", never a single
/// pass/fail flag.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// The draft row this run retired; None on a retry pass, where
    /// only leftover placements from an earlier partial publish exist.
    pub draft_id: Option<String>,
    pub published: usize,
    pub failed: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn fully_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Commits draft placements to the real calendar.
pub struct Publisher<'a> {
    db: &'a StudioDb,
    calendar: &'a dyn CalendarProvider,
}

impl<'a> Publisher<'a> {
    pub fn new(db: &'a StudioDb, calendar: &'a dyn CalendarProvider) -> Self {
        Self { db, calendar }
    }

    /// Publish every chunk currently holding a draft placement.
    ///
    /// When `expected_draft_id` is given, the publish is rejected if
    /// the current draft is a different one (the draft was regenerated
    /// since the caller last looked).
    ///
    /// # Errors
    /// Returns `NoActiveDraft` when nothing holds a draft placement,
    /// or `ConcurrentDraftConflict` on a stale id. Per-chunk calendar
    /// failures are reported in the returned `PublishReport`, never as
    /// an error.
    pub fn publish(&self, expected_draft_id: Option<&str>) -> Result<PublishReport> {
        let draft = self.db.current_draft()?;

        if let Some(expected) = expected_draft_id {
            let found = draft
                .as_ref()
                .map(|d| d.id.clone())
                .unwrap_or_else(|| "none".to_string());
            if expected != found {
                return Err(ScheduleError::ConcurrentDraftConflict {
                    expected: expected.to_string(),
                    found,
                }
                .into());
            }
        }

        // Draft placements drive the publish, not the draft row: a
        // partial publish retires the row but leaves its failed
        // chunks placed, and a re-publish must pick them up.
        let rows = self.db.draft_chunks()?;
        if rows.is_empty() {
            return Err(ScheduleError::NoActiveDraft.into());
        }
        let now = Utc::now();

        let mut published = 0;
        let mut failed = Vec::new();

        for row in rows {
            let Placement::Draft { start, end, .. } = row.chunk.placement else {
                continue;
            };

            let title = format!("{}: {}", row.project_name, row.chunk.name);
            let description = row.chunk.description.as_deref().unwrap_or("");

            match self.calendar.create_event(&title, description, start, end) {
                Ok(event_id) => {
                    self.db
                        .mark_published(&row.chunk.id, start, end, &event_id, now)?;
                    published += 1;
                }
                Err(e) => {
                    failed.push(PublishFailure {
                        chunk_id: row.chunk.id,
                        chunk_name: row.chunk.name,
                        message: e.to_string(),
                    });
                }
            }
        }

        // The draft row is spent either way; failed chunks keep their
        // draft placement for the next publish.
        if let Some(d) = &draft {
            self.db.accept_draft(&d.id)?;
        }

        Ok(PublishReport {
            draft_id: draft.map(|d| d.id),
            published,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Rock;
    use crate::chunk::{Chunk, ChunkStatus};
    use crate::draft::DraftSchedule;
    use crate::error::{CalendarError, CoreError};
    use crate::project::Project;
    use crate::scheduler::{DraftOutcome, PlacedChunk};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Calendar double that records created events and fails on
    /// configured titles.
    struct FakeCalendar {
        created: Mutex<Vec<String>>,
        fail_titles: HashSet<String>,
    }

    impl FakeCalendar {
        fn new() -> Self {
            Self {
                created: Mutex::new(Vec::new()),
                fail_titles: HashSet::new(),
            }
        }

        fn failing_on(title: &str) -> Self {
            let mut cal = Self::new();
            cal.fail_titles.insert(title.to_string());
            cal
        }

        fn created_count(&self) -> usize {
            self.created.lock().unwrap().len()
        }
    }

    impl CalendarProvider for FakeCalendar {
        fn name(&self) -> &str {
            "fake"
        }

        fn list_busy_intervals(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> std::result::Result<Vec<Rock>, CalendarError> {
            Ok(Vec::new())
        }

        fn create_event(
            &self,
            title: &str,
            _description: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> std::result::Result<String, CalendarError> {
            if self.fail_titles.contains(title) {
                return Err(CalendarError::Http("simulated timeout".to_string()));
            }
            let mut created = self.created.lock().unwrap();
            created.push(title.to_string());
            Ok(format!("evt-{}", created.len()))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn seed_draft(db: &mut StudioDb, chunk_ids: &[&str]) -> String {
        db.insert_project(&Project::new("p1", "Acme", 12_000))
            .unwrap();
        let mut placements = Vec::new();
        for (i, id) in chunk_ids.iter().enumerate() {
            let chunk = Chunk::new(*id, "p1", format!("Chunk {id}"), 1).unwrap();
            db.insert_chunk(&chunk).unwrap();
            placements.push(PlacedChunk {
                chunk_id: id.to_string(),
                start: t0() + Duration::hours(i as i64),
                end: t0() + Duration::hours(i as i64 + 1),
                order: i as i32,
            });
        }
        let outcome = DraftOutcome {
            draft: DraftSchedule::new(t0(), t0() + Duration::days(4)),
            placements,
            unplaced: Vec::new(),
        };
        db.apply_draft(&outcome).unwrap();
        db.current_draft().unwrap().unwrap().id
    }

    #[test]
    fn publish_commits_every_chunk_and_deletes_the_draft() {
        let mut db = StudioDb::open_memory().unwrap();
        seed_draft(&mut db, &["c1", "c2", "c3"]);

        let calendar = FakeCalendar::new();
        let report = Publisher::new(&db, &calendar).publish(None).unwrap();

        assert_eq!(report.published, 3);
        assert!(report.fully_succeeded());
        assert_eq!(calendar.created_count(), 3);
        assert!(db.current_draft().unwrap().is_none());

        for id in ["c1", "c2", "c3"] {
            let chunk = db.get_chunk(id).unwrap().unwrap();
            assert_eq!(chunk.status, ChunkStatus::Scheduled);
            assert!(chunk.placement.is_published());
        }
    }

    #[test]
    fn failed_chunk_keeps_draft_placement_and_is_reported() {
        let mut db = StudioDb::open_memory().unwrap();
        seed_draft(&mut db, &["c1", "c2", "c3"]);

        let calendar = FakeCalendar::failing_on("Acme: Chunk c2");
        let report = Publisher::new(&db, &calendar).publish(None).unwrap();

        assert_eq!(report.published, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].chunk_id, "c2");

        // The failed chunk still holds its draft slot, pending again.
        let failed = db.get_chunk("c2").unwrap().unwrap();
        assert_eq!(failed.status, ChunkStatus::Pending);
        assert!(failed.placement.is_draft());

        // The draft is spent regardless of failures.
        assert!(db.current_draft().unwrap().is_none());
    }

    #[test]
    fn failed_chunks_publish_on_the_next_attempt() {
        let mut db = StudioDb::open_memory().unwrap();
        seed_draft(&mut db, &["c1", "c2"]);

        let flaky = FakeCalendar::failing_on("Acme: Chunk c2");
        let first = Publisher::new(&db, &flaky).publish(None).unwrap();
        assert_eq!(first.published, 1);
        assert_eq!(first.failed.len(), 1);
        assert!(db.current_draft().unwrap().is_none());
        assert!(db.get_chunk("c2").unwrap().unwrap().placement.is_draft());

        // The calendar recovers; the leftover placement publishes.
        let healthy = FakeCalendar::new();
        let retry = Publisher::new(&db, &healthy).publish(None).unwrap();
        assert_eq!(retry.published, 1);
        assert!(retry.fully_succeeded());
        assert!(retry.draft_id.is_none());

        let chunk = db.get_chunk("c2").unwrap().unwrap();
        assert_eq!(chunk.status, ChunkStatus::Scheduled);
        assert!(chunk.placement.is_published());

        // Nothing placed, nothing to publish.
        let err = Publisher::new(&db, &healthy).publish(None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Schedule(ScheduleError::NoActiveDraft)
        ));
    }

    #[test]
    fn republish_without_a_new_draft_creates_nothing() {
        let mut db = StudioDb::open_memory().unwrap();
        seed_draft(&mut db, &["c1"]);

        let calendar = FakeCalendar::new();
        let publisher = Publisher::new(&db, &calendar);
        publisher.publish(None).unwrap();

        let err = publisher.publish(None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Schedule(ScheduleError::NoActiveDraft)
        ));
        assert_eq!(calendar.created_count(), 1);
    }

    #[test]
    fn stale_draft_id_is_rejected() {
        let mut db = StudioDb::open_memory().unwrap();
        let current = seed_draft(&mut db, &["c1"]);

        let calendar = FakeCalendar::new();
        let err = Publisher::new(&db, &calendar)
            .publish(Some("draft-stale"))
            .unwrap_err();

        match err {
            CoreError::Schedule(ScheduleError::ConcurrentDraftConflict { expected, found }) => {
                assert_eq!(expected, "draft-stale");
                assert_eq!(found, current);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        // Nothing was written.
        assert_eq!(calendar.created_count(), 0);
        assert!(db.current_draft().unwrap().is_some());
    }
}
