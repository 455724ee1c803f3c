//! Draft schedule generation.
//!
//! The scheduler is pure: it takes pending chunks, their projects, and
//! the rocks fetched from the reference calendar, and produces draft
//! placements without touching storage or the network. Persistence of
//! the outcome is the store's job, publication the publisher's.
//!
//! Placement is first-fit greedy over the prioritized chunk list. The
//! window opens at the Monday after `now` and grows week by week until
//! everything fits or the horizon is reached; chunks that still do not
//! fit are reported, never silently dropped.

pub mod slots;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::calendar::Rock;
use crate::chunk::Chunk;
use crate::draft::{BreakWindow, DraftSchedule};
use crate::project::{Project, ProjectStatus};

use slots::{at_minutes, day_free_intervals, FreeInterval};

/// Work-hour policy the scheduler places within.
///
/// Hours are UTC. The lunch block is expressed in minutes past midnight
/// so half-hour configurations work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPolicy {
    /// First schedulable hour of a work day (inclusive).
    pub start_hour: u32,
    /// End of the work day (exclusive).
    pub end_hour: u32,
    /// Lunch start, minutes past midnight.
    pub lunch_start_minute: u32,
    /// Lunch length. Zero disables the lunch block.
    pub lunch_minutes: u32,
    /// Maximum number of weeks a draft may extend over.
    pub horizon_weeks: u32,
}

impl Default for WorkPolicy {
    fn default() -> Self {
        Self {
            start_hour: 12,
            end_hour: 20,
            lunch_start_minute: 15 * 60,
            lunch_minutes: 60,
            horizon_weeks: 12,
        }
    }
}

impl WorkPolicy {
    /// Monday through Friday only.
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_monday() < 5
    }

    /// The open work window of a date, ignoring rocks and lunch.
    pub fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            at_minutes(date, i64::from(self.start_hour) * 60),
            at_minutes(date, i64::from(self.end_hour) * 60),
        )
    }

    /// The lunch block of a date, clipped to the work window. None when
    /// lunch is disabled or falls entirely outside work hours.
    pub fn lunch_window(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if self.lunch_minutes == 0 {
            return None;
        }
        let (day_start, day_end) = self.day_window(date);
        let start = at_minutes(date, i64::from(self.lunch_start_minute));
        let end = start + Duration::minutes(i64::from(self.lunch_minutes));
        let start = start.max(day_start);
        let end = end.min(day_end);
        if start < end {
            Some((start, end))
        } else {
            None
        }
    }
}

/// One chunk's proposed slot within a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedChunk {
    pub chunk_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Placement sequence within the draft.
    pub order: i32,
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub draft: DraftSchedule,
    pub placements: Vec<PlacedChunk>,
    /// Ids of chunks that did not fit within the horizon. Their
    /// presence is a warning, not an error.
    pub unplaced: Vec<String>,
}

/// Greedy first-fit draft scheduler.
pub struct DraftScheduler {
    policy: WorkPolicy,
}

/// Free time of one built day, consumed as placements land in it.
struct DayPlan {
    free: Vec<FreeInterval>,
    lunch: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl DraftScheduler {
    pub fn new(policy: WorkPolicy) -> Self {
        Self { policy }
    }

    /// The Monday after `now`. Generation never places into the current
    /// week, so a draft built on Friday evening targets the week after.
    pub fn window_start(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = now.date_naive();
        let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
        today + Duration::days(days_ahead)
    }

    /// The widest span a draft could cover, for fetching rocks up
    /// front: window start through the last Friday of the horizon.
    pub fn search_span(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let monday = self.window_start(now);
        let last_friday = monday + Duration::days(i64::from(self.horizon_weeks()) * 7 - 3);
        (
            at_minutes(monday, 0),
            at_minutes(last_friday, i64::from(self.policy.end_hour) * 60),
        )
    }

    fn horizon_weeks(&self) -> u32 {
        self.policy.horizon_weeks.max(1)
    }

    /// Generate a draft for the given inputs.
    ///
    /// Chunks are considered in priority order: project priority
    /// descending, then most recently touched project first, then phase
    /// order, then chunk creation time. Only pending chunks of active
    /// projects participate. Deterministic for identical inputs and
    /// `now`.
    pub fn generate(
        &self,
        chunks: &[Chunk],
        projects: &[Project],
        rocks: &[Rock],
        now: DateTime<Utc>,
    ) -> DraftOutcome {
        let project_index: HashMap<&str, &Project> = projects
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect();

        // Chunks pointing at a project we were not given cannot be
        // ranked, so they surface as unplaced instead of vanishing.
        // Chunks of paused or done projects are deliberately held back.
        let mut unplaced: Vec<String> = Vec::new();
        let mut queue: Vec<&Chunk> = Vec::new();
        for chunk in chunks.iter().filter(|c| c.is_pending()) {
            match project_index.get(chunk.project_id.as_str()) {
                Some(p) if p.status == ProjectStatus::Active => queue.push(chunk),
                Some(_) => {}
                None => unplaced.push(chunk.id.clone()),
            }
        }

        queue.sort_by(|a, b| {
            let pa = project_index[a.project_id.as_str()];
            let pb = project_index[b.project_id.as_str()];
            pb.priority
                .cmp(&pa.priority)
                .then(pb.last_touched_at.cmp(&pa.last_touched_at))
                .then(a.phase_order.unwrap_or(i32::MAX).cmp(&b.phase_order.unwrap_or(i32::MAX)))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        let monday = self.window_start(now);
        let mut days: Vec<DayPlan> = Vec::new();
        let mut avoided: HashSet<usize> = HashSet::new();

        let build_week = |days: &mut Vec<DayPlan>,
                              avoided: &mut HashSet<usize>,
                              week: u32| {
            for offset in 0..5 {
                let date = monday + Duration::days(i64::from(week) * 7 + offset);
                let (day_start, day_end) = self.policy.day_window(date);
                for (i, rock) in rocks.iter().enumerate() {
                    if rock.blocks_day(date)
                        || (!rock.all_day && rock.overlaps(day_start, day_end))
                    {
                        avoided.insert(i);
                    }
                }
                days.push(DayPlan {
                    free: day_free_intervals(date, &self.policy, rocks),
                    lunch: if rocks.iter().any(|r| r.blocks_day(date)) {
                        None
                    } else {
                        self.policy.lunch_window(date)
                    },
                });
            }
        };

        build_week(&mut days, &mut avoided, 0);
        let mut weeks_built = 1u32;

        let mut placements: Vec<PlacedChunk> = Vec::new();
        let mut order: i32 = 0;

        for chunk in queue {
            let needed = i64::from(chunk.hours) * 60;
            loop {
                let slot = days.iter().enumerate().find_map(|(di, day)| {
                    day.free
                        .iter()
                        .position(|f| f.minutes() >= needed)
                        .map(|fi| (di, fi))
                });

                match slot {
                    Some((di, fi)) => {
                        let day = &mut days[di];
                        let start = day.free[fi].start;
                        let end = start + Duration::minutes(needed);
                        if end == day.free[fi].end {
                            day.free.remove(fi);
                        } else {
                            day.free[fi].start = end;
                        }
                        placements.push(PlacedChunk {
                            chunk_id: chunk.id.clone(),
                            start,
                            end,
                            order,
                        });
                        order += 1;
                        break;
                    }
                    None if weeks_built < self.horizon_weeks() => {
                        build_week(&mut days, &mut avoided, weeks_built);
                        weeks_built += 1;
                    }
                    None => {
                        unplaced.push(chunk.id.clone());
                        break;
                    }
                }
            }
        }

        let last_date = placements
            .iter()
            .map(|p| p.end.date_naive())
            .max()
            .unwrap_or(monday + Duration::days(4));
        let week_end_friday =
            last_date + Duration::days(i64::from(4 - last_date.weekday().num_days_from_monday()));

        let mut draft = DraftSchedule::new(
            at_minutes(monday, i64::from(self.policy.start_hour) * 60),
            at_minutes(week_end_friday, i64::from(self.policy.end_hour) * 60),
        );
        draft.total_hours = placements
            .iter()
            .map(|p| (p.end - p.start).num_hours())
            .sum();
        draft.chunk_count = placements.len() as i64;
        draft.rocks_avoided = avoided.len() as i64;
        draft.lunch_breaks = days
            .iter()
            .filter(|d| d.lunch.map(|(s, _)| s.date_naive() <= last_date).unwrap_or(false))
            .filter_map(|d| d.lunch)
            .map(|(start, end)| BreakWindow { start, end })
            .collect();

        DraftOutcome {
            draft,
            placements,
            unplaced,
        }
    }
}
