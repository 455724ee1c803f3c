//! Draft schedule metadata.
//!
//! At most one draft exists at a time. The chunks themselves are the
//! source of truth for placements; the draft record stores only
//! aggregate metadata plus the id that doubles as an optimistic
//! version stamp for publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring break interval honored during placement (the lunch
/// block, materialized per day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Aggregate metadata for the current (unpublished) draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSchedule {
    /// Identity and version stamp. Publish verifies the id it was
    /// asked to commit is still the current one.
    pub id: String,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub total_hours: i64,
    pub chunk_count: i64,
    /// Distinct rocks the placement routed around. Advisory only.
    pub rocks_avoided: i64,
    pub lunch_breaks: Vec<BreakWindow>,
    pub generated_at: DateTime<Utc>,
}

impl DraftSchedule {
    pub fn new(week_start: DateTime<Utc>, week_end: DateTime<Utc>) -> Self {
        Self {
            id: format!("draft-{}", Uuid::new_v4().simple()),
            week_start,
            week_end,
            total_hours: 0,
            chunk_count: 0,
            rocks_avoided: 0,
            lunch_breaks: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}
