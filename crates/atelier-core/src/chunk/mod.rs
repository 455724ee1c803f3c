//! Work chunks: the schedulable unit.
//!
//! A chunk is a 1-3 hour atomic piece of project work. It is created
//! pending, draft-placed by the scheduler, and published to the real
//! calendar by the publisher. Placement is a single sum type instead of
//! parallel nullable columns so the legal states are exhaustive:
//! a chunk is unplaced, holds a draft slot, or holds a published slot.
//! Only the publisher converts `Draft` into `Published`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Chunk lifecycle status.
///
/// `scheduled` is set by the publisher; `in_progress` and `done` are
/// manual transitions by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    Scheduled,
    InProgress,
    Done,
}

/// Where a chunk currently sits on the calendar, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Placement {
    /// No slot assigned.
    Unplaced,
    /// A non-committed slot proposed by the draft scheduler. `order` is
    /// the placement sequence within the draft.
    Draft {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        order: i32,
    },
    /// A committed slot backed by a real calendar event.
    Published {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        event_id: String,
    },
}

impl Placement {
    pub fn is_draft(&self) -> bool {
        matches!(self, Placement::Draft { .. })
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Placement::Published { .. })
    }

    /// The slot interval, for either draft or published placements.
    pub fn interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Placement::Unplaced => None,
            Placement::Draft { start, end, .. } => Some((*start, *end)),
            Placement::Published { start, end, .. } => Some((*start, *end)),
        }
    }
}

/// A schedulable unit of work belonging to a project phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub project_id: String,
    pub phase_name: Option<String>,
    /// Ordering of phases within a project; chunks keep their phase
    /// sequence when scheduled.
    pub phase_order: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    /// Always 1, 2, or 3. A chunk is atomic: it occupies one contiguous
    /// interval of exactly this many hours.
    pub hours: u8,
    pub status: ChunkStatus,
    pub placement: Placement,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a pending, unplaced chunk.
    ///
    /// # Errors
    /// Returns a validation error if `hours` is not 1, 2, or 3, or if
    /// `project_id` is empty.
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        hours: u8,
    ) -> Result<Self, ValidationError> {
        let project_id = project_id.into();
        if project_id.is_empty() {
            return Err(ValidationError::MissingField("project_id"));
        }
        validate_hours(hours)?;

        let now = Utc::now();
        Ok(Self {
            id: id.into(),
            project_id,
            phase_name: None,
            phase_order: None,
            name: name.into(),
            description: None,
            hours,
            status: ChunkStatus::Pending,
            placement: Placement::Unplaced,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the chunk is waiting to be scheduled.
    pub fn is_pending(&self) -> bool {
        self.status == ChunkStatus::Pending
    }
}

/// Chunk hours must be 1, 2, or 3.
pub fn validate_hours(hours: u8) -> Result<(), ValidationError> {
    if (1..=3).contains(&hours) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "hours",
            message: format!("must be 1, 2, or 3 (got {hours})"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn chunk_hours_validated_at_creation() {
        assert!(Chunk::new("c1", "p1", "Wireframes", 2).is_ok());
        assert!(Chunk::new("c2", "p1", "Wireframes", 0).is_err());
        assert!(Chunk::new("c3", "p1", "Wireframes", 4).is_err());
    }

    #[test]
    fn chunk_requires_project() {
        let err = Chunk::new("c1", "", "Wireframes", 1).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField("project_id")));
    }

    #[test]
    fn new_chunk_is_pending_and_unplaced() {
        let chunk = Chunk::new("c1", "p1", "Wireframes", 2).unwrap();
        assert_eq!(chunk.status, ChunkStatus::Pending);
        assert_eq!(chunk.placement, Placement::Unplaced);
    }

    #[test]
    fn placement_interval() {
        let start = Utc::now();
        let end = start + Duration::hours(2);

        assert_eq!(Placement::Unplaced.interval(), None);

        let draft = Placement::Draft {
            start,
            end,
            order: 0,
        };
        assert_eq!(draft.interval(), Some((start, end)));
        assert!(draft.is_draft());

        let published = Placement::Published {
            start,
            end,
            event_id: "evt-1".to_string(),
        };
        assert_eq!(published.interval(), Some((start, end)));
        assert!(published.is_published());
    }

    #[test]
    fn placement_serialization_round_trip() {
        let placement = Placement::Draft {
            start: Utc::now(),
            end: Utc::now() + Duration::hours(1),
            order: 3,
        };
        let json = serde_json::to_string(&placement).unwrap();
        assert!(json.contains("\"state\":\"draft\""));
        let decoded: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, placement);
    }
}
