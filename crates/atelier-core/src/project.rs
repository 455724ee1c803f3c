//! Project entity.
//!
//! Projects are collaborators from the scheduler's point of view: they
//! supply the hourly rate and the priority used to order pending chunks,
//! and their `last_touched_at` is bumped whenever one of their chunks
//! (or time logs) changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project lifecycle status. Only active projects feed the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Paused,
    Done,
}

/// A client project that owns work chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Higher priority projects are scheduled sooner. Zero is neutral;
    /// negative pushes a project to the back of the queue.
    pub priority: i32,
    /// Billing rate in cents per hour.
    pub rate: i64,
    /// Conservative rate used by the revenue forecaster. Falls back to
    /// `rate` when absent.
    pub rate_low: Option<i64>,
    pub status: ProjectStatus,
    pub last_touched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create an active project with a neutral priority.
    pub fn new(id: impl Into<String>, name: impl Into<String>, rate: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            rate,
            rate_low: None,
            status: ProjectStatus::Active,
            last_touched_at: None,
            created_at: Utc::now(),
        }
    }

    /// Rate the forecaster should use (conservative low end).
    pub fn forecast_rate(&self) -> i64 {
        self.rate_low.unwrap_or(self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_rate_falls_back_to_rate() {
        let mut project = Project::new("p1", "Brand refresh", 12000);
        assert_eq!(project.forecast_rate(), 12000);

        project.rate_low = Some(9500);
        assert_eq!(project.forecast_rate(), 9500);
    }

    #[test]
    fn project_serialization() {
        let project = Project::new("p1", "Brand refresh", 12000);
        let json = serde_json::to_string(&project).unwrap();
        let decoded: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.status, ProjectStatus::Active);
    }
}
