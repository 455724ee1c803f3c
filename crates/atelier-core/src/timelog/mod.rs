//! Time-log state machine.
//!
//! A log runs through active -> paused -> finalized -> invoiced. At
//! most one log is active globally; the store enforces that at the
//! write boundary. Elapsed time is kept as accumulated seconds plus
//! the stretch since the last resume, so pausing freezes the count
//! without rewriting history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeLogStatus {
    Active,
    Paused,
    Finalized,
    Invoiced,
}

impl TimeLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeLogStatus::Active => "active",
            TimeLogStatus::Paused => "paused",
            TimeLogStatus::Finalized => "finalized",
            TimeLogStatus::Invoiced => "invoiced",
        }
    }
}

/// One tracked stretch of work against a project (and optionally a
/// specific chunk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: String,
    pub project_id: String,
    pub chunk_id: Option<String>,
    pub status: TimeLogStatus,
    pub started_at: DateTime<Utc>,
    /// Set while active; cleared on pause.
    pub last_resumed_at: Option<DateTime<Utc>>,
    /// Seconds banked by completed active stretches.
    pub accumulated_seconds: i64,
    /// Invoice the finalized duration was billed on.
    pub invoice_id: Option<String>,
    pub notes: Option<String>,
}

impl TimeLog {
    /// Start a new active log. The caller (store) must have verified no
    /// other log is active.
    pub fn start(
        id: impl Into<String>,
        project_id: impl Into<String>,
        chunk_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            chunk_id,
            status: TimeLogStatus::Active,
            started_at: now,
            last_resumed_at: Some(now),
            accumulated_seconds: 0,
            invoice_id: None,
            notes: None,
        }
    }

    /// Total elapsed seconds as of `now`.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let running = match (self.status, self.last_resumed_at) {
            (TimeLogStatus::Active, Some(resumed)) => (now - resumed).num_seconds().max(0),
            _ => 0,
        };
        self.accumulated_seconds + running
    }

    /// Freeze the running stretch into the accumulated total.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status != TimeLogStatus::Active {
            return Err(self.invalid("pause"));
        }
        self.accumulated_seconds = self.elapsed_seconds(now);
        self.last_resumed_at = None;
        self.status = TimeLogStatus::Paused;
        Ok(())
    }

    /// Re-activate a paused log. The store pauses any other active log
    /// first; resume is exclusive.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status != TimeLogStatus::Paused {
            return Err(self.invalid("resume"));
        }
        self.last_resumed_at = Some(now);
        self.status = TimeLogStatus::Active;
        Ok(())
    }

    /// Stop an active log: bank the running stretch and finalize in one
    /// step.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status != TimeLogStatus::Active {
            return Err(self.invalid("stop"));
        }
        self.accumulated_seconds = self.elapsed_seconds(now);
        self.last_resumed_at = None;
        self.status = TimeLogStatus::Finalized;
        Ok(())
    }

    /// Lock the duration of a paused log for invoicing.
    pub fn finalize(&mut self) -> Result<(), ScheduleError> {
        if self.status != TimeLogStatus::Paused {
            return Err(self.invalid("finalize"));
        }
        self.status = TimeLogStatus::Finalized;
        Ok(())
    }

    /// Manual duration edit. Permitted only while active or paused;
    /// finalized durations are locked.
    pub fn set_duration(&mut self, seconds: i64, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        match self.status {
            TimeLogStatus::Active => {
                self.accumulated_seconds = seconds;
                self.last_resumed_at = Some(now);
                Ok(())
            }
            TimeLogStatus::Paused => {
                self.accumulated_seconds = seconds;
                Ok(())
            }
            _ => Err(self.invalid("set_duration")),
        }
    }

    /// Link a finalized log to an invoice. The log is immutable after.
    pub fn attach_invoice(&mut self, invoice_id: impl Into<String>) -> Result<(), ScheduleError> {
        if self.status != TimeLogStatus::Finalized {
            return Err(self.invalid("attach_invoice"));
        }
        self.invoice_id = Some(invoice_id.into());
        self.status = TimeLogStatus::Invoiced;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == TimeLogStatus::Active
    }

    fn invalid(&self, action: &'static str) -> ScheduleError {
        ScheduleError::InvalidTransition {
            from: self.status.as_str(),
            action,
        }
    }
}
