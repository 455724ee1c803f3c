//! Calendar provider abstraction.
//!
//! The scheduler reads busy intervals ("rocks") from an external
//! calendar and the publisher writes committed chunk events back to it.
//! Rocks are never created or mutated by this system; they are fetched
//! fresh on every draft generation.

pub mod google;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// An external, read-only busy interval the scheduler must route
/// around. All-day rocks block entire days; timed rocks block only
/// their interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub all_day: bool,
}

impl Rock {
    /// A timed busy interval.
    pub fn timed(start: DateTime<Utc>, end: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            start,
            end,
            title: title.into(),
            all_day: false,
        }
    }

    /// An all-day event covering `[start_date, end_date)` (exclusive
    /// end, matching the Google Calendar convention).
    pub fn all_day(start: DateTime<Utc>, end: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            start,
            end,
            title: title.into(),
            all_day: true,
        }
    }

    /// Whether this rock overlaps the half-open interval `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Whether an all-day rock blocks the given date. Timed rocks never
    /// block whole days.
    pub fn blocks_day(&self, date: NaiveDate) -> bool {
        if !self.all_day {
            return false;
        }
        let start_date = self.start.date_naive();
        let end_date = self.end.date_naive();
        if end_date > start_date {
            date >= start_date && date < end_date
        } else {
            date == start_date
        }
    }
}

/// Contract the external calendar implements.
///
/// Implementations are expected to enforce a conservative request
/// timeout; a timed-out write is reported as a per-chunk failure by the
/// publisher, never as an aborted publish.
pub trait CalendarProvider: Send + Sync {
    /// Provider identifier (e.g. "google").
    fn name(&self) -> &str;

    /// Fetch busy intervals within `[start, end]`.
    fn list_busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Rock>, CalendarError>;

    /// Create an event and return its provider-assigned id.
    fn create_event(
        &self,
        title: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn timed_rock_overlap() {
        let rock = Rock::timed(utc(2026, 3, 2, 14), utc(2026, 3, 2, 15), "Call");
        assert!(rock.overlaps(utc(2026, 3, 2, 14), utc(2026, 3, 2, 16)));
        assert!(rock.overlaps(utc(2026, 3, 2, 13), utc(2026, 3, 2, 15)));
        // Touching endpoints do not overlap.
        assert!(!rock.overlaps(utc(2026, 3, 2, 15), utc(2026, 3, 2, 16)));
        assert!(!rock.overlaps(utc(2026, 3, 2, 12), utc(2026, 3, 2, 14)));
    }

    #[test]
    fn all_day_rock_blocks_dates_with_exclusive_end() {
        let rock = Rock::all_day(utc(2026, 3, 2, 0), utc(2026, 3, 4, 0), "Conference");
        assert!(rock.blocks_day(utc(2026, 3, 2, 0).date_naive()));
        assert!(rock.blocks_day(utc(2026, 3, 3, 0).date_naive()));
        assert!(!rock.blocks_day(utc(2026, 3, 4, 0).date_naive()));
    }

    #[test]
    fn timed_rock_never_blocks_a_day() {
        let rock = Rock::timed(utc(2026, 3, 2, 14), utc(2026, 3, 2, 15), "Call");
        assert!(!rock.blocks_day(utc(2026, 3, 2, 0).date_naive()));
    }
}
