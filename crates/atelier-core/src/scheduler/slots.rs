//! Per-day free interval computation.
//!
//! A work day starts as one open window (the policy's daily work
//! hours) and is whittled down by the lunch block and by every timed
//! rock that overlaps it. All-day rocks remove the day outright.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use super::WorkPolicy;
use crate::calendar::Rock;

/// A contiguous stretch of open time within a single work day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeInterval {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// UTC instant at `minutes` past midnight on `date`.
pub fn at_minutes(date: NaiveDate, minutes: i64) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + Duration::minutes(minutes)
}

/// Remove `[busy_start, busy_end)` from a sorted list of free
/// intervals, splitting any interval the busy range lands inside.
fn subtract(
    free: Vec<FreeInterval>,
    busy_start: DateTime<Utc>,
    busy_end: DateTime<Utc>,
) -> Vec<FreeInterval> {
    let mut result = Vec::with_capacity(free.len() + 1);
    for interval in free {
        if busy_end <= interval.start || busy_start >= interval.end {
            result.push(interval);
            continue;
        }
        if busy_start > interval.start {
            result.push(FreeInterval {
                start: interval.start,
                end: busy_start,
            });
        }
        if busy_end < interval.end {
            result.push(FreeInterval {
                start: busy_end,
                end: interval.end,
            });
        }
    }
    result
}

/// Compute the free sub-intervals of one calendar date.
///
/// Weekends yield nothing; a day covered by an all-day rock yields
/// nothing regardless of its remaining open hours.
pub fn day_free_intervals(date: NaiveDate, policy: &WorkPolicy, rocks: &[Rock]) -> Vec<FreeInterval> {
    if !policy.is_work_day(date) {
        return Vec::new();
    }
    if rocks.iter().any(|r| r.blocks_day(date)) {
        return Vec::new();
    }

    let (day_start, day_end) = policy.day_window(date);
    let mut free = vec![FreeInterval {
        start: day_start,
        end: day_end,
    }];

    if let Some((lunch_start, lunch_end)) = policy.lunch_window(date) {
        free = subtract(free, lunch_start, lunch_end);
    }

    for rock in rocks.iter().filter(|r| !r.all_day) {
        if rock.overlaps(day_start, day_end) {
            free = subtract(free, rock.start, rock.end);
        }
    }

    free
}
