//! Revenue forecasting.
//!
//! A derived, read-only view: draft placements times project rates,
//! bucketed by ISO week. No side effects; the forecaster consumes
//! whatever the draft currently proposes and nothing else, so it goes
//! quiet once a draft is published or cleared.
//!
//! Amounts use the project's conservative rate (`rate_low`) when one
//! is set, the standard rate otherwise.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::chunk::{Chunk, Placement};
use crate::project::Project;

/// One project/phase's share of a week.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastLine {
    pub project_id: String,
    pub project_name: String,
    pub phase_name: Option<String>,
    pub hours: i64,
    pub amount_cents: i64,
}

/// One ISO week of projected revenue.
#[derive(Debug, Clone, Serialize)]
pub struct WeekForecast {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub lines: Vec<ForecastLine>,
    pub total_hours: i64,
    pub total_cents: i64,
}

/// Projected cash flow for the current draft.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub weeks: Vec<WeekForecast>,
    pub total_hours: i64,
    pub total_cents: i64,
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Project revenue from draft placements.
///
/// Chunks without a draft placement, or whose project is unknown,
/// contribute nothing.
pub fn forecast(chunks: &[Chunk], projects: &[Project]) -> Forecast {
    let project_index: BTreeMap<&str, &Project> =
        projects.iter().map(|p| (p.id.as_str(), p)).collect();

    // week -> (project_id, phase) -> (hours, cents)
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<(String, Option<String>), (i64, i64)>> =
        BTreeMap::new();

    for chunk in chunks {
        let Placement::Draft { start, end, .. } = &chunk.placement else {
            continue;
        };
        let Some(project) = project_index.get(chunk.project_id.as_str()) else {
            continue;
        };

        let hours = (*end - *start).num_hours();
        let cents = hours * project.forecast_rate();
        let week = monday_of(start.date_naive());
        let key = (chunk.project_id.clone(), chunk.phase_name.clone());

        let entry = buckets
            .entry(week)
            .or_default()
            .entry(key)
            .or_insert((0, 0));
        entry.0 += hours;
        entry.1 += cents;
    }

    let mut total_hours = 0;
    let mut total_cents = 0;
    let weeks = buckets
        .into_iter()
        .map(|(week_start, lines)| {
            let lines: Vec<ForecastLine> = lines
                .into_iter()
                .map(|((project_id, phase_name), (hours, amount_cents))| {
                    let project_name = project_index
                        .get(project_id.as_str())
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    ForecastLine {
                        project_id,
                        project_name,
                        phase_name,
                        hours,
                        amount_cents,
                    }
                })
                .collect();
            let week_hours: i64 = lines.iter().map(|l| l.hours).sum();
            let week_cents: i64 = lines.iter().map(|l| l.amount_cents).sum();
            total_hours += week_hours;
            total_cents += week_cents;
            WeekForecast {
                week_start,
                lines,
                total_hours: week_hours,
                total_cents: week_cents,
            }
        })
        .collect();

    Forecast {
        weeks,
        total_hours,
        total_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn placed_chunk(
        id: &str,
        project_id: &str,
        phase: Option<&str>,
        start: DateTime<Utc>,
        hours: u8,
    ) -> Chunk {
        let mut chunk = Chunk::new(id, project_id, format!("Chunk {id}"), hours).unwrap();
        chunk.phase_name = phase.map(str::to_string);
        chunk.placement = Placement::Draft {
            start,
            end: start + Duration::hours(i64::from(hours)),
            order: 0,
        };
        chunk
    }

    fn monday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn buckets_by_iso_week_and_sums_totals() {
        let projects = vec![Project::new("p1", "Acme", 15_000)];
        let chunks = vec![
            placed_chunk("c1", "p1", None, monday_noon(), 2),
            placed_chunk("c2", "p1", None, monday_noon() + Duration::days(2), 1),
            // Following week.
            placed_chunk("c3", "p1", None, monday_noon() + Duration::days(7), 3),
        ];

        let forecast = forecast(&chunks, &projects);

        assert_eq!(forecast.weeks.len(), 2);
        assert_eq!(
            forecast.weeks[0].week_start,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert_eq!(forecast.weeks[0].total_hours, 3);
        assert_eq!(forecast.weeks[0].total_cents, 3 * 15_000);
        assert_eq!(forecast.weeks[1].total_hours, 3);
        assert_eq!(forecast.total_hours, 6);
        assert_eq!(forecast.total_cents, 6 * 15_000);
    }

    #[test]
    fn conservative_rate_wins_when_set() {
        let mut project = Project::new("p1", "Acme", 15_000);
        project.rate_low = Some(10_000);
        let chunks = vec![placed_chunk("c1", "p1", None, monday_noon(), 2)];

        let forecast = forecast(&chunks, &[project]);

        assert_eq!(forecast.total_cents, 2 * 10_000);
    }

    #[test]
    fn lines_split_by_phase() {
        let projects = vec![Project::new("p1", "Acme", 10_000)];
        let chunks = vec![
            placed_chunk("c1", "p1", Some("Design"), monday_noon(), 2),
            placed_chunk("c2", "p1", Some("Build"), monday_noon() + Duration::hours(2), 1),
            placed_chunk("c3", "p1", Some("Design"), monday_noon() + Duration::days(1), 1),
        ];

        let forecast = forecast(&chunks, &projects);

        let week = &forecast.weeks[0];
        assert_eq!(week.lines.len(), 2);
        let design = week
            .lines
            .iter()
            .find(|l| l.phase_name.as_deref() == Some("Design"))
            .unwrap();
        assert_eq!(design.hours, 3);
        assert_eq!(design.amount_cents, 3 * 10_000);
    }

    #[test]
    fn unplaced_and_published_chunks_contribute_nothing() {
        let projects = vec![Project::new("p1", "Acme", 10_000)];
        let unplaced = Chunk::new("c1", "p1", "Later", 2).unwrap();
        let mut published = Chunk::new("c2", "p1", "Done deal", 2).unwrap();
        published.placement = Placement::Published {
            start: monday_noon(),
            end: monday_noon() + Duration::hours(2),
            event_id: "evt-1".to_string(),
        };

        let forecast = forecast(&[unplaced, published], &projects);

        assert!(forecast.weeks.is_empty());
        assert_eq!(forecast.total_cents, 0);
    }
}
