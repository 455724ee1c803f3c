//! # Atelier Core Library
//!
//! Core business logic for Atelier, a solo design studio operations
//! tool. All operations are available through a standalone CLI binary;
//! any GUI would be a thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Scheduler**: interval-placement of pending work chunks into open
//!   work-hour slots, routing around calendar "rocks"
//! - **Draft lifecycle**: at most one draft schedule exists at a time;
//!   it is regenerable, publishable, and clearable without ever
//!   touching published data
//! - **Publisher**: commits a draft to the real calendar chunk by chunk
//! - **Storage**: SQLite persistence and TOML configuration
//! - **Time logs**: single-active-timer state machine that gates
//!   invoicing
//!
//! ## Key Components
//!
//! - [`DraftScheduler`]: the placement algorithm
//! - [`Publisher`]: draft-to-calendar commit with per-chunk failures
//! - [`StudioDb`]: chunk, project, draft, and time-log persistence
//! - [`CalendarProvider`]: trait the external calendar implements

pub mod calendar;
pub mod chunk;
pub mod draft;
pub mod error;
pub mod forecast;
pub mod project;
pub mod publisher;
pub mod scheduler;
pub mod storage;
pub mod timelog;

pub use calendar::{CalendarProvider, Rock};
pub use chunk::{Chunk, ChunkStatus, Placement};
pub use draft::{BreakWindow, DraftSchedule};
pub use error::{
    CalendarError, ConfigError, CoreError, DatabaseError, Result, ScheduleError, ValidationError,
};
pub use forecast::{Forecast, ForecastLine, WeekForecast};
pub use project::{Project, ProjectStatus};
pub use publisher::{PublishFailure, PublishReport, Publisher};
pub use scheduler::{DraftOutcome, DraftScheduler, PlacedChunk, WorkPolicy};
pub use storage::{Config, StudioDb};
pub use timelog::{TimeLog, TimeLogStatus};
