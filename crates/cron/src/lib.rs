//! Daily wall-clock jobs ("run at HH:MM") in a fixed timezone.
//!
//! Jobs carry a caller-defined payload that is handed back to a single
//! callback when they fire. Nothing is persisted; callers rebuild the job
//! table on startup.

pub mod error;
pub mod schedule;
pub mod service;
pub mod types;

pub use {
    error::{Error, Result},
    schedule::{compute_next_run, daily_at},
    service::{CronService, JobFn},
    types::{CronJob, CronJobCreate, CronJobState, CronStatus, RunStatus},
};
