//! Core data types for the daily scheduler.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Outcome of a single job run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Ok,
    Error,
}

/// Mutable runtime state of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CronJobState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A scheduled job carrying a caller-defined payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CronJob<P> {
    pub id: String,
    pub name: String,
    /// Cron expression, 5-field (`min hour dom month dow`) or with seconds.
    pub expr: String,
    pub enabled: bool,
    pub payload: P,
    pub state: CronJobState,
}

/// Input for [`crate::service::CronService::add`].
#[derive(Debug, Clone)]
pub struct CronJobCreate<P> {
    /// Generated when `None`.
    pub id: Option<String>,
    pub name: String,
    pub expr: String,
    pub payload: P,
}

/// Scheduler status snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CronStatus {
    pub running: bool,
    pub job_count: usize,
    pub next_run_at: Option<DateTime<Utc>>,
}
