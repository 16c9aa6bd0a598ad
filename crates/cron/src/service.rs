//! Core scheduler: timer loop, job execution, job table.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    chrono::Utc,
    chrono_tz::Tz,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    Result,
    schedule::compute_next_run,
    types::{CronJob, CronJobCreate, CronJobState, CronStatus, RunStatus},
};

/// Callback invoked with the payload of each due job.
pub type JobFn<P> = Arc<
    dyn Fn(P) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
>;

/// Poll interval when no job is scheduled.
const IDLE_POLL: Duration = Duration::from_secs(60);

/// The scheduler. Jobs live in memory; they are rebuilt from config on
/// every start.
pub struct CronService<P> {
    tz: Tz,
    jobs: RwLock<Vec<CronJob<P>>>,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    on_run: JobFn<P>,
}

impl<P> CronService<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(tz: Tz, on_run: JobFn<P>) -> Arc<Self> {
        Arc::new(Self {
            tz,
            jobs: RwLock::new(Vec::new()),
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            on_run,
        })
    }

    /// Start the timer loop.
    pub async fn start(self: &Arc<Self>) {
        *self.running.write().await = true;

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });

        *self.timer_handle.lock().await = Some(handle);
        info!(
            jobs = self.jobs.read().await.len(),
            tz = %self.tz,
            "cron service started"
        );
    }

    /// Stop the timer loop.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let mut handle = self.timer_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        info!("cron service stopped");
    }

    /// Add a new job.
    pub async fn add(&self, create: CronJobCreate<P>) -> Result<CronJob<P>> {
        let mut job = CronJob {
            id: create
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: create.name,
            expr: create.expr,
            enabled: true,
            payload: create.payload,
            state: CronJobState::default(),
        };
        job.state.next_run_at = compute_next_run(&job.expr, self.tz, Utc::now())?;

        {
            let mut jobs = self.jobs.write().await;
            jobs.push(job.clone());
        }

        self.wake_notify.notify_one();
        info!(id = %job.id, name = %job.name, next_run_at = ?job.state.next_run_at, "cron job added");
        Ok(job)
    }

    pub async fn status(&self) -> CronStatus {
        let jobs = self.jobs.read().await;
        CronStatus {
            running: *self.running.read().await,
            job_count: jobs.len(),
            next_run_at: jobs.iter().filter_map(|j| j.state.next_run_at).min(),
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let sleep = self.until_next_wake().await;

            if !sleep.is_zero() {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(sleep) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            self.process_due_jobs().await;
        }
    }

    async fn until_next_wake(&self) -> Duration {
        let jobs = self.jobs.read().await;
        let now = Utc::now();
        jobs.iter()
            .filter(|j| j.enabled && j.state.running_at.is_none())
            .filter_map(|j| j.state.next_run_at)
            .map(|t| (t - now).to_std().unwrap_or(Duration::ZERO))
            .min()
            .unwrap_or(IDLE_POLL)
    }

    async fn process_due_jobs(self: &Arc<Self>) {
        let now = Utc::now();
        let due_jobs: Vec<CronJob<P>> = {
            let mut jobs = self.jobs.write().await;
            let mut due = Vec::new();
            for job in jobs.iter_mut() {
                if job.enabled
                    && job.state.next_run_at.is_some_and(|t| t <= now)
                    && job.state.running_at.is_none()
                {
                    // Marked under the write lock so the next tick skips it.
                    job.state.running_at = Some(now);
                    due.push(job.clone());
                }
            }
            due
        };

        for job in due_jobs {
            let svc = Arc::clone(self);
            tokio::spawn(async move {
                svc.execute_job(&job).await;
            });
        }
    }

    async fn execute_job(self: &Arc<Self>, job: &CronJob<P>) {
        let started = Utc::now();
        info!(id = %job.id, name = %job.name, "executing cron job");

        let result = (self.on_run)(job.payload.clone()).await;

        let (status, error_msg) = match &result {
            Ok(()) => (RunStatus::Ok, None),
            Err(e) => {
                error!(id = %job.id, error = %e, "cron job failed");
                (RunStatus::Error, Some(e.to_string()))
            },
        };

        let finished = Utc::now();
        let next_run = compute_next_run(&job.expr, self.tz, finished).unwrap_or_else(|e| {
            warn!(id = %job.id, error = %e, "cannot compute next run, disabling job");
            None
        });

        let mut jobs = self.jobs.write().await;
        if let Some(j) = jobs.iter_mut().find(|j| j.id == job.id) {
            j.state.running_at = None;
            j.state.last_run_at = Some(finished);
            j.state.last_status = Some(status);
            j.state.last_error = error_msg;
            j.state.next_run_at = next_run;
            if next_run.is_none() {
                j.enabled = false;
            }
        }
        drop(jobs);
        self.wake_notify.notify_one();

        info!(
            id = %job.id,
            status = ?status,
            duration_ms = (finished - started).num_milliseconds(),
            "cron job finished"
        );
    }

    #[cfg(test)]
    async fn snapshot(&self) -> Vec<CronJob<P>> {
        self.jobs.read().await.clone()
    }

    #[cfg(test)]
    async fn force_due(&self, id: &str, at: chrono::DateTime<Utc>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.state.next_run_at = Some(at);
        }
    }
}
