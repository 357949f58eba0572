//! Job scheduler.
//!
//! One tokio task per registered job. Every task owns a child of the
//! scheduler's cancellation token and sleeps in bounded steps so a stop is
//! observed within one step even during a day-long wait. Each iteration runs
//! behind a panic boundary: a failing or panicking job is logged, recorded
//! in the health registry, and scheduled again as usual.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, metrics};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use engine_core::SchedulerError;

use crate::job::{Cadence, Job, Schedule};

/// Longest uninterrupted sleep. Bounds how late a stop is noticed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct Registration {
    job: Arc<dyn Job>,
    schedule: Schedule,
}

struct Running {
    token: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
}

/// Outcome of [`Scheduler::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stopped: Vec<String>,
    /// Jobs still running when the timeout expired; their tasks were aborted.
    pub abandoned: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

pub struct Scheduler {
    registrations: Vec<Registration>,
    poll_interval: Duration,
    running: Option<Running>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Adds a job. Registration is only possible before [`start`](Self::start).
    pub fn register(
        &mut self,
        job: Arc<dyn Job>,
        schedule: impl Into<Schedule>,
    ) -> Result<(), SchedulerError> {
        if self.running.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }
        let schedule = schedule.into();
        schedule.cadence.validate()?;

        let name = job.name().to_string();
        if self.registrations.iter().any(|r| r.job.name() == name) {
            return Err(SchedulerError::DuplicateJob(name));
        }

        health().register(&name);
        info!(job = %name, cadence = %schedule.cadence, run_on_start = schedule.run_on_start, "Job registered");
        self.registrations.push(Registration { job, schedule });
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.job.name()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns one task per job. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.running.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let token = CancellationToken::new();
        let tasks = self
            .registrations
            .iter()
            .map(|r| {
                let name = r.job.name().to_string();
                let handle = tokio::spawn(run_job(
                    r.job.clone(),
                    r.schedule,
                    token.child_token(),
                    self.poll_interval,
                ));
                (name, handle)
            })
            .collect();

        info!(jobs = self.registrations.len(), "Scheduler started");
        self.running = Some(Running { token, tasks });
        Ok(())
    }

    /// Signals every job to stop and waits up to `timeout` in total.
    ///
    /// Jobs in the middle of an iteration finish it first. Tasks still
    /// running at the deadline are aborted and reported as abandoned.
    pub async fn stop(&mut self, timeout: Duration) -> ShutdownReport {
        let Some(running) = self.running.take() else {
            return ShutdownReport::default();
        };

        info!(timeout_ms = timeout.as_millis() as u64, "Stopping scheduler");
        running.token.cancel();

        let deadline = Instant::now() + timeout;
        let mut report = ShutdownReport::default();

        for (name, mut handle) in running.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => report.stopped.push(name),
                Ok(Err(e)) => {
                    error!(job = %name, error = %e, "Job task ended abnormally");
                    report.stopped.push(name);
                }
                Err(_) => {
                    warn!(job = %name, "Job did not stop before the deadline, abandoning");
                    handle.abort();
                    report.abandoned.push(name);
                }
            }
        }

        if report.is_clean() {
            info!(stopped = report.stopped.len(), "Scheduler stopped");
        } else {
            warn!(
                stopped = report.stopped.len(),
                abandoned = ?report.abandoned,
                "Scheduler stopped with abandoned jobs"
            );
        }
        report
    }
}

async fn run_job(job: Arc<dyn Job>, schedule: Schedule, cancel: CancellationToken, poll: Duration) {
    let name = job.name().to_string();

    match schedule.cadence {
        Cadence::Periodic(interval) => {
            while !cancel.is_cancelled() {
                run_iteration(job.as_ref(), &cancel).await;
                if !sleep_for(interval, poll, &cancel).await {
                    break;
                }
            }
        }
        Cadence::Daily { hour, minute } => {
            if schedule.run_on_start && !cancel.is_cancelled() {
                run_iteration(job.as_ref(), &cancel).await;
            }
            loop {
                let Some(next) = next_daily_run(Local::now(), hour, minute) else {
                    error!(job = %name, hour, minute, "Cannot compute next run, job stopped");
                    break;
                };
                info!(job = %name, next_run = %next, "Next run scheduled");
                if !sleep_until(next, poll, &cancel).await {
                    break;
                }
                run_iteration(job.as_ref(), &cancel).await;
            }
        }
    }

    info!(job = %name, "Job stopped");
}

/// Runs one iteration, containing errors and panics.
async fn run_iteration(job: &dyn Job, cancel: &CancellationToken) {
    let name = job.name();
    let started = Instant::now();

    let result = AssertUnwindSafe(job.execute(cancel))
        .catch_unwind()
        .instrument(info_span!("job", name = %name))
        .await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    metrics().job_runs.inc();
    metrics().job_duration_ms.observe(elapsed_ms);

    match result {
        Ok(Ok(report)) => {
            health().record_success(name);
            info!(job = %name, elapsed_ms, report = %report, "Job run complete");
        }
        Ok(Err(e)) => {
            metrics().job_failures.inc();
            health().record_failure(name, e.to_string());
            error!(job = %name, elapsed_ms, code = e.error_code().unwrap_or("-"), error = %e, "Job run failed");
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            metrics().job_panics.inc();
            health().record_failure(name, format!("panic: {}", message));
            error!(job = %name, elapsed_ms, panic = %message, "Job panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Sleeps `duration` in steps of at most `poll`. Returns `false` if
/// cancelled first.
pub async fn sleep_for(duration: Duration, poll: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return !cancel.is_cancelled();
        }
        let step = (deadline - now).min(poll);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(step) => {}
        }
    }
}

/// Sleeps until the wall clock reaches `target`, re-reading the clock every
/// step. Returns `false` if cancelled first.
pub async fn sleep_until(target: DateTime<Local>, poll: Duration, cancel: &CancellationToken) -> bool {
    loop {
        let remaining = target.signed_duration_since(Local::now());
        let Ok(remaining) = remaining.to_std() else {
            return !cancel.is_cancelled();
        };
        if remaining.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(remaining.min(poll)) => {}
        }
    }
}

/// Next occurrence of local `hour:minute` strictly after `now`: today if
/// still ahead, otherwise tomorrow.
///
/// Returns `None` for an invalid time of day. On a DST gap the earliest
/// valid instant at or after the wall time is used.
pub fn next_daily_run<Tz: TimeZone>(now: DateTime<Tz>, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..=2 {
        let date = today + ChronoDuration::days(offset);
        let naive = date.and_time(time);
        let candidate = match tz.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => dt,
            chrono::LocalResult::Ambiguous(earliest, _) => earliest,
            chrono::LocalResult::None => match tz.from_local_datetime(&(naive + ChronoDuration::hours(1))) {
                chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt,
                chrono::LocalResult::None => continue,
            },
        };
        if candidate > now {
            return Some(candidate);
        }
    }
    None
}
