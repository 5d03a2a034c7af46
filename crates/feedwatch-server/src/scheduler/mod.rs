//! Recurring execution of scrape tasks.
//!
//! One [`ScheduleCoordinator`] is built at startup and shared with the API.
//! It owns one cron job per enabled task and guarantees that a task never has
//! two executions in flight: a fire (cron, catch-up or manual) that arrives
//! while the task is still running is dropped, not queued.

mod in_flight;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use feedwatch_core::{CoreError, CronSchedule, ScrapeTask, StoreError, TaskStore};
use feedwatch_pipeline::TaskRunner;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use self::in_flight::InFlight;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidSchedule(#[from] CoreError),
}

/// What caused an execution to be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Cron,
    CatchUp,
    Manual,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cron => "cron",
            Self::CatchUp => "catch_up",
            Self::Manual => "manual",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone)]
struct ScheduledJob {
    job_id: Uuid,
    schedule: CronSchedule,
}

/// Spawns executions, one at a time per task.
#[derive(Clone)]
struct Dispatcher {
    runner: Arc<dyn TaskRunner>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    fn dispatch(&self, task_id: i64, source: TriggerSource) -> Dispatch {
        let Some(guard) = self.in_flight.try_acquire(task_id) else {
            tracing::info!(task_id, %source, "scheduler: task already running; fire skipped");
            return Dispatch::AlreadyRunning;
        };

        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(task_id, %source, "scheduler: execution started");
            let execution = tokio::spawn(async move { runner.run_task(task_id).await });
            match execution.await {
                Ok(outcome) => {
                    tracing::info!(task_id, %source, ?outcome, "scheduler: execution finished");
                }
                Err(e) => {
                    tracing::error!(task_id, %source, error = %e, "scheduler: execution aborted");
                }
            }
        });
        Dispatch::Started
    }
}

pub struct ScheduleCoordinator {
    scheduler: JobScheduler,
    store: Arc<dyn TaskStore>,
    dispatcher: Dispatcher,
    jobs: Mutex<HashMap<i64, ScheduledJob>>,
    misfire_grace: TimeDelta,
}

impl ScheduleCoordinator {
    /// Creates an idle coordinator. Nothing runs until [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] if the job scheduler cannot be
    /// initialised.
    pub async fn new(
        store: Arc<dyn TaskStore>,
        runner: Arc<dyn TaskRunner>,
        misfire_grace: TimeDelta,
    ) -> Result<Self, SchedulerError> {
        Ok(Self {
            scheduler: JobScheduler::new().await?,
            store,
            dispatcher: Dispatcher {
                runner,
                in_flight: Arc::new(InFlight::default()),
            },
            jobs: Mutex::new(HashMap::new()),
            misfire_grace,
        })
    }

    /// Registers a job for every enabled task, runs fires missed within the
    /// grace window, and starts the timer loop.
    ///
    /// A task whose stored schedule fails to register is logged and left
    /// unscheduled; the others still start.
    ///
    /// # Errors
    ///
    /// Returns an error if enabled tasks cannot be loaded or the scheduler
    /// fails to start.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let tasks = self.store.list_enabled_tasks().await?;
        tracing::info!(count = tasks.len(), "scheduler: loading enabled tasks");

        let now = Utc::now();
        for task in &tasks {
            match self.register(task).await {
                Ok(schedule) => self.catch_up(task, &schedule, now),
                Err(e) => {
                    tracing::error!(
                        task_id = task.id,
                        schedule = %task.schedule,
                        error = %e,
                        "scheduler: failed to schedule task"
                    );
                }
            }
        }

        self.scheduler.start().await?;
        tracing::info!("scheduler: started");
        Ok(())
    }

    /// Re-reads task `task_id` and replaces its job with one built from the
    /// stored schedule, creating it if absent.
    ///
    /// Returns `false` (and removes any existing job) when the task is
    /// missing or disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be loaded, its schedule is
    /// invalid, or the job scheduler rejects the change.
    pub async fn reschedule(&self, task_id: i64) -> Result<bool, SchedulerError> {
        let task = self.store.get_task(task_id).await?;
        match task.filter(|t| t.is_enabled) {
            Some(task) => {
                let schedule = self.register(&task).await?;
                tracing::info!(
                    task_id,
                    schedule = %schedule,
                    "scheduler: task rescheduled"
                );
                Ok(true)
            }
            None => {
                self.unschedule(task_id).await?;
                tracing::warn!(task_id, "scheduler: task missing or disabled; not scheduled");
                Ok(false)
            }
        }
    }

    /// Removes the job for `task_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] if the job cannot be removed.
    pub async fn unschedule(&self, task_id: i64) -> Result<bool, SchedulerError> {
        let mut jobs = self.jobs.lock().await;
        let Some(existing) = jobs.remove(&task_id) else {
            return Ok(false);
        };
        self.scheduler.remove(&existing.job_id).await?;
        tracing::info!(task_id, "scheduler: task unscheduled");
        Ok(true)
    }

    /// Starts an execution now without touching the task's cron job.
    ///
    /// Returns immediately; the outcome is only visible through logs and
    /// notifications.
    pub fn trigger_now(&self, task_id: i64) -> Dispatch {
        self.dispatcher.dispatch(task_id, TriggerSource::Manual)
    }

    /// Next cron fire for `task_id`, if it is scheduled.
    pub async fn next_fire_time(&self, task_id: i64) -> Option<DateTime<Utc>> {
        let jobs = self.jobs.lock().await;
        jobs.get(&task_id)?.schedule.next_after(Utc::now())
    }

    pub async fn schedule_of(&self, task_id: i64) -> Option<CronSchedule> {
        let jobs = self.jobs.lock().await;
        jobs.get(&task_id).map(|job| job.schedule.clone())
    }

    pub async fn scheduled_task_ids(&self) -> Vec<i64> {
        let jobs = self.jobs.lock().await;
        let mut ids: Vec<i64> = jobs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn is_running(&self, task_id: i64) -> bool {
        self.dispatcher.in_flight.contains(task_id)
    }

    /// Stops the timer loop. Executions already running are not cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] if shutdown fails.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        tracing::info!("scheduler: stopped");
        Ok(())
    }

    #[cfg(test)]
    async fn job_id(&self, task_id: i64) -> Option<Uuid> {
        self.jobs.lock().await.get(&task_id).map(|job| job.job_id)
    }

    /// Adds a job for `task`, replacing any previous one.
    async fn register(&self, task: &ScrapeTask) -> Result<CronSchedule, SchedulerError> {
        let schedule = CronSchedule::parse(&task.schedule)?;

        let task_id = task.id;
        let dispatcher = self.dispatcher.clone();
        let job = Job::new_async(schedule.job_expression().as_str(), move |_uuid, _lock| {
            let dispatcher = dispatcher.clone();
            Box::pin(async move {
                dispatcher.dispatch(task_id, TriggerSource::Cron);
            })
        })?;

        let mut jobs = self.jobs.lock().await;
        if let Some(previous) = jobs.remove(&task_id) {
            self.scheduler.remove(&previous.job_id).await?;
        }
        let job_id = self.scheduler.add(job).await?;
        jobs.insert(
            task_id,
            ScheduledJob {
                job_id,
                schedule: schedule.clone(),
            },
        );

        tracing::info!(
            task_id,
            name = %task.name,
            schedule = %schedule,
            "scheduler: task scheduled"
        );
        Ok(schedule)
    }

    fn catch_up(&self, task: &ScrapeTask, schedule: &CronSchedule, now: DateTime<Utc>) {
        let Some(last_run) = task.last_run_at else {
            return;
        };
        if let Some(missed) = schedule.missed_fire(last_run, now, self.misfire_grace) {
            tracing::info!(
                task_id = task.id,
                missed_at = %missed,
                "scheduler: running missed fire"
            );
            self.dispatcher.dispatch(task.id, TriggerSource::CatchUp);
        }
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
