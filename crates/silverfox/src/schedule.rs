//! Daily scheduler for the import and CAO runs.
//!
//! Jobs fire at a local wall-clock time once per day. The loop is a plain
//! poll on the calling thread: tasks run sequentially and shutdown is
//! delivered through a channel so Ctrl-C interrupts the wait immediately.
//! Runs missed while the process was down are not replayed.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::config::{parse_time_of_day, ScheduleConfig};
use crate::error::ConfigError;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Used by tests and dry runs.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    DailyImport,
    DailyCaoOrders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyJob {
    pub name: String,
    pub at: NaiveTime,
    pub task: ScheduledTask,
}

struct JobState {
    job: DailyJob,
    next_run: NaiveDateTime,
}

/// First occurrence of `at` strictly after `after`.
fn next_occurrence(at: NaiveTime, after: NaiveDateTime) -> NaiveDateTime {
    let same_day = after.date().and_time(at);
    if same_day > after {
        same_day
    } else {
        same_day + chrono::Duration::days(1)
    }
}

pub struct Scheduler {
    jobs: Vec<JobState>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(jobs: Vec<DailyJob>, start: NaiveDateTime, poll_interval: Duration) -> Self {
        let jobs = jobs
            .into_iter()
            .map(|job| {
                let next_run = next_occurrence(job.at, start);
                JobState { job, next_run }
            })
            .collect();
        Self {
            jobs,
            poll_interval,
        }
    }

    /// Daily import followed by daily CAO, at the configured times.
    pub fn from_config(config: &ScheduleConfig, start: NaiveDateTime) -> Result<Self, ConfigError> {
        let time = |value: &str| {
            parse_time_of_day(value).ok_or_else(|| ConfigError::InvalidTime {
                value: value.to_string(),
            })
        };
        let jobs = vec![
            DailyJob {
                name: "daily-import".to_string(),
                at: time(&config.import_at)?,
                task: ScheduledTask::DailyImport,
            },
            DailyJob {
                name: "daily-cao".to_string(),
                at: time(&config.cao_at)?,
                task: ScheduledTask::DailyCaoOrders,
            },
        ];
        Ok(Self::new(
            jobs,
            start,
            Duration::from_secs(config.poll_interval_secs.max(1)),
        ))
    }

    pub fn next_run(&self, name: &str) -> Option<NaiveDateTime> {
        self.jobs
            .iter()
            .find(|s| s.job.name == name)
            .map(|s| s.next_run)
    }

    /// Jobs due at `now`, in configuration order. Each returned job is moved
    /// to its next occurrence after `now`, so a job fires at most once per
    /// call however many days were skipped.
    pub fn due_jobs(&mut self, now: NaiveDateTime) -> Vec<DailyJob> {
        let mut due = Vec::new();
        for state in &mut self.jobs {
            if state.next_run <= now {
                due.push(state.job.clone());
                state.next_run = next_occurrence(state.job.at, now);
            }
        }
        due
    }

    /// Polls until `shutdown` receives a message or its sender is dropped.
    pub fn run<F>(&mut self, clock: &dyn Clock, shutdown: &Receiver<()>, mut handler: F)
    where
        F: FnMut(&DailyJob),
    {
        for state in &self.jobs {
            log::info!("Scheduled {} next at {}", state.job.name, state.next_run);
        }

        loop {
            for job in self.due_jobs(clock.now()) {
                let _span = tracing::info_span!("scheduled_job", job = %job.name).entered();
                log::info!("Running scheduled job {}", job.name);
                handler(&job);
            }

            match shutdown.recv_timeout(self.poll_interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Scheduler stopping");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}
