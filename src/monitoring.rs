//! Self-monitoring of the scheduler
//!
//! Tracks, per scheduled job, how many ticks ran, failed or were dropped
//! because the previous run was still in flight, plus timing of the most
//! recent run. The supervisor logs a summary when the scheduler stops.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Tick statistics for one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Runs that completed, successfully or not
    pub executed: u64,
    /// Runs that returned an error or panicked
    pub failed: u64,
    /// Ticks skipped because the previous run had not finished
    pub dropped: u64,
    /// Duration of the most recent run
    pub last_duration: Option<Duration>,
    /// When the most recent run finished
    pub last_finished: Option<DateTime<Utc>>,
}

impl JobStats {
    /// Share of executed runs that failed, 0-100
    pub fn failure_rate(&self) -> f64 {
        if self.executed == 0 {
            0.0
        } else {
            self.failed as f64 / self.executed as f64 * 100.0
        }
    }
}

/// Thread-safe per-job tick statistics
#[derive(Debug, Default)]
pub struct TickStats {
    jobs: Mutex<HashMap<String, JobStats>>,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, job: &str, apply: impl FnOnce(&mut JobStats)) {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        apply(jobs.entry(job.to_string()).or_default());
    }

    /// Record a run that returned `Ok`
    ///
    /// # Arguments
    ///
    /// * `job` - Job name; the entry is created on first use
    /// * `duration` - Wall-clock time the run took
    pub fn record_success(&self, job: &str, duration: Duration) {
        debug!("Recording successful run of {} in {:?}", job, duration);
        self.update(job, |stats| {
            stats.executed += 1;
            stats.last_duration = Some(duration);
            stats.last_finished = Some(Utc::now());
        });
    }

    /// Record a run that returned an error or panicked
    pub fn record_failure(&self, job: &str, duration: Duration) {
        debug!("Recording failed run of {} in {:?}", job, duration);
        self.update(job, |stats| {
            stats.executed += 1;
            stats.failed += 1;
            stats.last_duration = Some(duration);
            stats.last_finished = Some(Utc::now());
        });
    }

    /// Count a tick that was skipped because the job was still running
    pub fn record_dropped(&self, job: &str) {
        self.update(job, |stats| stats.dropped += 1);
    }

    /// Copy of the statistics for one job
    ///
    /// # Returns
    ///
    /// `None` if the job has never run or dropped a tick.
    pub fn snapshot(&self, job: &str) -> Option<JobStats> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job)
            .cloned()
    }

    /// All jobs, sorted by name
    pub fn all(&self) -> Vec<(String, JobStats)> {
        let mut all: Vec<(String, JobStats)> = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, stats)| (name.clone(), stats.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Log one line per job and warn about jobs that look unhealthy
    pub fn log_summary(&self) {
        for (name, stats) in self.all() {
            info!(
                "Job {}: executed={}, failed={}, dropped={}, last_duration={:?}",
                name, stats.executed, stats.failed, stats.dropped, stats.last_duration
            );

            if stats.dropped > 0 {
                warn!(
                    "Job {} dropped {} tick(s); its checks take longer than its interval",
                    name, stats.dropped
                );
            }
            if stats.executed > 0 && stats.failure_rate() >= 50.0 {
                warn!(
                    "Job {} failed {:.1}% of its runs",
                    name,
                    stats.failure_rate()
                );
            }
        }
    }
}

/// Measures one run and records it when finished
pub struct RunTimer {
    start_time: Instant,
    job: String,
    stats: Arc<TickStats>,
}

impl RunTimer {
    /// Start timing a run of `job`; nothing is recorded until `finish`
    pub fn start(stats: Arc<TickStats>, job: &str) -> Self {
        Self {
            start_time: Instant::now(),
            job: job.to_string(),
            stats,
        }
    }

    /// Record the run and return how long it took
    pub fn finish(self, success: bool) -> Duration {
        let duration = self.start_time.elapsed();
        if success {
            self.stats.record_success(&self.job, duration);
        } else {
            self.stats.record_failure(&self.job, duration);
        }
        duration
    }
}
