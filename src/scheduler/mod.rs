//! Periodic job scheduler
//!
//! A dispatcher thread scans the registered entries every tick resolution
//! and hands due entries to a fixed pool of worker threads. Each entry has
//! its own in-flight gate: a tick that comes due while the previous run of
//! the same job is still executing is dropped, never queued. Different jobs
//! share nothing but the pool, so a slow job only delays itself.
//!
//! A run re-arms its entry at `finished + interval`, so the interval is
//! always measured from the end of one run to the start of the next.

/// Scheduler lifecycle with retry-until-running
pub mod supervisor;

pub use supervisor::{SchedulerFactory, Supervisor, SupervisorState};

use crate::error::SchedulerError;
use crate::monitoring::{RunTimer, TickStats};
use log::{debug, error, info, warn};
use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A unit of work run repeatedly by the scheduler
///
/// The scheduler guarantees that `run` is never entered twice at the same
/// time for one job, so implementations may keep mutable state without
/// locking. Different jobs run concurrently on the worker pool.
pub trait Job: Send {
    /// Name used in logs and as the key of the job's tick statistics
    fn name(&self) -> &str;

    /// Run once
    ///
    /// # Returns
    ///
    /// `Ok(())` if the run did its work. An `Err` is logged and counted as a
    /// failed run; the job stays scheduled either way. A panic is caught and
    /// treated like an error.
    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Scheduler tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Size of the worker pool; 0 means one worker per registered job
    pub worker_threads: usize,
    /// How often the dispatcher looks for due jobs
    pub tick_resolution: Duration,
    /// How long `stop` waits for in-flight runs
    pub shutdown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            tick_resolution: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

struct Entry {
    name: String,
    interval: Duration,
    job: Mutex<Box<dyn Job>>,
    in_flight: AtomicBool,
    next_due: Mutex<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Runs registered jobs at fixed intervals on a worker pool
///
/// The scheduler moves through three phases: idle (accepting
/// registrations), running, and stopped. A stopped scheduler cannot be
/// restarted; build a new one instead.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use trapwatch::{Scheduler, SchedulerConfig};
///
/// let mut scheduler = Scheduler::new(SchedulerConfig::default());
/// // scheduler.register(job, Duration::from_secs(60))?;
/// scheduler.start().expect("scheduler threads");
/// std::thread::sleep(Duration::from_secs(1));
/// scheduler.stop();
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    entries: Vec<Arc<Entry>>,
    phase: Phase,
    running: Arc<Mutex<bool>>,
    stats: Arc<TickStats>,
    dispatcher: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    worker_exits: Option<Receiver<()>>,
}

impl Scheduler {
    /// Create an idle scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - Worker pool size, dispatcher resolution and shutdown grace
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            phase: Phase::Idle,
            running: Arc::new(Mutex::new(false)),
            stats: Arc::new(TickStats::new()),
            dispatcher: None,
            workers: Vec::new(),
            worker_exits: None,
        }
    }

    /// Add a recurring job
    ///
    /// # Arguments
    ///
    /// * `job` - The work to run; owned by the scheduler from now on
    /// * `interval` - Delay between the end of one run and the start of the next
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidInterval` for a zero interval and
    /// `SchedulerError::NotAccepting` once the scheduler has been started.
    pub fn register(&mut self, job: Box<dyn Job>, interval: Duration) -> Result<(), SchedulerError> {
        let name = job.name().to_string();
        if self.phase != Phase::Idle {
            return Err(SchedulerError::NotAccepting(format!(
                "cannot register '{}' after start",
                name
            )));
        }
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval(name));
        }

        debug!("Registered job {} every {:?}", name, interval);
        self.entries.push(Arc::new(Entry {
            name,
            interval,
            job: Mutex::new(job),
            in_flight: AtomicBool::new(false),
            next_due: Mutex::new(Instant::now()),
        }));
        Ok(())
    }

    /// Number of registered jobs
    pub fn job_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether `start` succeeded and `stop` has not been called yet
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Shared handle to the per-job tick statistics
    ///
    /// The handle stays valid after the scheduler is stopped or dropped.
    pub fn stats(&self) -> Arc<TickStats> {
        Arc::clone(&self.stats)
    }

    /// Start firing all registered jobs; every job runs once immediately
    ///
    /// Calling `start` on a running scheduler does nothing.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotAccepting` if the scheduler was stopped
    /// and `SchedulerError::Spawn` if a thread cannot be created.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        match self.phase {
            Phase::Running => {
                info!("Scheduler already running, skipping start");
                return Ok(());
            }
            Phase::Stopped => {
                return Err(SchedulerError::NotAccepting(
                    "scheduler has been stopped".to_string(),
                ))
            }
            Phase::Idle => {}
        }

        let worker_count = match self.config.worker_threads {
            0 => self.entries.len().max(1),
            n => n,
        };
        info!(
            "Starting scheduler with {} job(s) on {} worker(s)",
            self.entries.len(),
            worker_count
        );

        let now = Instant::now();
        for entry in &self.entries {
            *lock(&entry.next_due) = now;
        }
        *lock(&self.running) = true;

        let (work_tx, work_rx) = mpsc::channel::<Arc<Entry>>();
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (exit_tx, exit_rx) = mpsc::channel::<()>();

        for index in 0..worker_count {
            let queue = Arc::clone(&work_rx);
            let running = Arc::clone(&self.running);
            let stats = Arc::clone(&self.stats);
            let exit = exit_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("trapwatch-worker-{}", index))
                .spawn(move || worker_loop(queue, running, stats, exit));

            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    // Dropping work_tx releases the workers already spawned
                    *lock(&self.running) = false;
                    self.workers.clear();
                    return Err(SchedulerError::Spawn(e));
                }
            }
        }
        drop(exit_tx);

        let entries = self.entries.clone();
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let resolution = self.config.tick_resolution;

        let dispatcher = thread::Builder::new()
            .name("trapwatch-dispatcher".to_string())
            .spawn(move || dispatch_loop(entries, work_tx, running, stats, resolution))
            .map_err(|e| {
                *lock(&self.running) = false;
                self.workers.clear();
                SchedulerError::Spawn(e)
            })?;

        self.dispatcher = Some(dispatcher);
        self.worker_exits = Some(exit_rx);
        self.phase = Phase::Running;
        info!("Scheduler started");
        Ok(())
    }

    /// Stop dispatching and wait, up to the grace period, for in-flight runs
    ///
    /// Safe to call in any state and more than once. Runs still executing
    /// when the grace period ends are left to finish on detached threads.
    pub fn stop(&mut self) {
        match self.phase {
            Phase::Stopped => return,
            Phase::Idle => {
                debug!("Scheduler stopped before it was started");
                self.phase = Phase::Stopped;
                return;
            }
            Phase::Running => {}
        }

        info!("Stopping scheduler");
        *lock(&self.running) = false;
        self.phase = Phase::Stopped;

        // The dispatcher drops the work channel on exit, which lets idle
        // workers fall out of their receive loop
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                error!("Scheduler dispatcher thread panicked");
            }
        }

        let deadline = Instant::now() + self.config.shutdown_grace;
        let mut remaining = self.workers.len();
        if let Some(exits) = self.worker_exits.take() {
            while remaining > 0 {
                let wait = deadline.saturating_duration_since(Instant::now());
                match exits.recv_timeout(wait) {
                    Ok(()) => remaining -= 1,
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            "{} worker(s) still busy after {:?}, detaching them",
                            remaining, self.config.shutdown_grace
                        );
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        if remaining == 0 {
            for handle in self.workers.drain(..) {
                if handle.join().is_err() {
                    error!("Scheduler worker thread panicked");
                }
            }
        } else {
            self.workers.clear();
        }

        info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_running(running: &Mutex<bool>) -> bool {
    *lock(running)
}

fn dispatch_loop(
    entries: Vec<Arc<Entry>>,
    work: Sender<Arc<Entry>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<TickStats>,
    resolution: Duration,
) {
    debug!("Dispatcher started");
    while is_running(&running) {
        let now = Instant::now();
        for entry in &entries {
            let mut next_due = lock(&entry.next_due);
            if now < *next_due {
                continue;
            }

            if entry.in_flight.swap(true, Ordering::AcqRel) {
                debug!("Dropping tick of {}: previous run still in progress", entry.name);
                stats.record_dropped(&entry.name);
                *next_due = now + entry.interval;
                continue;
            }

            // Provisional; the worker re-arms from the end of the run
            *next_due = now + entry.interval;
            drop(next_due);

            if work.send(Arc::clone(entry)).is_err() {
                entry.in_flight.store(false, Ordering::Release);
                error!("Worker pool is gone, dispatcher exiting");
                return;
            }
        }
        thread::sleep(resolution);
    }
    debug!("Dispatcher stopped");
}

fn worker_loop(
    queue: Arc<Mutex<Receiver<Arc<Entry>>>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<TickStats>,
    exit: Sender<()>,
) {
    loop {
        let next = lock(&queue).recv();
        let Ok(entry) = next else {
            break;
        };

        if is_running(&running) {
            execute(&entry, &stats);
        } else {
            debug!("Skipping queued run of {}: scheduler stopping", entry.name);
            entry.in_flight.store(false, Ordering::Release);
        }
    }
    let _ = exit.send(());
}

fn execute(entry: &Entry, stats: &Arc<TickStats>) {
    let timer = RunTimer::start(Arc::clone(stats), &entry.name);
    let result = {
        let mut job = lock(&entry.job);
        panic::catch_unwind(AssertUnwindSafe(|| job.run()))
    };

    let success = match result {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("Job {} failed: {}", entry.name, e);
            false
        }
        Err(payload) => {
            error!("Job {} panicked: {}", entry.name, panic_message(&payload));
            false
        }
    };

    let duration = timer.finish(success);
    debug!("Job {} finished in {:?}", entry.name, duration);

    *lock(&entry.next_due) = Instant::now() + entry.interval;
    entry.in_flight.store(false, Ordering::Release);
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
