use crate::error::SchedulerError;
use crate::scheduler::Scheduler;
use log::{debug, error, info};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Builds a fully registered, not yet started scheduler
pub type SchedulerFactory = Box<dyn Fn() -> Result<Scheduler, SchedulerError> + Send + Sync>;

/// Lifecycle of the supervised scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Owns the scheduler and keeps trying to bring it up until it runs
pub struct Supervisor {
    factory: SchedulerFactory,
    retry_delay: Duration,
    state: SupervisorState,
    scheduler: Option<Scheduler>,
    attempts: u32,
}

impl Supervisor {
    /// Create a stopped supervisor
    ///
    /// # Arguments
    ///
    /// * `factory` - Called on every start attempt to build a fresh scheduler
    /// * `retry_delay` - Wait between a failed start and the next attempt
    pub fn new(factory: SchedulerFactory, retry_delay: Duration) -> Self {
        Self {
            factory,
            retry_delay,
            state: SupervisorState::Stopped,
            scheduler: None,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Initialization attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Build and start a scheduler
    ///
    /// Does nothing while starting or running. On failure the supervisor is
    /// back in `Stopped` and may be started again.
    ///
    /// # Errors
    ///
    /// Returns the `SchedulerError` from building or starting the scheduler.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if matches!(self.state, SupervisorState::Starting | SupervisorState::Running) {
            debug!("Supervisor already {:?}, skipping start", self.state);
            return Ok(());
        }

        self.state = SupervisorState::Starting;
        self.attempts += 1;

        let started = (self.factory)().and_then(|mut scheduler| {
            scheduler.start()?;
            Ok(scheduler)
        });

        match started {
            Ok(scheduler) => {
                info!(
                    "Scheduler running with {} job(s) after {} attempt(s)",
                    scheduler.job_count(),
                    self.attempts
                );
                self.scheduler = Some(scheduler);
                self.state = SupervisorState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = SupervisorState::Stopped;
                Err(e)
            }
        }
    }

    /// Stop the scheduler if there is one; safe in any state
    pub fn stop(&mut self) {
        if self.state == SupervisorState::Stopped {
            return;
        }

        self.state = SupervisorState::Stopping;
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
            scheduler.stats().log_summary();
        }
        self.state = SupervisorState::Stopped;
        info!("Supervisor stopped");
    }

    /// Keep the scheduler running until a shutdown signal arrives
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Receives one message when the process should stop
    ///
    /// A failed start is retried after `retry_delay`. The wait happens on the
    /// shutdown channel, so a signal interrupts it. A closed channel counts as
    /// a shutdown signal.
    pub fn run(&mut self, shutdown: &Receiver<()>) {
        loop {
            if self.state == SupervisorState::Stopped {
                if let Err(e) = self.start() {
                    error!(
                        "Scheduler initialization failed (attempt {}), retrying in {:?}: {}",
                        self.attempts, self.retry_delay, e
                    );
                    match shutdown.recv_timeout(self.retry_delay) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }

            // Either a signal or a dropped sender ends the run
            let _ = shutdown.recv();
            break;
        }

        info!("Shutdown requested");
        self.stop();
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
