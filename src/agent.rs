//! Wiring from properties to a runnable scheduler
//!
//! The agent owns the collaborators every monitor shares: one notifier and
//! one prober per transport. Each call to [`Agent::build_scheduler`] loads a
//! fresh set of monitors from the registry, so a supervisor retrying
//! initialization always starts from clean condition state.

use crate::alerts::{LogNotifier, Notifier};
use crate::config::{AgentSettings, NotifierMode, Properties};
use crate::error::SchedulerError;
use crate::monitors::{MonitorJob, Registry};
use crate::probe::{DatagramProber, NoProbe, Prober, ProberSet, WebProber};
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerFactory};
use crate::snmp::{SnmpProber, TrapNotifier};
use log::{error, info, warn};
use std::sync::Arc;

pub struct Agent {
    properties: Properties,
    settings: AgentSettings,
    notifier: Arc<dyn Notifier>,
    probers: ProberSet,
}

impl Agent {
    /// Build the agent and its production collaborators from properties
    ///
    /// Uses the SNMP, datagram and HTTP probers and the notifier selected by
    /// `[notifier]`. If the HTTP client cannot be built, web checks fail at
    /// poll time instead of preventing startup.
    ///
    /// # Arguments
    ///
    /// * `properties` - Parsed configuration file
    pub fn new(properties: Properties) -> Self {
        let settings = AgentSettings::from_properties(&properties);
        let notifier = build_notifier(&settings.notifier);

        let http: Arc<dyn Prober> = match WebProber::new(settings.http_timeout) {
            Ok(prober) => Arc::new(prober),
            Err(e) => {
                error!("Failed to create HTTP client, web checks will fail: {}", e);
                Arc::new(NoProbe)
            }
        };
        let probers = ProberSet::new(
            Arc::new(SnmpProber::new()),
            Arc::new(DatagramProber::new()),
            http,
        );

        Self {
            properties,
            settings,
            notifier,
            probers,
        }
    }

    /// Build the agent around explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `properties` - Parsed configuration file
    /// * `notifier` - Receives every event the monitors produce
    /// * `probers` - One prober per transport
    pub fn with_collaborators(
        properties: Properties,
        notifier: Arc<dyn Notifier>,
        probers: ProberSet,
    ) -> Self {
        Self {
            settings: AgentSettings::from_properties(&properties),
            properties,
            notifier,
            probers,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Scheduler tuning taken from the `[agent]` section
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_threads: self.settings.worker_threads,
            tick_resolution: self.settings.tick_resolution,
            shutdown_grace: self.settings.shutdown_grace,
        }
    }

    /// Load every enabled monitor and register it with a new scheduler
    ///
    /// A monitor whose registration fails is logged and left out.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature matches [`SchedulerFactory`].
    pub fn build_scheduler(&self) -> Result<Scheduler, SchedulerError> {
        let mut scheduler = Scheduler::new(self.scheduler_config());

        for monitor in Registry::load(&self.properties).enabled_monitors() {
            let kind = monitor.kind();
            let interval = monitor.interval();
            let prober = self.probers.select(monitor.transport());
            let job = MonitorJob::new(monitor, prober, Arc::clone(&self.notifier));

            if let Err(e) = scheduler.register(Box::new(job), interval) {
                error!("Failed to schedule {} monitor: {}", kind, e);
            }
        }

        if scheduler.job_count() == 0 {
            warn!("No monitors enabled, the agent will stay idle");
        } else {
            info!("Scheduled {} monitor(s)", scheduler.job_count());
        }
        Ok(scheduler)
    }

    /// Turn the agent into a factory for the supervisor
    ///
    /// # Returns
    ///
    /// A factory that builds a new, fully registered scheduler on every call,
    /// so each supervisor retry starts from a clean slate.
    pub fn into_factory(self) -> SchedulerFactory {
        let agent = Arc::new(self);
        Box::new(move || agent.build_scheduler())
    }
}

fn build_notifier(mode: &NotifierMode) -> Arc<dyn Notifier> {
    match mode {
        NotifierMode::Trap {
            host,
            port,
            community,
        } => {
            info!("Sending traps to {}:{}", host, port);
            Arc::new(TrapNotifier::new(host.clone(), *port, community.clone()))
        }
        NotifierMode::Log => {
            info!("Writing notifications to the log");
            Arc::new(LogNotifier::new())
        }
    }
}
