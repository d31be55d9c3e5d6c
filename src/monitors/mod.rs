//! Monitors: independently scheduled periodic checks against one device
//!
//! Every variant is built from configuration by its factory, owns an
//! immutable [`MonitorDefinition`] and a list of [`Condition`]s. The default
//! [`Monitor::check`] runs each condition through the shared
//! [`hysteresis`] policy; a failure in one condition never stops the others.

pub mod battery;
pub mod conditions;
pub mod heartbeat;
pub mod hysteresis;
pub mod registry;
pub mod stream;
pub mod transmitter;
pub mod web;

pub use battery::BatteryBackupMonitor;
pub use conditions::{Classification, Condition, Fault, PresenceCondition, RangeCondition, StatusCondition};
pub use heartbeat::HeartbeatMonitor;
pub use hysteresis::Outcome;
pub use registry::{MonitorJob, Registry};
pub use stream::StreamPresenceMonitor;
pub use transmitter::TransmitterMonitor;
pub use web::WebManagedUnitMonitor;

use crate::alerts::Notifier;
use crate::config::Properties;
use crate::error::MonitorError;
use crate::probe::{Credential, Prober, Target, Transport};
use crate::state::ConditionState;
use log::error;
use std::fmt;
use std::time::Duration;

/// Polling interval used when `polling.rate` is missing or malformed
pub const DEFAULT_POLLING_SECS: u64 = 60;

/// The fixed, closed set of monitor variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    Heartbeat,
    Transmitter,
    BatteryBackup,
    StreamPresence,
    WebManagedUnit,
}

/// Builds one monitor variant from configuration
pub type MonitorFactory = fn(&Properties) -> Result<Box<dyn Monitor>, MonitorError>;

impl MonitorKind {
    pub const ALL: [MonitorKind; 5] = [
        MonitorKind::Heartbeat,
        MonitorKind::Transmitter,
        MonitorKind::BatteryBackup,
        MonitorKind::StreamPresence,
        MonitorKind::WebManagedUnit,
    ];

    /// Configuration section holding this variant's keys
    pub fn section(self) -> &'static str {
        match self {
            MonitorKind::Heartbeat => "monitor.heartbeat",
            MonitorKind::Transmitter => "monitor.transmitter",
            MonitorKind::BatteryBackup => "monitor.ups",
            MonitorKind::StreamPresence => "monitor.stream",
            MonitorKind::WebManagedUnit => "monitor.web",
        }
    }

    /// Key inside this variant's section
    pub fn key(self, name: &str) -> String {
        format!("{}.{}", self.section(), name)
    }

    pub fn factory(self) -> MonitorFactory {
        match self {
            MonitorKind::Heartbeat => heartbeat::build,
            MonitorKind::Transmitter => transmitter::build,
            MonitorKind::BatteryBackup => battery::build,
            MonitorKind::StreamPresence => stream::build,
            MonitorKind::WebManagedUnit => web::build,
        }
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorKind::Heartbeat => "heartbeat",
            MonitorKind::Transmitter => "transmitter",
            MonitorKind::BatteryBackup => "battery-backup",
            MonitorKind::StreamPresence => "stream-presence",
            MonitorKind::WebManagedUnit => "web-managed-unit",
        };
        f.write_str(name)
    }
}

/// Configuration shared by every variant, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDefinition {
    pub kind: MonitorKind,
    pub interval: Duration,
    pub enabled: bool,
    /// Absent for monitors that never probe
    pub target: Option<Target>,
}

impl MonitorDefinition {
    /// Read `enabled` and `polling.rate` for `kind`
    pub fn load(kind: MonitorKind, props: &Properties) -> Self {
        Self {
            kind,
            interval: Duration::from_secs(
                props.positive(&kind.key("polling.rate"), DEFAULT_POLLING_SECS),
            ),
            enabled: props.boolean(&kind.key("enabled"), false),
            target: None,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

/// Target reachable over SNMP: `host`, `port` and `community` keys
///
/// # Arguments
///
/// * `kind` - Variant whose section holds the keys
/// * `props` - Agent properties
/// * `default_port` - Port used when `port` is missing or malformed
/// * `default_community` - Community used when `community` is missing
pub(crate) fn snmp_target(
    kind: MonitorKind,
    props: &Properties,
    default_port: u16,
    default_community: &str,
) -> Target {
    Target::new(
        props.string(&kind.key("host"), "localhost"),
        props.port(&kind.key("port"), default_port),
        Credential::Community(props.string(&kind.key("community"), default_community)),
    )
}

/// One independently scheduled check bound to a single device
pub trait Monitor: Send {
    fn definition(&self) -> &MonitorDefinition;

    /// Which prober this monitor's conditions need
    fn transport(&self) -> Transport;

    fn conditions(&self) -> &[Box<dyn Condition>];

    fn kind(&self) -> MonitorKind {
        self.definition().kind
    }

    fn interval(&self) -> Duration {
        self.definition().interval
    }

    fn is_enabled(&self) -> bool {
        self.definition().enabled
    }

    /// Evaluate every condition once
    fn check(
        &self,
        state: &mut ConditionState,
        prober: &dyn Prober,
        notifier: &dyn Notifier,
    ) -> Vec<Outcome> {
        let Some(target) = &self.definition().target else {
            error!("{} monitor has no target configured", self.kind());
            return Vec::new();
        };

        self.conditions()
            .iter()
            .map(|condition| hysteresis::evaluate(condition.as_ref(), target, state, prober, notifier))
            .collect()
    }
}
