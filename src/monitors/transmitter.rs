use crate::config::Properties;
use crate::error::MonitorError;
use crate::events::NotificationKind;
use crate::monitors::{snmp_target, Condition, Monitor, MonitorDefinition, MonitorKind, StatusCondition};
use crate::probe::{Probe, Transport};
use crate::snmp::Oid;
use crate::state::StateKey;

/// Transmitter health status object
pub const HEALTH_OID: &str = "1.3.6.1.4.1.37504.3.2.1.3.4.1.2.1";
/// Transmitter RF power state object
pub const RF_POWER_OID: &str = "1.3.6.1.4.1.37504.3.2.4.3.1.1.1.1";

pub const DEFAULT_PORT: u16 = 161;
pub const DEFAULT_COMMUNITY: &str = "public";

/// Health status reported by the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    NotPresent = 1,
    Error = 2,
    Initializing = 3,
    Idle = 4,
    Operative = 5,
    Alarm = 6,
    Warning = 7,
    Factory = 8,
    Upgrading = 9,
    RfDown = 10,
    RfOff = 11,
}

impl HealthStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => HealthStatus::NotPresent,
            2 => HealthStatus::Error,
            3 => HealthStatus::Initializing,
            4 => HealthStatus::Idle,
            5 => HealthStatus::Operative,
            6 => HealthStatus::Alarm,
            7 => HealthStatus::Warning,
            8 => HealthStatus::Factory,
            9 => HealthStatus::Upgrading,
            10 => HealthStatus::RfDown,
            11 => HealthStatus::RfOff,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::NotPresent => "NOT_PRESENT",
            HealthStatus::Error => "ERROR",
            HealthStatus::Initializing => "INITIALIZING",
            HealthStatus::Idle => "IDLE",
            HealthStatus::Operative => "OPERATIVE",
            HealthStatus::Alarm => "ALARM",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Factory => "FACTORY",
            HealthStatus::Upgrading => "UPGRADING",
            HealthStatus::RfDown => "RF_DOWN",
            HealthStatus::RfOff => "RF_OFF",
        }
    }
}

fn health_label(code: i64) -> Option<&'static str> {
    HealthStatus::from_code(code).map(HealthStatus::label)
}

fn rf_power_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("UP"),
        2 => Some("DOWN"),
        _ => None,
    }
}

pub fn health_condition(oid: Oid) -> StatusCondition {
    StatusCondition::normal_only(
        StateKey::TransmitterHealth,
        NotificationKind::TransmitterHealth,
        Probe::Get(oid),
        HealthStatus::Operative as i64,
        health_label,
    )
}

pub fn rf_power_condition(oid: Oid) -> StatusCondition {
    StatusCondition::fault_only(
        StateKey::TransmitterRfPower,
        NotificationKind::RfPower,
        Probe::Get(oid),
        2,
        1,
        rf_power_label,
    )
}

/// RF transmitter polled over SNMP for health status and RF power
pub struct TransmitterMonitor {
    definition: MonitorDefinition,
    conditions: Vec<Box<dyn Condition>>,
}

impl TransmitterMonitor {
    /// # Errors
    ///
    /// Returns `MonitorError::InvalidOid` if a configured OID does not parse.
    pub fn configure(props: &Properties) -> Result<Self, MonitorError> {
        let kind = MonitorKind::Transmitter;
        let health: Oid = props.string(&kind.key("health_oid"), HEALTH_OID).parse()?;
        let rf_power: Oid = props.string(&kind.key("rf_power_oid"), RF_POWER_OID).parse()?;

        Ok(Self {
            definition: MonitorDefinition::load(kind, props).with_target(snmp_target(
                kind,
                props,
                DEFAULT_PORT,
                DEFAULT_COMMUNITY,
            )),
            conditions: vec![
                Box::new(health_condition(health)),
                Box::new(rf_power_condition(rf_power)),
            ],
        })
    }
}

pub fn build(props: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
    Ok(Box::new(TransmitterMonitor::configure(props)?))
}

impl Monitor for TransmitterMonitor {
    fn definition(&self) -> &MonitorDefinition {
        &self.definition
    }

    fn transport(&self) -> Transport {
        Transport::Snmp
    }

    fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }
}
