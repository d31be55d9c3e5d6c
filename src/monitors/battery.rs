use crate::config::Properties;
use crate::error::MonitorError;
use crate::events::NotificationKind;
use crate::monitors::{snmp_target, Condition, Monitor, MonitorDefinition, MonitorKind, StatusCondition};
use crate::probe::{Probe, Transport};
use crate::snmp::Oid;
use crate::state::StateKey;

/// upsBatteryStatus (UPS-MIB)
pub const BATTERY_STATUS_OID: &str = "1.3.6.1.2.1.33.1.2.1.0";
/// upsOutputSource (UPS-MIB)
pub const OUTPUT_SOURCE_OID: &str = "1.3.6.1.2.1.33.1.4.1.0";

/// SNMP port of the UPS network card
pub const DEFAULT_PORT: u16 = 3027;
pub const DEFAULT_COMMUNITY: &str = "LiebertEM";

const BATTERY_NORMAL: i64 = 2;
const OUTPUT_NORMAL: i64 = 3;

fn battery_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("UNKNOWN"),
        2 => Some("BATTERY_NORMAL"),
        3 => Some("BATTERY_LOW"),
        4 => Some("BATTERY_DEPLETED"),
        _ => None,
    }
}

fn output_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("OTHER"),
        2 => Some("NONE"),
        3 => Some("NORMAL"),
        4 => Some("BYPASS"),
        5 => Some("BATTERY"),
        6 => Some("BOOSTER"),
        7 => Some("REDUCER"),
        _ => None,
    }
}

/// UPS polled over SNMP for battery status and output source
pub struct BatteryBackupMonitor {
    definition: MonitorDefinition,
    conditions: Vec<Box<dyn Condition>>,
}

impl BatteryBackupMonitor {
    /// # Errors
    ///
    /// Returns `MonitorError::InvalidOid` if a configured OID does not parse.
    pub fn configure(props: &Properties) -> Result<Self, MonitorError> {
        let kind = MonitorKind::BatteryBackup;
        let battery: Oid = props
            .string(&kind.key("battery_oid"), BATTERY_STATUS_OID)
            .parse()?;
        let output: Oid = props
            .string(&kind.key("output_oid"), OUTPUT_SOURCE_OID)
            .parse()?;

        let conditions: Vec<Box<dyn Condition>> = vec![
            Box::new(StatusCondition::normal_only(
                StateKey::BatteryStatus,
                NotificationKind::BatteryStatus,
                Probe::Get(battery),
                BATTERY_NORMAL,
                battery_label,
            )),
            Box::new(StatusCondition::normal_only(
                StateKey::OutputSource,
                NotificationKind::OutputSource,
                Probe::Get(output),
                OUTPUT_NORMAL,
                output_label,
            )),
        ];

        Ok(Self {
            definition: MonitorDefinition::load(kind, props).with_target(snmp_target(
                kind,
                props,
                DEFAULT_PORT,
                DEFAULT_COMMUNITY,
            )),
            conditions,
        })
    }
}

pub fn build(props: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
    Ok(Box::new(BatteryBackupMonitor::configure(props)?))
}

impl Monitor for BatteryBackupMonitor {
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
