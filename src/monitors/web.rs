use crate::config::Properties;
use crate::error::MonitorError;
use crate::events::NotificationKind;
use crate::monitors::{Condition, Monitor, MonitorDefinition, MonitorKind, RangeCondition};
use crate::probe::{Credential, Probe, Target, Transport};
use crate::state::StateKey;

/// Status page of the web-managed unit
pub const STATUS_PATH: &str = "/cgi_ipradio?type=103";
/// Label of the cell preceding the forward RF level
pub const FORWARD_RF_LABEL: &str = "Forward RF Level";

pub const DEFAULT_FREQ_LOW: f64 = 47.81;
pub const DEFAULT_FREQ_HIGH: f64 = 57.83;

/// Web-managed appliance whose forward RF level must stay inside a band
pub struct WebManagedUnitMonitor {
    definition: MonitorDefinition,
    conditions: Vec<Box<dyn Condition>>,
}

impl WebManagedUnitMonitor {
    /// # Errors
    ///
    /// Returns `MonitorError::InvalidConfig` if `freq_low` is not below
    /// `freq_high`.
    pub fn configure(props: &Properties) -> Result<Self, MonitorError> {
        let kind = MonitorKind::WebManagedUnit;
        let target = Target::new(
            props.string(&kind.key("host"), "localhost"),
            props.port(&kind.key("port"), 80),
            Credential::Login {
                username: props.string(&kind.key("username"), "admin"),
                password: props.string(&kind.key("password"), "password"),
            },
        );

        let level = RangeCondition::new(
            StateKey::ForwardRfLevel,
            NotificationKind::RfLevel,
            Probe::PageField {
                path: STATUS_PATH.to_string(),
                label: FORWARD_RF_LABEL.to_string(),
            },
            props.float(&kind.key("freq_low"), DEFAULT_FREQ_LOW),
            props.float(&kind.key("freq_high"), DEFAULT_FREQ_HIGH),
        )?;

        Ok(Self {
            definition: MonitorDefinition::load(kind, props).with_target(target),
            conditions: vec![Box::new(level)],
        })
    }
}

pub fn build(props: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
    Ok(Box::new(WebManagedUnitMonitor::configure(props)?))
}

impl Monitor for WebManagedUnitMonitor {
    fn definition(&self) -> &MonitorDefinition {
        &self.definition
    }

    fn transport(&self) -> Transport {
        Transport::Http
    }

    fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }
}
