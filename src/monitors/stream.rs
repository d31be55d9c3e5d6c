use crate::config::Properties;
use crate::error::MonitorError;
use crate::events::NotificationKind;
use crate::monitors::{Condition, Monitor, MonitorDefinition, MonitorKind, PresenceCondition};
use crate::probe::{Credential, Probe, Target, Transport};
use crate::state::StateKey;
use std::time::Duration;

/// Largest datagram read while waiting for the stream
pub const MAX_DATAGRAM: usize = 1024;

/// Inbound media stream, detected by waiting for one datagram per poll
pub struct StreamPresenceMonitor {
    definition: MonitorDefinition,
    conditions: Vec<Box<dyn Condition>>,
}

impl StreamPresenceMonitor {
    pub fn configure(props: &Properties) -> Self {
        let kind = MonitorKind::StreamPresence;
        let target = Target::new(
            props.string(&kind.key("bind"), "0.0.0.0"),
            props.port(&kind.key("port"), 5003),
            Credential::None,
        );
        let timeout = Duration::from_millis(props.positive(&kind.key("timeout_ms"), 3000));

        Self {
            definition: MonitorDefinition::load(kind, props).with_target(target),
            conditions: vec![Box::new(PresenceCondition::new(
                StateKey::StreamPresence,
                NotificationKind::StreamPresence,
                Probe::Datagram {
                    timeout,
                    max_size: MAX_DATAGRAM,
                },
            ))],
        }
    }
}

pub fn build(props: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
    Ok(Box::new(StreamPresenceMonitor::configure(props)))
}

impl Monitor for StreamPresenceMonitor {
    fn definition(&self) -> &MonitorDefinition {
        &self.definition
    }

    fn transport(&self) -> Transport {
        Transport::Datagram
    }

    fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }
}
