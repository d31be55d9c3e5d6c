use crate::alerts::Notifier;
use crate::config::Properties;
use crate::error::MonitorError;
use crate::events::{Category, Field, NotificationEvent, NotificationKind};
use crate::monitors::{Condition, Monitor, MonitorDefinition, MonitorKind, Outcome};
use crate::probe::{Prober, Transport};
use crate::state::ConditionState;
use log::debug;

/// Announces that the agent itself is alive on every tick
///
/// Probes nothing and keeps no state.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    definition: MonitorDefinition,
}

impl HeartbeatMonitor {
    pub fn configure(props: &Properties) -> Self {
        Self {
            definition: MonitorDefinition::load(MonitorKind::Heartbeat, props),
        }
    }
}

pub fn build(props: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
    Ok(Box::new(HeartbeatMonitor::configure(props)))
}

impl Monitor for HeartbeatMonitor {
    fn definition(&self) -> &MonitorDefinition {
        &self.definition
    }

    fn transport(&self) -> Transport {
        Transport::None
    }

    fn conditions(&self) -> &[Box<dyn Condition>] {
        &[]
    }

    fn check(
        &self,
        _state: &mut ConditionState,
        _prober: &dyn Prober,
        notifier: &dyn Notifier,
    ) -> Vec<Outcome> {
        debug!("Sending heartbeat");
        notifier.send(NotificationEvent::new(
            NotificationKind::Heartbeat,
            Category::Heartbeat,
            vec![Field::Text("Heartbeat".to_string())],
        ));
        Vec::new()
    }
}
