use crate::alerts::Notifier;
use crate::config::Properties;
use crate::monitors::{Monitor, MonitorFactory, MonitorKind, Outcome};
use crate::probe::Prober;
use crate::scheduler::Job;
use crate::state::ConditionState;
use log::{debug, error, info};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Builds every monitor variant from configuration
///
/// A variant whose construction fails is logged and left out; it never
/// prevents the remaining variants from being built.
pub struct Registry {
    monitors: Vec<Box<dyn Monitor>>,
}

impl Registry {
    /// Build all known variants
    pub fn load(props: &Properties) -> Self {
        let factories: Vec<(MonitorKind, MonitorFactory)> = MonitorKind::ALL
            .iter()
            .map(|kind| (*kind, kind.factory()))
            .collect();
        Self::from_factories(props, &factories)
    }

    /// Build from an explicit factory table
    pub fn from_factories(props: &Properties, factories: &[(MonitorKind, MonitorFactory)]) -> Self {
        let mut monitors = Vec::with_capacity(factories.len());
        for (kind, factory) in factories {
            match factory(props) {
                Ok(monitor) => monitors.push(monitor),
                Err(e) => error!("Failed to configure {} monitor: {}", kind, e),
            }
        }
        Self { monitors }
    }

    /// Number of variants that were built, enabled or not
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Consume the registry, keeping only enabled monitors
    pub fn enabled_monitors(self) -> Vec<Box<dyn Monitor>> {
        self.monitors
            .into_iter()
            .filter(|monitor| {
                if monitor.is_enabled() {
                    info!(
                        "{} monitor enabled, polling every {:?}",
                        monitor.kind(),
                        monitor.interval()
                    );
                    true
                } else {
                    debug!("{} monitor disabled", monitor.kind());
                    false
                }
            })
            .collect()
    }
}

/// A monitor bundled with its state and collaborators, ready to schedule
///
/// The job exclusively owns the monitor's [`ConditionState`]; the scheduler
/// never runs the same job twice at once, so the state needs no locking.
pub struct MonitorJob {
    name: String,
    monitor: Box<dyn Monitor>,
    state: ConditionState,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
}

impl MonitorJob {
    pub fn new(monitor: Box<dyn Monitor>, prober: Arc<dyn Prober>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            name: monitor.kind().to_string(),
            monitor,
            state: ConditionState::new(),
            prober,
            notifier,
        }
    }

    pub fn interval(&self) -> Duration {
        self.monitor.interval()
    }

    pub fn state(&self) -> &ConditionState {
        &self.state
    }
}

impl Job for MonitorJob {
    fn name(&self) -> &str {
        &self.name
    }

    /// Fails only when every condition's probe failed, so tick statistics
    /// show a device that returned no data at all
    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let outcomes = self.monitor.check(
            &mut self.state,
            self.prober.as_ref(),
            self.notifier.as_ref(),
        );
        debug!("{} check finished: {:?}", self.name, outcomes);

        if !outcomes.is_empty() && outcomes.iter().all(|o| *o == Outcome::ProbeFailed) {
            return Err(format!("no data from any of {} probe(s)", outcomes.len()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::error::MonitorError;
    use crate::events::NotificationKind;
    use crate::monitors::{heartbeat, transmitter};
    use crate::probe::{NoProbe, ProbeValue, ScriptedProber};
    use crate::state::StateKey;

    fn failing(_: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
        Err(MonitorError::InvalidConfig("broken on purpose".to_string()))
    }

    fn exploding(_: &Properties) -> Result<Box<dyn Monitor>, MonitorError> {
        Err(MonitorError::InvalidConfig("also broken".to_string()))
    }

    #[test]
    fn test_only_enabled_monitors_are_returned() {
        let props: Properties = r#"
            [monitor.heartbeat]
            enabled = true

            [monitor.ups]
            enabled = true

            [monitor.transmitter]
            enabled = false
        "#
        .parse()
        .unwrap();

        let registry = Registry::load(&props);
        assert_eq!(registry.len(), MonitorKind::ALL.len());

        let mut kinds: Vec<MonitorKind> = registry
            .enabled_monitors()
            .iter()
            .map(|m| m.kind())
            .collect();
        kinds.sort_by_key(|k| k.section());
        assert_eq!(kinds, vec![MonitorKind::Heartbeat, MonitorKind::BatteryBackup]);
    }

    #[test]
    fn test_failing_variant_does_not_block_others() {
        let props: Properties = "[monitor.heartbeat]\nenabled = true\n[monitor.transmitter]\nenabled = true"
            .parse()
            .unwrap();

        let factories: [(MonitorKind, MonitorFactory); 4] = [
            (MonitorKind::WebManagedUnit, failing),
            (MonitorKind::Heartbeat, heartbeat::build),
            (MonitorKind::BatteryBackup, exploding),
            (MonitorKind::Transmitter, transmitter::build),
        ];
        let registry = Registry::from_factories(&props, &factories);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.enabled_monitors().len(), 2);
    }

    #[test]
    fn test_invalid_web_band_only_drops_web_monitor() {
        let props: Properties = r#"
            [monitor.web]
            enabled = true
            freq_low = 60
            freq_high = 40

            [monitor.stream]
            enabled = true
        "#
        .parse()
        .unwrap();

        let enabled = Registry::load(&props).enabled_monitors();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].kind(), MonitorKind::StreamPresence);
    }

    #[test]
    fn test_job_keeps_state_between_runs() {
        let monitor = transmitter::build(&Properties::default()).unwrap();
        let prober = Arc::new(ScriptedProber::new(vec![
            Ok(ProbeValue::Integer(6)),
            Ok(ProbeValue::Integer(1)),
            Ok(ProbeValue::Integer(5)),
            Ok(ProbeValue::Integer(1)),
        ]));
        let notifier = Arc::new(RecordingNotifier::new());
        let mut job = MonitorJob::new(monitor, prober, notifier.clone());

        assert_eq!(job.name(), "transmitter");
        job.run().unwrap();
        assert!(job.state().contains(StateKey::TransmitterHealth));
        job.run().unwrap();

        let kinds: Vec<NotificationKind> = notifier.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![NotificationKind::TransmitterHealth, NotificationKind::TransmitterHealth]
        );
    }

    #[test]
    fn test_job_reports_total_probe_failure() {
        let monitor = transmitter::build(&Properties::default()).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut job = MonitorJob::new(monitor, Arc::new(NoProbe), notifier.clone());

        assert!(job.run().is_err());
        assert!(job.state().is_empty());
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_heartbeat_job_never_fails() {
        let monitor = heartbeat::build(&Properties::default()).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut job = MonitorJob::new(monitor, Arc::new(NoProbe), notifier.clone());

        assert!(job.run().is_ok());
        assert_eq!(notifier.len(), 1);
    }
}
