//! Alert/clear decision shared by every probing monitor
//!
//! One evaluation reads the previous observation (or the condition's normal
//! baseline on the first poll), fetches a new value and decides:
//!
//! - abnormal now: alert, on every poll, repeats included
//! - normal now, abnormal before: clear, exactly once
//! - normal now, normal before: nothing
//!
//! A failed fetch changes nothing and sends nothing. The previous
//! observation stays authoritative for the next poll.

use crate::alerts::Notifier;
use crate::events::NotificationEvent;
use crate::monitors::conditions::{Classification, Condition, Fault};
use crate::probe::{Prober, Target};
use crate::state::ConditionState;
use log::{debug, error, info, warn};

/// What one evaluation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No new data; state untouched
    ProbeFailed,
    Alerted(Fault),
    Cleared,
    /// Normal, and it was normal before
    Steady,
}

/// Evaluate one condition against its target
pub fn evaluate(
    condition: &dyn Condition,
    target: &Target,
    state: &mut ConditionState,
    prober: &dyn Prober,
    notifier: &dyn Notifier,
) -> Outcome {
    let key = condition.key();
    let previous = state.get(key).unwrap_or_else(|| condition.baseline());

    let observation = match prober
        .fetch(target, condition.probe())
        .and_then(|value| condition.interpret(value))
    {
        Ok(observation) => observation,
        Err(e) => {
            error!("Probe of {} on {} failed: {}", key, target, e);
            return Outcome::ProbeFailed;
        }
    };

    let outcome = match condition.classify(observation) {
        Classification::Abnormal(fault) => {
            warn!(
                "{} on {} is {} ({}), sending alert",
                key, target, fault.label, observation
            );
            notifier.send(NotificationEvent::alert(
                condition.kind(),
                condition.alert_fields(observation, &fault),
            ));
            Outcome::Alerted(fault)
        }
        Classification::Normal if condition.classify(previous).is_abnormal() => {
            info!("{} on {} is back to normal ({}), sending clear", key, target, observation);
            notifier.send(NotificationEvent::clear(
                condition.kind(),
                condition.clear_fields(observation),
            ));
            Outcome::Cleared
        }
        Classification::Normal => {
            debug!("{} on {} is normal ({})", key, target, observation);
            Outcome::Steady
        }
    };

    state.record(key, observation);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{MockNotifier, RecordingNotifier};
    use crate::error::ProbeError;
    use crate::events::{Category, Field, NotificationKind};
    use crate::monitors::conditions::{PresenceCondition, RangeCondition, StatusCondition};
    use crate::probe::{Credential, MockProber, Probe, ProbeValue, ScriptedProber};
    use crate::state::{Observation, StateKey};
    use quickcheck_macros::quickcheck;
    use std::time::Duration;

    fn target() -> Target {
        Target::new("10.0.0.5", 161, Credential::Community("public".to_string()))
    }

    fn health() -> StatusCondition {
        StatusCondition::normal_only(
            StateKey::TransmitterHealth,
            NotificationKind::TransmitterHealth,
            Probe::Get("1.3.6.1.4.1.37504.3.2.1.3.4.1.2.1".parse().unwrap()),
            5,
            |code| match code {
                5 => Some("OPERATIVE"),
                6 => Some("ALARM"),
                _ => None,
            },
        )
    }

    fn stream() -> PresenceCondition {
        PresenceCondition::new(
            StateKey::StreamPresence,
            NotificationKind::StreamPresence,
            Probe::Datagram {
                timeout: Duration::from_secs(3),
                max_size: 1024,
            },
        )
    }

    fn rf_level() -> RangeCondition {
        RangeCondition::new(
            StateKey::ForwardRfLevel,
            NotificationKind::RfLevel,
            Probe::PageField {
                path: "/cgi_ipradio?type=103".to_string(),
                label: "Forward RF Level".to_string(),
            },
            47.81,
            57.83,
        )
        .unwrap()
    }

    /// Run `polls` evaluations and return the outcomes
    fn run(
        condition: &dyn Condition,
        prober: &ScriptedProber,
        notifier: &RecordingNotifier,
        state: &mut ConditionState,
        polls: usize,
    ) -> Vec<Outcome> {
        (0..polls)
            .map(|_| evaluate(condition, &target(), state, prober, notifier))
            .collect()
    }

    #[test]
    fn test_status_sequence_alerts_repeat_then_clear_once() {
        let condition = health();
        let prober = ScriptedProber::integers(&[5, 6, 6, 5, 5]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        let outcomes = run(&condition, &prober, &notifier, &mut state, 5);
        let alarm = Fault {
            code: 6,
            label: "ALARM",
        };
        assert_eq!(
            outcomes,
            vec![
                Outcome::Steady,
                Outcome::Alerted(alarm),
                Outcome::Alerted(alarm),
                Outcome::Cleared,
                Outcome::Steady,
            ]
        );

        let events = notifier.events();
        let summary: Vec<(Category, Option<i64>)> =
            events.iter().map(|e| (e.category, e.status())).collect();
        assert_eq!(
            summary,
            vec![
                (Category::Alert, Some(6)),
                (Category::Alert, Some(6)),
                (Category::Clear, Some(5)),
            ]
        );
        assert!(events
            .iter()
            .all(|e| e.kind == NotificationKind::TransmitterHealth));
    }

    #[test]
    fn test_presence_timeout_then_absent_then_present() {
        let condition = stream();
        let prober = ScriptedProber::new(vec![
            Err(ProbeError::Timeout(1)),
            Ok(ProbeValue::Presence(false)),
            Ok(ProbeValue::Presence(true)),
        ]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        assert_eq!(
            evaluate(&condition, &target(), &mut state, &prober, &notifier),
            Outcome::ProbeFailed
        );
        assert!(notifier.is_empty());
        assert!(!state.contains(StateKey::StreamPresence));

        assert!(matches!(
            evaluate(&condition, &target(), &mut state, &prober, &notifier),
            Outcome::Alerted(_)
        ));
        assert_eq!(
            evaluate(&condition, &target(), &mut state, &prober, &notifier),
            Outcome::Cleared
        );

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, Category::Alert);
        assert_eq!(events[0].fields, vec![Field::Status(2)]);
        assert_eq!(events[1].category, Category::Clear);
        assert_eq!(events[1].fields, vec![Field::Status(1)]);
    }

    #[test]
    fn test_range_low_then_high_then_clear() {
        let condition = rf_level();
        let prober = ScriptedProber::new(vec![
            Ok(ProbeValue::Text("45.0".to_string())),
            Ok(ProbeValue::Text("60.0".to_string())),
            Ok(ProbeValue::Text("50.0".to_string())),
        ]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        let outcomes = run(&condition, &prober, &notifier, &mut state, 3);
        assert_eq!(
            outcomes,
            vec![
                Outcome::Alerted(Fault {
                    code: 3,
                    label: "LOW"
                }),
                Outcome::Alerted(Fault {
                    code: 2,
                    label: "HIGH"
                }),
                Outcome::Cleared,
            ]
        );

        let fields: Vec<Vec<Field>> = notifier.events().into_iter().map(|e| e.fields).collect();
        assert_eq!(
            fields,
            vec![
                vec![Field::Status(3), Field::Measurement(45.0)],
                vec![Field::Status(2), Field::Measurement(60.0)],
                vec![Field::Status(1), Field::Measurement(50.0)],
            ]
        );
    }

    #[test]
    fn test_first_poll_abnormal_alerts() {
        let condition = health();
        let prober = ScriptedProber::integers(&[2]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        let outcome = evaluate(&condition, &target(), &mut state, &prober, &notifier);
        assert_eq!(
            outcome,
            Outcome::Alerted(Fault {
                code: 2,
                label: "UNKNOWN"
            })
        );
        assert_eq!(state.get(StateKey::TransmitterHealth), Some(Observation::Status(2)));
    }

    #[test]
    fn test_failed_probe_keeps_previous_observation() {
        let condition = health();
        let prober = ScriptedProber::new(vec![
            Ok(ProbeValue::Integer(6)),
            Err(ProbeError::Unreachable("down".to_string())),
            Ok(ProbeValue::Integer(5)),
        ]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        let outcomes = run(&condition, &prober, &notifier, &mut state, 3);
        assert_eq!(outcomes[1], Outcome::ProbeFailed);
        assert_eq!(outcomes[2], Outcome::Cleared);
        assert_eq!(notifier.len(), 2);
    }

    #[test]
    fn test_malformed_value_counts_as_failed_probe() {
        let condition = rf_level();
        let prober = ScriptedProber::new(vec![Ok(ProbeValue::Text("N/A".to_string()))]);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        assert_eq!(
            evaluate(&condition, &target(), &mut state, &prober, &notifier),
            Outcome::ProbeFailed
        );
        assert!(state.is_empty());
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_failed_fetch_never_notifies() {
        let condition = health();
        let mut prober = MockProber::new();
        prober
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(ProbeError::Timeout(4)));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let mut state = ConditionState::new();
        state.record(StateKey::TransmitterHealth, Observation::Status(6));

        let outcome = evaluate(&condition, &target(), &mut state, &prober, &notifier);
        assert_eq!(outcome, Outcome::ProbeFailed);
        assert_eq!(state.get(StateKey::TransmitterHealth), Some(Observation::Status(6)));
    }

    /// `None` is a failed probe, `Some(code)` a successful reading
    fn replay(polls: &[Option<u8>]) -> (Vec<Outcome>, RecordingNotifier) {
        let condition = health();
        let script = polls
            .iter()
            .map(|poll| match poll {
                Some(code) => Ok(ProbeValue::Integer(i64::from(code % 12))),
                None => Err(ProbeError::Timeout(1)),
            })
            .collect();
        let prober = ScriptedProber::new(script);
        let notifier = RecordingNotifier::new();
        let mut state = ConditionState::new();

        let outcomes = (0..polls.len())
            .map(|_| evaluate(&condition, &target(), &mut state, &prober, &notifier))
            .collect();
        (outcomes, notifier)
    }

    #[quickcheck]
    fn prop_every_abnormal_reading_alerts(polls: Vec<Option<u8>>) -> bool {
        let (_, notifier) = replay(&polls);
        let abnormal_readings = polls
            .iter()
            .flatten()
            .filter(|code| *code % 12 != 5)
            .count();
        let alerts = notifier
            .events()
            .iter()
            .filter(|e| e.category == Category::Alert)
            .count();
        alerts == abnormal_readings
    }

    #[quickcheck]
    fn prop_clear_only_after_abnormal(polls: Vec<Option<u8>>) -> bool {
        let (outcomes, _) = replay(&polls);

        let mut previous_abnormal = false;
        outcomes.iter().all(|outcome| match outcome {
            Outcome::ProbeFailed => true,
            Outcome::Alerted(_) => {
                previous_abnormal = true;
                true
            }
            Outcome::Cleared => std::mem::replace(&mut previous_abnormal, false),
            Outcome::Steady => !std::mem::replace(&mut previous_abnormal, false),
        })
    }

    #[quickcheck]
    fn prop_failed_probes_send_nothing(failures: u8) -> bool {
        let polls = vec![None; usize::from(failures % 32)];
        let (outcomes, notifier) = replay(&polls);
        notifier.is_empty() && outcomes.iter().all(|o| *o == Outcome::ProbeFailed)
    }
}
