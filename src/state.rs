//! Per-monitor memory of the last observed value for each condition

use std::collections::HashMap;
use std::fmt;

/// Closed set of state keys, one per tracked condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    TransmitterHealth,
    TransmitterRfPower,
    BatteryStatus,
    OutputSource,
    StreamPresence,
    ForwardRfLevel,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKey::TransmitterHealth => "transmitter.health",
            StateKey::TransmitterRfPower => "transmitter.rf_power",
            StateKey::BatteryStatus => "ups.battery_status",
            StateKey::OutputSource => "ups.output_source",
            StateKey::StreamPresence => "stream.presence",
            StateKey::ForwardRfLevel => "web.forward_rf_level",
        };
        f.write_str(name)
    }
}

/// A typed value observed by a successful poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Enumerated status code
    Status(i64),
    /// Numeric measurement
    Measurement(f64),
    /// Presence flag
    Presence(bool),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Status(code) => write!(f, "status {}", code),
            Observation::Measurement(value) => write!(f, "{}", value),
            Observation::Presence(true) => f.write_str("present"),
            Observation::Presence(false) => f.write_str("absent"),
        }
    }
}

/// Last observed value per condition, owned by exactly one monitor job
///
/// A key is absent until the first successful poll for it. After that it is
/// overwritten on every successful poll and never removed.
#[derive(Debug, Default)]
pub struct ConditionState {
    values: HashMap<StateKey, Observation>,
}

impl ConditionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous observation for `key`, if any poll has stored one
    pub fn get(&self, key: StateKey) -> Option<Observation> {
        self.values.get(&key).copied()
    }

    /// Store the newest observation for `key`, returning the one it replaced
    pub fn record(&mut self, key: StateKey, observation: Observation) -> Option<Observation> {
        self.values.insert(key, observation)
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
