//! Condition checks shared by the probing monitors
//!
//! A [`Condition`] knows how to fetch one value, how to turn the raw probe
//! result into an [`Observation`], and how to classify that observation as
//! normal or abnormal. The alert/clear decision itself lives in
//! [`hysteresis`](super::hysteresis) and is the same for every condition.

use crate::error::{MonitorError, ProbeError};
use crate::events::{Field, NotificationKind};
use crate::probe::{Probe, ProbeValue};
use crate::state::{Observation, StateKey};

/// Why a condition is abnormal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Code carried in the alert's status field
    pub code: i64,
    pub label: &'static str,
}

/// Result of classifying an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Normal,
    Abnormal(Fault),
}

impl Classification {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Classification::Abnormal(_))
    }
}

/// One independently evaluated check within a monitor
pub trait Condition: Send + Sync {
    /// Where the last observation is kept between polls
    fn key(&self) -> StateKey;

    /// Notification kind for alerts and clears
    fn kind(&self) -> NotificationKind;

    fn probe(&self) -> &Probe;

    /// Observation assumed before the first successful poll; always normal
    fn baseline(&self) -> Observation;

    /// Convert a raw probe value, rejecting values of the wrong shape
    fn interpret(&self, value: ProbeValue) -> Result<Observation, ProbeError>;

    fn classify(&self, observation: Observation) -> Classification;

    fn alert_fields(&self, observation: Observation, fault: &Fault) -> Vec<Field>;

    fn clear_fields(&self, observation: Observation) -> Vec<Field>;
}

/// Maps a status code to its name
pub type StatusLabels = fn(i64) -> Option<&'static str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusRule {
    /// Only this code is normal
    NormalIs(i64),
    /// Only this code is abnormal
    FaultIs(i64),
}

/// Enumerated status code read from a device
///
/// Alerts carry the observed code; clears carry the normal code.
#[derive(Debug, Clone)]
pub struct StatusCondition {
    key: StateKey,
    kind: NotificationKind,
    probe: Probe,
    rule: StatusRule,
    normal: i64,
    labels: StatusLabels,
}

impl StatusCondition {
    /// Every code other than `normal` is abnormal
    pub fn normal_only(
        key: StateKey,
        kind: NotificationKind,
        probe: Probe,
        normal: i64,
        labels: StatusLabels,
    ) -> Self {
        Self {
            key,
            kind,
            probe,
            rule: StatusRule::NormalIs(normal),
            normal,
            labels,
        }
    }

    /// Only `fault` is abnormal; `normal` is the code reported on clear
    pub fn fault_only(
        key: StateKey,
        kind: NotificationKind,
        probe: Probe,
        fault: i64,
        normal: i64,
        labels: StatusLabels,
    ) -> Self {
        Self {
            key,
            kind,
            probe,
            rule: StatusRule::FaultIs(fault),
            normal,
            labels,
        }
    }

    fn label(&self, code: i64) -> &'static str {
        (self.labels)(code).unwrap_or("UNKNOWN")
    }
}

impl Condition for StatusCondition {
    fn key(&self) -> StateKey {
        self.key
    }

    fn kind(&self) -> NotificationKind {
        self.kind
    }

    fn probe(&self) -> &Probe {
        &self.probe
    }

    fn baseline(&self) -> Observation {
        Observation::Status(self.normal)
    }

    fn interpret(&self, value: ProbeValue) -> Result<Observation, ProbeError> {
        match value {
            ProbeValue::Integer(code) => Ok(Observation::Status(code)),
            ProbeValue::Text(text) => text.trim().parse().map(Observation::Status).map_err(|_| {
                ProbeError::Malformed(format!("{}: '{}' is not a status code", self.key, text))
            }),
            other => Err(ProbeError::Malformed(format!(
                "{}: expected a status code, got {:?}",
                self.key, other
            ))),
        }
    }

    fn classify(&self, observation: Observation) -> Classification {
        let Observation::Status(code) = observation else {
            return Classification::Normal;
        };

        let abnormal = match self.rule {
            StatusRule::NormalIs(normal) => code != normal,
            StatusRule::FaultIs(fault) => code == fault,
        };

        if abnormal {
            Classification::Abnormal(Fault {
                code,
                label: self.label(code),
            })
        } else {
            Classification::Normal
        }
    }

    fn alert_fields(&self, _observation: Observation, fault: &Fault) -> Vec<Field> {
        vec![Field::Status(fault.code)]
    }

    fn clear_fields(&self, _observation: Observation) -> Vec<Field> {
        vec![Field::Status(self.normal)]
    }
}

/// Status code sent when a presence condition goes absent
pub const ABSENT: i64 = 2;
/// Status code sent when a presence condition recovers
pub const PRESENT: i64 = 1;

/// Something that should be there, such as an inbound stream
#[derive(Debug, Clone)]
pub struct PresenceCondition {
    key: StateKey,
    kind: NotificationKind,
    probe: Probe,
}

impl PresenceCondition {
    pub fn new(key: StateKey, kind: NotificationKind, probe: Probe) -> Self {
        Self { key, kind, probe }
    }
}

impl Condition for PresenceCondition {
    fn key(&self) -> StateKey {
        self.key
    }

    fn kind(&self) -> NotificationKind {
        self.kind
    }

    fn probe(&self) -> &Probe {
        &self.probe
    }

    fn baseline(&self) -> Observation {
        Observation::Presence(true)
    }

    fn interpret(&self, value: ProbeValue) -> Result<Observation, ProbeError> {
        match value {
            ProbeValue::Presence(present) => Ok(Observation::Presence(present)),
            other => Err(ProbeError::Malformed(format!(
                "{}: expected a presence flag, got {:?}",
                self.key, other
            ))),
        }
    }

    fn classify(&self, observation: Observation) -> Classification {
        match observation {
            Observation::Presence(false) => Classification::Abnormal(Fault {
                code: ABSENT,
                label: "ABSENT",
            }),
            _ => Classification::Normal,
        }
    }

    fn alert_fields(&self, _observation: Observation, fault: &Fault) -> Vec<Field> {
        vec![Field::Status(fault.code)]
    }

    fn clear_fields(&self, _observation: Observation) -> Vec<Field> {
        vec![Field::Status(PRESENT)]
    }
}

/// Status code for a measurement at or above the high threshold
pub const HIGH: i64 = 2;
/// Status code for a measurement at or below the low threshold
pub const LOW: i64 = 3;
/// Status code for a measurement back inside the band
pub const IN_RANGE: i64 = 1;

/// Numeric measurement that must stay strictly inside `(low, high)`
///
/// Alerts and clears carry the status code followed by the measurement.
#[derive(Debug, Clone)]
pub struct RangeCondition {
    key: StateKey,
    kind: NotificationKind,
    probe: Probe,
    low: f64,
    high: f64,
}

impl RangeCondition {
    /// # Errors
    ///
    /// Returns `MonitorError::InvalidConfig` unless `low < high` and both
    /// thresholds are finite.
    pub fn new(
        key: StateKey,
        kind: NotificationKind,
        probe: Probe,
        low: f64,
        high: f64,
    ) -> Result<Self, MonitorError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(MonitorError::InvalidConfig(format!(
                "{}: low threshold {} must be below high threshold {}",
                key, low, high
            )));
        }

        Ok(Self {
            key,
            kind,
            probe,
            low,
            high,
        })
    }
}

impl Condition for RangeCondition {
    fn key(&self) -> StateKey {
        self.key
    }

    fn kind(&self) -> NotificationKind {
        self.kind
    }

    fn probe(&self) -> &Probe {
        &self.probe
    }

    fn baseline(&self) -> Observation {
        Observation::Measurement((self.low + self.high) / 2.0)
    }

    fn interpret(&self, value: ProbeValue) -> Result<Observation, ProbeError> {
        let measurement = match value {
            ProbeValue::Integer(v) => v as f64,
            ProbeValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ProbeError::Malformed(format!("{}: '{}' is not a number", self.key, text))
            })?,
            other => {
                return Err(ProbeError::Malformed(format!(
                    "{}: expected a measurement, got {:?}",
                    self.key, other
                )))
            }
        };

        if !measurement.is_finite() {
            return Err(ProbeError::Malformed(format!(
                "{}: measurement {} is not finite",
                self.key, measurement
            )));
        }
        Ok(Observation::Measurement(measurement))
    }

    fn classify(&self, observation: Observation) -> Classification {
        match observation {
            Observation::Measurement(v) if v <= self.low => Classification::Abnormal(Fault {
                code: LOW,
                label: "LOW",
            }),
            Observation::Measurement(v) if v >= self.high => Classification::Abnormal(Fault {
                code: HIGH,
                label: "HIGH",
            }),
            _ => Classification::Normal,
        }
    }

    fn alert_fields(&self, observation: Observation, fault: &Fault) -> Vec<Field> {
        vec![Field::Status(fault.code), measurement_field(observation)]
    }

    fn clear_fields(&self, observation: Observation) -> Vec<Field> {
        vec![Field::Status(IN_RANGE), measurement_field(observation)]
    }
}

fn measurement_field(observation: Observation) -> Field {
    match observation {
        Observation::Measurement(v) => Field::Measurement(v),
        other => Field::Text(other.to_string()),
    }
}
