//! Notification types emitted by the monitors
//!
//! A [`NotificationEvent`] is built by a monitor when the hysteresis policy
//! decides to alert or clear, handed to a [`Notifier`](crate::alerts::Notifier)
//! and then dropped. Nothing here is retained between polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Identifies which monitor/condition a notification concerns
///
/// The numeric code travels on the wire as the trap's specific-trap number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Periodic liveness signal from the agent itself
    Heartbeat,
    /// Presence of the inbound media stream
    StreamPresence,
    /// UPS battery status
    BatteryStatus,
    /// UPS output source
    OutputSource,
    /// Forward RF level read from the web-managed unit
    RfLevel,
    /// Transmitter RF power state
    RfPower,
    /// Transmitter health status
    TransmitterHealth,
}

impl NotificationKind {
    /// Wire code for this kind
    pub fn code(self) -> u32 {
        match self {
            NotificationKind::Heartbeat => 1,
            NotificationKind::StreamPresence => 2,
            NotificationKind::BatteryStatus => 3,
            NotificationKind::OutputSource => 4,
            NotificationKind::RfLevel => 5,
            NotificationKind::RfPower => 6,
            NotificationKind::TransmitterHealth => 7,
        }
    }

    /// Last arc of the variable-binding OID for each field, in field order
    pub fn field_arcs(self) -> &'static [u32] {
        match self {
            NotificationKind::Heartbeat => &[1],
            NotificationKind::StreamPresence => &[2],
            NotificationKind::BatteryStatus => &[3],
            NotificationKind::OutputSource => &[4],
            NotificationKind::RfLevel => &[5, 6],
            NotificationKind::RfPower => &[7],
            NotificationKind::TransmitterHealth => &[8],
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Heartbeat => "heartbeat",
            NotificationKind::StreamPresence => "stream-presence",
            NotificationKind::BatteryStatus => "battery-status",
            NotificationKind::OutputSource => "output-source",
            NotificationKind::RfLevel => "rf-level",
            NotificationKind::RfPower => "rf-power",
            NotificationKind::TransmitterHealth => "transmitter-health",
        };
        f.write_str(name)
    }
}

/// Category of a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Liveness signal, carries no condition
    Heartbeat,
    /// A previously abnormal condition returned to normal
    Clear,
    /// A condition is currently abnormal
    Alert,
}

/// A single typed field carried by a notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Field {
    /// Enumerated status code
    Status(i64),
    /// Numeric measurement
    Measurement(f64),
    /// Free text
    Text(String),
}

/// A point-in-time alert, clear or heartbeat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    /// When the decision was made
    pub timestamp: Timestamp,
    /// Which monitor/condition this concerns
    pub kind: NotificationKind,
    /// Alert, clear or heartbeat
    pub category: Category,
    /// Ordered payload fields
    pub fields: Vec<Field>,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind, category: Category, fields: Vec<Field>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            category,
            fields,
        }
    }

    pub fn alert(kind: NotificationKind, fields: Vec<Field>) -> Self {
        Self::new(kind, Category::Alert, fields)
    }

    pub fn clear(kind: NotificationKind, fields: Vec<Field>) -> Self {
        Self::new(kind, Category::Clear, fields)
    }

    /// First status field, if any
    pub fn status(&self) -> Option<i64> {
        self.fields.iter().find_map(|field| match field {
            Field::Status(code) => Some(*code),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_unique() {
        let kinds = [
            NotificationKind::Heartbeat,
            NotificationKind::StreamPresence,
            NotificationKind::BatteryStatus,
            NotificationKind::OutputSource,
            NotificationKind::RfLevel,
            NotificationKind::RfPower,
            NotificationKind::TransmitterHealth,
        ];

        let mut codes: Vec<u32> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_rf_level_carries_two_fields() {
        assert_eq!(NotificationKind::RfLevel.field_arcs(), &[5, 6]);
        assert_eq!(NotificationKind::TransmitterHealth.field_arcs(), &[8]);
    }

    #[test]
    fn test_event_serialization() {
        let event = NotificationEvent::alert(
            NotificationKind::RfLevel,
            vec![Field::Status(3), Field::Measurement(45.0)],
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"rf_level\""));
        assert!(json.contains("\"category\":\"alert\""));

        let deserialized: NotificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_status_returns_first_status_field() {
        let event = NotificationEvent::clear(
            NotificationKind::RfLevel,
            vec![Field::Measurement(50.0), Field::Status(1)],
        );
        assert_eq!(event.status(), Some(1));

        let heartbeat = NotificationEvent::new(
            NotificationKind::Heartbeat,
            Category::Heartbeat,
            vec![Field::Text("Heartbeat".to_string())],
        );
        assert_eq!(heartbeat.status(), None);
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(serde_json::to_string(&Category::Alert).unwrap(), "\"alert\"");
        assert_eq!(serde_json::to_string(&Category::Clear).unwrap(), "\"clear\"");
        assert_eq!(
            serde_json::to_string(&Category::Heartbeat).unwrap(),
            "\"heartbeat\""
        );
    }
}
