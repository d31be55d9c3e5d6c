/// Error types for the monitoring agent
pub mod error;

/// Notification events emitted by monitors
pub mod events;

/// Last-observed value per monitored condition
pub mod state;

/// Fetching values from remote devices
pub mod probe;

/// SNMPv1 codec, GET client and trap sender
pub mod snmp;

/// Notification delivery
pub mod alerts;

/// Device monitors, their conditions and the registry
pub mod monitors;

/// Periodic job scheduling and its supervisor
pub mod scheduler;

/// Per-job tick statistics
pub mod monitoring;

/// Configuration management
pub mod config;

/// Wiring of collaborators, monitors and scheduler
pub mod agent;

// Re-export commonly used types
pub use agent::Agent;
pub use error::{CodecError, ConfigError, MonitorError, NotifyError, ProbeError, SchedulerError};
pub use events::{Category, Field, NotificationEvent, NotificationKind};
pub use scheduler::{Scheduler, SchedulerConfig, Supervisor, SupervisorState};
