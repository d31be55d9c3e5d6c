use crate::config::Properties;
use log::warn;
use std::time::Duration;

/// How notifications leave the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierMode {
    /// SNMPv1 traps to `host:port`
    Trap {
        host: String,
        port: u16,
        community: String,
    },
    /// JSON lines on the log
    Log,
}

/// Agent-wide settings, everything outside the per-monitor sections
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Worker pool size; 0 means one worker per scheduled monitor
    pub worker_threads: usize,
    /// Delay between scheduler initialization attempts
    pub retry_delay: Duration,
    /// How long shutdown waits for in-flight checks
    pub shutdown_grace: Duration,
    /// How often the dispatcher looks for due monitors
    pub tick_resolution: Duration,
    pub notifier: NotifierMode,
    /// Timeout for the web-managed unit's HTTP requests
    pub http_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_properties(&Properties::default())
    }
}

impl AgentSettings {
    pub fn from_properties(props: &Properties) -> Self {
        let notifier = match props.string("notifier.mode", "trap").to_ascii_lowercase().as_str() {
            "log" => NotifierMode::Log,
            mode => {
                if mode != "trap" {
                    warn!("Unknown notifier.mode '{}', using trap", mode);
                }
                NotifierMode::Trap {
                    host: props.string("notifier.host", "127.0.0.1"),
                    port: props.port("notifier.port", 162),
                    community: props.string("notifier.community", "public"),
                }
            }
        };

        Self {
            worker_threads: props.unsigned("agent.worker_threads", 0) as usize,
            retry_delay: Duration::from_millis(props.positive("agent.retry_delay_ms", 1000)),
            shutdown_grace: Duration::from_secs(props.unsigned("agent.shutdown_grace_secs", 10)),
            tick_resolution: Duration::from_millis(props.positive("agent.tick_resolution_ms", 100)),
            notifier,
            http_timeout: Duration::from_millis(props.positive("agent.http_timeout_ms", 10_000)),
        }
    }
}
