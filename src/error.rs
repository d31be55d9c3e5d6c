use thiserror::Error;

/// Errors that can occur while fetching a value from a remote target
///
/// The monitors never branch on the variant: any error means "no new data
/// this poll". The variants exist for logging.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Request timed out after {0} attempt(s)")]
    Timeout(u32),

    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Probe not supported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),
}

/// Errors raised by the SNMP BER codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated input: needed {needed} byte(s), {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Unexpected tag: expected 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("Invalid length encoding")]
    InvalidLength,

    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),

    #[error("Integer does not fit in 64 bits")]
    IntegerOverflow,
}

/// Errors that can occur when delivering a notification
///
/// These never leave the notifier: a failed delivery is logged and dropped.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to resolve receiver address: {0}")]
    Resolve(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while constructing a monitor from configuration
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid probe OID: {0}")]
    InvalidOid(#[from] CodecError),
}

/// Errors that can occur while building or registering scheduled jobs
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid interval for job '{0}': interval must be positive")]
    InvalidInterval(String),

    #[error("Scheduler is not accepting changes: {0}")]
    NotAccepting(String),

    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
