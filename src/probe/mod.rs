//! Remote value fetching
//!
//! A [`Prober`] performs one bounded, blocking fetch against a target and
//! returns either a value or a [`ProbeError`]. Monitors treat every error the
//! same way: no new data for this poll.

/// UDP stream presence detection
pub mod datagram;

/// Login-and-scrape probe for web-managed appliances
pub mod web;

/// Replayable prober for tests
#[cfg(test)]
pub mod scripted;

pub use datagram::DatagramProber;
#[cfg(test)]
pub use scripted::ScriptedProber;
pub use web::WebProber;

use crate::error::ProbeError;
use crate::snmp::Oid;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Credentials presented to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    /// SNMP community string
    Community(String),
    /// Form login for web-managed units
    Login { username: String, password: String },
}

/// Connection parameters for one remote target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub credential: Credential,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16, credential: Credential) -> Self {
        Self {
            host: host.into(),
            port,
            credential,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What to fetch from a target
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// SNMP GET of a single object
    Get(Oid),
    /// Wait for one datagram on the target address
    Datagram { timeout: Duration, max_size: usize },
    /// Log into a web page and read the cell following `label`
    PageField { path: String, label: String },
}

/// A raw value returned by a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeValue {
    Integer(i64),
    Text(String),
    Presence(bool),
}

/// Which concrete prober a monitor needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// The monitor never probes
    None,
    Snmp,
    Datagram,
    Http,
}

/// Performs a single synchronous fetch against a remote target
///
/// Implementations must bound the call with a timeout so an unreachable
/// device cannot stall its monitor indefinitely.
#[cfg_attr(test, mockall::automock)]
pub trait Prober: Send + Sync {
    fn fetch(&self, target: &Target, probe: &Probe) -> Result<ProbeValue, ProbeError>;
}

/// Prober for monitors that never fetch anything
#[derive(Debug, Default)]
pub struct NoProbe;

impl Prober for NoProbe {
    fn fetch(&self, target: &Target, _probe: &Probe) -> Result<ProbeValue, ProbeError> {
        Err(ProbeError::Unsupported(format!(
            "no prober available for {}",
            target
        )))
    }
}

/// One prober per transport, shared by all monitors that use it
#[derive(Clone)]
pub struct ProberSet {
    pub snmp: Arc<dyn Prober>,
    pub datagram: Arc<dyn Prober>,
    pub http: Arc<dyn Prober>,
    none: Arc<dyn Prober>,
}

impl ProberSet {
    pub fn new(snmp: Arc<dyn Prober>, datagram: Arc<dyn Prober>, http: Arc<dyn Prober>) -> Self {
        Self {
            snmp,
            datagram,
            http,
            none: Arc::new(NoProbe),
        }
    }

    /// Use the same prober for every transport
    pub fn uniform(prober: Arc<dyn Prober>) -> Self {
        Self::new(Arc::clone(&prober), Arc::clone(&prober), prober)
    }

    pub fn select(&self, transport: Transport) -> Arc<dyn Prober> {
        match transport {
            Transport::None => Arc::clone(&self.none),
            Transport::Snmp => Arc::clone(&self.snmp),
            Transport::Datagram => Arc::clone(&self.datagram),
            Transport::Http => Arc::clone(&self.http),
        }
    }
}
