use crate::error::ConfigError;
use log::{debug, warn};
use std::path::Path;
use std::str::FromStr;
use toml::{Table, Value};

/// Read-only key/value view over a TOML document
///
/// Keys are dotted paths such as `monitor.transmitter.polling.rate`. A key
/// may be spelled with nested tables (`[monitor.transmitter]` then
/// `polling.rate = 60`) or with quoted dotted names (`"polling.rate" = 60`);
/// both resolve to the same value.
///
/// Every getter takes a default. A missing key quietly yields the default.
/// A present but malformed value logs a warning and also yields the default,
/// so a single bad setting never stops the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    root: Table,
}

impl Properties {
    pub fn new(root: Table) -> Self {
        Self { root }
    }

    /// Load properties from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::TomlError` if it is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let properties = content.parse()?;
        debug!("Loaded properties from {}", path.display());
        Ok(properties)
    }

    /// Raw lookup of a dotted key
    pub fn get(&self, key: &str) -> Option<&Value> {
        let segments: Vec<&str> = key.split('.').collect();
        lookup(&self.root, &segments)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            None => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Integer(i)) => i.to_string(),
            Some(Value::Float(f)) => f.to_string(),
            Some(Value::Boolean(b)) => b.to_string(),
            Some(other) => malformed(key, other, default.to_string()),
        }
    }

    pub fn boolean(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(Value::Boolean(b)) => *b,
            Some(value @ Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => malformed(key, value, default),
            },
            Some(other) => malformed(key, other, default),
        }
    }

    /// A non-negative integer
    pub fn unsigned(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            None => default,
            Some(value) => integer(value)
                .and_then(|i| u64::try_from(i).ok())
                .unwrap_or_else(|| malformed(key, value, default)),
        }
    }

    /// A strictly positive integer; zero counts as malformed
    pub fn positive(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            None => default,
            Some(value) => integer(value)
                .and_then(|i| u64::try_from(i).ok())
                .filter(|i| *i > 0)
                .unwrap_or_else(|| malformed(key, value, default)),
        }
    }

    pub fn port(&self, key: &str, default: u16) -> u16 {
        match self.get(key) {
            None => default,
            Some(value) => integer(value)
                .and_then(|i| u16::try_from(i).ok())
                .filter(|p| *p > 0)
                .unwrap_or_else(|| malformed(key, value, default)),
        }
    }

    /// A finite floating point number; integers are accepted
    pub fn float(&self, key: &str, default: f64) -> f64 {
        let parsed = |value: &Value| match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match self.get(key) {
            None => default,
            Some(value) => parsed(value)
                .filter(|f| f.is_finite())
                .unwrap_or_else(|| malformed(key, value, default)),
        }
    }
}

impl FromStr for Properties {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.parse::<Table>()?))
    }
}

/// Walk `segments` through nested tables, allowing a key at any level to
/// contain literal dots
fn lookup<'a>(table: &'a Table, segments: &[&str]) -> Option<&'a Value> {
    // Prefer the longest literal key so `"polling.rate"` wins over `polling`
    for split in (1..=segments.len()).rev() {
        let candidate = segments[..split].join(".");
        let Some(value) = table.get(&candidate) else {
            continue;
        };

        if split == segments.len() {
            return Some(value);
        }
        if let Value::Table(child) = value {
            if let Some(found) = lookup(child, &segments[split..]) {
                return Some(found);
            }
        }
    }
    None
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn malformed<T: std::fmt::Debug>(key: &str, value: &Value, default: T) -> T {
    warn!(
        "Malformed value for '{}': {}; using default {:?}",
        key, value, default
    );
    default
}
