use crate::error::ProbeError;
use crate::probe::{Probe, ProbeValue, Prober, Target};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Prober that replays a fixed script of results, for testing
///
/// Results are returned in order regardless of target or descriptor. Once
/// the script is exhausted every fetch fails as unreachable. An optional
/// delay simulates a slow device.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    script: Mutex<VecDeque<Result<ProbeValue, ProbeError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(script: Vec<Result<ProbeValue, ProbeError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Script made only of successful integer readings
    pub fn integers(values: &[i64]) -> Self {
        Self::new(values.iter().map(|v| Ok(ProbeValue::Integer(*v))).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for ScriptedProber {
    fn fetch(&self, target: &Target, _probe: &Probe) -> Result<ProbeValue, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProbeError::Unreachable(format!(
                    "script exhausted for {}",
                    target
                )))
            })
    }
}
