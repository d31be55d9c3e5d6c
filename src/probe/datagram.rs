use crate::error::ProbeError;
use crate::probe::{Probe, ProbeValue, Prober, Target};
use log::debug;
use std::io::ErrorKind;
use std::net::UdpSocket;

/// Detects an inbound UDP stream by waiting for a single datagram
///
/// Binds the target address, waits up to the probe timeout and reports
/// `Presence(true)` if anything arrived, `Presence(false)` if the wait timed
/// out. Only socket-level failures (bind errors and the like) are probe
/// errors.
#[derive(Debug, Default)]
pub struct DatagramProber;

impl DatagramProber {
    pub fn new() -> Self {
        Self
    }
}

impl Prober for DatagramProber {
    fn fetch(&self, target: &Target, probe: &Probe) -> Result<ProbeValue, ProbeError> {
        let (timeout, max_size) = match probe {
            Probe::Datagram { timeout, max_size } => (*timeout, *max_size),
            other => {
                return Err(ProbeError::Unsupported(format!(
                    "datagram prober cannot handle {:?}",
                    other
                )))
            }
        };

        let socket = UdpSocket::bind((target.host.as_str(), target.port))?;
        socket.set_read_timeout(Some(timeout))?;

        let mut buffer = vec![0u8; max_size.max(1)];
        match socket.recv_from(&mut buffer) {
            Ok((size, peer)) => {
                debug!("Received {} byte datagram from {} on {}", size, peer, target);
                Ok(ProbeValue::Presence(true))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                debug!("No datagram received on {} within {:?}", target, timeout);
                Ok(ProbeValue::Presence(false))
            }
            Err(e) => Err(ProbeError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Credential;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn free_port() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    }

    fn probe(timeout_ms: u64) -> Probe {
        Probe::Datagram {
            timeout: Duration::from_millis(timeout_ms),
            max_size: 1024,
        }
    }

    #[test]
    fn test_timeout_reports_absent() {
        let target = Target::new("127.0.0.1", free_port(), Credential::None);
        let value = DatagramProber::new().fetch(&target, &probe(100)).unwrap();
        assert_eq!(value, ProbeValue::Presence(false));
    }

    #[test]
    fn test_datagram_reports_present() {
        let port = free_port();
        let target = Target::new("127.0.0.1", port, Credential::None);

        // Keep sending until the prober has had a chance to bind
        let done = Arc::new(AtomicBool::new(false));
        let sender_done = Arc::clone(&done);
        let sender = thread::spawn(move || {
            let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
            while !sender_done.load(Ordering::SeqCst) {
                let _ = socket.send_to(b"frame", ("127.0.0.1", port));
                thread::sleep(Duration::from_millis(10));
            }
        });

        let value = DatagramProber::new().fetch(&target, &probe(2000)).unwrap();
        done.store(true, Ordering::SeqCst);
        sender.join().unwrap();

        assert_eq!(value, ProbeValue::Presence(true));
    }

    #[test]
    fn test_bind_failure_is_probe_error() {
        let held = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = held.local_addr().unwrap().port();
        let target = Target::new("127.0.0.1", port, Credential::None);

        let result = DatagramProber::new().fetch(&target, &probe(100));
        assert!(matches!(result, Err(ProbeError::IoError(_))));
    }

    #[test]
    fn test_rejects_other_descriptors() {
        let target = Target::new("127.0.0.1", free_port(), Credential::None);
        let result = DatagramProber::new().fetch(&target, &Probe::Get("1.3.6.1".parse().unwrap()));
        assert!(matches!(result, Err(ProbeError::Unsupported(_))));
    }
}
