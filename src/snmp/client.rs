use crate::error::ProbeError;
use crate::probe::{Credential, Probe, ProbeValue, Prober, Target};
use crate::snmp::pdu::{GetRequest, GetResponse, Value};
use crate::snmp::Oid;
use log::{debug, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_RETRIES: u32 = 3;
const MAX_DATAGRAM: usize = 65_507;

/// SNMPv1 GET client
///
/// Each fetch sends one GetRequest and waits for the matching response.
/// Unanswered requests are retried `retries` times before the fetch fails
/// with [`ProbeError::Timeout`].
#[derive(Debug)]
pub struct SnmpProber {
    timeout: Duration,
    retries: u32,
    next_request_id: AtomicI32,
}

impl Default for SnmpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl SnmpProber {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }

    pub fn with_limits(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries,
            next_request_id: AtomicI32::new(1),
        }
    }

    fn request_id(&self) -> i32 {
        // Keep ids positive so they encode compactly and never collide with 0
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        if id <= 0 {
            self.next_request_id.store(2, Ordering::Relaxed);
            1
        } else {
            id
        }
    }

    fn resolve(target: &Target) -> Result<SocketAddr, ProbeError> {
        (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| ProbeError::Unreachable(format!("cannot resolve {}: {}", target, e)))?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| ProbeError::Unreachable(format!("no IPv4 address for {}", target)))
    }

    /// Send one request and wait for a response carrying `request_id`
    ///
    /// Returns `Ok(None)` when the wait times out.
    fn exchange(
        &self,
        socket: &UdpSocket,
        addr: SocketAddr,
        request: &[u8],
        request_id: i32,
    ) -> Result<Option<GetResponse>, ProbeError> {
        socket.send_to(request, addr)?;

        let mut buffer = vec![0u8; MAX_DATAGRAM];
        loop {
            let size = match socket.recv_from(&mut buffer) {
                Ok((size, _)) => size,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None)
                }
                Err(e) => return Err(ProbeError::IoError(e)),
            };

            match GetResponse::decode(&buffer[..size]) {
                Ok(response) if response.request_id == i64::from(request_id) => {
                    return Ok(Some(response))
                }
                Ok(response) => debug!(
                    "Ignoring stale response id {} (waiting for {})",
                    response.request_id, request_id
                ),
                Err(e) => warn!("Ignoring undecodable datagram from {}: {}", addr, e),
            }
        }
    }

    fn interpret(oid: &Oid, response: GetResponse) -> Result<ProbeValue, ProbeError> {
        if response.error_status != 0 {
            return Err(ProbeError::Malformed(format!(
                "agent returned error-status {} (index {}) for {}",
                response.error_status, response.error_index, oid
            )));
        }

        let varbind = response
            .varbinds
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::Malformed(format!("empty response for {}", oid)))?;

        match varbind.value {
            Value::Integer(v) => Ok(ProbeValue::Integer(v)),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
                Ok(ProbeValue::Integer(i64::from(v)))
            }
            Value::OctetString(bytes) => {
                Ok(ProbeValue::Text(String::from_utf8_lossy(&bytes).into_owned()))
            }
            other => Err(ProbeError::Malformed(format!(
                "unexpected value {:?} for {}",
                other, oid
            ))),
        }
    }
}

impl Prober for SnmpProber {
    fn fetch(&self, target: &Target, probe: &Probe) -> Result<ProbeValue, ProbeError> {
        let oid = match probe {
            Probe::Get(oid) => oid,
            other => {
                return Err(ProbeError::Unsupported(format!(
                    "SNMP prober cannot handle {:?}",
                    other
                )))
            }
        };

        let community = match &target.credential {
            Credential::Community(community) => community.clone(),
            _ => "public".to_string(),
        };

        let addr = Self::resolve(target)?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(self.timeout))?;

        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            let request_id = self.request_id();
            let request = GetRequest {
                community: community.clone(),
                request_id,
                oids: vec![oid.clone()],
            };

            debug!("GET {} from {} (attempt {}/{})", oid, target, attempt, attempts);
            if let Some(response) = self.exchange(&socket, addr, &request.encode(), request_id)? {
                return Self::interpret(oid, response);
            }
        }

        Err(ProbeError::Timeout(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::pdu::VarBind;
    use std::thread;

    /// Minimal agent answering each request with the supplied value
    fn agent(
        answers: Vec<Option<(i64, Value)>>,
    ) -> (u16, thread::JoinHandle<Vec<Oid>>) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            let mut buffer = [0u8; 1500];
            for answer in answers {
                let (size, peer) = socket.recv_from(&mut buffer).unwrap();
                let (request_id, oid) = decode_request(&buffer[..size]);
                seen.push(oid.clone());

                if let Some((error_status, value)) = answer {
                    let response = GetResponse {
                        community: "public".to_string(),
                        request_id,
                        error_status,
                        error_index: 0,
                        varbinds: vec![VarBind::new(oid, value)],
                    };
                    socket.send_to(&response.encode(), peer).unwrap();
                }
            }
            seen
        });

        (port, handle)
    }

    fn decode_request(datagram: &[u8]) -> (i64, Oid) {
        use crate::snmp::ber::{tag, Reader};

        let mut outer = Reader::new(datagram);
        let mut message = Reader::new(outer.expect(tag::SEQUENCE).unwrap());
        message.read_integer().unwrap();
        message.read_octet_string().unwrap();
        let mut pdu = Reader::new(message.expect(tag::GET_REQUEST).unwrap());
        let request_id = pdu.read_integer().unwrap();
        pdu.read_integer().unwrap();
        pdu.read_integer().unwrap();
        let mut list = Reader::new(pdu.expect(tag::SEQUENCE).unwrap());
        let mut varbind = Reader::new(list.expect(tag::SEQUENCE).unwrap());
        (request_id, varbind.read_oid().unwrap())
    }

    fn target(port: u16) -> Target {
        Target::new("127.0.0.1", port, Credential::Community("public".to_string()))
    }

    fn battery_status() -> Probe {
        Probe::Get("1.3.6.1.2.1.33.1.2.1.0".parse().unwrap())
    }

    #[test]
    fn test_get_integer() {
        let (port, server) = agent(vec![Some((0, Value::Integer(2)))]);
        let prober = SnmpProber::with_limits(Duration::from_secs(2), 0);

        let value = prober.fetch(&target(port), &battery_status()).unwrap();
        assert_eq!(value, ProbeValue::Integer(2));

        let seen = server.join().unwrap();
        assert_eq!(seen[0].to_string(), "1.3.6.1.2.1.33.1.2.1.0");
    }

    #[test]
    fn test_retries_after_unanswered_request() {
        let (port, server) = agent(vec![None, Some((0, Value::Gauge32(7)))]);
        let prober = SnmpProber::with_limits(Duration::from_millis(200), 1);

        let value = prober.fetch(&target(port), &battery_status()).unwrap();
        assert_eq!(value, ProbeValue::Integer(7));
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_timeout_after_all_attempts() {
        let (port, server) = agent(vec![None, None]);
        let prober = SnmpProber::with_limits(Duration::from_millis(100), 1);

        let result = prober.fetch(&target(port), &battery_status());
        assert!(matches!(result, Err(ProbeError::Timeout(2))));
        server.join().unwrap();
    }

    #[test]
    fn test_error_status_is_malformed() {
        let (port, server) = agent(vec![Some((2, Value::Null))]);
        let prober = SnmpProber::with_limits(Duration::from_secs(2), 0);

        let result = prober.fetch(&target(port), &battery_status());
        assert!(matches!(result, Err(ProbeError::Malformed(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_octet_string_becomes_text() {
        let (port, server) = agent(vec![Some((0, Value::OctetString(b"52.1".to_vec())))]);
        let prober = SnmpProber::with_limits(Duration::from_secs(2), 0);

        let value = prober.fetch(&target(port), &battery_status()).unwrap();
        assert_eq!(value, ProbeValue::Text("52.1".to_string()));
        server.join().unwrap();
    }

    #[test]
    fn test_rejects_other_descriptors() {
        let prober = SnmpProber::new();
        let probe = Probe::Datagram {
            timeout: Duration::from_millis(10),
            max_size: 16,
        };
        assert!(matches!(
            prober.fetch(&target(1), &probe),
            Err(ProbeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_request_ids_increase() {
        let prober = SnmpProber::new();
        let first = prober.request_id();
        let second = prober.request_id();
        assert!(first > 0);
        assert_eq!(second, first + 1);
    }
}
