use crate::alerts::Notifier;
use crate::error::NotifyError;
use crate::events::{Field, NotificationEvent};
use crate::snmp::pdu::{TrapV1, VarBind, Value, ENTERPRISE_SPECIFIC};
use crate::snmp::Oid;
use log::{debug, error};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Instant;

/// Enterprise OID carried by every trap, below iso.org
const ENTERPRISE: [u32; 7] = [6, 1, 4, 1, 44132, 4, 3];

/// Notification fields are bound under this OID, below iso.org
const FIELD_BASE: [u32; 7] = [6, 1, 4, 1, 44132, 4, 1];

/// Delivers notifications as SNMPv1 traps to a single receiver
///
/// Delivery is fire-and-forget. Failures are logged and the event dropped.
pub struct TrapNotifier {
    host: String,
    port: u16,
    community: String,
    started: Instant,
    enterprise: Oid,
    field_base: Oid,
}

impl TrapNotifier {
    pub fn new(host: impl Into<String>, port: u16, community: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            community: community.into(),
            started: Instant::now(),
            enterprise: Oid::iso_org(&ENTERPRISE),
            field_base: Oid::iso_org(&FIELD_BASE),
        }
    }

    /// Build the trap PDU for an event
    pub fn build_trap(&self, event: &NotificationEvent, agent_addr: Ipv4Addr) -> TrapV1 {
        let varbinds = event
            .kind
            .field_arcs()
            .iter()
            .zip(&event.fields)
            .map(|(arc, field)| VarBind::new(self.field_base.child(*arc), encode_field(field)))
            .collect();

        TrapV1 {
            community: self.community.clone(),
            enterprise: self.enterprise.clone(),
            agent_addr,
            generic_trap: ENTERPRISE_SPECIFIC,
            specific_trap: i64::from(event.kind.code()),
            time_stamp: self.uptime_ticks(),
            varbinds,
        }
    }

    /// Agent uptime in hundredths of a second, wrapping like sysUpTime
    fn uptime_ticks(&self) -> u32 {
        (self.started.elapsed().as_millis() / 10 % (u128::from(u32::MAX) + 1)) as u32
    }

    fn receiver(&self) -> Result<SocketAddr, NotifyError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| NotifyError::Resolve(format!("{}:{}: {}", self.host, self.port, e)))?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| NotifyError::Resolve(format!("no IPv4 address for {}", self.host)))
    }

    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let receiver = self.receiver()?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(receiver)?;

        let agent_addr = match socket.local_addr()?.ip() {
            IpAddr::V4(addr) => addr,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        };

        let trap = self.build_trap(event, agent_addr);
        socket.send(&trap.encode())?;
        debug!(
            "Sent {:?} trap {} to {}",
            event.category, trap.specific_trap, receiver
        );
        Ok(())
    }
}

fn encode_field(field: &Field) -> Value {
    match field {
        Field::Status(code) => Value::Integer(*code),
        Field::Measurement(value) => Value::OctetString(measurement_text(*value).into_bytes()),
        Field::Text(text) => Value::OctetString(text.clone().into_bytes()),
    }
}

/// Decimal text of a measurement; whole numbers keep one fractional digit
fn measurement_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl Notifier for TrapNotifier {
    fn send(&self, event: NotificationEvent) {
        if let Err(e) = self.deliver(&event) {
            error!("Failed to deliver {} notification: {}", event.kind, e);
        }
    }
}
