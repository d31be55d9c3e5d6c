//! SNMPv1 messages: GetRequest, GetResponse and Trap-PDU

use crate::error::CodecError;
use crate::snmp::ber::{self, tag, Oid, Reader};
use std::net::Ipv4Addr;

/// SNMP version field value for SNMPv1
pub const VERSION_1: i64 = 0;

/// Generic trap number for enterprise-specific traps
pub const ENTERPRISE_SPECIFIC: i64 = 6;

/// A variable-binding value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    /// Any other tag, kept raw
    Other(u8, Vec<u8>),
}

impl Value {
    fn encode(&self) -> Vec<u8> {
        match self {
            Value::Integer(v) => ber::integer(tag::INTEGER, *v),
            Value::OctetString(bytes) => ber::octet_string(bytes),
            Value::Null => ber::null(),
            Value::ObjectId(oid) => ber::oid(oid),
            Value::IpAddress(addr) => ber::tlv(tag::IP_ADDRESS, &addr.octets()),
            Value::Counter32(v) => ber::integer(tag::COUNTER32, i64::from(*v)),
            Value::Gauge32(v) => ber::integer(tag::GAUGE32, i64::from(*v)),
            Value::TimeTicks(v) => ber::integer(tag::TIME_TICKS, i64::from(*v)),
            Value::Other(t, content) => ber::tlv(*t, content),
        }
    }

    fn decode(value_tag: u8, content: &[u8]) -> Result<Self, CodecError> {
        let unsigned = |content: &[u8]| -> Result<u32, CodecError> {
            u32::try_from(ber::decode_integer(content)?).map_err(|_| CodecError::IntegerOverflow)
        };

        Ok(match value_tag {
            tag::INTEGER => Value::Integer(ber::decode_integer(content)?),
            tag::OCTET_STRING => Value::OctetString(content.to_vec()),
            tag::NULL => Value::Null,
            tag::OBJECT_IDENTIFIER => Value::ObjectId(ber::decode_oid(content)?),
            tag::IP_ADDRESS => match content {
                [a, b, c, d] => Value::IpAddress(Ipv4Addr::new(*a, *b, *c, *d)),
                _ => return Err(CodecError::InvalidLength),
            },
            tag::COUNTER32 => Value::Counter32(unsigned(content)?),
            tag::GAUGE32 => Value::Gauge32(unsigned(content)?),
            tag::TIME_TICKS => Value::TimeTicks(unsigned(content)?),
            other => Value::Other(other, content.to_vec()),
        })
    }
}

/// An OID paired with its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    fn encode(&self) -> Vec<u8> {
        ber::constructed(tag::SEQUENCE, &[ber::oid(&self.oid), self.value.encode()])
    }
}

fn encode_varbinds(varbinds: &[VarBind]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = varbinds.iter().map(VarBind::encode).collect();
    ber::constructed(tag::SEQUENCE, &encoded)
}

fn decode_varbinds(content: &[u8]) -> Result<Vec<VarBind>, CodecError> {
    let mut reader = Reader::new(content);
    let mut varbinds = Vec::new();
    while !reader.is_empty() {
        let mut pair = Reader::new(reader.expect(tag::SEQUENCE)?);
        let oid = pair.read_oid()?;
        let (value_tag, value_content) = pair.read_tlv()?;
        varbinds.push(VarBind::new(oid, Value::decode(value_tag, value_content)?));
    }
    Ok(varbinds)
}

fn encode_message(community: &str, pdu: Vec<u8>) -> Vec<u8> {
    ber::constructed(
        tag::SEQUENCE,
        &[
            ber::integer(tag::INTEGER, VERSION_1),
            ber::octet_string(community.as_bytes()),
            pdu,
        ],
    )
}

/// GetRequest for one or more objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub community: String,
    pub request_id: i32,
    pub oids: Vec<Oid>,
}

impl GetRequest {
    pub fn encode(&self) -> Vec<u8> {
        let varbinds: Vec<VarBind> = self
            .oids
            .iter()
            .map(|oid| VarBind::new(oid.clone(), Value::Null))
            .collect();

        let pdu = ber::constructed(
            tag::GET_REQUEST,
            &[
                ber::integer(tag::INTEGER, i64::from(self.request_id)),
                ber::integer(tag::INTEGER, 0),
                ber::integer(tag::INTEGER, 0),
                encode_varbinds(&varbinds),
            ],
        );
        encode_message(&self.community, pdu)
    }
}

/// Decoded GetResponse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponse {
    pub community: String,
    pub request_id: i64,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

impl GetResponse {
    pub fn decode(datagram: &[u8]) -> Result<Self, CodecError> {
        let mut outer = Reader::new(datagram);
        let mut message = Reader::new(outer.expect(tag::SEQUENCE)?);

        let _version = message.read_integer()?;
        let community = String::from_utf8_lossy(message.read_octet_string()?).into_owned();

        let mut pdu = Reader::new(message.expect(tag::GET_RESPONSE)?);
        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let varbinds = decode_varbinds(pdu.expect(tag::SEQUENCE)?)?;

        Ok(Self {
            community,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Encode a response, used to stand in for an agent in tests
    pub fn encode(&self) -> Vec<u8> {
        let pdu = ber::constructed(
            tag::GET_RESPONSE,
            &[
                ber::integer(tag::INTEGER, self.request_id),
                ber::integer(tag::INTEGER, self.error_status),
                ber::integer(tag::INTEGER, self.error_index),
                encode_varbinds(&self.varbinds),
            ],
        );
        encode_message(&self.community, pdu)
    }
}

/// SNMPv1 Trap-PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapV1 {
    pub community: String,
    pub enterprise: Oid,
    pub agent_addr: Ipv4Addr,
    pub generic_trap: i64,
    pub specific_trap: i64,
    pub time_stamp: u32,
    pub varbinds: Vec<VarBind>,
}

impl TrapV1 {
    pub fn encode(&self) -> Vec<u8> {
        let pdu = ber::constructed(
            tag::TRAP_V1,
            &[
                ber::oid(&self.enterprise),
                ber::tlv(tag::IP_ADDRESS, &self.agent_addr.octets()),
                ber::integer(tag::INTEGER, self.generic_trap),
                ber::integer(tag::INTEGER, self.specific_trap),
                ber::integer(tag::TIME_TICKS, i64::from(self.time_stamp)),
                encode_varbinds(&self.varbinds),
            ],
        );
        encode_message(&self.community, pdu)
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, CodecError> {
        let mut outer = Reader::new(datagram);
        let mut message = Reader::new(outer.expect(tag::SEQUENCE)?);

        let _version = message.read_integer()?;
        let community = String::from_utf8_lossy(message.read_octet_string()?).into_owned();

        let mut pdu = Reader::new(message.expect(tag::TRAP_V1)?);
        let enterprise = pdu.read_oid()?;
        let agent_addr = match pdu.expect(tag::IP_ADDRESS)? {
            [a, b, c, d] => Ipv4Addr::new(*a, *b, *c, *d),
            _ => return Err(CodecError::InvalidLength),
        };
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let time_stamp = u32::try_from(ber::decode_integer(pdu.expect(tag::TIME_TICKS)?)?)
            .map_err(|_| CodecError::IntegerOverflow)?;
        let varbinds = decode_varbinds(pdu.expect(tag::SEQUENCE)?)?;

        Ok(Self {
            community,
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    #[test]
    fn test_get_request_wire_format() {
        let request = GetRequest {
            community: "public".to_string(),
            request_id: 1,
            oids: vec![oid("1.3.6.1.2.1.1.3.0")],
        };

        let expected: Vec<u8> = vec![
            0x30, 0x26, // message
            0x02, 0x01, 0x00, // version 1
            0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', // community
            0xa0, 0x19, // GetRequest
            0x02, 0x01, 0x01, // request-id
            0x02, 0x01, 0x00, // error-status
            0x02, 0x01, 0x00, // error-index
            0x30, 0x0e, // varbind list
            0x30, 0x0c, // varbind
            0x06, 0x08, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x03, 0x00, // oid
            0x05, 0x00, // null
        ];
        assert_eq!(request.encode(), expected);
    }

    #[test]
    fn test_get_response_decode() {
        let response = GetResponse {
            community: "public".to_string(),
            request_id: 77,
            error_status: 0,
            error_index: 0,
            varbinds: vec![
                VarBind::new(oid("1.3.6.1.2.1.33.1.2.1.0"), Value::Integer(2)),
                VarBind::new(oid("1.3.6.1.2.1.1.3.0"), Value::TimeTicks(123_456)),
                VarBind::new(oid("1.3.6.1.2.1.1.1.0"), Value::OctetString(b"UPS".to_vec())),
            ],
        };

        let decoded = GetResponse::decode(&response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_get_response_rejects_request_pdu() {
        let request = GetRequest {
            community: "public".to_string(),
            request_id: 1,
            oids: vec![oid("1.3.6.1.2.1.1.3.0")],
        };

        assert_eq!(
            GetResponse::decode(&request.encode()),
            Err(CodecError::UnexpectedTag {
                expected: tag::GET_RESPONSE,
                found: tag::GET_REQUEST
            })
        );
    }

    #[test]
    fn test_trap_fields_survive_decode() {
        let trap = TrapV1 {
            community: "public".to_string(),
            enterprise: oid("1.3.6.1.4.1.44132.4.3"),
            agent_addr: Ipv4Addr::new(10, 1, 3, 7),
            generic_trap: ENTERPRISE_SPECIFIC,
            specific_trap: 5,
            time_stamp: 4200,
            varbinds: vec![
                VarBind::new(oid("1.3.6.1.4.1.44132.4.1.5"), Value::Integer(3)),
                VarBind::new(
                    oid("1.3.6.1.4.1.44132.4.1.6"),
                    Value::OctetString(b"45.0".to_vec()),
                ),
            ],
        };

        let encoded = trap.encode();
        assert_eq!(encoded[0], tag::SEQUENCE);
        assert_eq!(TrapV1::decode(&encoded).unwrap(), trap);
    }

    #[test]
    fn test_truncated_datagram_is_error() {
        let response = GetResponse {
            community: "public".to_string(),
            request_id: 1,
            error_status: 0,
            error_index: 0,
            varbinds: vec![VarBind::new(oid("1.3.6.1"), Value::Integer(5))],
        };
        let encoded = response.encode();

        assert!(matches!(
            GetResponse::decode(&encoded[..encoded.len() - 3]),
            Err(CodecError::Truncated { .. })
        ));
    }
}
