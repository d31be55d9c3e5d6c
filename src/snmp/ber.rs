//! Minimal BER encoding and decoding for SNMPv1 messages

use crate::error::CodecError;
use std::fmt;
use std::str::FromStr;

/// Universal and SNMP application/context tags
pub mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIME_TICKS: u8 = 0x43;
    pub const GET_REQUEST: u8 = 0xa0;
    pub const GET_RESPONSE: u8 = 0xa2;
    pub const TRAP_V1: u8 = 0xa4;
}

/// An SNMP object identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Build an OID from arcs, validating the first two
    pub fn from_arcs(arcs: Vec<u32>) -> Result<Self, CodecError> {
        match arcs.as_slice() {
            [first, second, ..]
                if *first <= 2 && (*second < 40 || (*first == 2 && *second <= u32::MAX - 80)) =>
            {
                Ok(Oid(arcs))
            }
            _ => Err(CodecError::InvalidOid(format!("{:?}", arcs))),
        }
    }

    /// An OID under iso.org (1.3), which is always valid
    pub fn iso_org(arcs: &[u32]) -> Oid {
        let mut all = vec![1, 3];
        all.extend_from_slice(arcs);
        Oid(all)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// A new OID with `arc` appended
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Oid(arcs)
    }
}

impl FromStr for Oid {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim()
            .trim_start_matches('.')
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CodecError::InvalidOid(s.to_string()))?;

        Oid::from_arcs(arcs).map_err(|_| CodecError::InvalidOid(s.to_string()))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arcs: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&arcs.join("."))
    }
}

/// Append a BER length to `out`
pub fn write_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// Encode a complete tag-length-value triple
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(tag);
    write_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Encode a constructed value from already-encoded children
pub fn constructed(tag: u8, children: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag, &children.concat())
}

/// Minimal two's complement content octets for `value`
pub fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub fn integer(tag: u8, value: i64) -> Vec<u8> {
    tlv(tag, &integer_content(value))
}

pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(tag::OCTET_STRING, content)
}

pub fn null() -> Vec<u8> {
    tlv(tag::NULL, &[])
}

pub fn oid(value: &Oid) -> Vec<u8> {
    let arcs = value.arcs();
    let mut content = Vec::new();
    encode_subidentifier(arcs[0] * 40 + arcs[1], &mut content);
    for arc in &arcs[2..] {
        encode_subidentifier(*arc, &mut content);
    }
    tlv(tag::OBJECT_IDENTIFIER, &content)
}

fn encode_subidentifier(mut value: u32, out: &mut Vec<u8>) {
    let mut chunk = [0u8; 5];
    let mut i = chunk.len() - 1;
    chunk[i] = (value & 0x7f) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        chunk[i] = 0x80 | (value & 0x7f) as u8;
        value >>= 7;
    }
    out.extend_from_slice(&chunk[i..]);
}

/// Decode two's complement content octets
pub fn decode_integer(content: &[u8]) -> Result<i64, CodecError> {
    let significant = match content {
        [] => return Err(CodecError::InvalidLength),
        // Unsigned application types may carry a leading zero octet
        [0x00, rest @ ..] if rest.len() == 8 => rest,
        _ if content.len() > 8 => return Err(CodecError::IntegerOverflow),
        _ => content,
    };

    if significant.len() == 8 && content.len() == 9 && significant[0] & 0x80 != 0 {
        return Err(CodecError::IntegerOverflow);
    }

    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for byte in significant {
        value = (value << 8) | i64::from(*byte);
    }
    Ok(value)
}

pub fn decode_oid(content: &[u8]) -> Result<Oid, CodecError> {
    let invalid = || CodecError::InvalidOid(format!("{:02x?}", content));

    let mut subidentifiers = Vec::new();
    let mut current: u32 = 0;
    let mut pending = false;
    for byte in content {
        current = current
            .checked_mul(128)
            .and_then(|v| v.checked_add(u32::from(byte & 0x7f)))
            .ok_or_else(invalid)?;
        pending = byte & 0x80 != 0;
        if !pending {
            subidentifiers.push(current);
            current = 0;
        }
    }
    if pending || subidentifiers.is_empty() {
        return Err(invalid());
    }

    let first = subidentifiers[0];
    let (a, b) = if first < 80 {
        (first / 40, first % 40)
    } else {
        (2, first - 80)
    };
    let mut arcs = vec![a, b];
    arcs.extend_from_slice(&subidentifiers[1..]);
    Oid::from_arcs(arcs)
}

/// Sequential reader over BER-encoded bytes
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(CodecError::Truncated {
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_length(&mut self) -> Result<usize, CodecError> {
        let first = self.take(1)?[0];
        if first < 0x80 {
            return Ok(usize::from(first));
        }

        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 {
            return Err(CodecError::InvalidLength);
        }
        Ok(self
            .take(count)?
            .iter()
            .fold(0usize, |len, byte| (len << 8) | usize::from(*byte)))
    }

    /// Read the next element, returning its tag and content
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), CodecError> {
        let tag = self.take(1)?[0];
        let len = self.read_length()?;
        let content = self.take(len)?;
        Ok((tag, content))
    }

    /// Read the next element and require a specific tag
    pub fn expect(&mut self, expected: u8) -> Result<&'a [u8], CodecError> {
        let (found, content) = self.read_tlv()?;
        if found != expected {
            return Err(CodecError::UnexpectedTag { expected, found });
        }
        Ok(content)
    }

    pub fn read_integer(&mut self) -> Result<i64, CodecError> {
        decode_integer(self.expect(tag::INTEGER)?)
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8], CodecError> {
        self.expect(tag::OCTET_STRING)
    }

    pub fn read_oid(&mut self) -> Result<Oid, CodecError> {
        decode_oid(self.expect(tag::OBJECT_IDENTIFIER)?)
    }
}
