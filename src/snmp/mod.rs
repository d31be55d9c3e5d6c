//! SNMPv1 support: BER codec, GET prober and trap notifier

/// Minimal BER encoding and decoding
pub mod ber;
pub mod client;
pub mod pdu;
pub mod trap;

pub use ber::Oid;
pub use client::SnmpProber;
pub use trap::TrapNotifier;
