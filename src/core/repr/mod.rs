//! Serialization and deserialization of network packets.
//!
//! The `repr` module provides abstractions for serialization and deserializing
//! packets and frames at different network layers to/from byte buffers. Every
//! view validates the length of its buffer up front, so accessors never read
//! past the bytes that were actually captured.

pub mod arp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;

pub use self::arp::{
    hw_types as arp_hw_types,
    proto_types as arp_proto_types,
    Arp,
    Op as ArpOp,
};
pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
};
pub use self::icmpv4::{
    types as icmpv4_types,
    DestinationUnreachable as Icmpv4DestinationUnreachable,
    Packet as Icmpv4Packet,
    Repr as Icmpv4Repr,
    TimeExceeded as Icmpv4TimeExceeded,
};
pub use self::ipv4::{
    protocols as ipv4_protocols,
    Address as Ipv4Address,
    Packet as Ipv4Packet,
    Repr as Ipv4Repr,
};
