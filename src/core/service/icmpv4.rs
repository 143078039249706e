use std::cmp::min;

use crate::core::repr::{
    eth_types,
    ipv4_protocols,
    EthernetFrame,
    Icmpv4DestinationUnreachable,
    Icmpv4Packet,
    Icmpv4Repr,
    Icmpv4TimeExceeded,
    Ipv4Packet,
    Ipv4Repr,
};
use crate::core::service::{
    ethernet,
    Icmpv4Error,
    Interface,
    Outcome,
    Router,
};
use crate::core::time::Env;
use crate::{
    Error,
    Result,
};

/// TTL of datagrams originated by the router.
pub const DEFAULT_TTL: u8 = 64;

/// Bytes of the offending datagram's payload quoted in an ICMP error.
pub const QUOTED_PAYLOAD_LEN: usize = 8;

/// Receives an ICMP packet addressed to the router.
///
/// Echo requests are answered via the ingress interface with identifier,
/// sequence number and data unchanged; other messages are ignored.
pub fn recv_packet<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_frame: &EthernetFrame<&[u8]>,
    ipv4_packet: &Ipv4Packet<&[u8]>,
) -> Result<Outcome> {
    let icmp_packet = Icmpv4Packet::try_new(ipv4_packet.payload())?;
    icmp_packet.check_encoding()?;

    let (id, seq) = match Icmpv4Repr::deserialize(&icmp_packet) {
        Ok(Icmpv4Repr::EchoRequest { id, seq }) => (id, seq),
        _ => {
            debug!(
                "Ignoring ICMP type {} code {} from {}.",
                icmp_packet._type(),
                icmp_packet.code(),
                ipv4_packet.src_addr()
            );
            return Err(Error::Ignored);
        }
    };

    debug!(
        "Got a ping from {}; Sending response...",
        ipv4_packet.src_addr()
    );

    let eth_frame_len = EthernetFrame::<&[u8]>::buffer_len(ipv4_packet.packet().len());

    ethernet::send_frame(router, ingress, eth_frame_len, |reply| {
        reply.set_dst_addr(eth_frame.src_addr());
        reply.set_payload_type(eth_types::IPV4);
        reply.payload_mut().copy_from_slice(ipv4_packet.packet());

        let mut ipv4_reply = Ipv4Packet::try_new(reply.payload_mut())?;
        ipv4_reply.set_src_addr(ipv4_packet.dst_addr());
        ipv4_reply.set_dst_addr(ipv4_packet.src_addr());
        ipv4_reply.set_ttl(DEFAULT_TTL);

        {
            let mut icmp_reply = Icmpv4Packet::try_new(ipv4_reply.payload_mut())?;
            Icmpv4Repr::EchoReply { id, seq }.serialize(&mut icmp_reply)?;
        }

        ipv4_reply.fill_checksum();
        Ok(())
    })?;

    Ok(Outcome::Replied)
}

/// Sends an ICMP error about a received frame back to its source.
///
/// The error quotes the offending datagram's header and up to the first
/// eight bytes of its payload, and leaves via the interface the frame came in
/// on. It is sourced from the datagram's destination when that is a router
/// address, otherwise from the ingress interface.
pub fn send_error<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_buffer: &[u8],
    error: Icmpv4Error,
) -> Result<()> {
    let eth_frame = EthernetFrame::try_new(eth_buffer)?;
    let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload())?;

    let quote_len = min(
        ipv4_packet.header_len() + QUOTED_PAYLOAD_LEN,
        ipv4_packet.packet().len(),
    );
    let quote = &ipv4_packet.packet()[.. quote_len];

    let icmp_repr = match error {
        Icmpv4Error::NetUnreachable => Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::NetUnreachable,
            payload_len: quote_len,
        },
        Icmpv4Error::HostUnreachable => Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::HostUnreachable,
            payload_len: quote_len,
        },
        Icmpv4Error::PortUnreachable => Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::PortUnreachable,
            payload_len: quote_len,
        },
        Icmpv4Error::TtlExceeded => Icmpv4Repr::TimeExceeded {
            reason: Icmpv4TimeExceeded::TtlExpired,
            payload_len: quote_len,
        },
    };

    let src_addr = match router.owner(ipv4_packet.dst_addr()) {
        Some(_) => ipv4_packet.dst_addr(),
        None => ingress.ipv4_addr,
    };

    let ipv4_repr = Ipv4Repr {
        src_addr,
        dst_addr: ipv4_packet.src_addr(),
        protocol: ipv4_protocols::ICMP,
        ttl: DEFAULT_TTL,
        identification: rand::random(),
        payload_len: icmp_repr.buffer_len(),
    };

    debug!(
        "Sending {:?} to {} via {}.",
        error, ipv4_repr.dst_addr, ingress.name
    );

    let eth_frame_len = EthernetFrame::<&[u8]>::buffer_len(ipv4_repr.buffer_len());

    ethernet::send_frame(router, ingress, eth_frame_len, |reply| {
        reply.set_dst_addr(eth_frame.src_addr());
        reply.set_payload_type(eth_types::IPV4);
        ipv4_repr.serialize(reply.payload_mut())?;

        let icmp_buffer = &mut reply.payload_mut()[Ipv4Packet::<&[u8]>::MIN_HEADER_LEN ..];
        let mut icmp_packet = Icmpv4Packet::try_new(icmp_buffer)?;
        icmp_packet.payload_mut().copy_from_slice(quote);
        icmp_repr.serialize(&mut icmp_packet)
    })
}
