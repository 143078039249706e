use crate::core::arp_cache::QueuedPacket;
use crate::core::repr::{
    ipv4_protocols,
    EthernetAddress,
    EthernetFrame,
    Ipv4Packet,
};
use crate::core::service::{
    arp,
    icmpv4,
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

/// Sends a copy of a received frame to its next hop.
///
/// The copy has its TTL decremented, its header checksum recomputed and its
/// Ethernet addresses rewritten for the hop from egress to eth_addr.
pub fn forward_frame<T: Env>(
    router: &Router<T>,
    egress: &Interface,
    eth_buffer: &[u8],
    eth_addr: EthernetAddress,
) -> Result<()> {
    let mut eth_buffer = eth_buffer.to_vec();
    let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..])?;
    eth_frame.set_dst_addr(eth_addr);
    eth_frame.set_src_addr(egress.ethernet_addr);

    {
        let mut ipv4_packet = Ipv4Packet::try_new(eth_frame.payload_mut())?;
        let ttl = ipv4_packet.ttl().saturating_sub(1);
        ipv4_packet.set_ttl(ttl);
        ipv4_packet.fill_checksum();
    }

    router.send(eth_frame.as_ref(), &egress.name);
    Ok(())
}

/// Receives an IPv4 packet from an interface.
///
/// The packet is validated then either answered locally, forwarded, queued
/// until its next hop is resolved, or rejected with an ICMP error.
pub fn recv_packet<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_frame: &EthernetFrame<&[u8]>,
) -> Result<Outcome> {
    let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload())?;

    if let Err(err) = ipv4_packet.check_encoding() {
        debug!(
            "Dropping IPv4 packet from {} with invalid checksum.",
            ipv4_packet.src_addr()
        );
        return Err(err);
    }

    if ipv4_packet.ttl() <= 1 {
        debug!(
            "TTL expired for IPv4 packet from {} to {}.",
            ipv4_packet.src_addr(),
            ipv4_packet.dst_addr()
        );
        return reject(router, ingress, eth_frame, Icmpv4Error::TtlExceeded);
    }

    let dst_addr = ipv4_packet.dst_addr();

    if router.owner(dst_addr).is_some() {
        return match ipv4_packet.protocol() {
            ipv4_protocols::ICMP => icmpv4::recv_packet(router, ingress, eth_frame, &ipv4_packet),
            protocol => {
                debug!(
                    "No service for protocol {} at {}.",
                    protocol, dst_addr
                );
                reject(router, ingress, eth_frame, Icmpv4Error::PortUnreachable)
            }
        };
    }

    let route = match router.route_table().lookup(dst_addr) {
        Some(route) => route,
        None => {
            debug!("No route to {}.", dst_addr);
            return reject(router, ingress, eth_frame, Icmpv4Error::NetUnreachable);
        }
    };

    let egress = match router.interface(&route.ifr_name) {
        Some(egress) => egress,
        None => {
            warn!("Route {} names an unknown interface.", route);
            return Err(Error::Ignored);
        }
    };

    let next_hop = route.next_hop(dst_addr);

    match router.arp_cache().lookup(next_hop) {
        Some(eth_addr) => {
            trace!(
                "Forwarding IPv4 packet for {} via {} to {}.",
                dst_addr,
                egress.name,
                eth_addr
            );
            forward_frame(router, egress, eth_frame.as_ref(), eth_addr)?;
            Ok(Outcome::Forwarded)
        }
        None => {
            let packet = QueuedPacket {
                buffer: eth_frame.as_ref().to_vec(),
                ingress: ingress.name.clone(),
                egress: egress.name.clone(),
            };

            debug!(
                "Queueing IPv4 packet for {} until {} is resolved.",
                dst_addr, next_hop
            );

            if let Some(request) = router.arp_cache().enqueue(next_hop, packet) {
                arp::send_request(router, &request)?;
            }

            Ok(Outcome::Enqueued)
        }
    }
}

fn reject<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_frame: &EthernetFrame<&[u8]>,
    error: Icmpv4Error,
) -> Result<Outcome> {
    icmpv4::send_error(router, ingress, eth_frame.as_ref(), error)?;
    Ok(Outcome::Unreachable(error))
}
