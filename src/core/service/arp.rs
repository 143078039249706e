use crate::core::arp_cache::{
    ArpRequest,
    PendingRequest,
};
use crate::core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
};
use crate::core::service::{
    ethernet,
    ipv4,
    Interface,
    Outcome,
    Router,
};
use crate::core::time::Env;
use crate::{
    Error,
    Result,
};

/// Sends an ARP packet via an interface.
pub fn send_packet<T: Env>(
    router: &Router<T>,
    interface: &Interface,
    arp_repr: &Arp,
    dst_addr: EthernetAddress,
) -> Result<()> {
    let eth_frame_len = EthernetFrame::<&[u8]>::buffer_len(arp_repr.buffer_len());

    ethernet::send_frame(router, interface, eth_frame_len, |eth_frame| {
        eth_frame.set_dst_addr(dst_addr);
        eth_frame.set_payload_type(eth_types::ARP);
        arp_repr.serialize(eth_frame.payload_mut())
    })
}

/// Broadcasts an ARP request via the interface the request names.
pub fn send_request<T: Env>(router: &Router<T>, request: &ArpRequest) -> Result<()> {
    let interface = router.interface(&request.ifr_name).ok_or_else(|| {
        Error::Config(format!("no interface named {}", request.ifr_name))
    })?;

    let arp_repr = Arp {
        op: ArpOp::Request,
        source_hw_addr: interface.ethernet_addr,
        source_proto_addr: interface.ipv4_addr,
        target_hw_addr: EthernetAddress::BROADCAST,
        target_proto_addr: request.target_proto_addr,
    };

    debug!(
        "Sending ARP request for {} via {}.",
        request.target_proto_addr, interface.name
    );

    send_packet(router, interface, &arp_repr, EthernetAddress::BROADCAST)
}

/// Receives an ARP packet from an interface.
///
/// Requests for one of the router's addresses are answered via the ingress
/// interface. Replies update the ARP cache and release any packets waiting
/// on the sender's address.
pub fn recv_packet<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_frame: &EthernetFrame<&[u8]>,
) -> Result<Outcome> {
    let arp_repr = Arp::deserialize(eth_frame.payload())?;

    match arp_repr.op {
        ArpOp::Request => {
            if router.owner(arp_repr.target_proto_addr).is_none() {
                debug!(
                    "Ignoring ARP request for {}.",
                    arp_repr.target_proto_addr
                );
                return Err(Error::Ignored);
            }

            let arp_reply = Arp {
                op: ArpOp::Reply,
                source_hw_addr: ingress.ethernet_addr,
                source_proto_addr: arp_repr.target_proto_addr,
                target_hw_addr: arp_repr.source_hw_addr,
                target_proto_addr: arp_repr.source_proto_addr,
            };

            debug!(
                "Sending ARP reply to {}/{}.",
                arp_reply.target_proto_addr, arp_reply.target_hw_addr
            );

            send_packet(router, ingress, &arp_reply, arp_reply.target_hw_addr)?;
            Ok(Outcome::Replied)
        }
        ArpOp::Reply => {
            info!(
                "Received ARP reply, adding mapping from {} to {}.",
                arp_repr.source_proto_addr, arp_repr.source_hw_addr
            );

            match router
                .arp_cache()
                .insert(arp_repr.source_hw_addr, arp_repr.source_proto_addr)
            {
                Some(pending) => {
                    let forwarded = drain(router, pending, arp_repr.source_hw_addr);
                    Ok(Outcome::Resolved { forwarded })
                }
                None => Ok(Outcome::Learned),
            }
        }
    }
}

/// Forwards every packet of a resolved request in the order they were queued,
/// returning the number sent.
fn drain<T: Env>(router: &Router<T>, pending: PendingRequest, eth_addr: EthernetAddress) -> usize {
    debug!(
        "Forwarding {} packets waiting on {}.",
        pending.packets.len(),
        pending.ipv4_addr
    );

    let mut forwarded = 0;

    for packet in &pending.packets {
        let sent = router
            .interface(&packet.egress)
            .ok_or(Error::Ignored)
            .and_then(|egress| ipv4::forward_frame(router, egress, &packet.buffer, eth_addr));

        match sent {
            Ok(()) => forwarded += 1,
            Err(err) => warn!(
                "Error forwarding packet queued for {}: {}.",
                pending.ipv4_addr, err
            ),
        }
    }

    forwarded
}
