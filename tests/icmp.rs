#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;

mod context;

use srouter::core::repr::{
    ipv4_protocols,
    EthernetFrame,
    Icmpv4DestinationUnreachable,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Packet,
    Ipv4Repr,
};
use srouter::core::service::{
    DropReason,
    Icmpv4Error,
    Outcome,
};

use context::*;

static PING_DATA: &[u8] = b"abcdefghijklmnopqrstuvwabcdefghi";

fn ping_frame(dst_interface_ipv4: srouter::core::repr::Ipv4Address, id: u16, seq: u16) -> Vec<u8> {
    echo_request_frame(
        *HOST1_ETH_ADDR,
        ETH1.ethernet_addr,
        *HOST1_IPV4_ADDR,
        dst_interface_ipv4,
        id,
        seq,
        PING_DATA,
    )
}

#[test]
fn echo_request_yields_one_reply() {
    let context = context();

    for &(id, seq) in &[(0x1234, 1), (0xFFFF, 0xFFFF), (0, 0)] {
        let frame = ping_frame(ETH1.ipv4_addr, id, seq);
        assert_eq!(context.recv(&frame, "eth1"), Outcome::Replied);

        let sent = context.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ifr_name, "eth1");

        let eth_frame = EthernetFrame::try_new(&sent[0].buffer[..]).unwrap();
        assert_eq!(eth_frame.dst_addr(), *HOST1_ETH_ADDR);
        assert_eq!(eth_frame.src_addr(), ETH1.ethernet_addr);

        let (ipv4_repr, icmp_repr, data) = parse_icmpv4(&sent[0].buffer);
        assert_eq!(ipv4_repr.src_addr, ETH1.ipv4_addr);
        assert_eq!(ipv4_repr.dst_addr, *HOST1_IPV4_ADDR);
        assert_eq!(ipv4_repr.ttl, 64);
        assert_eq!(icmp_repr, Icmpv4Repr::EchoReply { id, seq });
        assert_eq!(&data[..], PING_DATA);
    }
}

#[test]
fn echo_request_to_other_router_address() {
    let context = context();

    let frame = ping_frame(ETH3.ipv4_addr, 7, 7);
    assert_eq!(context.recv(&frame, "eth1"), Outcome::Replied);

    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ifr_name, "eth1");

    let (ipv4_repr, _, _) = parse_icmpv4(&sent[0].buffer);
    assert_eq!(ipv4_repr.src_addr, ETH3.ipv4_addr);
    assert_eq!(ipv4_repr.dst_addr, *HOST1_IPV4_ADDR);
}

#[test]
fn corrupted_echo_request_is_dropped() {
    let context = context();

    let mut frame = ping_frame(ETH1.ipv4_addr, 1, 1);
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;

    assert_eq!(
        context.recv(&frame, "eth1"),
        Outcome::Dropped(DropReason::Checksum)
    );
    assert!(context.sent().is_empty());
}

#[test]
fn other_icmp_to_router_is_ignored() {
    let context = context();

    let mut icmp_buffer = vec![0; Icmpv4Packet::<&[u8]>::buffer_len(4)];
    {
        let mut icmp_packet = Icmpv4Packet::try_new(&mut icmp_buffer[..]).unwrap();
        Icmpv4Repr::EchoReply { id: 1, seq: 1 }
            .serialize(&mut icmp_packet)
            .unwrap();
    }

    let ipv4_repr = Ipv4Repr {
        src_addr: *HOST1_IPV4_ADDR,
        dst_addr: ETH1.ipv4_addr,
        protocol: ipv4_protocols::ICMP,
        ttl: 64,
        identification: 9,
        payload_len: icmp_buffer.len(),
    };
    let frame = ipv4_frame(*HOST1_ETH_ADDR, ETH1.ethernet_addr, &ipv4_repr, &icmp_buffer);

    assert_eq!(context.recv(&frame, "eth1"), Outcome::Ignored);
    assert!(context.sent().is_empty());
}

#[test]
fn udp_to_router_yields_port_unreachable() {
    let context = context();

    let frame = udp_frame(
        *HOST1_ETH_ADDR,
        ETH1.ethernet_addr,
        *HOST1_IPV4_ADDR,
        ETH2.ipv4_addr,
        64,
        &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
    );
    assert_eq!(
        context.recv(&frame, "eth1"),
        Outcome::Unreachable(Icmpv4Error::PortUnreachable)
    );

    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ifr_name, "eth1");

    let (ipv4_repr, icmp_repr, quote) = parse_icmpv4(&sent[0].buffer);
    // Sourced from the address the datagram was sent to.
    assert_eq!(ipv4_repr.src_addr, ETH2.ipv4_addr);
    assert_eq!(ipv4_repr.dst_addr, *HOST1_IPV4_ADDR);
    assert_eq!(ipv4_repr.protocol, ipv4_protocols::ICMP);
    assert_eq!(ipv4_repr.ttl, 64);
    assert_matches!(
        icmp_repr,
        Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::PortUnreachable,
            payload_len: 28,
        }
    );

    let original = EthernetFrame::try_new(&frame[..]).unwrap();
    let original = Ipv4Packet::try_new(original.payload()).unwrap();
    assert_eq!(&quote[.. 20], original.header());
    assert_eq!(&quote[20 ..], &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn error_quote_is_bounded_by_datagram() {
    let context = context();

    let frame = udp_frame(
        *HOST1_ETH_ADDR,
        ETH1.ethernet_addr,
        *HOST1_IPV4_ADDR,
        *UNROUTABLE_IPV4_ADDR,
        64,
        &[0xAB, 0xCD, 0xEF],
    );
    assert_eq!(
        context.recv(&frame, "eth1"),
        Outcome::Unreachable(Icmpv4Error::NetUnreachable)
    );

    let sent = context.sent();
    let (ipv4_repr, icmp_repr, quote) = parse_icmpv4(&sent[0].buffer);
    // Transit datagrams are rejected from the ingress interface.
    assert_eq!(ipv4_repr.src_addr, ETH1.ipv4_addr);
    assert_matches!(
        icmp_repr,
        Icmpv4Repr::DestinationUnreachable {
            payload_len: 23,
            ..
        }
    );
    assert_eq!(quote.len(), 23);
    assert_eq!(&quote[20 ..], &[0xAB, 0xCD, 0xEF]);
}

#[test]
fn ttl_check_precedes_local_delivery() {
    let context = context();

    let ipv4_repr = Ipv4Repr {
        src_addr: *HOST1_IPV4_ADDR,
        dst_addr: ETH2.ipv4_addr,
        protocol: ipv4_protocols::UDP,
        ttl: 1,
        identification: 5,
        payload_len: 8,
    };
    let frame = ipv4_frame(*HOST1_ETH_ADDR, ETH1.ethernet_addr, &ipv4_repr, &[0; 8]);

    assert_eq!(
        context.recv(&frame, "eth1"),
        Outcome::Unreachable(Icmpv4Error::TtlExceeded)
    );

    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    let (reply_repr, icmp_repr, _) = parse_icmpv4(&sent[0].buffer);
    assert_eq!(reply_repr.src_addr, ETH2.ipv4_addr);
    assert_matches!(icmp_repr, Icmpv4Repr::TimeExceeded { .. });
}
