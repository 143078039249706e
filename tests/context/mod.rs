#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use srouter::core::arp_cache::ArpCacheConfig;
use srouter::core::dev::{
    Buffered,
    TaggedFrame,
};
use srouter::core::repr::{
    eth_types,
    ipv4_protocols,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use srouter::core::route_table::{
    RouteEntry,
    RouteTable,
};
use srouter::core::service::{
    Interface,
    Outcome,
    Router,
};
use srouter::core::time::MockEnv;

lazy_static! {
    pub static ref ETH1: Interface = Interface {
        name: String::from("eth1"),
        ethernet_addr: EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x01]),
        ipv4_addr: Ipv4Address::new([10, 0, 1, 1]),
    };

    pub static ref ETH2: Interface = Interface {
        name: String::from("eth2"),
        ethernet_addr: EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x02]),
        ipv4_addr: Ipv4Address::new([10, 0, 2, 1]),
    };

    pub static ref ETH3: Interface = Interface {
        name: String::from("eth3"),
        ethernet_addr: EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x03]),
        ipv4_addr: Ipv4Address::new([172, 16, 0, 1]),
    };

    /// Gateway on eth2 for the rest of 10.0.0.0/8.
    pub static ref GATEWAY_IPV4_ADDR: Ipv4Address = Ipv4Address::new([10, 0, 2, 254]);

    pub static ref GATEWAY_ETH_ADDR: EthernetAddress =
        EthernetAddress::new([0x0A, 0x00, 0x00, 0x00, 0x02, 0xFE]);

    /// A host on the eth1 subnet.
    pub static ref HOST1_IPV4_ADDR: Ipv4Address = Ipv4Address::new([10, 0, 1, 5]);

    pub static ref HOST1_ETH_ADDR: EthernetAddress =
        EthernetAddress::new([0x0A, 0x00, 0x00, 0x00, 0x01, 0x05]);

    /// A host on the eth3 subnet.
    pub static ref HOST3_IPV4_ADDR: Ipv4Address = Ipv4Address::new([172, 16, 0, 9]);

    pub static ref HOST3_ETH_ADDR: EthernetAddress =
        EthernetAddress::new([0x0A, 0x00, 0x00, 0x00, 0x03, 0x09]);

    /// An address no route covers.
    pub static ref UNROUTABLE_IPV4_ADDR: Ipv4Address = Ipv4Address::new([192, 168, 7, 7]);
}

/// A router over an in-memory device and a manually advanced clock.
pub struct Context {
    pub router: Arc<Router<MockEnv>>,
    pub dev: Arc<Buffered>,
    pub time_env: MockEnv,
}

impl Context {
    /// Processes a frame as if it arrived on an interface.
    pub fn recv(&self, eth_buffer: &[u8], ifr_name: &str) -> Outcome {
        self.router.recv_frame(eth_buffer, ifr_name)
    }

    /// Returns every frame the router sent since the last call.
    pub fn sent(&self) -> Vec<TaggedFrame> {
        self.dev.take_sent()
    }

    pub fn advance(&self, duration: Duration) {
        self.time_env.advance(duration);
    }

    /// Teaches the router the Ethernet address of an IPv4 address.
    pub fn learn(&self, eth_addr: EthernetAddress, ipv4_addr: Ipv4Address) {
        self.router.arp_cache().insert(eth_addr, ipv4_addr);
    }
}

pub fn routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            Ipv4Address::new([10, 0, 0, 0]),
            Ipv4Address::new([255, 0, 0, 0]),
            *GATEWAY_IPV4_ADDR,
            "eth2",
        ),
        RouteEntry::new(
            Ipv4Address::new([10, 0, 1, 0]),
            Ipv4Address::new([255, 255, 255, 0]),
            Ipv4Address::UNSPECIFIED,
            "eth1",
        ),
        RouteEntry::new(
            Ipv4Address::new([172, 16, 0, 0]),
            Ipv4Address::new([255, 255, 0, 0]),
            Ipv4Address::UNSPECIFIED,
            "eth3",
        ),
    ]
}

pub fn context() -> Context {
    context_with_routes(routes())
}

pub fn context_with_routes(routes: Vec<RouteEntry>) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    let dev = Arc::new(Buffered::new(&["eth1", "eth2", "eth3"]));
    let time_env = MockEnv::new();

    let router = Router::new(
        vec![ETH1.clone(), ETH2.clone(), ETH3.clone()],
        RouteTable::new(routes),
        ArpCacheConfig::default(),
        dev.clone(),
        time_env.clone(),
    );

    Context {
        router: Arc::new(router),
        dev,
        time_env,
    }
}

/// Builds an Ethernet frame carrying an IPv4 packet.
pub fn ipv4_frame(
    src_eth_addr: EthernetAddress,
    dst_eth_addr: EthernetAddress,
    ipv4_repr: &Ipv4Repr,
    payload: &[u8],
) -> Vec<u8> {
    assert_eq!(ipv4_repr.payload_len, payload.len());

    let mut eth_buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(ipv4_repr.buffer_len())];
    {
        let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..]).unwrap();
        eth_frame.set_src_addr(src_eth_addr);
        eth_frame.set_dst_addr(dst_eth_addr);
        eth_frame.set_payload_type(eth_types::IPV4);
        ipv4_repr.serialize(eth_frame.payload_mut()).unwrap();
        let mut ipv4_packet = Ipv4Packet::try_new(eth_frame.payload_mut()).unwrap();
        ipv4_packet.payload_mut().copy_from_slice(payload);
    }
    eth_buffer
}

/// Builds a UDP-looking datagram; only the protocol number matters to the
/// router.
pub fn udp_frame(
    src_eth_addr: EthernetAddress,
    dst_eth_addr: EthernetAddress,
    src_addr: Ipv4Address,
    dst_addr: Ipv4Address,
    ttl: u8,
    payload: &[u8],
) -> Vec<u8> {
    let ipv4_repr = Ipv4Repr {
        src_addr,
        dst_addr,
        protocol: ipv4_protocols::UDP,
        ttl,
        identification: 0x1234,
        payload_len: payload.len(),
    };
    ipv4_frame(src_eth_addr, dst_eth_addr, &ipv4_repr, payload)
}

/// Builds an ICMP echo request.
pub fn echo_request_frame(
    src_eth_addr: EthernetAddress,
    dst_eth_addr: EthernetAddress,
    src_addr: Ipv4Address,
    dst_addr: Ipv4Address,
    id: u16,
    seq: u16,
    data: &[u8],
) -> Vec<u8> {
    let mut icmp_buffer = vec![0; Icmpv4Packet::<&[u8]>::buffer_len(data.len())];
    {
        let mut icmp_packet = Icmpv4Packet::try_new(&mut icmp_buffer[..]).unwrap();
        icmp_packet.payload_mut().copy_from_slice(data);
        Icmpv4Repr::EchoRequest { id, seq }
            .serialize(&mut icmp_packet)
            .unwrap();
    }

    let ipv4_repr = Ipv4Repr {
        src_addr,
        dst_addr,
        protocol: ipv4_protocols::ICMP,
        ttl: 64,
        identification: 0x4321,
        payload_len: icmp_buffer.len(),
    };
    ipv4_frame(src_eth_addr, dst_eth_addr, &ipv4_repr, &icmp_buffer)
}

/// Builds an Ethernet frame carrying an ARP packet.
pub fn arp_frame(arp_repr: &Arp, dst_eth_addr: EthernetAddress) -> Vec<u8> {
    let mut eth_buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(arp_repr.buffer_len())];
    {
        let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..]).unwrap();
        eth_frame.set_src_addr(arp_repr.source_hw_addr);
        eth_frame.set_dst_addr(dst_eth_addr);
        eth_frame.set_payload_type(eth_types::ARP);
        arp_repr.serialize(eth_frame.payload_mut()).unwrap();
    }
    eth_buffer
}

/// Builds an ARP reply announcing that ipv4_addr is at eth_addr.
pub fn arp_reply_frame(
    eth_addr: EthernetAddress,
    ipv4_addr: Ipv4Address,
    interface: &Interface,
) -> Vec<u8> {
    let arp_repr = Arp {
        op: ArpOp::Reply,
        source_hw_addr: eth_addr,
        source_proto_addr: ipv4_addr,
        target_hw_addr: interface.ethernet_addr,
        target_proto_addr: interface.ipv4_addr,
    };
    arp_frame(&arp_repr, interface.ethernet_addr)
}

/// Parses a sent frame as Ethernet + IPv4, checking the header checksum.
pub fn parse_ipv4(eth_buffer: &[u8]) -> (EthernetFrame<&[u8]>, Ipv4Repr) {
    let eth_frame = EthernetFrame::try_new(eth_buffer).unwrap();
    assert_eq!(eth_frame.payload_type(), eth_types::IPV4);
    let ipv4_repr = {
        let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload()).unwrap();
        ipv4_packet.check_encoding().unwrap();
        Ipv4Repr::deserialize(&ipv4_packet)
    };
    (eth_frame, ipv4_repr)
}

/// Parses a sent frame as an ICMP message, checking both checksums, and
/// returns it with the ICMP payload.
pub fn parse_icmpv4(eth_buffer: &[u8]) -> (Ipv4Repr, Icmpv4Repr, Vec<u8>) {
    let (eth_frame, ipv4_repr) = parse_ipv4(eth_buffer);
    assert_eq!(ipv4_repr.protocol, ipv4_protocols::ICMP);

    let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload()).unwrap();
    let icmp_packet = Icmpv4Packet::try_new(ipv4_packet.payload()).unwrap();
    icmp_packet.check_encoding().unwrap();

    (
        ipv4_repr,
        Icmpv4Repr::deserialize(&icmp_packet).unwrap(),
        icmp_packet.payload().to_vec(),
    )
}

/// Parses a sent frame as an ARP packet.
pub fn parse_arp(eth_buffer: &[u8]) -> (EthernetFrame<&[u8]>, Arp) {
    let eth_frame = EthernetFrame::try_new(eth_buffer).unwrap();
    assert_eq!(eth_frame.payload_type(), eth_types::ARP);
    let arp_repr = Arp::deserialize(eth_frame.payload()).unwrap();
    (eth_frame, arp_repr)
}
