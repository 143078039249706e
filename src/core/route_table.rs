//! Static IPv4 routing with longest prefix match.

use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};

use crate::core::repr::Ipv4Address;

/// A static route towards a destination network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    /// Destination network.
    pub destination: Ipv4Address,
    /// Subnet mask of the destination network.
    pub mask: Ipv4Address,
    /// Next hop, or 0.0.0.0 if the destination network is directly attached.
    pub gateway: Ipv4Address,
    /// Name of the interface to send packets for this route on.
    pub ifr_name: String,
}

impl RouteEntry {
    pub fn new(
        destination: Ipv4Address,
        mask: Ipv4Address,
        gateway: Ipv4Address,
        ifr_name: &str,
    ) -> RouteEntry {
        RouteEntry {
            destination,
            mask,
            gateway,
            ifr_name: String::from(ifr_name),
        }
    }

    /// Returns the number of leading one bits in the mask.
    pub fn prefix_len(&self) -> u32 {
        self.mask.as_u32().leading_ones()
    }

    /// Checks if an address lies in the destination network.
    pub fn is_member(&self, addr: Ipv4Address) -> bool {
        let mask = self.mask.as_u32();
        self.destination.as_u32() & mask == addr.as_u32() & mask
    }

    /// Returns the IPv4 address to resolve when forwarding a packet for dst_addr
    /// along this route.
    pub fn next_hop(&self, dst_addr: Ipv4Address) -> Ipv4Address {
        if self.gateway.is_unspecified() {
            dst_addr
        } else {
            self.gateway
        }
    }
}

impl Display for RouteEntry {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.destination,
            self.prefix_len(),
            self.gateway,
            self.ifr_name
        )
    }
}

/// An immutable set of routes, kept in the order they were loaded.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> RouteTable {
        RouteTable { entries }
    }

    /// Returns the most specific route for an address, if any.
    ///
    /// Among routes with equal prefix lengths the one loaded first wins. No
    /// route is implied; a table without a 0.0.0.0/0 entry has no default.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;

        for entry in self.entries.iter().filter(|entry| entry.is_member(addr)) {
            match best {
                Some(current) if current.prefix_len() >= entry.prefix_len() => {}
                _ => best = Some(entry),
            }
        }

        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
