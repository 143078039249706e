//! Packet processing services for different network layers.
//!
//! The `service` module holds the router and the per-layer handlers it runs
//! every received frame through. Handlers propagate faults with `?`; the
//! router converts whatever comes back into an `Outcome`.

pub mod arp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;
pub mod sweeper;

use std::sync::Arc;

use crate::core::arp_cache::{
    ArpCache,
    ArpCacheConfig,
};
use crate::core::dev::{
    Device,
    Error as DevError,
};
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::core::route_table::RouteTable;
use crate::core::time::{
    Env,
    SystemEnv,
};
use crate::{
    Error,
    Result,
};

/// A router interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    /// Name the transport knows the interface by.
    pub name: String,
    /// Ethernet address for the interface.
    pub ethernet_addr: EthernetAddress,
    /// IPv4 address for the interface.
    pub ipv4_addr: Ipv4Address,
}

/// The ICMP errors a router generates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icmpv4Error {
    NetUnreachable,
    HostUnreachable,
    PortUnreachable,
    TtlExceeded,
}

/// Why a frame was discarded without a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Shorter than the headers it claims to carry.
    Truncated,
    /// Inconsistent header fields.
    Malformed,
    /// Failed checksum validation.
    Checksum,
}

/// What the router did with a received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An ARP reply or ICMP echo reply was sent.
    Replied,
    /// The packet was forwarded towards its next hop.
    Forwarded,
    /// The packet is waiting on ARP resolution of its next hop.
    Enqueued,
    /// An ARP reply resolved a pending request and its packets were sent.
    Resolved { forwarded: usize },
    /// An ARP reply updated the cache with nothing waiting on it.
    Learned,
    /// An ICMP error was sent back to the packet's source.
    Unreachable(Icmpv4Error),
    /// A well formed frame the router does not act on.
    Ignored,
    /// A frame discarded as untrustworthy.
    Dropped(DropReason),
}

/// Work done by one sweep of the ARP cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// ARP requests sent again.
    pub retransmitted: usize,
    /// Pending requests that ran out of attempts.
    pub expired_requests: usize,
    /// Host unreachable errors sent for packets queued on expired requests.
    pub unreachable_sent: usize,
    /// Resolved mappings that aged out.
    pub expired_entries: usize,
}

/// A static router over a set of interfaces sharing one device.
///
/// Interfaces and routes are fixed at construction. The ARP cache is the only
/// mutable state and synchronizes internally, so a router can be shared
/// between the packet path and a `Sweeper`.
pub struct Router<T = SystemEnv>
where
    T: Env,
{
    interfaces: Vec<Interface>,
    route_table: RouteTable,
    arp_cache: ArpCache<T>,
    dev: Arc<dyn Device>,
}

impl<T: Env> Router<T> {
    pub fn new(
        interfaces: Vec<Interface>,
        route_table: RouteTable,
        arp_cache_config: ArpCacheConfig,
        dev: Arc<dyn Device>,
        time_env: T,
    ) -> Router<T> {
        Router {
            interfaces,
            route_table,
            arp_cache: ArpCache::new(arp_cache_config, time_env),
            dev,
        }
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.route_table
    }

    pub fn arp_cache(&self) -> &ArpCache<T> {
        &self.arp_cache
    }

    /// Returns the interface with a name.
    pub fn interface(&self, ifr_name: &str) -> Option<&Interface> {
        self.interfaces
            .iter()
            .find(|interface| interface.name == ifr_name)
    }

    /// Returns the interface owning an IPv4 address, if the address is one
    /// of the router's own.
    pub fn owner(&self, ipv4_addr: Ipv4Address) -> Option<&Interface> {
        self.interfaces
            .iter()
            .find(|interface| interface.ipv4_addr == ipv4_addr)
    }

    /// Hands a frame to the device. Failures are logged and otherwise
    /// ignored.
    pub(crate) fn send(&self, buffer: &[u8], ifr_name: &str) {
        trace!("Sending {} byte frame via {}.", buffer.len(), ifr_name);
        if let Err(err) = self.dev.send(buffer, ifr_name) {
            warn!("Error sending frame via {}: {:?}.", ifr_name, err);
        }
    }

    /// Processes a single frame received on an interface.
    pub fn recv_frame(&self, buffer: &[u8], ifr_name: &str) -> Outcome {
        let ingress = match self.interface(ifr_name) {
            Some(ingress) => ingress,
            None => {
                debug!("Ignoring frame from unknown interface {}.", ifr_name);
                return Outcome::Ignored;
            }
        };

        trace!("Received {} byte frame via {}.", buffer.len(), ifr_name);

        match ethernet::recv_frame(self, ingress, buffer) {
            Ok(outcome) => outcome,
            Err(Error::Ignored) => Outcome::Ignored,
            Err(Error::Exhausted) => Outcome::Dropped(DropReason::Truncated),
            Err(Error::Malformed) => Outcome::Dropped(DropReason::Malformed),
            Err(Error::Checksum) => Outcome::Dropped(DropReason::Checksum),
            Err(err) => {
                warn!("Error processing frame from {}: {}.", ifr_name, err);
                Outcome::Ignored
            }
        }
    }

    /// Processes every frame currently available from the device.
    pub fn recv(&self) -> Result<Vec<Outcome>> {
        let mut buffer = vec![0; self.dev.max_transmission_unit()];
        let mut outcomes = Vec::new();

        loop {
            match self.dev.recv(&mut buffer) {
                Ok((buffer_len, ifr_name)) => {
                    let outcome = self.recv_frame(&buffer[.. buffer_len], &ifr_name);
                    debug!("Frame via {}: {:?}.", ifr_name, outcome);
                    outcomes.push(outcome);
                }
                Err(DevError::Nothing) | Err(DevError::Busy) => return Ok(outcomes),
                Err(DevError::Overflow) => warn!("Discarding frame larger than the MTU."),
                Err(err) => return Err(Error::Device(err)),
            }
        }
    }

    /// Processes frames until the device fails.
    pub fn run(&self) -> Result<()> {
        info!(
            "Routing between {} interfaces with {} routes.",
            self.interfaces.len(),
            self.route_table.len()
        );

        loop {
            self.recv()?;
        }
    }

    /// Runs one sweep of the ARP cache, retransmitting due ARP requests and
    /// answering every packet of an exhausted request with host unreachable.
    pub fn sweep(&self) -> SweepReport {
        let sweep = self.arp_cache.sweep();
        let mut report = SweepReport {
            expired_requests: sweep.exhausted.len(),
            expired_entries: sweep.expired_entries,
            ..SweepReport::default()
        };

        for request in &sweep.retransmit {
            match arp::send_request(self, request) {
                Ok(()) => report.retransmitted += 1,
                Err(err) => warn!(
                    "Error retransmitting ARP request for {}: {}.",
                    request.target_proto_addr, err
                ),
            }
        }

        for pending in sweep.exhausted {
            info!(
                "No ARP reply for {} after {} attempts, dropping {} packets.",
                pending.ipv4_addr,
                pending.attempts,
                pending.packets.len()
            );

            for packet in &pending.packets {
                let sent = self
                    .interface(&packet.ingress)
                    .ok_or(Error::Ignored)
                    .and_then(|ingress| {
                        icmpv4::send_error(self, ingress, &packet.buffer, Icmpv4Error::HostUnreachable)
                    });

                match sent {
                    Ok(()) => report.unreachable_sent += 1,
                    Err(err) => warn!("Error sending host unreachable: {}.", err),
                }
            }
        }

        if report != SweepReport::default() {
            debug!("ARP cache sweep: {:?}.", report);
        }

        report
    }
}
