//! IPv4 to Ethernet address resolution state.
//!
//! The cache holds resolved mappings and, for every address still being
//! resolved, a pending request with the packets waiting on it. The packet path
//! and the periodic sweep both operate on the cache, so all state lives behind
//! one lock and each public operation is a single critical section.

use std::collections::HashMap;
use std::sync::{
    Mutex,
    MutexGuard,
};
use std::time::{
    Duration,
    Instant,
};

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::core::time::{
    Env,
    SystemEnv,
};

/// Timing parameters for an ARP cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpCacheConfig {
    /// How long a resolved mapping stays valid.
    pub entry_lifetime: Duration,
    /// Minimum time between two ARP requests for the same address.
    pub retry_interval: Duration,
    /// Number of ARP requests sent before giving up on an address.
    pub max_attempts: usize,
}

impl Default for ArpCacheConfig {
    fn default() -> ArpCacheConfig {
        ArpCacheConfig {
            entry_lifetime: Duration::from_secs(15),
            retry_interval: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// A packet waiting for its next hop to be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedPacket {
    /// The complete Ethernet frame as it was received.
    pub buffer: Vec<u8>,
    /// Interface the frame was received on.
    pub ingress: String,
    /// Interface the frame should be forwarded on.
    pub egress: String,
}

/// An ARP request the caller should transmit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpRequest {
    pub target_proto_addr: Ipv4Address,
    pub ifr_name: String,
}

/// An address being resolved along with the packets waiting on it.
#[derive(Debug)]
pub struct PendingRequest {
    pub ipv4_addr: Ipv4Address,
    /// Interface ARP requests are broadcast on.
    pub ifr_name: String,
    /// Number of ARP requests sent so far.
    pub attempts: usize,
    pub last_sent_at: Instant,
    /// Packets in the order they were enqueued.
    pub packets: Vec<QueuedPacket>,
}

/// Work produced by a sweep of the cache.
#[derive(Debug, Default)]
pub struct Sweep {
    /// ARP requests due for retransmission.
    pub retransmit: Vec<ArpRequest>,
    /// Pending requests that ran out of attempts; every queued packet is
    /// owed a host unreachable error.
    pub exhausted: Vec<PendingRequest>,
    /// Number of resolved mappings that expired.
    pub expired_entries: usize,
}

struct Entry {
    eth_addr: EthernetAddress,
    in_cache_since: Instant,
}

struct Table {
    entries: HashMap<Ipv4Address, Entry>,
    pending: HashMap<Ipv4Address, PendingRequest>,
}

/// Maintains an expiring set of IPv4 -> Ethernet address mappings and the
/// requests that are still resolving.
pub struct ArpCache<T = SystemEnv>
where
    T: Env,
{
    table: Mutex<Table>,
    config: ArpCacheConfig,
    time_env: T,
}

impl<T: Env> ArpCache<T> {
    /// Creates an empty ARP cache.
    pub fn new(config: ArpCacheConfig, time_env: T) -> ArpCache<T> {
        ArpCache {
            table: Mutex::new(Table {
                entries: HashMap::new(),
                pending: HashMap::new(),
            }),
            config,
            time_env,
        }
    }

    pub fn config(&self) -> &ArpCacheConfig {
        &self.config
    }

    fn table(&self) -> MutexGuard<Table> {
        // A panic while holding the lock leaves the table consistent; every
        // mutation below completes before the guard drops.
        match self.table.lock() {
            Ok(guard) => guard,
            Err(err) => err.into_inner(),
        }
    }

    /// Lookup the Ethernet address for an IPv4 address.
    ///
    /// Mappings older than the entry lifetime are never returned, even before
    /// a sweep reclaims them.
    pub fn lookup(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        let table = self.table();
        let now = self.time_env.now_instant();

        table
            .entries
            .get(&ipv4_addr)
            .filter(|entry| now.saturating_duration_since(entry.in_cache_since) <= self.config.entry_lifetime)
            .map(|entry| entry.eth_addr)
    }

    /// Create or update the Ethernet address mapping for an IPv4 address.
    ///
    /// If packets are waiting on the address their pending request is removed
    /// and handed to the caller, who becomes responsible for sending them.
    pub fn insert(
        &self,
        eth_addr: EthernetAddress,
        ipv4_addr: Ipv4Address,
    ) -> Option<PendingRequest> {
        let mut table = self.table();
        let in_cache_since = self.time_env.now_instant();

        table.entries.insert(
            ipv4_addr,
            Entry {
                eth_addr,
                in_cache_since,
            },
        );

        table.pending.remove(&ipv4_addr)
    }

    /// Queues a packet until an IPv4 address is resolved.
    ///
    /// Returns the first ARP request to transmit when no request for the
    /// address was outstanding, or None if the packet joined an existing one.
    pub fn enqueue(&self, ipv4_addr: Ipv4Address, packet: QueuedPacket) -> Option<ArpRequest> {
        let mut table = self.table();

        if let Some(pending) = table.pending.get_mut(&ipv4_addr) {
            pending.packets.push(packet);
            return None;
        }

        let request = ArpRequest {
            target_proto_addr: ipv4_addr,
            ifr_name: packet.egress.clone(),
        };

        table.pending.insert(
            ipv4_addr,
            PendingRequest {
                ipv4_addr,
                ifr_name: packet.egress.clone(),
                attempts: 1,
                last_sent_at: self.time_env.now_instant(),
                packets: vec![packet],
            },
        );

        Some(request)
    }

    /// Advances retransmission state and purges expired mappings.
    ///
    /// Each pending request whose last ARP request is at least one retry
    /// interval old is either due for another attempt, or, once all attempts
    /// are spent, removed and returned as exhausted.
    pub fn sweep(&self) -> Sweep {
        let mut table = self.table();
        let now = self.time_env.now_instant();
        let config = self.config;
        let mut sweep = Sweep::default();

        let mut exhausted = Vec::new();

        for (ipv4_addr, pending) in table.pending.iter_mut() {
            if now.saturating_duration_since(pending.last_sent_at) < config.retry_interval {
                continue;
            }

            if pending.attempts < config.max_attempts {
                pending.attempts += 1;
                pending.last_sent_at = now;
                sweep.retransmit.push(ArpRequest {
                    target_proto_addr: *ipv4_addr,
                    ifr_name: pending.ifr_name.clone(),
                });
            } else {
                exhausted.push(*ipv4_addr);
            }
        }

        for ipv4_addr in exhausted {
            if let Some(pending) = table.pending.remove(&ipv4_addr) {
                sweep.exhausted.push(pending);
            }
        }

        let before = table.entries.len();
        table
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.in_cache_since) <= config.entry_lifetime);
        sweep.expired_entries = before - table.entries.len();

        sweep
    }

    /// Returns the number of addresses with a pending request.
    pub fn pending_len(&self) -> usize {
        self.table().pending.len()
    }
}
