//! Bounded registry of time servers seen
//!
//! Fixed-capacity arena keyed by reference identifier. Insert-or-update,
//! never evict: once the arena is full, previously unseen servers are
//! silently dropped and the first-come slots keep their place for the
//! process lifetime. Capacity and eviction policy are behavioral contracts.

/// Maximum number of servers tracked.
pub const REGISTRY_CAPACITY: usize = 10;

/// One tracked server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerRecord {
    /// Reference identifier from the reply (identity key).
    pub reference_id: [u8; 4],
    /// Last advertised poll interval, in seconds (unclamped).
    pub poll_secs: u64,
    /// Local epoch second of the last accepted exchange.
    pub last_poll_epoch: u64,
}

/// Fixed-capacity, append-or-update server arena.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    slots: [Option<ServerRecord>; REGISTRY_CAPACITY],
}

impl ServerRegistry {
    pub fn new() -> Self {
        ServerRegistry::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// Look up a server by reference id.
    pub fn get(&self, reference_id: &[u8; 4]) -> Option<&ServerRecord> {
        self.slots
            .iter()
            .flatten()
            .find(|r| r.reference_id == *reference_id)
    }

    /// Record an accepted exchange: update the matching record in place, or
    /// take the first free slot. Returns false when the server is unknown and
    /// the arena is full (the observation is dropped).
    pub fn observe(&mut self, reference_id: [u8; 4], poll_secs: u64, epoch: u64) -> bool {
        for slot in self.slots.iter_mut() {
            match slot {
                Some(record) if record.reference_id == reference_id => {
                    record.poll_secs = poll_secs;
                    record.last_poll_epoch = epoch;
                    return true;
                }
                Some(_) => continue,
                None => {
                    *slot = Some(ServerRecord {
                        reference_id,
                        poll_secs,
                        last_poll_epoch: epoch,
                    });
                    return true;
                }
            }
        }
        tracing::debug!(?reference_id, "registry full, new server dropped");
        false
    }

    /// Iterate occupied slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ServerRecord> {
        self.slots.iter().flatten()
    }
}
