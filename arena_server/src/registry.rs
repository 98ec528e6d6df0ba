//! Outbound queues of live sessions.
//!
//! The simulation loop never writes to sockets itself. It hands each
//! session's writer task a cheap `Bytes` clone of the encoded frame; a
//! session whose queue is full simply misses that frame.

use std::collections::HashMap;

use arena_shared::character::CharacterId;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Frames skipped because the session's queue was full.
    pub dropped: usize,
    /// Sessions whose writer has already gone away.
    pub closed: usize,
}

#[derive(Default)]
pub struct SessionRegistry {
    outbound: RwLock<HashMap<CharacterId, mpsc::Sender<Bytes>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: CharacterId, tx: mpsc::Sender<Bytes>) {
        self.outbound.write().insert(id, tx);
    }

    /// Drops the session's sender. Returns whether it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        self.outbound.write().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outbound.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.outbound.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `frame` for every registered session without waiting.
    pub fn broadcast(&self, frame: &Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (id, tx) in self.outbound.read().iter() {
            match tx.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    debug!(character_id = %id, "Outbound queue full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => report.closed += 1,
            }
        }
        report
    }
}
