//! Connection registry: who is connected, their pending input batches, and
//! the outbound line channels feeding the per-connection writer tasks.

use std::collections::HashMap;

use log::warn;
use tokio::sync::mpsc;

use shared::{ActionKind, PlayerAction};

/// Stable internal identity of a connection. Monotonic and never reused, so
/// a task holding a stale id can only miss, never touch the wrong peer.
pub type SlotId = u64;

/// One connected peer. The position of the entry inside the registry is the
/// player's wire index; the slot id is the handle the tasks hold.
#[derive(Debug)]
pub struct Connection {
    slot: SlotId,
    batch: HashMap<ActionKind, PlayerAction>,
    reported: bool,
    sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    fn new(slot: SlotId, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            slot,
            batch: HashMap::new(),
            reported: false,
            sender,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Merges a batched update into the pending batch. Only the most recent
    /// action of each kind survives until the next drain.
    pub fn merge_actions(&mut self, actions: Vec<PlayerAction>) {
        for action in actions {
            self.batch.insert(action.kind(), action);
        }
        self.reported = true;
    }

    /// Takes the pending batch in fixed kind order and resets the report
    /// flag for the next tick.
    pub fn drain_batch(&mut self) -> Vec<PlayerAction> {
        let drained = ActionKind::ALL
            .iter()
            .filter_map(|kind| self.batch.remove(kind))
            .collect();
        self.reported = false;
        drained
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }

    /// Queues a line for the writer task. Returns false when the writer is
    /// gone, which the caller treats like any other disconnect.
    pub fn send_line(&self, line: String) -> bool {
        self.sender.send(line).is_ok()
    }
}

/// All live connections, in wire-index order.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    next_slot: SlotId,
    capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: Vec::new(),
            next_slot: 0,
            capacity,
        }
    }

    /// Admits a connection into the next free wire index, or `None` at
    /// capacity.
    pub fn add(&mut self, sender: mpsc::UnboundedSender<String>) -> Option<SlotId> {
        if self.connections.len() >= self.capacity {
            return None;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.connections.push(Connection::new(slot, sender));
        Some(slot)
    }

    /// Removes a connection, returning the wire index it held. Later entries
    /// shift down, which is exactly how peers reinterpret indices after a
    /// `PLAYER_LEFT`.
    pub fn remove(&mut self, slot: SlotId) -> Option<usize> {
        let index = self.index_of(slot)?;
        self.connections.remove(index);
        Some(index)
    }

    /// Current wire index of a slot.
    pub fn index_of(&self, slot: SlotId) -> Option<usize> {
        self.connections.iter().position(|c| c.slot == slot)
    }

    pub fn connection_mut(&mut self, slot: SlotId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.slot == slot)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Whether every connection has reported a batch since the last drain.
    /// Vacuously true when nobody is connected.
    pub fn all_reported(&self) -> bool {
        self.connections.iter().all(Connection::has_reported)
    }

    /// Slots that have not reported this tick, for the stall watchdog.
    pub fn unreported_slots(&self) -> Vec<SlotId> {
        self.connections
            .iter()
            .filter(|c| !c.has_reported())
            .map(|c| c.slot)
            .collect()
    }

    /// Drains every pending batch in wire-index order.
    pub fn drain_all(&mut self) -> Vec<(SlotId, Vec<PlayerAction>)> {
        self.connections
            .iter_mut()
            .map(|c| (c.slot, c.drain_batch()))
            .collect()
    }

    /// Queues a line to every connection, optionally skipping one (the
    /// originator of the event being relayed). A failed send is logged and
    /// left for the disconnect path to clean up.
    pub fn broadcast(&self, line: &str, exclude: Option<SlotId>) {
        for connection in &self.connections {
            if Some(connection.slot) == exclude {
                continue;
            }
            if !connection.send_line(line.to_string()) {
                warn!("dropping outbound line for dead connection {}", connection.slot);
            }
        }
    }

    /// Queues a line to a single connection. Returns false when the
    /// connection is gone or its writer has shut down.
    pub fn send_to(&self, slot: SlotId, line: &str) -> bool {
        match self.connections.iter().find(|c| c.slot == slot) {
            Some(connection) => connection.send_line(line.to_string()),
            None => false,
        }
    }

    pub fn slots_in_order(&self) -> Vec<SlotId> {
        self.connections.iter().map(|c| c.slot).collect()
    }
}
