//! Slot table: numeric slot allocation and two-peer pairing
//!
//! Direct generalization of the teacher's `room::{Room, RoomManager}`
//! from content-addressed `RoomId([u8; 32])` keys to the spec's
//! monotonically-assigned decimal slot ids with a free-list pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use latch_protocol::slot::SlotId;
use tokio::sync::mpsc;

/// A value forwarded from one peer's socket to its paired peer.
#[derive(Debug, Clone)]
pub enum PeerFrame {
    /// An opaque text frame, forwarded byte-for-byte.
    Text(String),
    /// The sending peer's socket closed with this WebSocket close code;
    /// forwarded so the paired socket can close with the same or an
    /// equivalent code (§4.2's close-propagation rule).
    Close(u16),
}

/// Channel for sending a frame or close notice to a peer's socket.
pub type PeerSender = mpsc::Sender<PeerFrame>;
/// Channel for receiving a frame or close notice from the paired peer.
pub type PeerReceiver = mpsc::Receiver<PeerFrame>;

/// A slot's pairing state.
enum SlotState {
    /// One socket connected, waiting for the second.
    AwaitingPeer { sender: PeerSender },
    /// Both sockets connected and forwarding to each other.
    Paired { sender_a: PeerSender, sender_b: PeerSender },
    /// A `BadKey` frame was observed on this slot: locked, single-guess
    /// enforcement, never reused even if both sockets have since closed.
    Closed,
}

struct Slot {
    state: SlotState,
    created_at: Instant,
    paired_at: Option<Instant>,
    last_activity: Instant,
}

impl Slot {
    fn new(sender: PeerSender) -> Self {
        let now = Instant::now();
        Self {
            state: SlotState::AwaitingPeer { sender },
            created_at: now,
            paired_at: None,
            last_activity: now,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Errors from slot table operations.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    /// The named slot does not exist (never created, expired, or closed).
    #[error("no such slot")]
    NoSuchSlot,
    /// A slot already has two paired sockets.
    #[error("slot is full")]
    SlotFull,
    /// The slot pool is exhausted.
    #[error("no slots available")]
    NoMoreSlots,
}

/// Tracks every live slot and the free pool of numeric ids to reuse once a
/// slot closes cleanly (not via `BadKey`, which permanently retires the id
/// for the lifetime of the process — matching the single-guess model: once
/// retired an id is never handed out again, trading a finite id space for
/// the guarantee that a passphrase can be tried at most once).
pub struct SlotTable {
    slots: DashMap<SlotId, Slot>,
    free_ids: Mutex<VecDeque<u64>>,
    next_id: AtomicU64,
    max_slots: usize,
    idle_deadline: Duration,
    handshake_deadline: Duration,
}

impl SlotTable {
    /// Build a new, empty slot table.
    pub fn new(max_slots: usize, idle_deadline: Duration, handshake_deadline: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            free_ids: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(0),
            max_slots,
            idle_deadline,
            handshake_deadline,
        }
    }

    fn allocate_id(&self) -> Result<SlotId, SlotError> {
        if let Some(id) = self.free_ids.lock().unwrap().pop_front() {
            return Ok(SlotId(id));
        }
        if self.slots.len() >= self.max_slots {
            return Err(SlotError::NoMoreSlots);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if id as usize >= self.max_slots {
            return Err(SlotError::NoMoreSlots);
        }
        Ok(SlotId(id))
    }

    /// Create a new slot for the first socket to connect without naming one.
    /// Returns the assigned id and the receiver half this socket reads from.
    pub fn create(&self) -> Result<(SlotId, PeerReceiver), SlotError> {
        let id = self.allocate_id()?;
        let (tx, rx) = mpsc::channel(64);
        self.slots.insert(id, Slot::new(tx));
        Ok((id, rx))
    }

    /// Join an existing slot as its second socket, pairing it. Returns the
    /// receiver half this socket reads from.
    pub fn join(&self, id: SlotId) -> Result<PeerReceiver, SlotError> {
        let mut entry = self.slots.get_mut(&id).ok_or(SlotError::NoSuchSlot)?;
        match &entry.state {
            SlotState::Closed => Err(SlotError::NoSuchSlot),
            SlotState::Paired { .. } => Err(SlotError::SlotFull),
            SlotState::AwaitingPeer { sender } => {
                let sender_a = sender.clone();
                let (tx_b, rx_b) = mpsc::channel(64);
                entry.state = SlotState::Paired {
                    sender_a,
                    sender_b: tx_b,
                };
                entry.paired_at = Some(Instant::now());
                entry.touch();
                Ok(rx_b)
            }
        }
    }

    /// Get the sender for the other socket in a paired slot, from the
    /// perspective of `is_first` (true = the socket that created the slot).
    pub fn peer_sender(&self, id: SlotId, is_first: bool) -> Option<PeerSender> {
        let entry = self.slots.get(&id)?;
        match &entry.state {
            SlotState::Paired { sender_a, sender_b } => {
                Some(if is_first { sender_b.clone() } else { sender_a.clone() })
            }
            _ => None,
        }
    }

    /// Record activity on a slot (extends its idle deadline).
    pub fn touch(&self, id: SlotId) {
        if let Some(mut slot) = self.slots.get_mut(&id) {
            slot.touch();
        }
    }

    /// Permanently retire a slot after an authentication failure. The id is
    /// never returned to the free pool.
    pub fn lock_bad_key(&self, id: SlotId) {
        if let Some(mut slot) = self.slots.get_mut(&id) {
            slot.state = SlotState::Closed;
        }
    }

    /// Close a slot normally (peer hangup, successful completion, or
    /// timeout) and return its id to the free pool for reuse.
    pub fn close(&self, id: SlotId) {
        if let Entry::Occupied(entry) = self.slots.entry(id) {
            let was_locked = matches!(entry.get().state, SlotState::Closed);
            entry.remove();
            if !was_locked {
                self.free_ids.lock().unwrap().push_back(id.0);
            }
        }
    }

    /// Sweep slots past their idle or handshake deadline, closing them.
    /// Returns the number of slots removed.
    pub fn cleanup_stale(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        for entry in self.slots.iter() {
            let id = *entry.key();
            let slot = entry.value();
            let idle_expired = now.duration_since(slot.last_activity) > self.idle_deadline;
            let handshake_expired = matches!(slot.state, SlotState::Paired { .. })
                && slot
                    .paired_at
                    .map(|t| now.duration_since(t) > self.handshake_deadline)
                    .unwrap_or(false);
            if idle_expired || handshake_expired {
                expired.push(id);
            }
        }

        for id in &expired {
            self.close(*id);
        }
        expired.len()
    }

    /// Number of live slots, for tests and metrics.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SlotTable {
        SlotTable::new(4, Duration::from_secs(60), Duration::from_secs(45))
    }

    #[test]
    fn create_then_join_pairs_the_slot() {
        let t = table();
        let (id, _rx_a) = t.create().unwrap();
        let _rx_b = t.join(id).unwrap();
        assert!(t.peer_sender(id, true).is_some());
        assert!(t.peer_sender(id, false).is_some());
    }

    #[test]
    fn joining_a_full_slot_fails() {
        let t = table();
        let (id, _rx_a) = t.create().unwrap();
        let _rx_b = t.join(id).unwrap();
        assert!(matches!(t.join(id), Err(SlotError::SlotFull)));
    }

    #[test]
    fn joining_unknown_slot_fails() {
        let t = table();
        assert!(matches!(t.join(SlotId(999)), Err(SlotError::NoSuchSlot)));
    }

    #[test]
    fn pool_exhaustion_yields_no_more_slots() {
        let t = SlotTable::new(2, Duration::from_secs(60), Duration::from_secs(45));
        t.create().unwrap();
        t.create().unwrap();
        assert!(matches!(t.create(), Err(SlotError::NoMoreSlots)));
    }

    #[test]
    fn closed_slot_id_is_reused() {
        let t = SlotTable::new(1, Duration::from_secs(60), Duration::from_secs(45));
        let (id, _rx) = t.create().unwrap();
        t.close(id);
        let (id2, _rx2) = t.create().unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn bad_key_lock_retires_id_permanently() {
        let t = SlotTable::new(1, Duration::from_secs(60), Duration::from_secs(45));
        let (id, _rx) = t.create().unwrap();
        t.lock_bad_key(id);
        t.close(id);
        assert!(matches!(t.create(), Err(SlotError::NoMoreSlots)));
    }

    #[test]
    fn cleanup_removes_idle_slots() {
        let t = SlotTable::new(4, Duration::from_millis(0), Duration::from_secs(45));
        t.create().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(t.cleanup_stale(), 1);
        assert_eq!(t.len(), 0);
    }
}
