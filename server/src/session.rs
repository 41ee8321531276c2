//! Game session controller: lobby/roster management, the start transition,
//! and the routing of drained actions into the authoritative world.

use log::{info, warn};

use shared::{Layout, Message, PlayerAction, PlayerRecord, World, MIN_PLAYERS};

use crate::registry::SlotId;

/// Lifecycle of a session. One-way: `Lobby -> Started -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Lobby,
    Started,
    Ended,
}

/// The session state machine. Owns the world once the game starts; the
/// session loop is its only caller, so no internal locking.
#[derive(Debug)]
pub struct Session {
    phase: SessionPhase,
    layout: Layout,
    roster: Vec<(SlotId, Option<PlayerRecord>)>,
    seats: Vec<SlotId>,
    world: Option<World>,
    capacity: usize,
}

impl Session {
    pub fn new(layout: Layout, capacity: usize) -> Self {
        Self {
            phase: SessionPhase::Lobby,
            layout,
            roster: Vec::new(),
            seats: Vec::new(),
            world: None,
            capacity,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Whether a new connection may join: lobby phase and below capacity.
    pub fn can_accept(&self) -> bool {
        self.phase == SessionPhase::Lobby && self.roster.len() < self.capacity
    }

    /// Reserves a roster entry for an admitted connection. The player record
    /// arrives later with its `NEW_PLAYER`.
    pub fn connection_opened(&mut self, slot: SlotId) {
        self.roster.push((slot, None));
    }

    /// Records the joining player's announcement and returns the roster
    /// snapshot (everyone who has announced so far, in wire order) for the
    /// `ALL_PLAYERS` reply.
    pub fn player_joined(&mut self, slot: SlotId, record: PlayerRecord) -> Vec<PlayerRecord> {
        match self.roster.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = Some(record),
            None => warn!("join from unknown connection {}", slot),
        }
        self.joined_records()
    }

    fn joined_records(&self) -> Vec<PlayerRecord> {
        self.roster
            .iter()
            .filter_map(|(_, record)| record.clone())
            .collect()
    }

    /// Attempts the lobby-to-started transition. Requires every connection
    /// to have announced its player and the minimum head count; refuses
    /// otherwise. On success the seating order is frozen: seat position is
    /// the player's wire index for the rest of the game.
    pub fn try_start(&mut self) -> bool {
        if self.phase != SessionPhase::Lobby {
            return false;
        }
        if self.roster.len() < MIN_PLAYERS || self.roster.iter().any(|(_, r)| r.is_none()) {
            info!(
                "start refused: {} connected, {} announced",
                self.roster.len(),
                self.joined_records().len()
            );
            return false;
        }
        self.seats = self.roster.iter().map(|(slot, _)| *slot).collect();
        self.world = Some(World::new(&self.layout, &self.joined_records()));
        self.phase = SessionPhase::Started;
        info!("game started with {} players", self.seats.len());
        true
    }

    /// The frozen wire index of a connection once the game has started.
    pub fn seat_of(&self, slot: SlotId) -> Option<usize> {
        self.seats.iter().position(|s| *s == slot)
    }

    /// Validates one drained action against the world. Returns the message
    /// to rebroadcast when the action was accepted.
    pub fn apply_action(&mut self, slot: SlotId, action: &PlayerAction) -> Option<Message> {
        if self.phase != SessionPhase::Started {
            return None;
        }
        let index = self.seat_of(slot)?;
        let world = self.world.as_mut()?;
        match *action {
            PlayerAction::Translate { dx, dy } => world
                .translate_player(index, dx, dy, true)
                .then_some(Message::PlayerTranslate { index, dx, dy }),
            PlayerAction::Rotate { angle } => {
                world.rotate_player(index, angle);
                Some(Message::PlayerRotate { index, angle })
            }
            PlayerAction::Shoot => world
                .player_shoot(index)
                .map(|_| Message::PlayerShoot { index }),
        }
    }

    /// Steps projectiles and resolves their collisions for one tick.
    pub fn advance_world(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.advance_transient_elements();
        }
    }

    /// Handles a departed connection. In the lobby the roster entry is
    /// removed and later entries shift down; in a started game the player is
    /// deactivated in place. Returns the wire index to announce in
    /// `PLAYER_LEFT`, when there is one. Ends the session when nobody is
    /// left connected.
    ///
    /// Peers only ever see announced players, so the lobby index counts
    /// announced entries, and an opened-but-unannounced departure yields
    /// nothing to broadcast.
    pub fn connection_closed(&mut self, slot: SlotId, remaining: usize) -> Option<usize> {
        let index = match self.phase {
            SessionPhase::Lobby => match self.roster.iter().position(|(s, _)| *s == slot) {
                Some(position) => {
                    let announced = self.roster[position].1.is_some();
                    let wire_index = self.roster[..position]
                        .iter()
                        .filter(|(_, record)| record.is_some())
                        .count();
                    self.roster.remove(position);
                    announced.then_some(wire_index)
                }
                None => None,
            },
            SessionPhase::Started => match self.seat_of(slot) {
                Some(seat) => {
                    if let Some(world) = self.world.as_mut() {
                        world.deactivate_player(seat);
                    }
                    Some(seat)
                }
                None => None,
            },
            SessionPhase::Ended => None,
        };
        if remaining == 0 {
            self.phase = SessionPhase::Ended;
            info!("last connection closed, session over");
        }
        index
    }
}
