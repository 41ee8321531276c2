//! Client-side mirror of the session: lobby roster, then a world replica
//! driven by the server's validated event stream.

use log::warn;

use shared::{Layout, Message, PlayerRecord, World};

/// The client's view of the session. Remote events are applied without
/// re-validation; the server already checked them, and re-checking here
/// could only disagree through drift.
pub struct ClientGameState {
    layout: Layout,
    roster: Vec<PlayerRecord>,
    world: Option<World>,
    server_addr: Option<String>,
    rejected: bool,
}

impl ClientGameState {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            roster: Vec::new(),
            world: None,
            server_addr: None,
            rejected: false,
        }
    }

    pub fn roster(&self) -> &[PlayerRecord] {
        &self.roster
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn started(&self) -> bool {
        self.world.is_some()
    }

    pub fn rejected(&self) -> bool {
        self.rejected
    }

    /// The address the server advertises for other players to join at.
    pub fn server_addr(&self) -> Option<&str> {
        self.server_addr.as_deref()
    }

    /// Folds one server message into the mirror.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::NewPlayer(record) => self.roster.push(record.clone()),
            Message::AllPlayers(records) => self.roster = records.clone(),
            Message::PlayerLeft { index } => self.player_left(*index),
            Message::ServerIp { addr } => self.server_addr = Some(addr.clone()),
            Message::StartGame => {
                self.world = Some(World::new(&self.layout, &self.roster));
            }
            Message::PlayerTranslate { index, dx, dy } => {
                if let Some(world) = self.world.as_mut() {
                    if *index < world.players().len() {
                        world.translate_player(*index, *dx, *dy, false);
                    } else {
                        warn!("translate for unknown player {}", index);
                    }
                }
            }
            Message::PlayerRotate { index, angle } => {
                if let Some(world) = self.world.as_mut() {
                    if *index < world.players().len() {
                        world.rotate_player(*index, *angle);
                    } else {
                        warn!("rotate for unknown player {}", index);
                    }
                }
            }
            Message::PlayerShoot { index } => {
                if let Some(world) = self.world.as_mut() {
                    if *index < world.players().len() {
                        world.spawn_projectile(*index);
                    } else {
                        warn!("shot from unknown player {}", index);
                    }
                }
            }
            Message::EndPlayerUpdate => {
                if let Some(world) = self.world.as_mut() {
                    world.advance_transient_elements();
                }
            }
            Message::Rejected => self.rejected = true,
            // Client-to-server only; a server never sends these.
            Message::PlayerUpdate(_) => warn!("unexpected batched update from server"),
        }
    }

    fn player_left(&mut self, index: usize) {
        match self.world.as_mut() {
            // Mid-game: the seat stays, the player goes inert.
            Some(world) => {
                if index < world.players().len() {
                    world.deactivate_player(index);
                }
            }
            // Lobby: the entry disappears and later indices shift down.
            None => {
                if index < self.roster.len() {
                    self.roster.remove(index);
                }
            }
        }
    }
}
