//! Simulation and protocol core shared by the server and client.
//!
//! The world is a torus: coordinates wrap at the map width and height, and
//! the collision engine in [`bounds`] tests seam-crossing extents against
//! translated copies so entities on opposite sides of the seam still meet.
//! The server owns the authoritative [`world::World`]; clients keep a mirror
//! of it and replay validated events received over the [`protocol`].

pub mod bounds;
pub mod element;
pub mod player;
pub mod protocol;
pub mod world;

pub use bounds::{RectBounds, Torus, WorldRect};
pub use element::{Element, Projectile, StaticObstacle};
pub use player::Player;
pub use protocol::{ActionKind, Message, PlayerAction, PlayerRecord, ProtocolError};
pub use world::{Hit, Layout, World};

use std::time::Duration;

pub const MAP_WIDTH: i32 = 1000;
pub const MAP_HEIGHT: i32 = 1000;

pub const MAX_PLAYERS: usize = 10;
pub const MIN_PLAYERS: usize = 2;

pub const PLAYER_SIZE: i32 = 30;
pub const PLAYER_SPEED: i32 = 5;
pub const MAX_HEALTH: i32 = 100;

pub const BULLET_SIZE: i32 = 5;
pub const BULLET_SPEED: i32 = 15;
pub const BULLET_DAMAGE: i32 = 5;

/// Minimum time between shots from one player.
pub const RELOAD_INTERVAL: Duration = Duration::from_millis(500);

/// Floor of the tick period; a tick never completes faster than this.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How long the tick barrier waits for a silent connection before dropping it.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(2);
