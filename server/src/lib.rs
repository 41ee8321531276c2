//! # Arena Server Library
//!
//! Authoritative host for the toroidal multiplayer arena. The server owns the
//! only `World` that matters: every state-changing client action is validated
//! against it before being accepted and rebroadcast, so a client can never
//! talk itself into a position the collision rules forbid.
//!
//! ## Core Responsibilities
//!
//! ### Admission and roster
//! Connections are admitted while the session is in the lobby and below
//! capacity; anyone else is told `REJECTED` and closed. Each admitted
//! connection occupies one roster slot whose position doubles as the player's
//! wire index.
//!
//! ### Input aggregation
//! Each connection has a reader task that classifies incoming lines.
//! `PLAYER_UPDATE` batches are merged into a per-connection pending batch,
//! keeping only the most recent action of each kind; everything else is
//! forwarded to the session loop as an immediate event.
//!
//! ### Tick scheduling
//! Once the game starts, ticks are paced by a rendezvous: the scheduler waits
//! until every connection has reported a batch (with a bounded timeout that
//! drops stalled connections), enforces the minimum tick period, drains the
//! batches in wire order through validation, rebroadcasts the accepted
//! events, and closes the tick with `END_PLAYER_UPDATE`.
//!
//! ## Concurrency
//!
//! One accept task, one reader task and one writer task per connection, and
//! the session loop. They meet in the shared [`registry::ConnectionRegistry`]
//! behind an `RwLock` and an mpsc event channel into the session loop. The
//! world itself has a single mutator (the session loop) and needs no lock.
//! Per-connection writer tasks drain an ordered channel, so two broadcasts
//! arrive at every destination in the order they were issued.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::{Layout, MIN_TICK_INTERVAL};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layout = Layout {
//!         width: 1000,
//!         height: 1000,
//!         spawns: vec![(20, 20), (20, 320), (320, 20)],
//!         obstacles: Vec::new(),
//!     };
//!     let mut server = Server::bind("127.0.0.1:5000", MIN_TICK_INTERVAL, 10, layout).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod registry;
pub mod session;
