//! # Arena Client Library
//!
//! Client-side networking and state mirroring for the toroidal arena. The
//! client holds a mirror of the server's world and keeps it consistent by
//! replaying the events the server has already validated: its own inputs are
//! only ever submitted as batched updates, never applied locally ahead of
//! the server's verdict.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The connection boundary: joins the session, submits batched input, and
//! decodes the server's line stream into typed messages.
//!
//! ### Game Module (`game`)
//! The mirror state: roster bookkeeping in the lobby, then a `World` replica
//! that applies validated remote events unconditionally (the server already
//! checked them) and advances projectiles on each end-of-tick marker.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGameState;
//! use client::network::Client;
//! use shared::{Layout, PlayerAction};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layout = Layout {
//!         width: 1000,
//!         height: 1000,
//!         spawns: vec![(20, 20), (20, 320)],
//!         obstacles: Vec::new(),
//!     };
//!     let mut client = Client::connect("127.0.0.1:5000").await?;
//!     let mut state = ClientGameState::new(layout);
//!
//!     client.join("alice", "images/red.png").await?;
//!     while let Some(message) = client.next_message().await? {
//!         state.apply(&message);
//!         if state.started() {
//!             client.send_update(&[PlayerAction::Shoot]).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
