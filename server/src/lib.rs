//! # Terminal Chess Server Library
//!
//! Multiplayer chess played from a plain terminal. Clients connect with a
//! byte stream, send an identity line, and are paired into games. Every game
//! redraws the whole board to each of its players several times a second.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking
//! Players either ask for a game by name (`alice#room`) or are paired with
//! the first public game that is waiting for an opponent. Games that empty
//! out are removed and their tasks stopped.
//!
//! ### Authoritative Rules
//! Legality and game outcome come from a rules engine (`shakmaty`). The UI
//! board is only changed after the engine accepts a move, and is reconciled
//! with the engine afterwards so castling, en passant and promotion show up
//! correctly.
//!
//! ### Rendering
//! Frames are composed in full on every redraw and written in one go after a
//! clear-screen sequence. There is no diffing.
//!
//! ## Architecture Design
//!
//! ### Tasks per Game
//! - **Hub**: owns the session set; handles register, unregister and redraw
//!   requests one at a time
//! - **Update loop**: 60 Hz, feeds each player its latest key
//! - **Redraw loop**: 10 Hz, starts the game once two players are in and asks
//!   the hub to redraw
//! - **Redraw proxy**: forwards "redraw now" requests into the hub
//!
//! ### Tasks per Connection
//! One input task decodes keys from the client stream. When the stream ends
//! or the player quits, it evicts the session from its game.
//!
//! ### Shared State
//! Board, overlay and engine sit behind one `RwLock`. The update loop takes
//! it exclusively and renders share it.
//!
//! ## Module Organization
//!
//! - `game_manager`: admission, registries, eviction
//! - `game`: per-game state, lifecycle and loops
//! - `hub`: session set actor
//! - `player`: cursor and selection state machine
//! - `session`: output stream plus player
//! - `input`: key decoding and edge detection
//! - `rules`: rules engine trait and its `shakmaty` implementation
//! - `render`: frame composition
//! - `recorder`: best-effort game history
//! - `network`: TCP listener and identity handshake
//! - `config`: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::game_manager::GameManager;
//! use server::network::Server;
//! use server::recorder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let recorder = Arc::from(recorder::from_config(&config.recorder));
//!     let manager = GameManager::new(config.game.clone(), recorder);
//!
//!     // Connect with `telnet 127.0.0.1 2222`
//!     let server = Server::bind(&config, manager).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod game_manager;
pub mod hub;
pub mod input;
pub mod network;
pub mod player;
pub mod recorder;
pub mod render;
pub mod rules;
pub mod session;
pub mod utils;
