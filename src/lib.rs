//! # Mudcore - Live-Session Core for a Text-Based Multiplayer World
//!
//! Mudcore tracks which players occupy which rooms, lets them act on shared
//! objects and on each other, and tells every player about the world events
//! relevant to them, while many sessions run concurrently against shared rooms.
//!
//! ## Features
//!
//! - **Rooms as tasks**: Every room owns its occupants, objects and exits and is the
//!   only context that mutates them. Other tasks enqueue requests on its mailbox.
//! - **Serialized interaction queue**: `take` and `drop` for a room are resolved one at a
//!   time by that room, so two players racing for the same object never both win.
//! - **Stimuli and perception**: Room events fan out to occupants through a per-kind
//!   perception table (you never hear about your own arrival).
//! - **Bounded queues everywhere**: Command queues, stimulus inboxes and room queues are
//!   bounded and double as backpressure valves, with a configurable delivery policy.
//! - **Sled persistence**: Player records are created or loaded at session start.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudcore::config::Config;
//! use mudcore::mud::{SledPlayerStore, World};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = SledPlayerStore::open(&config.storage.data_dir)?;
//!     let world = World::new(config.clone(), Arc::new(store));
//!     world.build_default().await?;
//!     mudcore::net::serve(world, &config.server.bind).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`mud`] - Rooms, players, stimuli, the interaction queue and the world registry
//! - [`net`] - TCP line adapter that turns sockets into session connections
//! - [`config`] - Configuration management and validation
//! - [`metrics`] - Process-wide counters
//! - [`logutil`] - Log sanitising for user-typed text
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   net::serve    │ ← TCP sockets → Connection (lines in, text out)
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  World          │ ← Registry task, id allocator, session accept
//! └─────────────────┘
//!          │
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Player session │───→│  Room tasks     │ ← owner (membership, take/drop)
//! │  (intake, exec, │←───│                 │   + fan-out (stimuli)
//! │   delivery)     │    └─────────────────┘
//! └─────────────────┘
//! ```

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod mud;
pub mod net;
