//! # World Client Library
//!
//! Client-side network synchronization for a shared block world. The library
//! keeps one local actor, any number of remote actors, and the block layout
//! in step with an authoritative server.
//!
//! ## Architecture Overview
//!
//! A single [`Session`] owns all session state and is driven from one task.
//! Sockets are read and written by helper tasks that only move frames; every
//! decision happens when the owner awaits [`Session::poll`].
//!
//! ### Server Authority
//! The client never predicts. Each `actorState` for the local actor replaces
//! the local position and yaw outright, and block deltas echoed back for the
//! local actor are ignored because they were already applied locally.
//!
//! ### Snapshot Interpolation
//! Remote actors are rendered a fixed delay in the past. Each keeps a small
//! time-ordered buffer of server snapshots and is drawn at a blend of the two
//! snapshots around the render time.
//!
//! ### Connection Recovery
//! Unexpected closes schedule a bounded number of fixed-delay reconnects.
//! An explicit disconnect never reconnects; an explicit connect always starts
//! with a full retry budget.
//!
//! ## Module Organization
//!
//! - [`connection`]: transport lifecycle, framing and reconnect policy
//! - [`session`]: the orchestrator tying everything to the host
//! - [`dispatch`]: routes each inbound message to exactly one handler
//! - [`remote`]: snapshot buffers and interpolation for remote actors
//! - [`reconcile`]: server overwrite of the local actor
//! - [`input`] and [`latency`]: the two periodic uplinks
//! - [`world`] and [`events`]: contracts with the host application
//! - [`cadence`], [`clock`] and [`config`]: timing and settings
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::{MemoryWorld, Session, SessionConfig};
//!
//! # async fn run() {
//! let config = SessionConfig::new("127.0.0.1:8080", Some("plaza".to_string()));
//! let mut session = Session::new(config, MemoryWorld::new());
//! session.connect();
//!
//! loop {
//!     session.poll().await;
//!     session.update_remote_actors(1.0 / 60.0);
//! }
//! # }
//! ```

pub mod cadence;
pub mod clock;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod events;
pub mod input;
pub mod latency;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SessionConfig, TimestampSource};
pub use connection::{ConnectionEvent, ConnectionState, SessionConnection, SessionError};
pub use events::{SessionEvents, SessionMode};
pub use input::InputUpdate;
pub use session::Session;
pub use world::{ActorVisuals, BlockWorld, LocalAvatar, MemoryWorld, Pose, SessionHost};
