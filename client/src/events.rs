//! Host-facing notifications and the session's connection mode.

use protocol::{ActorState, BlockPlacement, BlockPosition, WorldSnapshot};

/// What the host should present, stated rather than inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Connected, but no world was requested.
    NoWorld,
    /// Opening or re-opening the transport, or waiting for `welcome`.
    Connecting,
    /// Joined a world; the server is authoritative.
    Joined,
    /// Server unreachable and no reconnect pending; the host runs locally.
    Offline,
}

/// Host callbacks, one per session event. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait SessionEvents {
    fn on_mode_changed(&mut self, mode: SessionMode) {}
    fn on_connected(&mut self) {}
    fn on_disconnected(&mut self, reason: &str) {}
    fn on_join_error(&mut self, message: &str) {}
    fn on_actor_joined(&mut self, actor_id: &str, state: &ActorState, color: &str) {}
    fn on_actor_left(&mut self, actor_id: &str) {}
    fn on_actor_state(&mut self, actor_id: &str, state: &ActorState) {}
    fn on_block_placed(&mut self, actor_id: &str, block: &BlockPlacement) {}
    fn on_block_removed(&mut self, actor_id: &str, position: BlockPosition) {}
    fn on_world_reset(&mut self, actor_id: &str) {}
    fn on_world_state(&mut self, world: &WorldSnapshot) {}
    fn on_world_saved(&mut self, success: bool, message: Option<&str>) {}
}
