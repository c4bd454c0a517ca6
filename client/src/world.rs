//! Contracts with the world and rendering collaborators, plus an in-memory
//! implementation for headless clients.

use crate::events::{SessionEvents, SessionMode};
use log::info;
use protocol::{ActorState, BlockPlacement, BlockPosition, Vec3, WorldSnapshot};
use std::collections::HashMap;

/// A rendered position and yaw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: f32,
}

impl Pose {
    pub fn new(position: Vec3, rotation: f32) -> Self {
        Self { position, rotation }
    }
}

impl From<&ActorState> for Pose {
    fn from(state: &ActorState) -> Self {
        Self::new(state.position, state.rotation)
    }
}

/// Block storage owned by the world collaborator.
pub trait BlockWorld {
    fn place_block_from_network(&mut self, block: &BlockPlacement);
    /// Returns `true` when a block existed and was removed.
    fn remove_block_at(&mut self, position: BlockPosition) -> bool;
    fn clear_all_blocks(&mut self);
}

/// The locally controlled actor. Setters are expected to re-sync anything
/// that follows the actor, such as the camera.
pub trait LocalAvatar {
    fn local_actor_position(&self) -> Vec3;
    fn set_local_actor_position(&mut self, position: Vec3);
    fn set_local_actor_rotation(&mut self, yaw: f32);
}

/// Visual representations of remote actors.
pub trait ActorVisuals {
    type Handle;

    fn create_remote_actor_visual(
        &mut self,
        actor_id: &str,
        initial: &ActorState,
        color: &str,
    ) -> Self::Handle;
    fn update_remote_actor_visual(&mut self, handle: &mut Self::Handle, pose: Pose);
    fn dispose_remote_actor_visual(&mut self, handle: Self::Handle);
}

/// Everything a session needs from its surroundings.
pub trait SessionHost: BlockWorld + LocalAvatar + ActorVisuals + SessionEvents {}

impl<T: BlockWorld + LocalAvatar + ActorVisuals + SessionEvents> SessionHost for T {}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVisual {
    pub color: String,
    pub pose: Pose,
}

/// A headless world: blocks in a map, actors as plain poses.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    blocks: HashMap<BlockPosition, BlockPlacement>,
    local_position: Vec3,
    local_rotation: f32,
    visuals: HashMap<String, RemoteVisual>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_at(&self, position: BlockPosition) -> Option<&BlockPlacement> {
        self.blocks.get(&position)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn local_rotation(&self) -> f32 {
        self.local_rotation
    }

    pub fn visual(&self, actor_id: &str) -> Option<&RemoteVisual> {
        self.visuals.get(actor_id)
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    /// Applies a locally originated placement, as the editor would before
    /// telling the server.
    pub fn place_local(&mut self, block: BlockPlacement) {
        self.blocks.insert(block.position, block);
    }
}

impl BlockWorld for MemoryWorld {
    fn place_block_from_network(&mut self, block: &BlockPlacement) {
        self.blocks.insert(block.position, block.clone());
    }

    fn remove_block_at(&mut self, position: BlockPosition) -> bool {
        self.blocks.remove(&position).is_some()
    }

    fn clear_all_blocks(&mut self) {
        self.blocks.clear();
    }
}

impl LocalAvatar for MemoryWorld {
    fn local_actor_position(&self) -> Vec3 {
        self.local_position
    }

    fn set_local_actor_position(&mut self, position: Vec3) {
        self.local_position = position;
    }

    fn set_local_actor_rotation(&mut self, yaw: f32) {
        self.local_rotation = yaw;
    }
}

impl ActorVisuals for MemoryWorld {
    type Handle = String;

    fn create_remote_actor_visual(
        &mut self,
        actor_id: &str,
        initial: &ActorState,
        color: &str,
    ) -> String {
        self.visuals.insert(
            actor_id.to_string(),
            RemoteVisual {
                color: color.to_string(),
                pose: Pose::from(initial),
            },
        );
        actor_id.to_string()
    }

    fn update_remote_actor_visual(&mut self, handle: &mut String, pose: Pose) {
        if let Some(visual) = self.visuals.get_mut(handle.as_str()) {
            visual.pose = pose;
        }
    }

    fn dispose_remote_actor_visual(&mut self, handle: String) {
        self.visuals.remove(&handle);
    }
}

impl SessionEvents for MemoryWorld {
    fn on_mode_changed(&mut self, mode: SessionMode) {
        info!("Session mode: {:?}", mode);
    }

    fn on_join_error(&mut self, message: &str) {
        info!("Join rejected: {}", message);
    }

    fn on_actor_joined(&mut self, actor_id: &str, _state: &ActorState, color: &str) {
        info!("{} joined ({})", actor_id, color);
    }

    fn on_actor_left(&mut self, actor_id: &str) {
        info!("{} left", actor_id);
    }

    fn on_world_state(&mut self, world: &WorldSnapshot) {
        info!(
            "World {} loaded with {} blocks",
            world.world_id,
            world.blocks.len()
        );
    }

    fn on_world_saved(&mut self, success: bool, message: Option<&str>) {
        info!("World saved: {} {}", success, message.unwrap_or(""));
    }
}
