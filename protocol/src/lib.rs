//! Wire protocol shared between the world client and the world server.
//!
//! Everything that crosses the connection lives here: the value types carried
//! by messages, the two closed message sets ([`ClientPacket`] upstream,
//! [`ServerPacket`] downstream) and the framing codec in [`codec`].

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod codec;

pub use codec::{CodecError, WireFormat, MAX_FRAME_LEN};

pub const INPUT_SEND_INTERVAL_MS: u64 = 50;
pub const PING_INTERVAL_MS: u64 = 1000;
pub const INTERPOLATION_DELAY_MS: u64 = 100;
pub const SNAPSHOT_BUFFER_CAPACITY: usize = 10;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_DELAY_MS: u64 = 2000;
pub const DEFAULT_ACTOR_COLOR: &str = "#ffffff";

/// Current wall-clock time in milliseconds since the unix epoch.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Per-axis linear interpolation, `t = 0` yields `self`.
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        Vec3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn distance(self, other: Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Kinematic state of one actor as the server sees it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActorState {
    pub position: Vec3,
    /// Yaw in radians.
    pub rotation: f32,
    pub velocity: Vec3,
    pub is_moving: bool,
    pub is_grounded: bool,
}

impl ActorState {
    pub fn at(position: Vec3, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }
}

/// Integer grid coordinates of a block cell.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A block placement delta.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlacement {
    pub position: BlockPosition,
    pub structure_id: String,
    /// Quarter turns around the vertical axis.
    pub rotation: u8,
    pub material: Option<String>,
}

/// Full block content of a world, sent once on join.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub world_id: String,
    pub blocks: Vec<BlockPlacement>,
}

/// The local actor's current intent, resent on every uplink tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub descend: bool,
    pub sprint: bool,
    pub hover: bool,
    pub camera_yaw: f32,
}

/// Messages sent by the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientPacket {
    Join { world_id: String },
    Input { inputs: InputState, timestamp: u64 },
    BlockPlaced { block: BlockPlacement },
    BlockRemoved { position: BlockPosition },
    WorldReset,
    WorldSave,
    Ping { timestamp: u64 },
}

impl ClientPacket {
    pub fn tag(&self) -> &'static str {
        match self {
            ClientPacket::Join { .. } => "join",
            ClientPacket::Input { .. } => "input",
            ClientPacket::BlockPlaced { .. } => "blockPlaced",
            ClientPacket::BlockRemoved { .. } => "blockRemoved",
            ClientPacket::WorldReset => "worldReset",
            ClientPacket::WorldSave => "worldSave",
            ClientPacket::Ping { .. } => "ping",
        }
    }
}

/// Messages sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerPacket {
    Welcome {
        actor_id: String,
        color: String,
        state: ActorState,
        world: WorldSnapshot,
    },
    JoinError {
        message: String,
    },
    ActorJoined {
        actor_id: String,
        state: ActorState,
        color: String,
    },
    ActorLeft {
        actor_id: String,
    },
    ActorState {
        actor_id: String,
        state: ActorState,
        timestamp: u64,
    },
    BlockPlaced {
        actor_id: String,
        block: BlockPlacement,
    },
    BlockRemoved {
        actor_id: String,
        position: BlockPosition,
    },
    WorldReset {
        actor_id: String,
    },
    WorldSaved {
        success: bool,
        message: Option<String>,
    },
    Pong {
        timestamp: u64,
    },
}

impl ServerPacket {
    pub fn tag(&self) -> &'static str {
        match self {
            ServerPacket::Welcome { .. } => "welcome",
            ServerPacket::JoinError { .. } => "joinError",
            ServerPacket::ActorJoined { .. } => "actorJoined",
            ServerPacket::ActorLeft { .. } => "actorLeft",
            ServerPacket::ActorState { .. } => "actorState",
            ServerPacket::BlockPlaced { .. } => "blockPlaced",
            ServerPacket::BlockRemoved { .. } => "blockRemoved",
            ServerPacket::WorldReset { .. } => "worldReset",
            ServerPacket::WorldSaved { .. } => "worldSaved",
            ServerPacket::Pong { .. } => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vec3_lerp() {
        let a = Vec3::new(0.0, 2.0, -4.0);
        let b = Vec3::new(10.0, 4.0, 4.0);
        let mid = a.lerp(b, 0.5);
        assert_approx_eq!(mid.x, 5.0);
        assert_approx_eq!(mid.y, 3.0);
        assert_approx_eq!(mid.z, 0.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 6.0, 3.0);
        assert_approx_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn test_actor_state_at() {
        let state = ActorState::at(Vec3::new(1.0, 2.0, 3.0), 0.5);
        assert_eq!(state.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.rotation, 0.5);
        assert_eq!(state.velocity, Vec3::ZERO);
        assert!(!state.is_moving);
        assert!(!state.is_grounded);
    }

    #[test]
    fn test_join_packet_json_shape() {
        let packet = ClientPacket::Join {
            world_id: "plaza".to_string(),
        };
        let json = serde_json::to_string(&packet).unwrap();
        assert_eq!(json, r#"{"join":{"worldId":"plaza"}}"#);
    }

    #[test]
    fn test_unit_packets_json_shape() {
        assert_eq!(
            serde_json::to_string(&ClientPacket::WorldSave).unwrap(),
            r#""worldSave""#
        );
        assert_eq!(
            serde_json::to_string(&ClientPacket::WorldReset).unwrap(),
            r#""worldReset""#
        );
    }

    #[test]
    fn test_actor_state_packet_json_fields() {
        let json = r#"{"actorState":{"actorId":"p7","timestamp":1234,
            "state":{"position":{"x":1.0,"y":2.0,"z":3.0},"rotation":0.25,
            "velocity":{"x":0.0,"y":0.0,"z":0.0},"isMoving":true,"isGrounded":false}}}"#;
        let packet: ServerPacket = serde_json::from_str(json).unwrap();

        match packet {
            ServerPacket::ActorState {
                actor_id,
                state,
                timestamp,
            } => {
                assert_eq!(actor_id, "p7");
                assert_eq!(timestamp, 1234);
                assert_eq!(state.position, Vec3::new(1.0, 2.0, 3.0));
                assert_approx_eq!(state.rotation, 0.25);
                assert!(state.is_moving);
                assert!(!state.is_grounded);
            }
            other => panic!("Wrong packet type: {}", other.tag()),
        }
    }

    #[test]
    fn test_world_saved_optional_message() {
        let json = r#"{"worldSaved":{"success":false,"message":null}}"#;
        let packet: ServerPacket = serde_json::from_str(json).unwrap();
        assert_eq!(
            packet,
            ServerPacket::WorldSaved {
                success: false,
                message: None
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let json = r#"{"teleport":{"actorId":"p1"}}"#;
        assert!(serde_json::from_str::<ServerPacket>(json).is_err());
    }

    #[test]
    fn test_packet_serialization_welcome_bincode() {
        let packet = ServerPacket::Welcome {
            actor_id: "p1".to_string(),
            color: "#ff8800".to_string(),
            state: ActorState::at(Vec3::new(4.0, 5.0, 6.0), 1.0),
            world: WorldSnapshot {
                world_id: "plaza".to_string(),
                blocks: vec![BlockPlacement {
                    position: BlockPosition::new(1, 0, -1),
                    structure_id: "stone".to_string(),
                    rotation: 2,
                    material: Some("granite".to_string()),
                }],
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: ServerPacket = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, packet);
    }

    #[test]
    fn test_packet_tags() {
        assert_eq!(ClientPacket::Ping { timestamp: 1 }.tag(), "ping");
        assert_eq!(
            ServerPacket::ActorLeft {
                actor_id: "x".into()
            }
            .tag(),
            "actorLeft"
        );
    }

    #[test]
    fn test_get_timestamp() {
        let timestamp1 = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        let timestamp2 = get_timestamp();
        assert!(timestamp2 > timestamp1);
    }
}
