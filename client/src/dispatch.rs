//! Routing of inbound packets to one handler method per tag.

use protocol::{ActorState, BlockPlacement, BlockPosition, ServerPacket, WorldSnapshot};

/// One method per inbound tag. There are no default bodies: an implementor
/// states what happens for every message the server can send.
pub trait InboundHandler {
    fn welcome(&mut self, actor_id: String, color: String, state: ActorState, world: WorldSnapshot);
    fn join_error(&mut self, message: String);
    fn actor_joined(&mut self, actor_id: String, state: ActorState, color: String);
    fn actor_left(&mut self, actor_id: String);
    fn actor_state(&mut self, actor_id: String, state: ActorState, timestamp: u64);
    fn block_placed(&mut self, actor_id: String, block: BlockPlacement);
    fn block_removed(&mut self, actor_id: String, position: BlockPosition);
    fn world_reset(&mut self, actor_id: String);
    fn world_saved(&mut self, success: bool, message: Option<String>);
    fn pong(&mut self, timestamp: u64);
}

pub fn dispatch<H: InboundHandler + ?Sized>(handler: &mut H, packet: ServerPacket) {
    match packet {
        ServerPacket::Welcome {
            actor_id,
            color,
            state,
            world,
        } => handler.welcome(actor_id, color, state, world),
        ServerPacket::JoinError { message } => handler.join_error(message),
        ServerPacket::ActorJoined {
            actor_id,
            state,
            color,
        } => handler.actor_joined(actor_id, state, color),
        ServerPacket::ActorLeft { actor_id } => handler.actor_left(actor_id),
        ServerPacket::ActorState {
            actor_id,
            state,
            timestamp,
        } => handler.actor_state(actor_id, state, timestamp),
        ServerPacket::BlockPlaced { actor_id, block } => handler.block_placed(actor_id, block),
        ServerPacket::BlockRemoved { actor_id, position } => {
            handler.block_removed(actor_id, position)
        }
        ServerPacket::WorldReset { actor_id } => handler.world_reset(actor_id),
        ServerPacket::WorldSaved { success, message } => handler.world_saved(success, message),
        ServerPacket::Pong { timestamp } => handler.pong(timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Vec3;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl InboundHandler for Recorder {
        fn welcome(&mut self, actor_id: String, color: String, _: ActorState, world: WorldSnapshot) {
            self.calls
                .push(format!("welcome {} {} {}", actor_id, color, world.world_id));
        }
        fn join_error(&mut self, message: String) {
            self.calls.push(format!("join_error {}", message));
        }
        fn actor_joined(&mut self, actor_id: String, _: ActorState, color: String) {
            self.calls.push(format!("actor_joined {} {}", actor_id, color));
        }
        fn actor_left(&mut self, actor_id: String) {
            self.calls.push(format!("actor_left {}", actor_id));
        }
        fn actor_state(&mut self, actor_id: String, state: ActorState, timestamp: u64) {
            self.calls.push(format!(
                "actor_state {} {} {}",
                actor_id, state.position.x, timestamp
            ));
        }
        fn block_placed(&mut self, actor_id: String, block: BlockPlacement) {
            self.calls
                .push(format!("block_placed {} {}", actor_id, block.structure_id));
        }
        fn block_removed(&mut self, actor_id: String, position: BlockPosition) {
            self.calls
                .push(format!("block_removed {} {}", actor_id, position.y));
        }
        fn world_reset(&mut self, actor_id: String) {
            self.calls.push(format!("world_reset {}", actor_id));
        }
        fn world_saved(&mut self, success: bool, message: Option<String>) {
            self.calls
                .push(format!("world_saved {} {:?}", success, message));
        }
        fn pong(&mut self, timestamp: u64) {
            self.calls.push(format!("pong {}", timestamp));
        }
    }

    #[test]
    fn test_every_tag_reaches_its_handler() {
        let packets = vec![
            ServerPacket::Welcome {
                actor_id: "me".into(),
                color: "#00ff00".into(),
                state: ActorState::default(),
                world: WorldSnapshot {
                    world_id: "plaza".into(),
                    blocks: vec![],
                },
            },
            ServerPacket::JoinError {
                message: "world full".into(),
            },
            ServerPacket::ActorJoined {
                actor_id: "p2".into(),
                state: ActorState::default(),
                color: "#0000ff".into(),
            },
            ServerPacket::ActorLeft {
                actor_id: "p2".into(),
            },
            ServerPacket::ActorState {
                actor_id: "p3".into(),
                state: ActorState::at(Vec3::new(7.0, 0.0, 0.0), 0.0),
                timestamp: 99,
            },
            ServerPacket::BlockPlaced {
                actor_id: "p3".into(),
                block: BlockPlacement {
                    position: BlockPosition::new(0, 1, 0),
                    structure_id: "brick".into(),
                    rotation: 0,
                    material: None,
                },
            },
            ServerPacket::BlockRemoved {
                actor_id: "p3".into(),
                position: BlockPosition::new(0, 4, 0),
            },
            ServerPacket::WorldReset {
                actor_id: "p3".into(),
            },
            ServerPacket::WorldSaved {
                success: true,
                message: Some("ok".into()),
            },
            ServerPacket::Pong { timestamp: 12 },
        ];

        let mut recorder = Recorder::default();
        for packet in packets {
            dispatch(&mut recorder, packet);
        }

        assert_eq!(
            recorder.calls,
            vec![
                "welcome me #00ff00 plaza",
                "join_error world full",
                "actor_joined p2 #0000ff",
                "actor_left p2",
                "actor_state p3 7 99",
                "block_placed p3 brick",
                "block_removed p3 4",
                "world_reset p3",
                "world_saved true Some(\"ok\")",
                "pong 12",
            ]
        );
    }
}
