//! Accumulation of the local actor's intent for the fixed-rate uplink.

use protocol::{ClientPacket, InputState};

/// A partial update reported by the controller. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputUpdate {
    pub forward: Option<bool>,
    pub backward: Option<bool>,
    pub left: Option<bool>,
    pub right: Option<bool>,
    pub jump: Option<bool>,
    pub descend: Option<bool>,
    pub sprint: Option<bool>,
    pub hover: Option<bool>,
    pub camera_yaw: Option<f32>,
}

/// Holds the current intent and turns it into `input` packets on demand.
///
/// The uplink never decides *when* to send; the session calls
/// [`InputUplink::next_packet`] on each cadence tick, so the full intent is
/// resent every tick whether or not it changed.
#[derive(Debug, Default)]
pub struct InputUplink {
    current: InputState,
    packets_built: u64,
}

impl InputUplink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &InputState {
        &self.current
    }

    pub fn packets_built(&self) -> u64 {
        self.packets_built
    }

    pub fn merge(&mut self, update: InputUpdate) {
        let current = &mut self.current;
        merge_field(&mut current.forward, update.forward);
        merge_field(&mut current.backward, update.backward);
        merge_field(&mut current.left, update.left);
        merge_field(&mut current.right, update.right);
        merge_field(&mut current.jump, update.jump);
        merge_field(&mut current.descend, update.descend);
        merge_field(&mut current.sprint, update.sprint);
        merge_field(&mut current.hover, update.hover);
        merge_field(&mut current.camera_yaw, update.camera_yaw);
    }

    /// Replaces the whole intent, e.g. when the controller loses focus.
    pub fn replace(&mut self, state: InputState) {
        self.current = state;
    }

    pub fn next_packet(&mut self, timestamp: u64) -> ClientPacket {
        self.packets_built += 1;
        ClientPacket::Input {
            inputs: self.current,
            timestamp,
        }
    }
}

fn merge_field<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uplink_creation() {
        let uplink = InputUplink::new();
        assert_eq!(*uplink.current(), InputState::default());
        assert_eq!(uplink.packets_built(), 0);
    }

    #[test]
    fn test_merge_only_touches_reported_fields() {
        let mut uplink = InputUplink::new();
        uplink.merge(InputUpdate {
            forward: Some(true),
            camera_yaw: Some(1.25),
            ..InputUpdate::default()
        });
        uplink.merge(InputUpdate {
            sprint: Some(true),
            ..InputUpdate::default()
        });
        uplink.merge(InputUpdate {
            forward: Some(false),
            hover: Some(true),
            ..InputUpdate::default()
        });

        let current = uplink.current();
        assert!(!current.forward);
        assert!(current.sprint);
        assert!(current.hover);
        assert_eq!(current.camera_yaw, 1.25);
        assert!(!current.left);
    }

    #[test]
    fn test_unchanged_intent_is_resent_every_tick() {
        let mut uplink = InputUplink::new();
        uplink.merge(InputUpdate {
            left: Some(true),
            ..InputUpdate::default()
        });

        let first = uplink.next_packet(1000);
        let second = uplink.next_packet(1050);

        match (first, second) {
            (
                ClientPacket::Input {
                    inputs: a,
                    timestamp: t1,
                },
                ClientPacket::Input {
                    inputs: b,
                    timestamp: t2,
                },
            ) => {
                assert_eq!(a, b);
                assert!(a.left);
                assert_eq!((t1, t2), (1000, 1050));
            }
            _ => panic!("Wrong packet type"),
        }
        assert_eq!(uplink.packets_built(), 2);
    }

    #[test]
    fn test_replace() {
        let mut uplink = InputUplink::new();
        uplink.merge(InputUpdate {
            jump: Some(true),
            ..InputUpdate::default()
        });
        uplink.replace(InputState::default());
        assert!(!uplink.current().jump);
    }
}
