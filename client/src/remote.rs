//! Snapshot interpolation for actors controlled by other clients.
//!
//! Each remote actor keeps a short, timestamp-ordered buffer of server states
//! and is drawn `interpolation_delay` in the past, so that there is usually a
//! pair of snapshots on either side of the instant being drawn.

use crate::world::Pose;
use protocol::ActorState;
use std::collections::hash_map::{Entry, HashMap};
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSnapshot {
    pub state: ActorState,
    pub timestamp: u64,
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Interpolates yaw along the shorter arc.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let diff = wrap_angle(to - from);
    wrap_angle(from + diff * t)
}

#[derive(Debug)]
pub struct RemoteActor {
    buffer: VecDeque<StateSnapshot>,
    capacity: usize,
    interpolation_delay_ms: u64,
    rendered: Option<Pose>,
}

impl RemoteActor {
    pub fn new(capacity: usize, interpolation_delay: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
            interpolation_delay_ms: interpolation_delay.as_millis() as u64,
            rendered: None,
        }
    }

    /// Buffers a snapshot. Arrival order may differ from timestamp order;
    /// the buffer is re-sorted and the oldest entries beyond capacity dropped.
    pub fn receive_state(&mut self, state: ActorState, timestamp: u64) {
        self.buffer.push_back(StateSnapshot { state, timestamp });
        self.buffer
            .make_contiguous()
            .sort_by_key(|snapshot| snapshot.timestamp);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &StateSnapshot> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&StateSnapshot> {
        self.buffer.back()
    }

    /// Last pose produced by [`RemoteActor::update`].
    pub fn rendered(&self) -> Option<Pose> {
        self.rendered
    }

    /// Pose to draw at host time `now_ms`, or `None` with an empty buffer.
    pub fn sample(&self, now_ms: u64) -> Option<Pose> {
        if self.buffer.len() < 2 {
            return self.buffer.front().map(|snapshot| Pose::from(&snapshot.state));
        }

        let render_time = now_ms.saturating_sub(self.interpolation_delay_ms);

        let bracket = self
            .buffer
            .iter()
            .zip(self.buffer.iter().skip(1))
            .find(|(a, b)| a.timestamp <= render_time && render_time <= b.timestamp);

        match bracket {
            Some((a, b)) => {
                let span = b.timestamp - a.timestamp;
                let t = if span == 0 {
                    1.0
                } else {
                    ((render_time - a.timestamp) as f64 / span as f64).clamp(0.0, 1.0) as f32
                };

                Some(Pose::new(
                    a.state.position.lerp(b.state.position, t),
                    lerp_angle(a.state.rotation, b.state.rotation, t),
                ))
            }
            None => self.latest().map(|snapshot| Pose::from(&snapshot.state)),
        }
    }

    /// Advances the rendered pose. Time comes from `now_ms`; the frame delta
    /// is accepted for the per-tick call shape but does not affect the result.
    pub fn update(&mut self, now_ms: u64, _delta_time: f32) -> Option<Pose> {
        let pose = self.sample(now_ms)?;
        self.rendered = Some(pose);
        Some(pose)
    }
}

#[derive(Debug)]
pub struct RemoteActorEntry<H> {
    pub actor: RemoteActor,
    pub handle: H,
    pub color: String,
}

/// Remote actors keyed by server-assigned id, together with the visual handle
/// each one owns.
#[derive(Debug)]
pub struct RemoteActorRegistry<H> {
    actors: HashMap<String, RemoteActorEntry<H>>,
    capacity: usize,
    interpolation_delay: Duration,
}

impl<H> RemoteActorRegistry<H> {
    pub fn new(capacity: usize, interpolation_delay: Duration) -> Self {
        Self {
            actors: HashMap::new(),
            capacity,
            interpolation_delay,
        }
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        self.actors.contains_key(actor_id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn get(&self, actor_id: &str) -> Option<&RemoteActorEntry<H>> {
        self.actors.get(actor_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actors.keys().map(String::as_str)
    }

    /// Adds an actor unless one with this id exists. `make_handle` only runs
    /// for a real insertion. Returns whether the actor was added.
    pub fn insert_with(
        &mut self,
        actor_id: &str,
        color: &str,
        make_handle: impl FnOnce() -> H,
    ) -> bool {
        match self.actors.entry(actor_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RemoteActorEntry {
                    actor: RemoteActor::new(self.capacity, self.interpolation_delay),
                    handle: make_handle(),
                    color: color.to_string(),
                });
                true
            }
        }
    }

    /// Removes an actor, handing back its visual handle for disposal.
    pub fn remove(&mut self, actor_id: &str) -> Option<H> {
        self.actors.remove(actor_id).map(|entry| entry.handle)
    }

    /// Buffers a state for a registered actor. Returns `false` if unknown.
    pub fn receive_state(&mut self, actor_id: &str, state: ActorState, timestamp: u64) -> bool {
        match self.actors.get_mut(actor_id) {
            Some(entry) => {
                entry.actor.receive_state(state, timestamp);
                true
            }
            None => false,
        }
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut RemoteActorEntry<H>> {
        self.actors.values_mut()
    }

    /// Empties the registry, returning every handle for disposal.
    pub fn drain(&mut self) -> Vec<H> {
        self.actors.drain().map(|(_, entry)| entry.handle).collect()
    }
}
