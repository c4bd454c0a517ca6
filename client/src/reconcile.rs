//! Server-authoritative correction of the local actor.
//!
//! The server's state replaces the predicted one outright. There is no input
//! replay and no smoothing, so a large prediction error shows as a visible
//! snap; [`reconcile_local`] reports the error so a host can measure it.

use crate::world::LocalAvatar;
use log::debug;
use protocol::ActorState;

/// Corrections larger than this are logged.
pub const CORRECTION_LOG_THRESHOLD: f32 = 0.5;

/// Overwrites local position and yaw with `state` and returns how far the
/// predicted position was off.
pub fn reconcile_local<A: LocalAvatar + ?Sized>(avatar: &mut A, state: &ActorState) -> f32 {
    let error = avatar.local_actor_position().distance(state.position);
    if error > CORRECTION_LOG_THRESHOLD {
        debug!("Local actor corrected by {:.2} units", error);
    }

    avatar.set_local_actor_position(state.position);
    avatar.set_local_actor_rotation(state.rotation);
    error
}
