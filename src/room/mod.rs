//! Room core: the per-room actor, its state machine, the buzzer arbiter,
//! and the final-round sub-machine.

pub mod actor;
pub mod buzzer;
pub mod final_round;
pub mod snapshot;
pub mod state;

pub use actor::{spawn_room, RoomCommand, RoomHandle};
pub use state::{Now, RoomHealth, RoomTimings};

use crate::protocol::{ConnectionId, ParticipantId, ServerFrame};

/// How a room actor reaches its audience.
///
/// The actor holds participant ids only; the gateway's connection registry
/// implements this trait and dereferences ids to live sockets. Sends are
/// fire-and-forget — transport failures never propagate into room state.
pub trait RoomPublisher: Send + Sync + 'static {
    /// Record that `conn` now speaks for `participant` in `room`.
    fn bind(&self, conn: ConnectionId, room: &str, participant: ParticipantId);
    /// Deliver a frame to one connection.
    fn unicast(&self, conn: ConnectionId, frame: &ServerFrame);
    /// Fan a frame out to every connection bound to `room`.
    fn broadcast(&self, room: &str, frame: &ServerFrame);
}
