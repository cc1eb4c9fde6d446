//! Frame serialisation helpers shared by the registry and the socket tasks.

use std::sync::Arc;

use crate::protocol::ServerFrame;

/// Serialise a frame once so fan-out can share the bytes across every
/// connection in a room. `None` only on a serialisation bug; the failure is
/// logged and the frame dropped rather than poisoning the room actor.
#[must_use]
pub fn encode_frame(frame: &ServerFrame) -> Option<Arc<str>> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Arc::from(json)),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialise outbound frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_tagged_json() {
        let payload = encode_frame(&ServerFrame::BuzzerLocked { locked: false }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "buzzerLocked");
        assert_eq!(value["locked"], false);
    }
}
