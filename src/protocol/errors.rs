use thiserror::Error;

use super::types::ParticipantRole;
use crate::protocol::messages::ServerFrame;

/// User-visible failure of a room operation.
///
/// Every variant renders as an `error{message}` frame to the caller only;
/// none of them mutate room state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Malformed frame or unknown message type. Never disconnects.
    #[error("malformed message: {0}")]
    Protocol(String),

    /// The sender's role is not allowed to perform the operation.
    #[error("operation requires the {} role", .required.as_str())]
    Role { required: ParticipantRole },

    /// The room's current status disallows the operation.
    #[error("{0}")]
    State(String),

    /// Unknown room code, participant, clue, or game id.
    #[error("{0} not found")]
    NotFound(String),

    /// Input outside the allowed range or shape.
    #[error("{0}")]
    Validation(String),

    /// Generator or persistence failure, sanitised for the client.
    #[error("upstream failure: {0}")]
    Dependency(String),
}

impl RoomError {
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub const fn requires(required: ParticipantRole) -> Self {
        Self::Role { required }
    }

    /// Render the error as its wire frame.
    #[must_use]
    pub fn frame(&self) -> ServerFrame {
        ServerFrame::Error {
            message: self.to_string(),
        }
    }
}
