//! Wire protocol: frame types, identifiers, room codes, and error kinds.
//!
//! Everything here is plain data. The room actor consumes [`ClientFrame`]s
//! and produces [`ServerFrame`]s; the gateway only parses, routes, and
//! serialises.

pub mod errors;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use errors::RoomError;
pub use messages::{
    parse_client_frame, ClientFrame, GameStateView, PlayerView, SelectedClueView, ServerFrame,
};
pub use room_codes::{generate_room_code, is_valid_room_code, normalize_room_code};
pub use types::{ConnectionId, ParticipantId, ParticipantRole, RoomStatus, RoundKind};
pub use validation::validate_display_name;
