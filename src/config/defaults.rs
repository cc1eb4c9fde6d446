//! Default value functions for configuration fields, referenced from the
//! `#[serde(default = ...)]` attributes throughout the config types.

use super::logging::LogFormat;
use super::types::PersistenceBackend;

// =============================================================================
// Port & root config
// =============================================================================

pub const fn default_port() -> u16 {
    3001
}

// =============================================================================
// Server defaults
// =============================================================================

pub const fn default_ping_interval_ms() -> u64 {
    1_000
}

pub const fn default_pong_timeout_ms() -> u64 {
    3_000
}

/// Buzzes within this window of the first buzz count as simultaneous.
pub const fn default_tie_window_ms() -> u64 {
    250
}

/// Scheduling slack added after the tie window before resolution runs.
pub const fn default_tie_buffer_ms() -> u64 {
    50
}

pub const fn default_final_answer_timeout_ms() -> u64 {
    30_000
}

/// How long a host may be absent before the room is reaped.
pub const fn default_room_grace_ms() -> u64 {
    300_000 // 5 minutes
}

pub const fn default_room_sweep_interval_ms() -> u64 {
    30_000
}

pub const fn default_max_message_size() -> usize {
    65_536 // 64KB
}

// =============================================================================
// Security defaults
// =============================================================================

pub fn default_frontend_origin() -> String {
    "*".to_string()
}

// =============================================================================
// Generator defaults
// =============================================================================

pub const fn default_generator_timeout_ms() -> u64 {
    30_000
}

// =============================================================================
// Persistence defaults
// =============================================================================

pub const fn default_persistence_backend() -> PersistenceBackend {
    PersistenceBackend::DocumentStore
}

pub fn default_persistence_dir() -> String {
    "saved_games".to_string()
}

// =============================================================================
// Logging defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
