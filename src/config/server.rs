//! Server behavior configuration: heartbeats, buzzer timing, room lifetime.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_final_answer_timeout_ms, default_max_message_size, default_ping_interval_ms,
    default_pong_timeout_ms, default_room_grace_ms, default_room_sweep_interval_ms,
    default_tie_buffer_ms, default_tie_window_ms,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval between server-initiated heartbeat pings (milliseconds)
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Silence tolerated before a connection is evicted (milliseconds)
    #[serde(default = "default_pong_timeout_ms")]
    pub pong_timeout_ms: u64,
    /// Width of the buzzer tie window (milliseconds)
    #[serde(default = "default_tie_window_ms")]
    pub tie_window_ms: u64,
    /// Slack between tie-window close and winner selection (milliseconds)
    #[serde(default = "default_tie_buffer_ms")]
    pub tie_buffer_ms: u64,
    /// Final-round answer countdown (milliseconds)
    #[serde(default = "default_final_answer_timeout_ms")]
    pub final_answer_timeout_ms: u64,
    /// Host absence tolerated before the room is reaped (milliseconds)
    #[serde(default = "default_room_grace_ms")]
    pub room_grace_ms: u64,
    /// Interval of the registry's reaper task (milliseconds)
    #[serde(default = "default_room_sweep_interval_ms")]
    pub room_sweep_interval_ms: u64,
    /// Largest inbound frame accepted (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            pong_timeout_ms: default_pong_timeout_ms(),
            tie_window_ms: default_tie_window_ms(),
            tie_buffer_ms: default_tie_buffer_ms(),
            final_answer_timeout_ms: default_final_answer_timeout_ms(),
            room_grace_ms: default_room_grace_ms(),
            room_sweep_interval_ms: default_room_sweep_interval_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}
