#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

//! # Buzzline Server
//!
//! Real-time room coordinator for a Jeopardy-style trivia show. Hosts,
//! players, and big-screen viewers share a room over WebSocket; the server
//! synchronises their views and adjudicates the buzzer race.
//!
//! All of a room's state lives behind one actor; everything else is
//! plumbing around its mailbox.

/// Server configuration and environment variables
pub mod config;

/// Clue grids, content packs, and the reading-time estimate
pub mod game;

/// Adapter for the external AI content generator
pub mod generator;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Room actors: state machine, buzzer arbiter, final round
pub mod room;

/// Room registry and shared services
pub mod server;

/// Persistence for game content packs
pub mod store;

/// WebSocket connection handling and the HTTP surface
pub mod websocket;
