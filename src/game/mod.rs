//! Round and board engine: clue grids, content packs, and the reading-time
//! estimate that gates the buzzer unlock.

pub mod board;
pub mod speech;

pub use board::{Board, Category, Clue, FinalClue, GameConfig, GameMetadata};
pub use speech::speaking_time_ms;
