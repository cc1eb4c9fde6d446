//! Persistence for game content packs.
//!
//! A [`GameStore`] must make `save` durable before it returns, serve its own
//! writes on `get`, and list summaries newest-first. Two backends ship: an
//! in-memory document store (the default, also used throughout the tests)
//! and a one-file-per-game filesystem store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{PersistenceBackend, PersistenceConfig};
use crate::game::{GameConfig, GameMetadata};

pub mod document;
pub mod filesystem;

pub use document::DocumentStore;
pub use filesystem::FilesystemStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored game is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One row of `GET /api/games/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub metadata: GameMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Persist a pack and return its id. Durable before returning.
    async fn save(&self, config: GameConfig) -> Result<String, StoreError>;
    /// Fetch a pack by id; read-your-writes.
    async fn get(&self, id: &str) -> Result<Option<GameConfig>, StoreError>;
    /// Summaries ordered by `created_at` descending, ties broken by id.
    async fn list(&self) -> Result<Vec<GameSummary>, StoreError>;
}

/// Build the configured backend.
#[must_use]
pub fn create_store(config: &PersistenceConfig) -> Arc<dyn GameStore> {
    match config.backend {
        PersistenceBackend::Filesystem => Arc::new(FilesystemStore::new(&config.dir)),
        PersistenceBackend::DocumentStore => Arc::new(DocumentStore::new()),
    }
}

/// Newest first; equal timestamps fall back to id order so listings are
/// stable across calls.
pub(crate) fn sort_summaries(summaries: &mut [GameSummary]) {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
