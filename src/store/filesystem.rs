//! Filesystem backend: one pretty-printed JSON document per game.
//!
//! Durability: the document is written to a temp file, fsynced, then renamed
//! into place, so a crash never leaves a half-written game behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use super::{sort_summaries, GameStore, GameSummary, StoreError};
use crate::game::GameConfig;

pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn game_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_id(id)))
    }
}

/// Ids normally are UUIDs, but saved documents are self-describing and may
/// carry arbitrary ids; keep them out of path syntax.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl GameStore for FilesystemStore {
    async fn save(&self, mut config: GameConfig) -> Result<String, StoreError> {
        config.ensure_id();
        config.saved_at = Some(Utc::now());
        let id = config.id.clone();

        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(&config)?;
        let final_path = self.game_path(&id);
        let tmp_path = self.dir.join(format!(".{}.tmp", sanitize_id(&id)));

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &final_path).await?;

        tracing::debug!(game_id = %id, path = %final_path.display(), "game saved to disk");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<GameConfig>, StoreError> {
        match tokio::fs::read(self.game_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<GameSummary>, StoreError> {
        let mut summaries = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(summaries),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_summary(&path).await {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    // A malformed file should not take down the listing.
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable saved game");
                }
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

async fn read_summary(path: &Path) -> Result<GameSummary, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    let config: GameConfig = serde_json::from_slice(&bytes)?;
    Ok(GameSummary {
        id: config.id,
        created_at: config.created_at,
        metadata: config.metadata,
        filename: path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string),
    })
}
