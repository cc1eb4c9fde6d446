//! In-memory document store: the default backend and the one the tests use.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{sort_summaries, GameStore, GameSummary, StoreError};
use crate::game::GameConfig;

#[derive(Default)]
pub struct DocumentStore {
    games: DashMap<String, GameConfig>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for DocumentStore {
    async fn save(&self, mut config: GameConfig) -> Result<String, StoreError> {
        config.ensure_id();
        config.saved_at = Some(Utc::now());
        let id = config.id.clone();
        self.games.insert(id.clone(), config);
        tracing::debug!(game_id = %id, "game saved to document store");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<GameConfig>, StoreError> {
        Ok(self.games.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<GameSummary>, StoreError> {
        let mut summaries: Vec<GameSummary> = self
            .games
            .iter()
            .map(|entry| GameSummary {
                id: entry.key().clone(),
                created_at: entry.value().created_at,
                metadata: entry.value().metadata.clone(),
                filename: None,
            })
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::test_fixtures;
    use chrono::Duration;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = DocumentStore::new();
        let id = store.save(test_fixtures::config()).await.unwrap();
        let loaded = store.get(&id).await.unwrap().expect("game present");
        assert_eq!(loaded.id, id);
        assert!(loaded.saved_at.is_some());
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let store = DocumentStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_id_is_minted_on_save() {
        let store = DocumentStore::new();
        let mut config = test_fixtures::config();
        config.id = String::new();
        let id = store.save(config).await.unwrap();
        assert!(!id.is_empty());
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_id_tiebreak() {
        let store = DocumentStore::new();
        let base = test_fixtures::config();

        let mut older = base.clone();
        older.id = "b-older".to_string();
        older.created_at = base.created_at - Duration::hours(1);

        let mut tie_a = base.clone();
        tie_a.id = "a-tie".to_string();
        let mut tie_b = base.clone();
        tie_b.id = "b-tie".to_string();

        for config in [older, tie_b, tie_a] {
            store.save(config).await.unwrap();
        }

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a-tie", "b-tie", "b-older"]);
    }

    #[tokio::test]
    async fn save_overwrites_same_id() {
        let store = DocumentStore::new();
        let config = test_fixtures::config();
        store.save(config.clone()).await.unwrap();
        let mut updated = config;
        updated.metadata.difficulty = Some("hard".to_string());
        let id = store.save(updated).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.metadata.difficulty.as_deref(), Some("hard"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
