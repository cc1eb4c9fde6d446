//! Server orchestration: the room registry and the services shared by every
//! room (connection registry, persistence, generator).

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Duration;

use crate::config::Config;
use crate::generator::GeneratorClient;
use crate::protocol::{
    generate_room_code, is_valid_room_code, normalize_room_code, RoomError,
};
use crate::room::{spawn_room, RoomCommand, RoomHandle, RoomTimings};
use crate::store::{create_store, GameStore};
use crate::websocket::ConnectionRegistry;

pub struct GameServer {
    /// Live rooms by code. The entry API makes create-vs-collide atomic.
    rooms: DashMap<String, RoomHandle>,
    connections: Arc<ConnectionRegistry>,
    store: Arc<dyn GameStore>,
    generator: Option<GeneratorClient>,
    config: Arc<Config>,
}

impl GameServer {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        let store = create_store(&config.persistence);
        let generator = GeneratorClient::from_config(&config.generator);
        if generator.is_none() {
            tracing::info!("no generator endpoint configured; /api/games/generate is disabled");
        }
        Arc::new(Self {
            rooms: DashMap::new(),
            connections: Arc::new(ConnectionRegistry::new()),
            store,
            generator,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    #[must_use]
    pub fn generator(&self) -> Option<&GeneratorClient> {
        self.generator.as_ref()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn timings(&self) -> RoomTimings {
        RoomTimings {
            tie_window_ms: self.config.server.tie_window_ms,
            tie_buffer_ms: self.config.server.tie_buffer_ms,
            final_answer_timeout_ms: self.config.server.final_answer_timeout_ms,
        }
    }

    fn spawn(&self, code: String) -> RoomHandle {
        spawn_room(
            code,
            self.timings(),
            Arc::clone(&self.connections) as Arc<dyn crate::room::RoomPublisher>,
            Arc::clone(&self.store),
        )
    }

    /// Host-side entry point: join the named room, create it under the
    /// requested code, or mint a fresh code, retrying on collision.
    pub fn create_or_join_host(&self, requested: Option<&str>) -> Result<RoomHandle, RoomError> {
        if let Some(requested) = requested {
            let code = normalize_room_code(requested);
            if !is_valid_room_code(&code) {
                return Err(RoomError::validation(
                    "room code must be 4 uppercase letters or digits",
                ));
            }
            let handle = match self.rooms.entry(code.clone()) {
                Entry::Occupied(mut occupied) => {
                    if occupied.get().is_closed() {
                        // The previous actor died; give the code a fresh room.
                        let handle = self.spawn(code);
                        occupied.insert(handle.clone());
                        handle
                    } else {
                        occupied.get().clone()
                    }
                }
                Entry::Vacant(vacant) => {
                    let handle = self.spawn(code);
                    vacant.insert(handle.clone());
                    handle
                }
            };
            return Ok(handle);
        }

        loop {
            let code = generate_room_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => {
                    tracing::debug!(%code, "room code collision, retrying");
                }
                Entry::Vacant(vacant) => {
                    let handle = self.spawn(code);
                    vacant.insert(handle.clone());
                    return Ok(handle);
                }
            }
        }
    }

    /// Find a live room by code.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<RoomHandle> {
        let code = normalize_room_code(code);
        self.rooms
            .get(&code)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Periodic reaper: evicts rooms whose host has been absent past the
    /// grace window, finished rooms past the same window, and dead actors.
    pub async fn sweep_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_millis(
            self.config.server.room_sweep_interval_ms,
        ));
        loop {
            interval.tick().await;
            self.reap_expired().await;
        }
    }

    pub async fn reap_expired(&self) {
        let grace_ms = self.config.server.room_grace_ms as i64;
        let now_ms = Utc::now().timestamp_millis();
        let handles: Vec<RoomHandle> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for handle in handles {
            if handle.is_closed() {
                self.remove_room(handle.code());
                continue;
            }
            let Some(health) = handle.health().await else {
                self.remove_room(handle.code());
                continue;
            };
            let host_gone = health
                .host_absent_since
                .is_some_and(|since| now_ms - since >= grace_ms);
            let finished_idle =
                health.finished && now_ms - health.last_activity_ms >= grace_ms;
            if host_gone || finished_idle {
                tracing::info!(
                    room = handle.code(),
                    host_gone,
                    finished_idle,
                    age_ms = now_ms - health.created_at_ms,
                    "reaping expired room"
                );
                handle.send(RoomCommand::Shutdown).await;
                self.remove_room(handle.code());
            }
        }
    }

    fn remove_room(&self, code: &str) {
        self.rooms.remove(code);
        self.connections.drop_room(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server() -> Arc<GameServer> {
        GameServer::new(Arc::new(Config::default()))
    }

    #[tokio::test]
    async fn minted_codes_are_registered_and_unique() {
        let server = test_server();
        let a = server.create_or_join_host(None).unwrap();
        let b = server.create_or_join_host(None).unwrap();
        assert_ne!(a.code(), b.code());
        assert_eq!(server.room_count(), 2);
        assert!(server.lookup(a.code()).is_some());
    }

    #[tokio::test]
    async fn requested_codes_are_normalized_and_reused() {
        let server = test_server();
        let created = server.create_or_join_host(Some("ab12")).unwrap();
        assert_eq!(created.code(), "AB12");

        let joined = server.create_or_join_host(Some("AB12")).unwrap();
        assert_eq!(joined.code(), "AB12");
        assert_eq!(server.room_count(), 1);

        assert!(server.lookup("ab12").is_some());
        assert!(server.lookup("ZZZZ").is_none());
    }

    #[tokio::test]
    async fn malformed_codes_are_rejected() {
        let server = test_server();
        assert!(server.create_or_join_host(Some("TOOLONG")).is_err());
        assert!(server.create_or_join_host(Some("a!")).is_err());
    }

    #[tokio::test]
    async fn shutdown_rooms_are_swept() {
        let server = test_server();
        let handle = server.create_or_join_host(Some("AB12")).unwrap();
        handle.send(RoomCommand::Shutdown).await;
        // Health probing a dead actor fails, and the sweep drops it.
        tokio::task::yield_now().await;
        server.reap_expired().await;
        assert!(server.lookup("AB12").is_none());
    }

    #[tokio::test]
    async fn healthy_rooms_survive_the_sweep() {
        let server = test_server();
        server.create_or_join_host(Some("AB12")).unwrap();
        server.reap_expired().await;
        assert!(server.lookup("AB12").is_some());
    }
}
