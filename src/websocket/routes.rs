use std::sync::Arc;

use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Deserialize;

use super::connection::handle_socket;
use crate::game::GameConfig;
use crate::generator::GeneratorError;
use crate::server::GameServer;
use crate::store::GameSummary;

/// Create the axum router: the WebSocket endpoint plus the small HTTP
/// surface for health and saved games.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<GameServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/api/games/list", get(list_games))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/generate", post(generate_game))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<GameServer>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_games(
    State(server): State<Arc<GameServer>>,
) -> Result<Json<Vec<GameSummary>>, (StatusCode, String)> {
    server
        .store()
        .list()
        .await
        .map(Json)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

async fn get_game(
    State(server): State<Arc<GameServer>>,
    Path(id): Path<String>,
) -> Result<Json<GameConfig>, (StatusCode, String)> {
    match server.store().get(&id).await {
        Ok(Some(config)) => Ok(Json(config)),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("game {id} not found"))),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateGameRequest {
    pub topics: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

async fn generate_game(
    State(server): State<Arc<GameServer>>,
    Json(request): Json<GenerateGameRequest>,
) -> Result<Json<GameConfig>, (StatusCode, String)> {
    let Some(generator) = server.generator() else {
        return Err((
            StatusCode::BAD_REQUEST,
            "no generator endpoint is configured".to_string(),
        ));
    };
    if request.topics.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one topic is required".to_string(),
        ));
    }

    generator
        .generate_game(&request.topics, request.difficulty.as_deref())
        .await
        .map(Json)
        .map_err(|err| match err {
            // Recoverable: the model produced junk, the caller can retry.
            GeneratorError::MalformedGame(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            GeneratorError::Http(_) | GeneratorError::Status(_) => {
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        })
}
