//! Adapter for the external AI content generator.
//!
//! The generator is an HTTP-reachable text service: one request in, one
//! response out. The core keeps no conversation state between calls, so the
//! remote side is free to be a façade over any number of model back-ends.
//! On top of the raw call, [`GeneratorClient::generate_game`] asks for JSON
//! and validates the board shape before handing a [`GameConfig`] back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::GeneratorConfig;
use crate::game::{Board, FinalClue, GameConfig, GameMetadata};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned status {0}")]
    Status(u16),
    /// Malformed output is recoverable: the caller may simply retry.
    #[error("generator returned an unusable game: {0}")]
    MalformedGame(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Text,
}

/// The single operation the generator exposes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub system_instructions: String,
    pub user_prompt: String,
    pub output_format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorReply {
    pub conversation_id: String,
    pub output_text: String,
}

/// What we expect the generator's JSON output to look like.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedGame {
    first_round: Board,
    double_round: Board,
    final_round: FinalClue,
}

pub struct GeneratorClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeneratorClient {
    /// Build a client when an endpoint is configured; `None` disables the
    /// generate surface entirely.
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .ok()?;
        Some(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// Fire one request at the generator.
    pub async fn generate(
        &self,
        request: GeneratorRequest,
    ) -> Result<GeneratorReply, GeneratorError> {
        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "generator returned an error status");
            return Err(GeneratorError::Status(status.as_u16()));
        }
        Ok(response.json::<GeneratorReply>().await?)
    }

    /// Generate a full game for the given topics and parse it into a
    /// validated content pack.
    pub async fn generate_game(
        &self,
        topics: &[String],
        difficulty: Option<&str>,
    ) -> Result<GameConfig, GeneratorError> {
        let reply = self.generate(game_request(topics, difficulty)).await?;
        let mut config = parse_game_payload(&reply.output_text)?;
        config.metadata = GameMetadata {
            topics: topics.to_vec(),
            difficulty: difficulty.map(str::to_string),
        };
        Ok(config)
    }
}

fn game_request(topics: &[String], difficulty: Option<&str>) -> GeneratorRequest {
    let difficulty = difficulty.unwrap_or("medium");
    GeneratorRequest {
        conversation_id: None,
        system_instructions: concat!(
            "You write trivia boards for a Jeopardy-style game show. ",
            "Respond with a single JSON object with keys firstRound, ",
            "doubleRound and finalRound. Each regular round has exactly 6 ",
            "categories of 5 clues with ascending values (200-1000 for the ",
            "first round, 400-2000 for the double round). Every clue needs ",
            "id, categoryId, value, promptText and expectedResponse; the ",
            "final round needs categoryName, promptText and expectedResponse.",
        )
        .to_string(),
        user_prompt: format!(
            "Write a {difficulty} difficulty game about: {}",
            topics.join(", ")
        ),
        output_format: OutputFormat::Json,
        tools: None,
    }
}

/// Parse generator output into a validated pack. Models love to wrap JSON in
/// markdown fences, so those are stripped first.
fn parse_game_payload(raw: &str) -> Result<GameConfig, GeneratorError> {
    let body = strip_code_fence(raw);
    let generated: GeneratedGame = serde_json::from_str(body)
        .map_err(|err| GeneratorError::MalformedGame(err.to_string()))?;

    let config = GameConfig {
        id: Uuid::new_v4().to_string(),
        first_round: generated.first_round,
        double_round: generated.double_round,
        final_round: generated.final_round,
        created_at: Utc::now(),
        metadata: GameMetadata::default(),
        saved_at: None,
        saved_by: None,
    };
    config
        .validate()
        .map_err(GeneratorError::MalformedGame)?;
    Ok(config)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim()
}
