use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::RoundKind;

/// Categories on a regular board
pub const CATEGORIES_PER_ROUND: usize = 6;
/// Clues per category, ordered by value ascending
pub const CLUES_PER_CATEGORY: usize = 5;

/// A single prompt on the board.
///
/// `revealed` flips when the host selects the clue; `answered` flips on a
/// correct judgement. Both are the only mutable parts of a loaded game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Clue {
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    pub value: u32,
    pub prompt_text: String,
    pub expected_response: String,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub answered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub clues: Vec<Clue>,
}

/// One regular round's clue grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub categories: Vec<Category>,
}

impl Board {
    #[must_use]
    pub fn clue(&self, category_id: &str, clue_id: &str) -> Option<&Clue> {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .and_then(|c| c.clues.iter().find(|clue| clue.id == clue_id))
    }

    pub fn clue_mut(&mut self, category_id: &str, clue_id: &str) -> Option<&mut Clue> {
        self.categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .and_then(|c| c.clues.iter_mut().find(|clue| clue.id == clue_id))
    }

    /// Shape check applied on load and on generator output.
    pub fn validate(&self, label: &str) -> Result<(), String> {
        if self.categories.len() != CATEGORIES_PER_ROUND {
            return Err(format!(
                "{label}: expected {CATEGORIES_PER_ROUND} categories, got {}",
                self.categories.len()
            ));
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(format!("{label}: category {} has no name", category.id));
            }
            if category.clues.len() != CLUES_PER_CATEGORY {
                return Err(format!(
                    "{label}: category '{}' has {} clues, expected {CLUES_PER_CATEGORY}",
                    category.name,
                    category.clues.len()
                ));
            }
            let mut previous = 0u32;
            for clue in &category.clues {
                if clue.value == 0 {
                    return Err(format!(
                        "{label}: clue {} in '{}' has non-positive value",
                        clue.id, category.name
                    ));
                }
                if clue.value <= previous {
                    return Err(format!(
                        "{label}: clues in '{}' are not ordered by ascending value",
                        category.name
                    ));
                }
                previous = clue.value;
            }
        }
        Ok(())
    }
}

/// The degenerate final round: a single wager-and-answer clue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalClue {
    pub category_name: String,
    pub prompt_text: String,
    pub expected_response: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// A complete game content pack: two boards plus the final clue.
///
/// Immutable after loading into a room, except for the `revealed`/`answered`
/// flags on individual clues. Self-describing and version-free; `saved_at`
/// and `saved_by` are stamped by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub id: String,
    pub first_round: Board,
    pub double_round: Board,
    pub final_round: FinalClue,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: GameMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_by: Option<serde_json::Value>,
}

impl GameConfig {
    #[must_use]
    pub fn board(&self, round: RoundKind) -> Option<&Board> {
        match round {
            RoundKind::First => Some(&self.first_round),
            RoundKind::Double => Some(&self.double_round),
            RoundKind::Final => None,
        }
    }

    pub fn board_mut(&mut self, round: RoundKind) -> Option<&mut Board> {
        match round {
            RoundKind::First => Some(&mut self.first_round),
            RoundKind::Double => Some(&mut self.double_round),
            RoundKind::Final => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.first_round.validate("first round")?;
        self.double_round.validate("double round")?;
        if self.final_round.prompt_text.trim().is_empty() {
            return Err("final round has no prompt".to_string());
        }
        if self.final_round.expected_response.trim().is_empty() {
            return Err("final round has no expected response".to_string());
        }
        Ok(())
    }

    /// Ensure the pack carries a usable id, minting one when absent.
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn board(prefix: &str) -> Board {
        let categories = (0..CATEGORIES_PER_ROUND)
            .map(|c| Category {
                id: format!("{prefix}-cat-{c}"),
                name: format!("Category {c}"),
                clues: (1..=CLUES_PER_CATEGORY as u32)
                    .map(|i| Clue {
                        id: format!("{prefix}-clue-{c}-{i}"),
                        category_id: format!("{prefix}-cat-{c}"),
                        value: i * 200,
                        prompt_text: format!("Prompt {c}-{i} for the board"),
                        expected_response: format!("What is answer {c}-{i}?"),
                        revealed: false,
                        answered: false,
                    })
                    .collect(),
            })
            .collect();
        Board { categories }
    }

    pub fn config() -> GameConfig {
        GameConfig {
            id: "test-game".to_string(),
            first_round: board("first"),
            double_round: board("double"),
            final_round: FinalClue {
                category_name: "World Capitals".to_string(),
                prompt_text: "This city on the Baltic is the capital of Estonia".to_string(),
                expected_response: "What is Tallinn?".to_string(),
            },
            created_at: Utc::now(),
            metadata: GameMetadata {
                topics: vec!["geography".to_string()],
                difficulty: Some("medium".to_string()),
            },
            saved_at: None,
            saved_by: None,
        }
    }
}
