//! Application-level configuration loading, including the runtime question pool.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "VIBE_SYNC_CONFIG_PATH";

/// Default round ceiling for new rooms.
const DEFAULT_MAX_ROUNDS: u32 = 5;
/// Default player capacity per room.
const DEFAULT_MAX_PLAYERS: usize = 12;

/// Thematic category of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionCategory {
    /// Lighthearted prompts.
    Funny,
    /// Everyday-life prompts.
    Life,
    /// Romance-leaning prompts.
    Romance,
}

/// One prompt from the shared pool. The pool is never mutated during play;
/// rooms hold owned copies of the question they are asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Position-derived identifier, stable for the process lifetime.
    pub id: u32,
    /// Prompt text shown to players.
    pub text: String,
    /// Thematic category.
    pub category: QuestionCategory,
    /// Inactive questions are excluded from selection.
    pub active: bool,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    questions: Vec<Question>,
    max_players: usize,
    max_rounds: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in question pool when no file is present or parsing fails.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = config.questions.len(),
                        "loaded question pool from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Questions currently eligible for selection.
    pub fn active_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|question| question.active)
    }

    /// Look up an active question by id.
    pub fn active_question(&self, id: u32) -> Option<&Question> {
        self.active_questions().find(|question| question.id == id)
    }

    /// Player capacity per room.
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Round ceiling applied to new rooms.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            max_players: DEFAULT_MAX_PLAYERS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    questions: Vec<RawQuestion>,
    #[serde(default)]
    max_players: Option<usize>,
    #[serde(default)]
    max_rounds: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let questions = if value.questions.is_empty() {
            defaults.questions
        } else {
            value
                .questions
                .into_iter()
                .enumerate()
                .map(|(index, raw)| Question {
                    id: index as u32 + 1,
                    text: raw.text,
                    category: raw.category,
                    active: raw.active,
                })
                .collect()
        };

        Self {
            questions,
            max_players: value.max_players.unwrap_or(defaults.max_players),
            max_rounds: value.max_rounds.unwrap_or(defaults.max_rounds),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single question inside the configuration file.
struct RawQuestion {
    text: String,
    category: QuestionCategory,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_questions() -> Vec<Question> {
    let prompts = [
        (
            "What is one tiny thing that instantly makes your day better?",
            QuestionCategory::Life,
        ),
        (
            "What is your most dramatic overreaction this month?",
            QuestionCategory::Funny,
        ),
        (
            "Describe your ideal late-night vibe in one sentence.",
            QuestionCategory::Romance,
        ),
        (
            "What is one secret talent your friends still underestimate?",
            QuestionCategory::Life,
        ),
        (
            "What is your chaotic comfort food combo?",
            QuestionCategory::Funny,
        ),
    ];

    prompts
        .into_iter()
        .enumerate()
        .map(|(index, (text, category))| Question {
            id: index as u32 + 1,
            text: text.to_string(),
            category,
            active: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_has_five_active_questions() {
        let config = AppConfig::default();
        assert_eq!(config.active_questions().count(), 5);
        assert_eq!(config.max_players(), 12);
        assert_eq!(config.max_rounds(), 5);
    }

    #[test]
    fn question_ids_are_one_based_and_stable() {
        let config = AppConfig::default();
        let ids: Vec<u32> = config.active_questions().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(config.active_question(3).is_some());
        assert!(config.active_question(99).is_none());
    }

    #[test]
    fn raw_config_overrides_limits_and_skips_inactive() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "questions": [
                    {"text": "A?", "category": "LIFE"},
                    {"text": "B?", "category": "FUNNY", "active": false}
                ],
                "max_players": 4,
                "max_rounds": 2
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.max_players(), 4);
        assert_eq!(config.max_rounds(), 2);
        assert_eq!(config.active_questions().count(), 1);
        assert!(config.active_question(2).is_none());
    }
}
