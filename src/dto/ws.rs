use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Actions accepted from room WebSocket clients.
///
/// Wire shape is `{"action": "...", "data": {...}}`; `data` may be omitted
/// for actions that carry no payload.
#[derive(Debug, PartialEq, ToSchema)]
pub enum ClientAction {
    /// Request a read-only snapshot, sent only to this socket.
    SyncState,
    /// Open the next round.
    StartRound(StartRoundAction),
    /// Submit (or replace) the caller's answer.
    SubmitAnswer(SubmitAnswerAction),
    /// Reveal a random answer of the current round.
    RevealAnswer,
    /// Submit (or replace) an author guess.
    SubmitGuess(SubmitGuessAction),
    /// End the game and compute pairwise sync results.
    FinishRoom,
}

/// Data payload of the `start_round` action.
#[derive(Debug, Default, Deserialize, PartialEq, ToSchema)]
pub struct StartRoundAction {
    /// Specific question to ask; random pool choice when omitted.
    #[serde(default)]
    pub question_id: Option<u32>,
}

/// Data payload of the `submit_answer` action.
#[derive(Debug, Deserialize, PartialEq, ToSchema)]
pub struct SubmitAnswerAction {
    /// Answering player.
    pub player_id: Uuid,
    /// Free-text answer.
    pub text: String,
}

/// Data payload of the `submit_guess` action.
#[derive(Debug, Deserialize, PartialEq, ToSchema)]
pub struct SubmitGuessAction {
    /// Guessing player.
    pub player_id: Uuid,
    /// Answer being guessed on.
    pub answer_id: Uuid,
    /// Player accused of authorship.
    pub guessed_player_id: Uuid,
}

/// Errors produced while decoding an inbound WebSocket action.
#[derive(Debug, Error)]
pub enum ActionParseError {
    /// Frame was not valid JSON or its data payload did not match the action.
    #[error("malformed action payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The action name is not part of the protocol.
    #[error("unsupported action `{0}`")]
    Unsupported(String),
}

#[derive(Debug, Deserialize)]
struct RawAction {
    action: String,
    #[serde(default)]
    data: Value,
}

impl ClientAction {
    /// Parse one inbound WebSocket text frame.
    pub fn from_json_str(text: &str) -> Result<Self, ActionParseError> {
        let raw: RawAction = serde_json::from_str(text)?;
        let data = match raw.data {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        let action = match raw.action.as_str() {
            "sync_state" => ClientAction::SyncState,
            "start_round" => ClientAction::StartRound(serde_json::from_value(data)?),
            "submit_answer" => ClientAction::SubmitAnswer(serde_json::from_value(data)?),
            "reveal_answer" => ClientAction::RevealAnswer,
            "submit_guess" => ClientAction::SubmitGuess(serde_json::from_value(data)?),
            "finish_room" => ClientAction::FinishRoom,
            other => return Err(ActionParseError::Unsupported(other.to_string())),
        };

        Ok(action)
    }
}
