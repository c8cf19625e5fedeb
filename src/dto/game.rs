use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::QuestionCategory,
    dto::format_timestamp,
    state::{
        room::{Player, Room, SyncResult},
        state_machine::RoomStatus,
    },
};

/// Payload used to open a brand-new room with its host player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    /// Display name of the host.
    #[validate(length(min = 1, max = 32))]
    pub name: String,
}

/// Payload used to join an existing room by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Code of the room to join.
    #[validate(length(equal = 6))]
    pub room_code: String,
    /// Display name, unique within the room.
    #[validate(length(min = 1, max = 32))]
    pub name: String,
}

/// Payload used to open the next round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartRoundRequest {
    /// Code of the room.
    #[validate(length(equal = 6))]
    pub room_code: String,
    /// Specific question to ask; picked at random from the pool when omitted.
    #[serde(default)]
    pub question_id: Option<u32>,
}

/// Payload used to submit (or replace) the caller's answer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Code of the room.
    #[validate(length(equal = 6))]
    pub room_code: String,
    /// Answering player.
    pub player_id: Uuid,
    /// Free-text answer.
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

/// Payload used to submit (or replace) an author guess.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitGuessRequest {
    /// Code of the room.
    #[validate(length(equal = 6))]
    pub room_code: String,
    /// Guessing player.
    pub player_id: Uuid,
    /// Answer being guessed on (the currently revealed one).
    pub answer_id: Uuid,
    /// Player accused of authorship.
    pub guessed_player_id: Uuid,
}

/// Public projection of a player, ordered into the leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current derived score.
    pub score: i64,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Whether the player currently has a live connection.
    pub is_connected: bool,
    /// RFC 3339 join timestamp.
    pub joined_at: String,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
            is_host: player.is_host,
            is_connected: player.is_connected,
            joined_at: format_timestamp(player.joined_at),
        }
    }
}

/// Full room snapshot broadcast after every successful mutating action.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// Room code.
    pub room_code: String,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Current round number (0 before the first round).
    pub round: u32,
    /// Round ceiling.
    pub max_rounds: u32,
    /// Text of the question in play, if any.
    pub question: Option<String>,
    /// Category of the question in play, if any.
    pub question_category: Option<QuestionCategory>,
    /// Identifier of the currently revealed answer, if any.
    pub revealed_answer_id: Option<Uuid>,
    /// Text of the currently revealed answer, if any.
    pub revealed_answer_text: Option<String>,
    /// Leaderboard ordered by score descending, then join time.
    pub players: Vec<PlayerSummary>,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        let round = room.active_round();
        let question = room.active_question.as_ref();
        let revealed = room
            .revealed_answer
            .and_then(|id| round.and_then(|r| r.answer(id)));

        Self {
            room_code: room.code.clone(),
            status: room.status,
            round: room.current_round,
            max_rounds: room.max_rounds,
            question: question.map(|q| q.text.clone()),
            question_category: question.map(|q| q.category),
            revealed_answer_id: revealed.map(|answer| answer.id),
            revealed_answer_text: revealed.map(|answer| answer.text.clone()),
            players: room.leaderboard().into_iter().map(Into::into).collect(),
        }
    }
}

/// Snapshot extended with the identity handed to a creating/joining player.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomWelcome {
    /// Current room snapshot.
    #[serde(flatten)]
    pub room: RoomSnapshot,
    /// Identifier assigned to the caller.
    pub player_id: Uuid,
    /// Echo of the caller's accepted name.
    pub player_name: String,
}

/// Snapshot extended with the id of the answer just upserted.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerAccepted {
    /// Current room snapshot.
    #[serde(flatten)]
    pub room: RoomSnapshot,
    /// Identifier of the caller's answer (stable across resubmission).
    pub answer_id: Uuid,
}

/// Outcome of a single guess event.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessOutcome {
    /// Whether the accusation matched the author.
    pub is_correct: bool,
    /// Points awarded to the guesser for this guess.
    pub points_awarded: i64,
}

/// Snapshot extended with the caller's guess outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessAccepted {
    /// Current room snapshot.
    #[serde(flatten)]
    pub room: RoomSnapshot,
    /// Outcome of the guess just recorded.
    pub guess: GuessOutcome,
    /// Whether this guess completed the reveal (room moved to scoreboard).
    pub reveal_complete: bool,
}

/// One pairwise sync result, with names resolved for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncPairSummary {
    /// First member of the pair (earlier join time).
    pub player_one: Uuid,
    /// Second member of the pair.
    pub player_two: Uuid,
    /// Display name of the first member.
    pub player_one_name: String,
    /// Display name of the second member.
    pub player_two_name: String,
    /// Average embedding similarity of co-answered rounds.
    pub answer_similarity: f64,
    /// Average of the pair's individual guess accuracies.
    pub correct_guess_rate: f64,
    /// Share of the pair's guesses that targeted each other.
    pub mutual_selection_rate: f64,
    /// Blended percentage in [0,100].
    pub sync_percentage: f64,
}

impl SyncPairSummary {
    /// Resolve player names against the room roster.
    pub fn from_result(result: &SyncResult, room: &Room) -> Self {
        let name_of = |id: Uuid| {
            room.players
                .get(&id)
                .map(|player| player.name.clone())
                .unwrap_or_default()
        };

        Self {
            player_one: result.player_one,
            player_two: result.player_two,
            player_one_name: name_of(result.player_one),
            player_two_name: name_of(result.player_two),
            answer_similarity: result.answer_similarity,
            correct_guess_rate: result.correct_guess_rate,
            mutual_selection_rate: result.mutual_selection_rate,
            sync_percentage: result.sync_percentage,
        }
    }
}

/// Snapshot extended with the final pairwise results, best pairs first.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalResults {
    /// Current room snapshot.
    #[serde(flatten)]
    pub room: RoomSnapshot,
    /// Pairwise sync results ordered by percentage descending.
    pub pairs: Vec<SyncPairSummary>,
}
