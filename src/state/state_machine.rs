use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Players are gathering; no round has started yet.
    Lobby,
    /// A question is open and players may submit answers.
    Question,
    /// One answer is revealed and players are guessing its author.
    Reveal,
    /// Everyone eligible has guessed; scores are on display.
    Scoreboard,
    /// Terminal state: sync results are computed, nothing may change.
    Finished,
}

/// Events that move a room between statuses.
///
/// Answer and guess submission do not appear here: they mutate round data
/// without changing status (guess submission reaches [`RoomEvent::CompleteReveal`]
/// through the reveal-completion rule instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Open the next round with a fresh question.
    StartRound,
    /// Reveal one submitted answer for guessing (repeatable while revealing).
    RevealAnswer,
    /// Every eligible guesser has guessed on the revealed answer.
    CompleteReveal,
    /// Host ends the game; sync results are computed.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the room was in when the invalid event was received.
    pub from: RoomStatus,
    /// The event that cannot be applied from this status.
    pub event: RoomEvent,
}

impl RoomStatus {
    /// Whether answer submission is legal in this status.
    pub fn accepts_answers(self) -> bool {
        matches!(self, RoomStatus::Question)
    }

    /// Whether guess submission is legal in this status.
    pub fn accepts_guesses(self) -> bool {
        matches!(self, RoomStatus::Reveal)
    }

    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Finished)
    }

    /// Compute the status reached by applying `event`, if the transition is valid.
    ///
    /// `Finished` is terminal: no event leaves it.
    pub fn apply(self, event: RoomEvent) -> Result<RoomStatus, InvalidTransition> {
        let next = match (self, event) {
            (RoomStatus::Finished, event) => {
                return Err(InvalidTransition { from: self, event });
            }
            // A new round may open from the lobby, from the scoreboard, or
            // over an abandoned question/reveal, as long as the game is not over.
            (_, RoomEvent::StartRound) => RoomStatus::Question,
            (RoomStatus::Question | RoomStatus::Reveal, RoomEvent::RevealAnswer) => {
                RoomStatus::Reveal
            }
            (RoomStatus::Reveal, RoomEvent::CompleteReveal) => RoomStatus::Scoreboard,
            (_, RoomEvent::Finish) => RoomStatus::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
