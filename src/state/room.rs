use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{config::Question, services::scoring, state::state_machine::RoomStatus};

/// Player info tracked for the lifetime of a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable identifier handed back to the client on create/join.
    pub id: Uuid,
    /// Display name, unique within the room.
    pub name: String,
    /// Current score. Derived data: always recomputed from the guess
    /// ledger, never patched incrementally.
    pub score: i64,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Whether the player currently has a live connection.
    pub is_connected: bool,
    /// Join timestamp; player iteration order doubles as join order.
    pub joined_at: OffsetDateTime,
}

/// One player's answer to the current round's question.
///
/// Keyed by author within [`Round::answers`]; resubmission replaces text and
/// embedding but keeps the answer id stable.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Identifier used by guess submissions to reference this answer.
    pub id: Uuid,
    /// Author of the answer.
    pub player_id: Uuid,
    /// Raw answer text as typed.
    pub text: String,
    /// Normalized text the embedding was computed from.
    pub normalized_text: String,
    /// Embedding vector supplied by the similarity provider. Never inspected
    /// here, only stored and fed back to the provider symmetrically.
    pub embedding: Vec<f32>,
}

/// One author-guess on a revealed answer.
#[derive(Debug, Clone)]
pub struct Guess {
    /// Answer being guessed on.
    pub answer_id: Uuid,
    /// Player making the guess.
    pub guesser_id: Uuid,
    /// Player accused of having written the answer.
    pub guessed_player_id: Uuid,
    /// Whether the accusation matched the actual author.
    pub is_correct: bool,
    /// Points awarded for this single guess event.
    pub points_awarded: i64,
}

/// One question-answer-guess cycle within a room.
#[derive(Debug, Clone)]
pub struct Round {
    /// 1-based round number, unique per room.
    pub number: u32,
    /// The question asked this round (owned copy of the pool entry).
    pub question: Question,
    /// Answers keyed by author id, preserving submission order.
    pub answers: IndexMap<Uuid, Answer>,
    /// Guess ledger for this round; upserted by (answer, guesser).
    pub guesses: Vec<Guess>,
    /// Answer currently revealed for guessing, once one has been picked.
    pub revealed_answer: Option<Uuid>,
}

impl Round {
    /// Create round `number` asking `question`.
    pub fn new(number: u32, question: Question) -> Self {
        Self {
            number,
            question,
            answers: IndexMap::new(),
            guesses: Vec::new(),
            revealed_answer: None,
        }
    }

    /// Insert or replace the answer of `player_id`, returning the answer id.
    ///
    /// The id survives resubmission so guesses already referencing it stay
    /// valid; only text and embedding are replaced.
    pub fn upsert_answer(
        &mut self,
        player_id: Uuid,
        text: String,
        normalized_text: String,
        embedding: Vec<f32>,
    ) -> Uuid {
        match self.answers.get_mut(&player_id) {
            Some(existing) => {
                existing.text = text;
                existing.normalized_text = normalized_text;
                existing.embedding = embedding;
                existing.id
            }
            None => {
                let id = Uuid::new_v4();
                self.answers.insert(
                    player_id,
                    Answer {
                        id,
                        player_id,
                        text,
                        normalized_text,
                        embedding,
                    },
                );
                id
            }
        }
    }

    /// Look up an answer of this round by its id.
    pub fn answer(&self, answer_id: Uuid) -> Option<&Answer> {
        self.answers.values().find(|answer| answer.id == answer_id)
    }

    /// Insert or replace the guess keyed by (answer, guesser).
    pub fn upsert_guess(&mut self, guess: Guess) {
        match self.guesses.iter_mut().find(|existing| {
            existing.answer_id == guess.answer_id && existing.guesser_id == guess.guesser_id
        }) {
            Some(existing) => *existing = guess,
            None => self.guesses.push(guess),
        }
    }

    /// Number of distinct players who have guessed on `answer_id`.
    pub fn guessers_on(&self, answer_id: Uuid) -> usize {
        self.guesses
            .iter()
            .filter(|guess| guess.answer_id == answer_id)
            .count()
    }
}

/// End-of-game compatibility result for one unordered player pair.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// First member of the pair (earlier join time).
    pub player_one: Uuid,
    /// Second member of the pair.
    pub player_two: Uuid,
    /// Average embedding similarity of co-answered rounds, in [0,1].
    pub answer_similarity: f64,
    /// Average of the pair's individual guess accuracies, in [0,1].
    pub correct_guess_rate: f64,
    /// Share of the pair's guesses that targeted each other, in [0,1].
    pub mutual_selection_rate: f64,
    /// Blended percentage in [0,100], rounded to 2 decimals.
    pub sync_percentage: f64,
}

/// One independent play session and everything it owns.
#[derive(Debug, Clone)]
pub struct Room {
    /// Human-readable room code (6 uppercase alphanumeric characters).
    pub code: String,
    /// Lifecycle status driven by the state machine.
    pub status: RoomStatus,
    /// Monotonic round counter; 0 until the first round starts.
    pub current_round: u32,
    /// Round ceiling fixed at creation.
    pub max_rounds: u32,
    /// Player that created the room.
    pub host: Option<Uuid>,
    /// Question currently in play, if any.
    pub active_question: Option<Question>,
    /// Answer currently revealed for guessing, if any.
    pub revealed_answer: Option<Uuid>,
    /// Players keyed by id; insertion order is join order.
    pub players: IndexMap<Uuid, Player>,
    /// Rounds in play order (`rounds[n - 1]` is round `n`).
    pub rounds: Vec<Round>,
    /// Pairwise results, populated once by the finish transition.
    pub sync_results: Vec<SyncResult>,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Last mutation timestamp.
    pub updated_at: OffsetDateTime,
}

impl Room {
    /// Create an empty room in the lobby.
    pub fn new(code: String, max_rounds: u32) -> Self {
        let timestamp = OffsetDateTime::now_utc();
        Self {
            code,
            status: RoomStatus::Lobby,
            current_round: 0,
            max_rounds,
            host: None,
            active_question: None,
            revealed_answer: None,
            players: IndexMap::new(),
            rounds: Vec::new(),
            sync_results: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Add a player, returning its id. The first host-flagged player becomes
    /// the room host. Name uniqueness is the caller's guard.
    pub fn add_player(&mut self, name: String, is_host: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.players.insert(
            id,
            Player {
                id,
                name,
                score: 0,
                is_host,
                is_connected: true,
                joined_at: OffsetDateTime::now_utc(),
            },
        );
        if is_host && self.host.is_none() {
            self.host = Some(id);
        }
        self.touch();
        id
    }

    /// Whether `name` is already taken in this room.
    pub fn has_player_named(&self, name: &str) -> bool {
        self.players.values().any(|player| player.name == name)
    }

    /// The round matching `current_round`, if one exists.
    pub fn active_round(&self) -> Option<&Round> {
        self.current_round
            .checked_sub(1)
            .and_then(|index| self.rounds.get(index as usize))
    }

    /// Mutable access to the round matching `current_round`.
    pub fn active_round_mut(&mut self) -> Option<&mut Round> {
        self.current_round
            .checked_sub(1)
            .and_then(|index| self.rounds.get_mut(index as usize))
    }

    /// Iterate every guess made in this room, across all rounds.
    pub fn all_guesses(&self) -> impl Iterator<Item = &Guess> {
        self.rounds.iter().flat_map(|round| round.guesses.iter())
    }

    /// Lifetime guess accuracy of `player_id` within this room:
    /// correct / total, or 0.0 when the player never guessed.
    pub fn correct_guess_rate(&self, player_id: Uuid) -> f64 {
        let mut total = 0usize;
        let mut correct = 0usize;
        for guess in self.all_guesses() {
            if guess.guesser_id == player_id {
                total += 1;
                if guess.is_correct {
                    correct += 1;
                }
            }
        }
        if total == 0 {
            return 0.0;
        }
        correct as f64 / total as f64
    }

    /// Recompute every player's score from the complete guess ledger.
    ///
    /// `score = Σ points of guesses made + bonus × times correctly identified
    /// as author`. Runs on every guess submission so that a corrected guess
    /// never double-credits anyone.
    pub fn recalculate_scores(&mut self) {
        let bonus = scoring::points_for_author_caught(true);
        let ids: Vec<Uuid> = self.players.keys().copied().collect();
        for id in ids {
            let mut guess_points = 0i64;
            let mut times_caught = 0i64;
            for guess in self.rounds.iter().flat_map(|round| round.guesses.iter()) {
                if guess.guesser_id == id {
                    guess_points += guess.points_awarded;
                }
                if guess.is_correct && guess.guessed_player_id == id {
                    times_caught += 1;
                }
            }
            if let Some(player) = self.players.get_mut(&id) {
                player.score = guess_points + times_caught * bonus;
            }
        }
    }

    /// Players ordered by score descending, join time breaking ties.
    pub fn leaderboard(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        // Stable sort keeps join order within equal scores.
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    /// Bump the updated-at timestamp after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Question, QuestionCategory};

    fn question() -> Question {
        Question {
            id: 1,
            text: "What is your chaotic comfort food combo?".into(),
            category: QuestionCategory::Funny,
            active: true,
        }
    }

    fn room_with_players(count: usize) -> (Room, Vec<Uuid>) {
        let mut room = Room::new("ABC123".into(), 5);
        let ids = (0..count)
            .map(|i| room.add_player(format!("player-{i}"), i == 0))
            .collect();
        (room, ids)
    }

    #[test]
    fn resubmitted_answer_replaces_but_keeps_id() {
        let (mut room, ids) = room_with_players(2);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;

        let round = room.active_round_mut().unwrap();
        let first = round.upsert_answer(ids[0], "pizza".into(), "pizza".into(), vec![1.0]);
        let second = round.upsert_answer(ids[0], "ramen".into(), "ramen".into(), vec![0.5]);

        assert_eq!(first, second);
        assert_eq!(round.answers.len(), 1);
        let answer = round.answer(first).unwrap();
        assert_eq!(answer.text, "ramen");
        assert_eq!(answer.embedding, vec![0.5]);
    }

    #[test]
    fn resubmitted_guess_replaces_and_scores_do_not_double_count() {
        let (mut room, ids) = room_with_players(3);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;

        let answer_id = room.active_round_mut().unwrap().upsert_answer(
            ids[0],
            "x".into(),
            "x".into(),
            vec![1.0],
        );

        // Wrong guess first, then corrected to the real author.
        for (guessed, is_correct) in [(ids[2], false), (ids[0], true)] {
            room.active_round_mut().unwrap().upsert_guess(Guess {
                answer_id,
                guesser_id: ids[1],
                guessed_player_id: guessed,
                is_correct,
                points_awarded: scoring::points_for_guess(is_correct),
            });
            room.recalculate_scores();
        }

        let round = room.active_round().unwrap();
        assert_eq!(round.guesses.len(), 1);
        assert_eq!(round.guessers_on(answer_id), 1);

        // Latest guess only: +10 for the guesser, +2 for the caught author.
        assert_eq!(room.players[&ids[1]].score, 10);
        assert_eq!(room.players[&ids[0]].score, 2);
        assert_eq!(room.players[&ids[2]].score, 0);
    }

    #[test]
    fn correct_guess_rate_counts_only_own_guesses() {
        let (mut room, ids) = room_with_players(3);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;
        let answer_id = room.active_round_mut().unwrap().upsert_answer(
            ids[0],
            "x".into(),
            "x".into(),
            vec![1.0],
        );

        room.active_round_mut().unwrap().upsert_guess(Guess {
            answer_id,
            guesser_id: ids[1],
            guessed_player_id: ids[0],
            is_correct: true,
            points_awarded: 10,
        });
        room.active_round_mut().unwrap().upsert_guess(Guess {
            answer_id,
            guesser_id: ids[2],
            guessed_player_id: ids[1],
            is_correct: false,
            points_awarded: 0,
        });

        assert_eq!(room.correct_guess_rate(ids[1]), 1.0);
        assert_eq!(room.correct_guess_rate(ids[2]), 0.0);
        // Never guessed at all.
        assert_eq!(room.correct_guess_rate(ids[0]), 0.0);
    }

    #[test]
    fn leaderboard_orders_by_score_then_join_time() {
        let (mut room, ids) = room_with_players(3);
        room.players.get_mut(&ids[1]).unwrap().score = 12;
        room.players.get_mut(&ids[2]).unwrap().score = 12;

        let board = room.leaderboard();
        let ordered: Vec<Uuid> = board.iter().map(|player| player.id).collect();
        // Equal scores resolve by join order: ids[1] joined before ids[2].
        assert_eq!(ordered, vec![ids[1], ids[2], ids[0]]);
    }
}
