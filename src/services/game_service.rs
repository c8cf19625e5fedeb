use rand::{Rng, seq::IndexedRandom};
use uuid::Uuid;

use crate::{
    config::Question,
    dto::game::{
        AnswerAccepted, FinalResults, GuessAccepted, GuessOutcome, RoomSnapshot, RoomWelcome,
        SyncPairSummary,
    },
    error::GameError,
    services::{room_events, scoring, sync_service, text},
    state::{
        SharedState,
        room::{Guess, Room, Round},
        state_machine::RoomEvent,
    },
};

const ROOM_CODE_LENGTH: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_ATTEMPTS: usize = 40;

/// Create a fresh room with its host player.
pub async fn create_room(state: &SharedState, name: &str) -> Result<RoomWelcome, GameError> {
    let name = name.trim().to_string();
    let max_rounds = state.config().max_rounds();

    for _ in 0..ROOM_CODE_ATTEMPTS {
        let code = generate_room_code();
        let mut room = Room::new(code, max_rounds);
        let player_id = room.add_player(name.clone(), true);
        let snapshot = RoomSnapshot::from(&room);
        if state.try_insert_room(room).is_some() {
            return Ok(RoomWelcome {
                room: snapshot,
                player_id,
                player_name: name,
            });
        }
    }

    Err(GameError::ResourceUnavailable(
        "unable to generate a unique room code".into(),
    ))
}

/// Join an existing room by code, claiming a display name.
pub async fn join_room(
    state: &SharedState,
    room_code: &str,
    name: &str,
) -> Result<RoomWelcome, GameError> {
    let code = normalize_code(room_code);
    let name = name.trim().to_string();
    let max_players = state.config().max_players();

    let welcome = state
        .with_room(&code, |room| {
            if room.status.is_terminal() {
                return Err(GameError::InvalidPhase(
                    "this room has already finished".into(),
                ));
            }
            if room.players.len() >= max_players {
                return Err(GameError::CapacityExceeded("room is full".into()));
            }
            if room.has_player_named(&name) {
                return Err(GameError::Conflict("name already taken in this room".into()));
            }

            let player_id = room.add_player(name.clone(), false);
            Ok(RoomWelcome {
                room: RoomSnapshot::from(&*room),
                player_id,
                player_name: name.clone(),
            })
        })
        .await?;

    room_events::broadcast_state_updated(state, &code, &welcome.room);
    Ok(welcome)
}

/// Open the next round, asking `question_id` or a random active question.
pub async fn start_round(
    state: &SharedState,
    room_code: &str,
    question_id: Option<u32>,
) -> Result<RoomSnapshot, GameError> {
    let code = normalize_code(room_code);
    let question = select_question(state, question_id)?;

    let snapshot = state
        .with_room(&code, move |room| {
            let next = room.status.apply(RoomEvent::StartRound)?;
            if room.current_round >= room.max_rounds {
                return Err(GameError::CapacityExceeded("maximum rounds reached".into()));
            }

            let number = room.current_round + 1;
            room.rounds.push(Round::new(number, question.clone()));
            room.current_round = number;
            room.active_question = Some(question);
            room.revealed_answer = None;
            room.status = next;
            room.touch();

            Ok(RoomSnapshot::from(&*room))
        })
        .await?;

    room_events::broadcast_state_updated(state, &code, &snapshot);
    Ok(snapshot)
}

/// Submit (or replace) a player's answer to the current round.
///
/// Normalization and embedding happen before the room's exclusive section is
/// acquired: a slow or failing provider never blocks other actions on the
/// room, and a provider failure aborts the action with room state untouched.
pub async fn submit_answer(
    state: &SharedState,
    room_code: &str,
    player_id: Uuid,
    answer_text: &str,
) -> Result<AnswerAccepted, GameError> {
    let code = normalize_code(room_code);
    let normalized = text::normalize_text(answer_text);
    let embedding = state.provider().embed(&normalized).await?;
    let stored_text = answer_text.trim().to_string();

    let accepted = state
        .with_room(&code, move |room| {
            if !room.status.accepts_answers() {
                return Err(GameError::InvalidPhase(
                    "room is not accepting answers".into(),
                ));
            }
            if !room.players.contains_key(&player_id) {
                return Err(GameError::NotFound("player not found in room".into()));
            }
            let round = room
                .active_round_mut()
                .ok_or_else(|| GameError::NotFound("no active round found".into()))?;

            let answer_id = round.upsert_answer(player_id, stored_text, normalized, embedding);
            room.touch();

            Ok(AnswerAccepted {
                room: RoomSnapshot::from(&*room),
                answer_id,
            })
        })
        .await?;

    room_events::broadcast_state_updated(state, &code, &accepted.room);
    Ok(accepted)
}

/// Reveal one answer of the current round, picked uniformly at random.
///
/// The pick is uniform over all of the round's answers, including on repeated
/// reveals within the same round: re-revealing always re-picks and may show
/// an answer again.
pub async fn reveal_answer(state: &SharedState, room_code: &str) -> Result<RoomSnapshot, GameError> {
    let code = normalize_code(room_code);

    let snapshot = state
        .with_room(&code, |room| {
            let next = room.status.apply(RoomEvent::RevealAnswer)?;
            let round = room
                .active_round()
                .ok_or_else(|| GameError::NotFound("no active round found".into()))?;

            let answer_ids: Vec<Uuid> = round.answers.values().map(|answer| answer.id).collect();
            let revealed = answer_ids
                .choose(&mut rand::rng())
                .copied()
                .ok_or_else(|| {
                    GameError::ResourceUnavailable("no answers submitted for this round".into())
                })?;

            if let Some(round) = room.active_round_mut() {
                round.revealed_answer = Some(revealed);
            }
            room.revealed_answer = Some(revealed);
            room.status = next;
            room.touch();

            Ok(RoomSnapshot::from(&*room))
        })
        .await?;

    room_events::broadcast_state_updated(state, &code, &snapshot);
    Ok(snapshot)
}

/// Submit (or replace) an author guess on an answer of the current round.
///
/// Every player score in the room is recomputed from the full guess ledger
/// inside the same exclusive section, so a corrected guess never
/// double-credits. When every eligible guesser has guessed on the answer the
/// room moves to the scoreboard.
pub async fn submit_guess(
    state: &SharedState,
    room_code: &str,
    guesser_id: Uuid,
    answer_id: Uuid,
    guessed_player_id: Uuid,
) -> Result<GuessAccepted, GameError> {
    let code = normalize_code(room_code);

    let accepted = state
        .with_room(&code, move |room| {
            if !room.status.accepts_guesses() {
                return Err(GameError::InvalidPhase("room is not in reveal phase".into()));
            }
            if !room.players.contains_key(&guesser_id) {
                return Err(GameError::NotFound("player not found in room".into()));
            }
            if !room.players.contains_key(&guessed_player_id) {
                return Err(GameError::NotFound("guessed player not found in room".into()));
            }

            let expected_guessers = room.players.len().saturating_sub(1);
            let round = room
                .active_round_mut()
                .ok_or_else(|| GameError::NotFound("no active round found".into()))?;
            let author = round
                .answer(answer_id)
                .map(|answer| answer.player_id)
                .ok_or_else(|| GameError::NotFound("answer not found in current round".into()))?;

            if guesser_id == author {
                return Err(GameError::Conflict(
                    "answer author cannot guess own answer".into(),
                ));
            }

            let is_correct = guessed_player_id == author;
            let points_awarded = scoring::points_for_guess(is_correct);
            round.upsert_guess(Guess {
                answer_id,
                guesser_id,
                guessed_player_id,
                is_correct,
                points_awarded,
            });
            let submitted_guesses = round.guessers_on(answer_id);

            room.recalculate_scores();

            // Reveal-completion rule: re-checked after every guess.
            let reveal_complete = submitted_guesses >= expected_guessers;
            if reveal_complete {
                room.status = room.status.apply(RoomEvent::CompleteReveal)?;
            }
            room.touch();

            Ok(GuessAccepted {
                room: RoomSnapshot::from(&*room),
                guess: GuessOutcome {
                    is_correct,
                    points_awarded,
                },
                reveal_complete,
            })
        })
        .await?;

    room_events::broadcast_state_updated(state, &code, &accepted.room);
    Ok(accepted)
}

/// Finish the game: compute pairwise sync results and seal the room.
///
/// Results are replaced wholesale, so a repeated finish recomputes the same
/// set instead of duplicating rows.
pub async fn finish_room(state: &SharedState, room_code: &str) -> Result<FinalResults, GameError> {
    let code = normalize_code(room_code);
    let provider = state.provider();

    let results = state
        .with_room(&code, move |room| {
            if room.players.len() < 2 {
                return Err(GameError::ResourceUnavailable(
                    "need at least two players to compute sync".into(),
                ));
            }

            if !room.status.is_terminal() {
                room.status = room.status.apply(RoomEvent::Finish)?;
            }
            room.active_question = None;
            room.sync_results = sync_service::compute_sync_results(room, provider.as_ref());
            room.touch();

            let mut pairs: Vec<SyncPairSummary> = room
                .sync_results
                .iter()
                .map(|result| SyncPairSummary::from_result(result, room))
                .collect();
            pairs.sort_by(|a, b| {
                b.sync_percentage
                    .partial_cmp(&a.sync_percentage)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            Ok(FinalResults {
                room: RoomSnapshot::from(&*room),
                pairs,
            })
        })
        .await?;

    room_events::broadcast_final_results(state, &code, &results);
    Ok(results)
}

/// Read-only snapshot of the room's current state.
pub async fn room_snapshot(state: &SharedState, room_code: &str) -> Result<RoomSnapshot, GameError> {
    let code = normalize_code(room_code);
    state
        .with_room(&code, |room| Ok(RoomSnapshot::from(&*room)))
        .await
}

fn normalize_code(room_code: &str) -> String {
    room_code.trim().to_uppercase()
}

fn select_question(state: &SharedState, question_id: Option<u32>) -> Result<Question, GameError> {
    match question_id {
        Some(id) => state
            .config()
            .active_question(id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("question `{id}` not found"))),
        None => {
            let pool: Vec<&Question> = state.config().active_questions().collect();
            pool.choose(&mut rand::rng())
                .map(|question| (*question).clone())
                .ok_or_else(|| {
                    GameError::ResourceUnavailable("no active questions available".into())
                })
        }
    }
}

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        services::embedding::HashEmbedder,
        state::{AppState, state_machine::RoomStatus},
    };

    fn test_state() -> SharedState {
        AppState::new(AppConfig::default(), Arc::new(HashEmbedder))
    }

    /// Create a room with `extra` joined players on top of the host.
    async fn room_with_players(
        state: &SharedState,
        extra: usize,
    ) -> (String, Vec<Uuid>) {
        let host = create_room(state, "host").await.unwrap();
        let code = host.room.room_code.clone();
        let mut ids = vec![host.player_id];
        for index in 0..extra {
            let joined = join_room(state, &code, &format!("guest-{index}"))
                .await
                .unwrap();
            ids.push(joined.player_id);
        }
        (code, ids)
    }

    #[tokio::test]
    async fn create_room_assigns_code_and_host() {
        let state = test_state();
        let welcome = create_room(&state, "  host  ").await.unwrap();

        assert_eq!(welcome.room.room_code.len(), 6);
        assert!(
            welcome
                .room
                .room_code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert_eq!(welcome.player_name, "host");
        assert_eq!(welcome.room.status, RoomStatus::Lobby);
        assert_eq!(welcome.room.round, 0);
        assert_eq!(welcome.room.players.len(), 1);
        assert!(welcome.room.players[0].is_host);
        assert!(state.contains_room(&welcome.room.room_code));
    }

    #[tokio::test]
    async fn join_room_rejects_unknown_code_and_duplicate_name() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 0).await;

        let err = join_room(&state, "ZZZZZZ", "guest").await.unwrap_err();
        assert!(matches!(err, GameError::NotFound(_)));

        join_room(&state, &code, "guest").await.unwrap();
        let err = join_room(&state, &code, "guest").await.unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
    }

    #[tokio::test]
    async fn join_room_enforces_capacity() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 11).await;

        let err = join_room(&state, &code, "too-many").await.unwrap_err();
        assert!(matches!(err, GameError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn start_round_opens_question_phase_until_round_ceiling() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 1).await;

        for round in 1..=5u32 {
            let snapshot = start_round(&state, &code, None).await.unwrap();
            assert_eq!(snapshot.status, RoomStatus::Question);
            assert_eq!(snapshot.round, round);
            assert!(snapshot.question.is_some());
        }

        let err = start_round(&state, &code, None).await.unwrap_err();
        assert!(matches!(err, GameError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn start_round_with_specific_question() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 1).await;

        let expected = state.config().active_question(3).unwrap().text.clone();
        let snapshot = start_round(&state, &code, Some(3)).await.unwrap();
        assert_eq!(snapshot.question.as_deref(), Some(expected.as_str()));

        let err = start_round(&state, &code, Some(99)).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound(_)));
    }

    #[tokio::test]
    async fn submit_answer_requires_question_phase() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 1).await;

        let err = submit_answer(&state, &code, ids[0], "too early")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase(_)));
    }

    #[tokio::test]
    async fn resubmitted_answer_leaves_single_row_with_latest_text() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 1).await;
        start_round(&state, &code, None).await.unwrap();

        let first = submit_answer(&state, &code, ids[0], "pizza").await.unwrap();
        let second = submit_answer(&state, &code, ids[0], "ramen").await.unwrap();
        assert_eq!(first.answer_id, second.answer_id);

        state
            .with_room(&code, |room| {
                let round = room.active_round().unwrap();
                assert_eq!(round.answers.len(), 1);
                assert_eq!(round.answer(first.answer_id).unwrap().text, "ramen");
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reveal_requires_submitted_answers() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 1).await;
        start_round(&state, &code, None).await.unwrap();

        let err = reveal_answer(&state, &code).await.unwrap_err();
        assert!(matches!(err, GameError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn reveal_picks_a_submitted_answer_and_may_repick() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 2).await;
        start_round(&state, &code, None).await.unwrap();

        let a = submit_answer(&state, &code, ids[0], "x").await.unwrap();
        let b = submit_answer(&state, &code, ids[1], "y").await.unwrap();

        let snapshot = reveal_answer(&state, &code).await.unwrap();
        assert_eq!(snapshot.status, RoomStatus::Reveal);
        let revealed = snapshot.revealed_answer_id.unwrap();
        assert!(revealed == a.answer_id || revealed == b.answer_id);
        assert!(snapshot.revealed_answer_text.is_some());

        // Re-reveal within the same round always re-picks.
        let again = reveal_answer(&state, &code).await.unwrap();
        assert_eq!(again.status, RoomStatus::Reveal);
        let repicked = again.revealed_answer_id.unwrap();
        assert!(repicked == a.answer_id || repicked == b.answer_id);
    }

    #[tokio::test]
    async fn self_guess_is_rejected_without_recording_anything() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 2).await;
        start_round(&state, &code, None).await.unwrap();
        let answer = submit_answer(&state, &code, ids[0], "mine").await.unwrap();
        reveal_answer(&state, &code).await.unwrap();

        let err = submit_guess(&state, &code, ids[0], answer.answer_id, ids[1])
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));

        state
            .with_room(&code, |room| {
                assert!(room.active_round().unwrap().guesses.is_empty());
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn guess_outside_reveal_phase_is_rejected() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 1).await;
        start_round(&state, &code, None).await.unwrap();
        let answer = submit_answer(&state, &code, ids[0], "x").await.unwrap();

        let err = submit_guess(&state, &code, ids[1], answer.answer_id, ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase(_)));
    }

    #[tokio::test]
    async fn end_to_end_round_with_three_players() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 2).await;
        let (a, b) = (ids[0], ids[1]);

        start_round(&state, &code, None).await.unwrap();
        let answer_a = submit_answer(&state, &code, a, "x").await.unwrap();
        let answer_b = submit_answer(&state, &code, b, "y").await.unwrap();
        // C abstains.

        let snapshot = reveal_answer(&state, &code).await.unwrap();
        let revealed = snapshot.revealed_answer_id.unwrap();
        let author = if revealed == answer_a.answer_id { a } else { b };
        assert!(revealed == answer_a.answer_id || revealed == answer_b.answer_id);

        let guessers: Vec<Uuid> = ids.iter().copied().filter(|id| *id != author).collect();

        // First eligible guesser finds the author.
        let first = submit_guess(&state, &code, guessers[0], revealed, author)
            .await
            .unwrap();
        assert!(first.guess.is_correct);
        assert_eq!(first.guess.points_awarded, 10);
        assert!(!first.reveal_complete);
        assert_eq!(first.room.status, RoomStatus::Reveal);

        // Second eligible guesser accuses the wrong player.
        let second = submit_guess(&state, &code, guessers[1], revealed, guessers[0])
            .await
            .unwrap();
        assert!(!second.guess.is_correct);
        assert_eq!(second.guess.points_awarded, 0);
        assert!(second.reveal_complete);
        assert_eq!(second.room.status, RoomStatus::Scoreboard);

        let score_of = |snapshot: &RoomSnapshot, id: Uuid| {
            snapshot
                .players
                .iter()
                .find(|player| player.id == id)
                .unwrap()
                .score
        };
        // Correct guesser earned 10, the caught author earned the 2-point
        // bonus, the wrong guesser earned nothing.
        assert_eq!(score_of(&second.room, guessers[0]), 10);
        assert_eq!(score_of(&second.room, author), 2);
        assert_eq!(score_of(&second.room, guessers[1]), 0);
    }

    #[tokio::test]
    async fn corrected_guess_never_double_counts() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 2).await;
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        start_round(&state, &code, None).await.unwrap();
        let answer = submit_answer(&state, &code, a, "x").await.unwrap();
        reveal_answer(&state, &code).await.unwrap();

        // B guesses wrong, then corrects to the real author.
        submit_guess(&state, &code, b, answer.answer_id, c)
            .await
            .unwrap();
        let corrected = submit_guess(&state, &code, b, answer.answer_id, a)
            .await
            .unwrap();
        assert!(corrected.guess.is_correct);
        // One distinct guesser out of two eligible: reveal still open.
        assert!(!corrected.reveal_complete);

        let score_of = |id: Uuid| {
            corrected
                .room
                .players
                .iter()
                .find(|player| player.id == id)
                .unwrap()
                .score
        };
        assert_eq!(score_of(b), 10);
        assert_eq!(score_of(a), 2);

        state
            .with_room(&code, |room| {
                assert_eq!(room.active_round().unwrap().guesses.len(), 1);
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_guesses_match_a_serial_reference() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 3).await;
        let author = ids[0];

        start_round(&state, &code, None).await.unwrap();
        let answer = submit_answer(&state, &code, author, "x").await.unwrap();
        reveal_answer(&state, &code).await.unwrap();

        // Three guessers act at once: two find the author, one misses.
        let accusations = [
            (ids[1], author),
            (ids[2], author),
            (ids[3], ids[1]),
        ];
        let (r1, r2, r3) = tokio::join!(
            submit_guess(&state, &code, accusations[0].0, answer.answer_id, accusations[0].1),
            submit_guess(&state, &code, accusations[1].0, answer.answer_id, accusations[1].1),
            submit_guess(&state, &code, accusations[2].0, answer.answer_id, accusations[2].1),
        );
        r1.unwrap();
        r2.unwrap();
        r3.unwrap();

        // Any serial order of these three guesses produces the same ledger,
        // so the recomputed scores must match the serial reference: 10 per
        // correct guesser, 2 per catch for the author.
        let snapshot = room_snapshot(&state, &code).await.unwrap();
        assert_eq!(snapshot.status, RoomStatus::Scoreboard);
        let score_of = |id: Uuid| {
            snapshot
                .players
                .iter()
                .find(|player| player.id == id)
                .unwrap()
                .score
        };
        assert_eq!(score_of(ids[1]), 10);
        assert_eq!(score_of(ids[2]), 10);
        assert_eq!(score_of(ids[3]), 0);
        assert_eq!(score_of(author), 4);
    }

    #[tokio::test]
    async fn finish_twice_replaces_instead_of_duplicating() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 2).await;

        start_round(&state, &code, None).await.unwrap();
        submit_answer(&state, &code, ids[0], "coffee first").await.unwrap();
        submit_answer(&state, &code, ids[1], "coffee first").await.unwrap();
        reveal_answer(&state, &code).await.unwrap();

        let first = finish_room(&state, &code).await.unwrap();
        assert_eq!(first.room.status, RoomStatus::Finished);
        assert_eq!(first.pairs.len(), 3);

        let second = finish_room(&state, &code).await.unwrap();
        assert_eq!(second.pairs.len(), 3);

        let key = |pairs: &[SyncPairSummary]| {
            let mut keyed: Vec<(Uuid, Uuid, f64)> = pairs
                .iter()
                .map(|pair| (pair.player_one, pair.player_two, pair.sync_percentage))
                .collect();
            keyed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
            keyed
        };
        assert_eq!(key(&first.pairs), key(&second.pairs));
    }

    #[tokio::test]
    async fn finish_needs_at_least_two_players() {
        let state = test_state();
        let (code, _) = room_with_players(&state, 0).await;

        let err = finish_room(&state, &code).await.unwrap_err();
        assert!(matches!(err, GameError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn finished_room_rejects_further_actions() {
        let state = test_state();
        let (code, ids) = room_with_players(&state, 1).await;
        finish_room(&state, &code).await.unwrap();

        let err = start_round(&state, &code, None).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase(_)));

        let err = submit_answer(&state, &code, ids[0], "late").await.unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase(_)));

        let err = join_room(&state, &code, "late-joiner").await.unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase(_)));
    }
}
