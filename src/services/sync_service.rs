//! End-of-game pairwise sync aggregation.

use uuid::Uuid;

use crate::{
    services::{
        embedding::SimilarityProvider,
        scoring::{SyncComponents, sync_percentage},
    },
    state::room::{Room, SyncResult},
};

/// Compute the pairwise sync results for every unordered player pair.
///
/// Pairs are enumerated over players in join order, so the result order is
/// deterministic. The caller replaces the room's stored results wholesale
/// with the returned set; recomputation is therefore idempotent even when
/// the finish action runs more than once.
pub fn compute_sync_results(room: &Room, provider: &dyn SimilarityProvider) -> Vec<SyncResult> {
    let players: Vec<Uuid> = room.players.keys().copied().collect();

    let mut results = Vec::new();
    for (index, &player_one) in players.iter().enumerate() {
        for &player_two in &players[index + 1..] {
            let answer_similarity = pair_answer_similarity(room, provider, player_one, player_two);
            let correct_guess_rate = (room.correct_guess_rate(player_one)
                + room.correct_guess_rate(player_two))
                / 2.0;
            let mutual_selection_rate = pair_mutual_selection_rate(room, player_one, player_two);

            results.push(SyncResult {
                player_one,
                player_two,
                answer_similarity,
                correct_guess_rate,
                mutual_selection_rate,
                sync_percentage: sync_percentage(SyncComponents {
                    answer_similarity,
                    correct_guess_rate,
                    mutual_selection_rate,
                }),
            });
        }
    }
    results
}

/// Average similarity across rounds where both players submitted an answer
/// with a non-empty embedding; 0.0 when no such round exists.
fn pair_answer_similarity(
    room: &Room,
    provider: &dyn SimilarityProvider,
    player_one: Uuid,
    player_two: Uuid,
) -> f64 {
    let mut total = 0.0;
    let mut rounds = 0usize;
    for round in &room.rounds {
        let (Some(a1), Some(a2)) = (round.answers.get(&player_one), round.answers.get(&player_two))
        else {
            continue;
        };
        if a1.embedding.is_empty() || a2.embedding.is_empty() {
            continue;
        }
        total += provider.similarity(&a1.embedding, &a2.embedding);
        rounds += 1;
    }
    if rounds == 0 {
        return 0.0;
    }
    total / rounds as f64
}

/// Share of the pair's guesses that targeted each other, in either
/// direction; 0.0 when neither player ever guessed.
fn pair_mutual_selection_rate(room: &Room, player_one: Uuid, player_two: Uuid) -> f64 {
    let mut mutual = 0usize;
    let mut opportunities = 0usize;
    for guess in room.all_guesses() {
        let by_one = guess.guesser_id == player_one;
        let by_two = guess.guesser_id == player_two;
        if by_one || by_two {
            opportunities += 1;
        }
        if (by_one && guess.guessed_player_id == player_two)
            || (by_two && guess.guessed_player_id == player_one)
        {
            mutual += 1;
        }
    }
    if opportunities == 0 {
        return 0.0;
    }
    mutual as f64 / opportunities as f64
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::{Question, QuestionCategory},
        services::embedding::EmbeddingError,
        state::room::{Guess, Round},
    };

    /// Provider reporting a fixed similarity for any non-empty vectors.
    struct FixedSimilarity(f64);

    impl SimilarityProvider for FixedSimilarity {
        fn embed(&self, _text: &str) -> BoxFuture<'static, Result<Vec<f32>, EmbeddingError>> {
            Box::pin(async { Ok(vec![1.0]) })
        }

        fn similarity(&self, _a: &[f32], _b: &[f32]) -> f64 {
            self.0
        }
    }

    fn question() -> Question {
        Question {
            id: 1,
            text: "Describe your ideal late-night vibe in one sentence.".into(),
            category: QuestionCategory::Romance,
            active: true,
        }
    }

    fn room_with_players(count: usize) -> (Room, Vec<Uuid>) {
        let mut room = Room::new("SYNC01".into(), 5);
        let ids = (0..count)
            .map(|i| room.add_player(format!("player-{i}"), i == 0))
            .collect();
        (room, ids)
    }

    #[test]
    fn pairs_enumerate_in_join_order() {
        let (room, ids) = room_with_players(3);
        let results = compute_sync_results(&room, &FixedSimilarity(1.0));

        let pairs: Vec<(Uuid, Uuid)> = results
            .iter()
            .map(|result| (result.player_one, result.player_two))
            .collect();
        assert_eq!(
            pairs,
            vec![(ids[0], ids[1]), (ids[0], ids[2]), (ids[1], ids[2])]
        );
    }

    #[test]
    fn no_shared_rounds_yield_zero_components() {
        let (mut room, ids) = room_with_players(2);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;
        // Only one of the two answered.
        room.active_round_mut()
            .unwrap()
            .upsert_answer(ids[0], "x".into(), "x".into(), vec![1.0]);

        let results = compute_sync_results(&room, &FixedSimilarity(0.9));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].answer_similarity, 0.0);
        assert_eq!(results[0].correct_guess_rate, 0.0);
        assert_eq!(results[0].mutual_selection_rate, 0.0);
        assert_eq!(results[0].sync_percentage, 0.0);
    }

    #[test]
    fn empty_embeddings_do_not_count_as_shared_rounds() {
        let (mut room, ids) = room_with_players(2);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;
        let round = room.active_round_mut().unwrap();
        round.upsert_answer(ids[0], "x".into(), "x".into(), Vec::new());
        round.upsert_answer(ids[1], "y".into(), "y".into(), vec![1.0]);

        let results = compute_sync_results(&room, &FixedSimilarity(0.9));
        assert_eq!(results[0].answer_similarity, 0.0);
    }

    #[test]
    fn components_blend_through_the_fixed_formula() {
        let (mut room, ids) = room_with_players(2);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;
        let answer_one;
        let answer_two;
        {
            let round = room.active_round_mut().unwrap();
            answer_one = round.upsert_answer(ids[0], "x".into(), "x".into(), vec![1.0]);
            answer_two = round.upsert_answer(ids[1], "y".into(), "y".into(), vec![1.0]);
        }

        // Both guess each other; player one is right, player two is wrong
        // (player one did write answer one).
        let round = room.active_round_mut().unwrap();
        round.upsert_guess(Guess {
            answer_id: answer_two,
            guesser_id: ids[0],
            guessed_player_id: ids[1],
            is_correct: true,
            points_awarded: 10,
        });
        round.upsert_guess(Guess {
            answer_id: answer_one,
            guesser_id: ids[1],
            guessed_player_id: ids[0],
            is_correct: true,
            points_awarded: 10,
        });

        let results = compute_sync_results(&room, &FixedSimilarity(0.8));
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.answer_similarity, 0.8);
        // Both players guessed once, both correctly.
        assert_eq!(result.correct_guess_rate, 1.0);
        // Every guess either made targeted the other.
        assert_eq!(result.mutual_selection_rate, 1.0);
        // 0.4*0.8 + 0.3*1.0 + 0.3*1.0 = 0.92
        assert_eq!(result.sync_percentage, 92.0);
    }

    #[test]
    fn mutual_rate_counts_both_directions_over_all_guesses() {
        let (mut room, ids) = room_with_players(3);
        room.rounds.push(Round::new(1, question()));
        room.current_round = 1;
        let answer_id = room.active_round_mut().unwrap().upsert_answer(
            ids[2],
            "z".into(),
            "z".into(),
            vec![1.0],
        );

        let round = room.active_round_mut().unwrap();
        // Player 0 accuses player 1, player 1 accuses player 2.
        round.upsert_guess(Guess {
            answer_id,
            guesser_id: ids[0],
            guessed_player_id: ids[1],
            is_correct: false,
            points_awarded: 0,
        });
        round.upsert_guess(Guess {
            answer_id,
            guesser_id: ids[1],
            guessed_player_id: ids[2],
            is_correct: true,
            points_awarded: 10,
        });

        let results = compute_sync_results(&room, &FixedSimilarity(0.0));
        // Pair (0,1): one of their two guesses targeted the other.
        assert_eq!(results[0].mutual_selection_rate, 0.5);
        // Pair (0,2): player 0 made the pair's only guess and it targeted
        // player 1, not player 2.
        assert_eq!(results[1].mutual_selection_rate, 0.0);
        // Pair (1,2): player 1's only guess targeted player 2.
        assert_eq!(results[2].mutual_selection_rate, 1.0);
    }
}
