//! Pure scoring primitives: guess points and the sync-percentage blend.

/// Points awarded for correctly identifying an answer's author.
pub const CORRECT_GUESS_POINTS: i64 = 10;
/// Bonus awarded to an author each time they are correctly identified.
pub const AUTHOR_CAUGHT_POINTS: i64 = 2;

const SIMILARITY_WEIGHT: f64 = 0.4;
const GUESS_RATE_WEIGHT: f64 = 0.3;
const MUTUAL_RATE_WEIGHT: f64 = 0.3;

/// Points a guesser earns for a single guess event.
pub fn points_for_guess(is_correct: bool) -> i64 {
    if is_correct { CORRECT_GUESS_POINTS } else { 0 }
}

/// Bonus the answer's author earns when a guess identified them.
pub fn points_for_author_caught(is_correct: bool) -> i64 {
    if is_correct { AUTHOR_CAUGHT_POINTS } else { 0 }
}

/// Clamp a signal into [0,1]. Upstream signals may drift past the bounds
/// through floating-point accumulation; clamping happens before blending.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// The three normalized signals blended into a sync percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncComponents {
    /// Average embedding similarity across co-answered rounds.
    pub answer_similarity: f64,
    /// Average of the pair's individual guess accuracies.
    pub correct_guess_rate: f64,
    /// Share of the pair's guesses that targeted each other.
    pub mutual_selection_rate: f64,
}

/// Blend the three clamped signals into a percentage in [0,100],
/// rounded to 2 decimal places.
pub fn sync_percentage(components: SyncComponents) -> f64 {
    let similarity = clamp01(components.answer_similarity);
    let guess_rate = clamp01(components.correct_guess_rate);
    let mutual = clamp01(components.mutual_selection_rate);
    let score = similarity * SIMILARITY_WEIGHT
        + guess_rate * GUESS_RATE_WEIGHT
        + mutual * MUTUAL_RATE_WEIGHT;
    (score * 100.0 * 100.0).round() / 100.0
}
