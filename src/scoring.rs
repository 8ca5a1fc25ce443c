//! Points awarded for an answer
//!
//! Scoring is a pure function of the points system, the question, whether
//! the answer was correct, and how much time was left when it arrived.

use crate::{quiz::config::Question, settings::PointsSystem};

/// Fraction of the base points a participant can earn on top for answering instantly
const MAX_BONUS_RATIO: f64 = 0.5;

/// Calculates the speed bonus for a correct standard-mode answer
///
/// The bonus scales linearly with the share of the time limit still left,
/// up to half the base points. The share is clamped to `0..=1`, so neither
/// a negative remaining time nor one larger than the limit can push the
/// bonus outside `0..=base / 2`.
pub fn speed_bonus(base: i64, time_limit: i64, time_remaining: i64) -> u64 {
    if base <= 0 || time_limit <= 0 {
        return 0;
    }

    let ratio = (time_remaining as f64 / time_limit as f64).clamp(0., 1.);
    (base as f64 * MAX_BONUS_RATIO * ratio).round() as u64
}

/// Calculates the points awarded for one answer
///
/// Never fails: a negative base awards nothing.
pub fn award(
    points_system: PointsSystem,
    base: i64,
    time_limit: i64,
    is_correct: bool,
    time_remaining: i64,
) -> u64 {
    if !is_correct {
        return 0;
    }

    match points_system {
        PointsSystem::NoPoints => 0,
        PointsSystem::Simple => 1,
        PointsSystem::Standard => u64::try_from(base)
            .unwrap_or(0)
            .saturating_add(speed_bonus(base, time_limit, time_remaining)),
    }
}

/// Calculates the points awarded for an answer to `question`
pub fn score(
    points_system: PointsSystem,
    question: &Question,
    is_correct: bool,
    time_remaining: u64,
) -> u64 {
    award(
        points_system,
        question.points,
        signed(question.time_limit()),
        is_correct,
        signed(time_remaining),
    )
}

fn signed(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}
