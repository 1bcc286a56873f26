//! Task progress scoring
//!
//! Turns a task's practice sessions into a single 0..=100 completion value.
//! Each session is scored on tempo and on self-reported confidence through a
//! saturating tanh curve, and the task takes the best session.

use crate::models::Session;

/// Confidence scale maximum
pub const MAX_CONFIDENCE: f64 = 5.0;

/// Steepness of the tanh curve
const CURVE_K: f64 = 2.2;
/// Inflection point as a fraction of the target
const CURVE_X0: f64 = 0.72;

const TEMPO_WEIGHT: f64 = 0.4;
const CONFIDENCE_WEIGHT: f64 = 0.6;

/// Saturating S-curve score of `current` against `target`, in 0..=100
pub fn tanh_progress(current: f64, target: f64) -> f64 {
    if current >= target {
        return 100.0;
    }

    let ratio = current / target;
    let progress = ((CURVE_K * (ratio - CURVE_X0)).tanh() + 1.0) / 2.0 * 100.0;

    progress.max(0.0)
}

/// Weighted tempo/confidence score of a single session
pub fn session_score(target_bpm: i32, bpm: i32, confidence: i32) -> f64 {
    let tempo = tanh_progress(bpm as f64, target_bpm as f64);
    let conf = tanh_progress(confidence as f64, MAX_CONFIDENCE);

    TEMPO_WEIGHT * tempo + CONFIDENCE_WEIGHT * conf
}

/// Progress of a task: the best session score, 0 when there are no sessions
pub fn compute_task_progress(target_bpm: i32, sessions: &[Session]) -> f64 {
    sessions
        .iter()
        .map(|s| session_score(target_bpm, s.bpm, s.confidence))
        .fold(None, |best: Option<f64>, score| match best {
            Some(b) if b >= score => Some(b),
            _ => Some(score),
        })
        .map_or(0.0, |best| best.min(100.0))
}
