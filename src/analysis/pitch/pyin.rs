//! Probabilistic YIN with temporal stickiness
//!
//! Shares YIN's cmndf, but scores every local minimum instead of taking the
//! first threshold crossing. A candidate close to the previously accepted
//! frequency earns a bonus, which keeps the track from hopping between
//! octaves on ambiguous windows. This is the only estimator with memory.

use super::common::{cmndf, earliest_near_best, parabolic_vertex, PeriodRange, NEAR_BEST_MARGIN};
use super::{GateMode, Scratch, TrackerState};
use crate::music::semitone_distance;

/// Weight of the stickiness bonus
const STICKINESS_WEIGHT: f32 = 0.5;

/// Score multiplier for candidates outside the typical voice range
const OUT_OF_RANGE_PENALTY: f32 = 0.7;
const VOICE_MIN_HZ: f32 = 80.0;
const VOICE_MAX_HZ: f32 = 1000.0;

/// Exponential moving average factor for the smoothed RMS
const RMS_SMOOTHING: f32 = 0.9;

const SMOOTH_THRESHOLD_BASE: f32 = 0.4;
const SMOOTH_THRESHOLD_RMS_SCALE: f32 = 10.0;
const INSTANT_THRESHOLD: f32 = 0.5;

/// Per-call inputs beyond the window itself
#[derive(Debug, Clone, Copy)]
pub(crate) struct Params {
    /// RMS of the current window
    pub rms: f32,
    /// Semitone scale of the stickiness bonus; 0 disables it
    pub bias: f32,
    pub gate_mode: GateMode,
}

/// Acceptance threshold for a given smoothed RMS.
///
/// The smooth threshold is not clamped and goes negative once the smoothed
/// RMS exceeds 0.1, at which point every candidate passes.
pub(crate) fn acceptance_threshold(gate_mode: GateMode, smoothed_rms: f32) -> f32 {
    match gate_mode {
        GateMode::Smooth => {
            SMOOTH_THRESHOLD_BASE * (1.0 - smoothed_rms * SMOOTH_THRESHOLD_RMS_SCALE)
        }
        GateMode::Instant => INSTANT_THRESHOLD,
    }
}

fn score(cmndf_value: f32, hz: f32, previous: Option<f32>, bias: f32) -> f32 {
    let probability = (1.0 - cmndf_value).max(0.0);
    let bonus = match previous {
        Some(prev) if bias > 0.0 => {
            (-semitone_distance(prev, hz).abs() / bias).exp() * STICKINESS_WEIGHT
        }
        _ => 0.0,
    };
    let total = probability + bonus;
    if (VOICE_MIN_HZ..=VOICE_MAX_HZ).contains(&hz) {
        total
    } else {
        total * OUT_OF_RANGE_PENALTY
    }
}

pub(crate) fn estimate(
    window: &[f32],
    sample_rate: f32,
    range: PeriodRange,
    params: Params,
    history: TrackerState,
    scratch: &mut Scratch,
) -> (Option<f32>, TrackerState) {
    let smoothed_rms = RMS_SMOOTHING * history.smoothed_rms + (1.0 - RMS_SMOOTHING) * params.rms;
    let mut next = TrackerState {
        previous_frequency: history.previous_frequency,
        smoothed_rms,
    };

    let values = &mut scratch.lag[..range.lag_len()];
    cmndf(window, values);

    let candidates = &mut scratch.candidates;
    candidates.clear();
    for tau in range.min..=range.max {
        let value = values[tau];
        if value < values[tau - 1] && value <= values[tau + 1] {
            let hz = sample_rate / tau as f32;
            candidates.push((
                tau,
                score(value, hz, history.previous_frequency, params.bias),
            ));
        }
    }

    // Highest score, except a shorter period within the margin wins to avoid octave drops
    let Some((tau, best)) = earliest_near_best(candidates, NEAR_BEST_MARGIN) else {
        return (None, next);
    };
    if best < acceptance_threshold(params.gate_mode, smoothed_rms) {
        return (None, next);
    }

    let hz = sample_rate / parabolic_vertex(values, tau);
    next.previous_frequency = Some(hz);
    (Some(hz), next)
}
