//! McLeod pitch method
//!
//! Works on the normalized square difference function, which lies in
//! [-1, 1] and reaches 1 at the period of a perfectly periodic signal.

use super::common::{earliest_near_best, parabolic_vertex, PeriodRange, NEAR_BEST_MARGIN};
use super::Scratch;

/// Minimum nsdf value of the chosen key maximum
pub const CLARITY_THRESHOLD: f32 = 0.6;

/// `nsdf(τ) = 2·Σ x[i]x[i+τ] / Σ (x[i]² + x[i+τ]²)` over `i < n - τ`.
fn nsdf(window: &[f32], out: &mut [f32]) {
    let n = window.len();
    for (tau, slot) in out.iter_mut().enumerate() {
        let mut acf = 0.0f32;
        let mut energy = 0.0f32;
        for i in 0..n - tau {
            let a = window[i];
            let b = window[i + tau];
            acf += a * b;
            energy += a * a + b * b;
        }
        *slot = if energy > 0.0 { 2.0 * acf / energy } else { 0.0 };
    }
}

pub(crate) fn estimate(
    window: &[f32],
    sample_rate: f32,
    range: PeriodRange,
    scratch: &mut Scratch,
) -> Option<f32> {
    let values = &mut scratch.lag[..range.lag_len()];
    nsdf(window, values);

    // Skip the lobe around lag 0, which always peaks at 1
    let mut tau = 1;
    while tau <= range.max && values[tau] > 0.0 {
        tau += 1;
    }

    // One key maximum per positive region
    let candidates = &mut scratch.candidates;
    candidates.clear();
    let mut region_peak: Option<(usize, f32)> = None;
    while tau <= range.max {
        let value = values[tau];
        if value > 0.0 {
            if region_peak.map_or(true, |(_, peak)| value > peak) {
                region_peak = Some((tau, value));
            }
        } else if let Some(peak) = region_peak.take() {
            if peak.0 >= range.min {
                candidates.push(peak);
            }
        }
        tau += 1;
    }
    if let Some(peak) = region_peak {
        // Region still rising at the edge of the range is not a maximum
        if peak.0 >= range.min && peak.0 < range.max {
            candidates.push(peak);
        }
    }

    // Highest peak, except a shorter period within the margin wins to avoid octave drops
    let (tau, clarity) = earliest_near_best(candidates, NEAR_BEST_MARGIN)?;
    if clarity < CLARITY_THRESHOLD {
        return None;
    }

    Some(sample_rate / parabolic_vertex(values, tau))
}
