//! SWIPE-style subharmonic summation
//!
//! Each log-spaced candidate frequency is scored by summing the normalized
//! autocorrelation at its period and the next three multiples, each term
//! divided by its harmonic number and averaged over the harmonics that fit
//! in the lag buffer. Local maxima of the score are refined to the nearest
//! autocorrelation peak and re-scored at the refined period, so the result
//! is not quantized to the candidate grid.

use super::common::{earliest_near_best, parabolic_vertex, NEAR_BEST_MARGIN};
use super::common::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};
use super::Scratch;

/// Number of log-spaced candidate frequencies
pub const CANDIDATE_COUNT: usize = 100;

/// Harmonics summed per candidate
const HARMONICS: usize = 4;

/// Candidates with fewer usable harmonics are not scored
const MIN_USABLE_HARMONICS: usize = 2;

/// Minimum strength of the chosen candidate
pub const STRENGTH_FLOOR: f32 = 0.01;

/// Frequency of candidate `index` (fractional indices allowed)
fn candidate_hz(index: f32) -> f32 {
    let step = (MAX_FREQUENCY_HZ / MIN_FREQUENCY_HZ).ln() / (CANDIDATE_COUNT - 1) as f32;
    MIN_FREQUENCY_HZ * (step * index).exp()
}

/// Linearly interpolated read of the lag buffer
#[inline]
fn acf_at(acf: &[f32], lag: f32) -> f32 {
    let base = lag.floor() as usize;
    let frac = lag - base as f32;
    acf[base] * (1.0 - frac) + acf[base + 1] * frac
}

/// Harmonic sum of one candidate period
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score {
    /// Mean of `acf(h·p) / h` over the usable harmonics
    strength: f32,
    /// `strength` relative to its value for a perfectly periodic signal
    relative: f32,
}

/// Score `period`; `None` when fewer than two harmonics fit below `max_lag`
fn score(acf: &[f32], max_lag: usize, period: f32) -> Option<Score> {
    let mut sum = 0.0f32;
    let mut weight = 0.0f32;
    let mut usable = 0usize;
    for harmonic in 1..=HARMONICS {
        let h = harmonic as f32;
        let lag = h * period;
        if lag > max_lag as f32 {
            break;
        }
        sum += acf_at(acf, lag) / h;
        weight += 1.0 / h;
        usable += 1;
    }
    if usable < MIN_USABLE_HARMONICS {
        return None;
    }
    Some(Score {
        strength: sum / usable as f32,
        relative: sum / weight,
    })
}

/// Sub-sample lag of the autocorrelation peak within a factor `span` of
/// `period`. `None` when the largest value sits on the edge of that span,
/// i.e. there is no peak near the candidate.
fn refine(acf: &[f32], max_lag: usize, period: f32, span: f32) -> Option<f32> {
    let lo = ((period / span).floor() as usize).max(1);
    let hi = ((period * span).ceil() as usize).min(max_lag);
    if hi < lo + 2 {
        return None;
    }
    let peak = (lo..=hi).max_by(|&a, &b| acf[a].total_cmp(&acf[b]))?;
    if peak == lo || peak == hi {
        return None;
    }
    Some(parabolic_vertex(acf, peak))
}

/// Refined period and its score for candidate `index`
fn refined(acf: &[f32], max_lag: usize, sample_rate: f32, index: usize) -> Option<(f32, Score)> {
    let span = candidate_hz(1.0) / candidate_hz(0.0);
    let period = refine(acf, max_lag, sample_rate / candidate_hz(index as f32), span)?;
    Some((period, score(acf, max_lag, period)?))
}

pub(crate) fn estimate(window: &[f32], sample_rate: f32, scratch: &mut Scratch) -> Option<f32> {
    let n = window.len();
    let max_lag = n * 3 / 4;
    if max_lag + 2 > scratch.lag.len() || max_lag + 1 >= n {
        return None;
    }

    // Autocorrelation normalized per lag by the energy of both overlapping
    // segments, so every lag is in [-1, 1] regardless of overlap length
    let acf = &mut scratch.lag[..max_lag + 2];
    for (lag, slot) in acf.iter_mut().enumerate() {
        let mut cross = 0.0f32;
        let mut energy = 0.0f32;
        for i in 0..n - lag {
            cross += window[i] * window[i + lag];
            energy += window[i] * window[i] + window[i + lag] * window[i + lag];
        }
        *slot = if energy > 0.0 { 2.0 * cross / energy } else { 0.0 };
    }
    if acf[0] <= 0.0 {
        return None;
    }
    let acf = &*acf;

    // Peaks are picked on the relative score: the mean weight changes with
    // the usable harmonic count, which would otherwise put steps in the curve
    let strengths = &mut scratch.strengths;
    for (index, slot) in strengths.iter_mut().enumerate() {
        let period = sample_rate / candidate_hz(index as f32);
        *slot = score(acf, max_lag, period).map_or(f32::NEG_INFINITY, |s| s.relative);
    }

    // Local maxima from the highest frequency down, each confirmed by an
    // autocorrelation peak near its period
    let candidates = &mut scratch.candidates;
    candidates.clear();
    for index in (0..CANDIDATE_COUNT).rev() {
        let value = strengths[index];
        if !value.is_finite() {
            continue;
        }
        let left = if index > 0 { strengths[index - 1] } else { f32::NEG_INFINITY };
        let right = strengths.get(index + 1).copied().unwrap_or(f32::NEG_INFINITY);
        if value > left && value >= right {
            if let Some((_, peak)) = refined(acf, max_lag, sample_rate, index) {
                candidates.push((index, peak.relative));
            }
        }
    }

    // Subharmonics of a periodic signal score as well as its fundamental
    let (index, _) = earliest_near_best(candidates, NEAR_BEST_MARGIN)?;
    let (period, peak) = refined(acf, max_lag, sample_rate, index)?;
    if peak.strength < STRENGTH_FLOOR {
        return None;
    }
    Some(sample_rate / period)
}
