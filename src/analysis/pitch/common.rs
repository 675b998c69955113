//! Building blocks shared by the lag-domain estimators.

/// Highest detectable frequency in Hz
pub const MAX_FREQUENCY_HZ: f32 = 2000.0;

/// Lowest detectable frequency in Hz
pub const MIN_FREQUENCY_HZ: f32 = 30.0;

/// Later candidates within this score of the best lose to earlier ones.
///
/// A periodic signal is also periodic at every multiple of its period, so
/// the lag functions show near-identical extrema at 2τ, 3τ, ... Preferring
/// the shortest near-best period keeps estimates off the subharmonics.
pub const NEAR_BEST_MARGIN: f32 = 0.05;

/// Integer lag search range for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    /// Shortest period (highest frequency), at least 2 so `min - 1` is a real lag
    pub min: usize,
    /// Longest period; `max + 1` stays inside the lag buffers
    pub max: usize,
}

impl PeriodRange {
    /// Lag range for a window of `window_len` samples.
    ///
    /// The longest period is `sample_rate / 30`, clamped to half the window so
    /// the difference functions always integrate over at least `n / 2` samples.
    /// Returns `None` when the clamped range is empty.
    pub fn new(sample_rate: u32, window_len: usize) -> Option<Self> {
        let sr = sample_rate as f32;
        let min = ((sr / MAX_FREQUENCY_HZ).floor() as usize).max(2);
        let max = ((sr / MIN_FREQUENCY_HZ).ceil() as usize).min((window_len / 2).saturating_sub(1));
        if max < min + 2 {
            return None;
        }
        Some(Self { min, max })
    }

    /// Smallest window length for which [`PeriodRange::new`] succeeds.
    pub fn minimum_window(sample_rate: u32) -> usize {
        let min = ((sample_rate as f32 / MAX_FREQUENCY_HZ).floor() as usize).max(2);
        2 * (min + 3)
    }

    /// Length of the lag buffers, covering lags `0..=max + 1`.
    #[inline]
    pub fn lag_len(&self) -> usize {
        self.max + 2
    }
}

/// Vertex offset of the parabola through `(-1, a)`, `(0, b)`, `(1, c)`.
///
/// Works for both peaks and valleys. Returns 0 for a flat triple and clamps
/// to ±1 so a non-extremum centre cannot throw the estimate off its cell.
#[inline]
pub fn parabolic_offset(a: f32, b: f32, c: f32) -> f32 {
    let denominator = a - 2.0 * b + c;
    if denominator.abs() < f32::EPSILON {
        return 0.0;
    }
    ((a - c) / (2.0 * denominator)).clamp(-1.0, 1.0)
}

/// Sub-sample position of the extremum at `index`.
///
/// Boundary indices are returned unrefined.
#[inline]
pub fn parabolic_vertex(values: &[f32], index: usize) -> f32 {
    if index == 0 || index + 1 >= values.len() {
        return index as f32;
    }
    index as f32 + parabolic_offset(values[index - 1], values[index], values[index + 1])
}

/// Cumulative mean normalized difference function, written to `out[..len]`.
///
/// `d(τ) = Σ_{i<W} (x[i] - x[i+τ])²` with a fixed integration window
/// `W = n - (len - 1)`, then `cmndf(τ) = d(τ)·τ / Σ_{j=1..τ} d(j)` and
/// `cmndf(0) = 1`. A zero running sum (silence) maps to 1.
pub fn cmndf(window: &[f32], out: &mut [f32]) {
    let len = out.len();
    debug_assert!(len >= 2 && len <= window.len());
    let integration = window.len() - (len - 1);

    out[0] = 1.0;
    let mut running = 0.0f32;
    for tau in 1..len {
        let mut sum = 0.0f32;
        for i in 0..integration {
            let diff = window[i] - window[i + tau];
            sum += diff * diff;
        }
        running += sum;
        out[tau] = if running > 0.0 {
            sum * tau as f32 / running
        } else {
            1.0
        };
    }
}

/// Pick the earliest candidate whose score is within `margin` of the best.
///
/// Candidates must be ordered by preference (shortest period first).
pub fn earliest_near_best(candidates: &[(usize, f32)], margin: f32) -> Option<(usize, f32)> {
    let best = candidates
        .iter()
        .map(|&(_, score)| score)
        .fold(f32::NEG_INFINITY, f32::max);
    if !best.is_finite() {
        return None;
    }
    candidates
        .iter()
        .copied()
        .find(|&(_, score)| score >= best - margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_range_at_44100() {
        let range = PeriodRange::new(44_100, 2048).unwrap();
        assert_eq!(range.min, 22);
        // 44100 / 30 = 1470, clamped to half the window
        assert_eq!(range.max, 1023);
        assert_eq!(range.lag_len(), 1025);
    }

    #[test]
    fn test_period_range_unclamped_for_long_windows() {
        let range = PeriodRange::new(8_000, 2048).unwrap();
        assert_eq!(range.min, 4);
        assert_eq!(range.max, 267);
    }

    #[test]
    fn test_period_range_rejects_tiny_windows() {
        assert!(PeriodRange::new(44_100, 32).is_none());
        let minimum = PeriodRange::minimum_window(44_100);
        assert!(PeriodRange::new(44_100, minimum).is_some());
        assert!(PeriodRange::new(44_100, minimum - 2).is_none());
    }

    #[test]
    fn test_parabolic_vertex_recovers_exact_minimum() {
        // y = 3(x - 10.3)^2 + 2 sampled at integers
        let values: Vec<f32> = (0..20)
            .map(|x| 3.0 * (x as f32 - 10.3).powi(2) + 2.0)
            .collect();
        let vertex = parabolic_vertex(&values, 10);
        assert!((vertex - 10.3).abs() < 1e-4, "vertex {}", vertex);
    }

    #[test]
    fn test_parabolic_vertex_recovers_exact_maximum() {
        // y = -0.5(x - 6.8)^2 + 1 sampled at integers
        let values: Vec<f32> = (0..12)
            .map(|x| -0.5 * (x as f32 - 6.8).powi(2) + 1.0)
            .collect();
        let vertex = parabolic_vertex(&values, 7);
        assert!((vertex - 6.8).abs() < 1e-4, "vertex {}", vertex);
    }

    #[test]
    fn test_parabolic_vertex_boundaries_unrefined() {
        let values = [1.0, 0.5, 0.25];
        assert_eq!(parabolic_vertex(&values, 0), 0.0);
        assert_eq!(parabolic_vertex(&values, 2), 2.0);
    }

    #[test]
    fn test_parabolic_offset_flat_triple() {
        assert_eq!(parabolic_offset(0.5, 0.5, 0.5), 0.0);
    }

    #[test]
    fn test_cmndf_of_silence_is_one() {
        let window = vec![0.0f32; 256];
        let mut out = vec![0.0f32; 100];
        cmndf(&window, &mut out);
        assert!(out.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_cmndf_dips_at_period() {
        let period = 50usize;
        let window: Vec<f32> = (0..1024)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / period as f32).sin())
            .collect();
        let mut out = vec![0.0f32; 200];
        cmndf(&window, &mut out);
        assert_eq!(out[0], 1.0);
        assert!(out[period] < 1e-3, "cmndf at period = {}", out[period]);
        assert!(out[period / 2] > 1.0);
    }

    #[test]
    fn test_earliest_near_best_prefers_short_period() {
        let candidates = [(100, 0.99), (200, 1.0), (300, 0.4)];
        assert_eq!(earliest_near_best(&candidates, 0.05), Some((100, 0.99)));
        assert_eq!(earliest_near_best(&candidates, 0.001), Some((200, 1.0)));
        assert_eq!(earliest_near_best(&[], 0.05), None);
    }
}
