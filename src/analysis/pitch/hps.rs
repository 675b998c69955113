//! Harmonic product spectrum
//!
//! The magnitude spectrum is evaluated by direct correlation against
//! precomputed twiddle tables, one bin at a time, and only up to the highest
//! bin the product needs. The harmonic product then multiplies each bin with
//! the bins at two, three and four times its frequency.

use std::f32::consts::PI;

use super::common::{parabolic_offset, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};
use super::Scratch;

/// Fixed transform length; shorter windows are zero-padded
pub const TRANSFORM_SIZE: usize = 4096;

const HARMONICS: usize = 4;

/// Minimum amplitude of the fundamental bin, in the units of the input
pub const MAGNITUDE_FLOOR: f32 = 0.01;

/// A bin only qualifies as a fundamental if it carries at least this
/// fraction of the strongest bin's magnitude
const FUNDAMENTAL_FLOOR: f32 = 0.1;

/// Cosine and sine of `2πj / TRANSFORM_SIZE` for every `j`
pub(crate) fn twiddle_tables() -> (Vec<f32>, Vec<f32>) {
    (0..TRANSFORM_SIZE)
        .map(|j| {
            let phase = 2.0 * PI * j as f32 / TRANSFORM_SIZE as f32;
            (phase.cos(), phase.sin())
        })
        .unzip()
}

pub(crate) fn estimate(window: &[f32], sample_rate: f32, scratch: &mut Scratch) -> Option<f32> {
    let m = TRANSFORM_SIZE;
    let nyquist_bin = m / 2;
    let bin_hz = sample_rate / m as f32;

    let low_bin = ((MIN_FREQUENCY_HZ / bin_hz).ceil() as usize).max(1);
    let high_bin = ((MAX_FREQUENCY_HZ / bin_hz).floor() as usize).min(nyquist_bin - 1);
    if high_bin < low_bin {
        return None;
    }
    let top_bin = (high_bin * HARMONICS).min(nyquist_bin);

    // Hann-windowed tail of the window, zero-padded to the transform size
    let used = window.len().min(m);
    let samples = &window[window.len() - used..];
    let frame = &mut scratch.frame;
    frame.fill(0.0);
    let mut window_sum = 0.0f32;
    for (i, (slot, &sample)) in frame.iter_mut().zip(samples).enumerate() {
        let weight = if used > 1 {
            0.5 - 0.5 * (2.0 * PI * i as f32 / (used - 1) as f32).cos()
        } else {
            1.0
        };
        window_sum += weight;
        *slot = sample * weight;
    }
    if window_sum <= 0.0 {
        return None;
    }

    // Amplitude-calibrated magnitudes: a sine of amplitude A peaks near A
    let scale = 2.0 / window_sum;
    let spectrum = &mut scratch.spectrum[..=top_bin];
    let mut peak_magnitude = 0.0f32;
    for (bin, magnitude) in spectrum.iter_mut().enumerate() {
        let mut re = 0.0f32;
        let mut im = 0.0f32;
        for (i, &x) in frame[..used].iter().enumerate() {
            let j = (bin * i) % m;
            re += x * scratch.cos_table[j];
            im -= x * scratch.sin_table[j];
        }
        *magnitude = (re * re + im * im).sqrt() * scale;
        if bin >= low_bin {
            peak_magnitude = peak_magnitude.max(*magnitude);
        }
    }
    if peak_magnitude <= 0.0 {
        return None;
    }

    let product = &mut scratch.product;
    let mut best: Option<(usize, f32)> = None;
    for bin in low_bin..=high_bin {
        if spectrum[bin] < FUNDAMENTAL_FLOOR * peak_magnitude {
            product[bin] = 0.0;
            continue;
        }
        let mut value = 1.0f32;
        for harmonic in 1..=HARMONICS {
            let index = bin * harmonic;
            if index > top_bin {
                break;
            }
            value *= spectrum[index] / peak_magnitude;
        }
        product[bin] = value;
        if best.map_or(true, |(_, current)| value > current) {
            best = Some((bin, value));
        }
    }
    let (mut bin, _) = best?;

    // The product peak can sit a bin off the fundamental's spectral peak
    while bin < top_bin && spectrum[bin + 1] > spectrum[bin] {
        bin += 1;
    }
    while bin > 1 && spectrum[bin - 1] > spectrum[bin] {
        bin -= 1;
    }
    if spectrum[bin] < MAGNITUDE_FLOOR {
        return None;
    }

    // Hann main lobes are close to Gaussian, so fit the parabola in log space
    let offset = if bin < top_bin && spectrum[bin - 1] > 0.0 && spectrum[bin + 1] > 0.0 {
        parabolic_offset(
            spectrum[bin - 1].ln(),
            spectrum[bin].ln(),
            spectrum[bin + 1].ln(),
        )
    } else {
        0.0
    };

    Some((bin as f32 + offset) * bin_hz)
}
