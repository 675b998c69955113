//! Signal fixtures for tests and the diagnostic CLI.
//!
//! Synthetic generators produce deterministic mono signals; `read_wav` loads
//! recorded takes (PCM int or float, any channel count, downmixed to mono).

use std::f32::consts::PI;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pure sine of the given peak amplitude, starting at phase zero
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = 2.0 * PI * frequency / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

/// Sum of the first `harmonics` partials with 1/h amplitudes, normalized so
/// the peak amplitude does not exceed `amplitude`
pub fn harmonic_tone(
    frequency: f32,
    amplitude: f32,
    harmonics: usize,
    sample_rate: u32,
    len: usize,
) -> Vec<f32> {
    let harmonics = harmonics.max(1);
    let norm: f32 = (1..=harmonics).map(|h| 1.0 / h as f32).sum();
    let step = 2.0 * PI * frequency / sample_rate as f32;
    (0..len)
        .map(|i| {
            let phase = step * i as f32;
            let sum: f32 = (1..=harmonics)
                .map(|h| (phase * h as f32).sin() / h as f32)
                .sum();
            amplitude * sum / norm
        })
        .collect()
}

/// Uniform white noise in `[-amplitude, amplitude]`, reproducible per seed
pub fn white_noise(amplitude: f32, len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(-1.0f32..=1.0) * amplitude)
        .collect()
}

/// Decode a WAV file to mono f32 samples in [-1, 1]
///
/// # Returns
/// Samples and the file's sample rate
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };
    Ok((mono, spec.sample_rate))
}
