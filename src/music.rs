//! Pitch unit conversions shared by the estimators and the sequencer.
//!
//! Equal temperament with A4 = 440 Hz on MIDI note 69.

/// Reference frequency of MIDI note 69
pub const A4_HZ: f64 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI: i32 = 69;

/// Frequency in Hz of a (possibly out-of-range) MIDI note number.
#[inline]
pub fn midi_to_hz(midi: i32) -> f64 {
    A4_HZ * 2f64.powf((midi - A4_MIDI) as f64 / 12.0)
}

/// Fractional MIDI note number of a frequency. `None` for non-positive input.
#[inline]
pub fn hz_to_midi(hz: f64) -> Option<f64> {
    if hz > 0.0 && hz.is_finite() {
        Some(A4_MIDI as f64 + 12.0 * (hz / A4_HZ).log2())
    } else {
        None
    }
}

/// Signed distance from `from_hz` to `to_hz` in semitones.
#[inline]
pub fn semitone_distance(from_hz: f32, to_hz: f32) -> f32 {
    12.0 * (to_hz / from_hz).log2()
}

/// Signed distance from `from_hz` to `to_hz` in cents.
#[inline]
pub fn cents_between(from_hz: f32, to_hz: f32) -> f32 {
    100.0 * semitone_distance(from_hz, to_hz)
}
