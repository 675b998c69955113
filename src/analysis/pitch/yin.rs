//! YIN: first cmndf dip below a fixed threshold

use super::common::{cmndf, parabolic_vertex, PeriodRange};
use super::Scratch;

/// cmndf value a dip must fall below to count as periodic
pub const THRESHOLD: f32 = 0.15;

pub(crate) fn estimate(
    window: &[f32],
    sample_rate: f32,
    range: PeriodRange,
    scratch: &mut Scratch,
) -> Option<f32> {
    let values = &mut scratch.lag[..range.lag_len()];
    cmndf(window, values);

    let mut tau = (range.min..=range.max).find(|&tau| values[tau] < THRESHOLD)?;
    // Valley descent: the crossing is on the slope, the minimum is further on
    while tau < range.max && values[tau + 1] < values[tau] {
        tau += 1;
    }

    let period = parabolic_vertex(values, tau);
    Some(sample_rate / period)
}
