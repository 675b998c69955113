// Published value - latest pitch estimate and level, single writer, many readers
//
// Only the most recent reading matters to consumers, so this is a value cell
// rather than a queue. Frequency and RMS are packed into one AtomicU64 so a
// reader never sees a frequency from one block paired with the level of
// another. A seqlock counter ties each reading to the publication that
// wrote it. The writer side is not Clone, which keeps it single-writer.

use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::pitch::PitchEstimate;
use crate::audio::level::level_percent;

#[derive(Debug, Default)]
struct Shared {
    /// High 32 bits: frequency (0.0 for no pitch). Low 32 bits: RMS
    packed: AtomicU64,
    /// Twice the number of publications; odd while one is being written
    sequence: AtomicU64,
}

fn pack(frequency: f32, rms: f32) -> u64 {
    ((frequency.to_bits() as u64) << 32) | rms.to_bits() as u64
}

fn unpack(packed: u64) -> (f32, f32) {
    (
        f32::from_bits((packed >> 32) as u32),
        f32::from_bits(packed as u32),
    )
}

/// Snapshot read by consumers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchReading {
    pub estimate: PitchEstimate,
    /// RMS of the most recent block
    pub rms: f32,
    /// RMS mapped onto 0-100
    pub level_percent: f32,
    /// Increments on every publication; 0 means nothing published yet
    pub sequence: u64,
}

/// Writer half, owned by the audio path
#[derive(Debug)]
pub struct PitchPublisher {
    shared: Arc<Shared>,
    frequency: f32,
}

impl PitchPublisher {
    /// Publish a new estimate together with the current block level
    pub fn publish(&mut self, estimate: PitchEstimate, rms: f32) {
        self.frequency = estimate.frequency().unwrap_or(0.0);
        self.store(rms);
    }

    /// Publish a new level, keeping the last estimate
    pub fn publish_level(&mut self, rms: f32) {
        self.store(rms);
    }

    fn store(&self, rms: f32) {
        let shared = &self.shared;
        shared.sequence.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        shared
            .packed
            .store(pack(self.frequency, rms), Ordering::Relaxed);
        shared.sequence.fetch_add(1, Ordering::Release);
    }
}

/// Reader half; clone freely
#[derive(Debug, Clone)]
pub struct PitchMonitor {
    shared: Arc<Shared>,
}

impl PitchMonitor {
    /// Latest reading; retries while the writer is mid-publication
    pub fn latest(&self) -> PitchReading {
        let shared = &self.shared;
        loop {
            let before = shared.sequence.load(Ordering::Acquire);
            let packed = shared.packed.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            let after = shared.sequence.load(Ordering::Relaxed);
            if before == after && before % 2 == 0 {
                let (frequency, rms) = unpack(packed);
                return PitchReading {
                    estimate: PitchEstimate::from_hz(frequency),
                    rms,
                    level_percent: level_percent(rms),
                    sequence: before / 2,
                };
            }
            std::hint::spin_loop();
        }
    }
}

/// Create a connected publisher/monitor pair, initially reading no pitch at zero level
pub fn published_value() -> (PitchPublisher, PitchMonitor) {
    let shared = Arc::new(Shared::default());
    (
        PitchPublisher {
            shared: Arc::clone(&shared),
            frequency: 0.0,
        },
        PitchMonitor { shared },
    )
}
