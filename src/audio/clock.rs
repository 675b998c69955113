//! Time sources for the scheduling path.
//!
//! Scheduling is driven by audio-clock time, not wall time, so a suspended
//! capture stream naturally freezes scheduling. A clock that cannot be read
//! reports `None` and the scheduler stays idle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic clock in seconds
pub trait AudioClock: Send + Sync {
    /// Current time in seconds, or `None` while the clock is unavailable
    fn now(&self) -> Option<f64>;
}

/// Clock derived from the number of frames captured so far.
///
/// Cloned handles share the same counter: the capture path calls
/// [`FrameClock::advance`] once per block and schedulers read it.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl FrameClock {
    /// New stopped clock at frame zero
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            sample_rate,
        }
    }

    pub fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Release);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Mark the capture stream as running or suspended
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> Option<f64> {
        if self.sample_rate == 0 || !self.is_running() {
            return None;
        }
        Some(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Clock set explicitly by the caller, for tests and offline simulation
#[derive(Debug, Clone)]
pub struct ManualClock {
    seconds_bits: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl ManualClock {
    pub fn new(start_seconds: f64) -> Self {
        Self {
            seconds_bits: Arc::new(AtomicU64::new(start_seconds.to_bits())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.seconds_bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        let current = f64::from_bits(self.seconds_bits.load(Ordering::Acquire));
        self.set(current + seconds);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> Option<f64> {
        if !self.available.load(Ordering::Acquire) {
            return None;
        }
        Some(f64::from_bits(self.seconds_bits.load(Ordering::Acquire)))
    }
}

/// Wall-clock fallback backed by `Instant`, zero at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> Option<f64> {
        Some(self.start.elapsed().as_secs_f64())
    }
}
