// Audio module - capture-side plumbing: block transport, windowing, metering and clocks

pub mod buffer_pool;
pub mod clock;
pub mod level;
pub mod signal_buffer;

// Re-export commonly used types for convenience
pub use buffer_pool::{
    AnalysisChannels, AudioBlock, BufferPool, BufferPoolChannels, CaptureChannels,
    DEFAULT_BLOCK_CAPACITY, DEFAULT_BUFFER_COUNT,
};
pub use clock::{AudioClock, FrameClock, ManualClock, SystemClock};
pub use level::{level_percent, rms, LevelMeter};
pub use signal_buffer::{BlockOutput, SignalBuffer};
