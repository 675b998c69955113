// Vocal Trainer Core - pitch tracking and exercise scheduling
// Lock-free audio-path analysis plus a look-ahead transport on the audio clock

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod exercise;
pub mod fixtures;
pub mod music;
pub mod transport;

// Re-exports for convenience
pub use analysis::pitch::{
    Algorithm, EstimatorConfig, GateMode, PitchEstimate, PitchEstimator, TrackerState, Verdict,
};
pub use analysis::tracker::PitchTracker;
pub use analysis::{AnalysisSession, AnalyzerControl, PitchMonitor, PitchReading, VoiceAnalyzer};
pub use config::AppConfig;
pub use error::{AudioError, ErrorCode, ExerciseError};
pub use exercise::{
    build_sequence, Exercise, ExerciseRun, MusicalEvent, ScheduledEvent, SchedulerAnchor,
    VocalRange,
};
pub use transport::{Transport, TransportDriver, TransportEvent, TransportHandle};
