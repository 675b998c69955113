// AnalysisSession: lifecycle of the analysis thread
//
// Owns the running flag and join handle for one capture session. Starting an
// already running session or stopping an idle one is an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::analysis::{spawn_analysis_thread, VoiceAnalyzer};
use crate::audio::buffer_pool::AnalysisChannels;
use crate::error::{log_audio_error, AudioError};

/// Manages the analysis thread for one capture session
///
/// # Example
/// ```ignore
/// let (capture, analysis) = BufferPool::new(32, 512).split();
/// let mut session = AnalysisSession::new(100);
/// session.start(analyzer, analysis)?;
/// // ... capture callback sends blocks ...
/// let analyzer = session.stop()?;
/// ```
pub struct AnalysisSession {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<VoiceAnalyzer>>,
    log_every_n_windows: u64,
}

impl AnalysisSession {
    pub fn new(log_every_n_windows: u64) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            log_every_n_windows,
        }
    }

    /// Start draining `channels` into `analyzer` on a dedicated thread
    ///
    /// # Errors
    /// - `AlreadyRunning` if a thread from an earlier `start` is still owned
    /// - `ThreadSpawnFailed` if the OS refuses the thread
    pub fn start(
        &mut self,
        analyzer: VoiceAnalyzer,
        channels: AnalysisChannels,
    ) -> Result<(), AudioError> {
        if self.handle.is_some() {
            let err = AudioError::AlreadyRunning;
            log_audio_error(&err, "start_analysis");
            return Err(err);
        }

        self.running.store(true, Ordering::Release);
        let handle = spawn_analysis_thread(
            analyzer,
            channels,
            Arc::clone(&self.running),
            self.log_every_n_windows,
        )
        .map_err(|err| {
            self.running.store(false, Ordering::Release);
            log_audio_error(&err, "start_analysis");
            err
        })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the thread once the queue is drained and return its analyzer
    ///
    /// # Errors
    /// - `NotRunning` if the session was never started or already stopped
    /// - `StreamFailure` if the analysis thread panicked
    pub fn stop(&mut self) -> Result<VoiceAnalyzer, AudioError> {
        let Some(handle) = self.handle.take() else {
            return Err(AudioError::NotRunning);
        };
        self.running.store(false, Ordering::Release);
        handle.join().map_err(|_| {
            let err = AudioError::StreamFailure {
                reason: "analysis thread panicked".to_string(),
            };
            log_audio_error(&err, "stop_analysis");
            err
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
