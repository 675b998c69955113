//! ClockScheduler - look-ahead metronome on an audio clock
//!
//! Beats are addressed by index from an anchor time, `anchor + k * beat`, so
//! timing never accumulates drift across ticks. Each tick emits every beat
//! that falls inside the look-ahead window `[.., now + lookahead)`.
//!
//! The scheduler never reads a clock itself: callers pass the current clock
//! reading, `None` meaning the clock is unavailable.

use serde::Serialize;

use crate::config::SchedulerConfig;
use crate::error::ExerciseError;
use crate::exercise::ScheduledEvent;

/// Tolerance when deciding whether `now` sits exactly on a beat
const BEAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Scheduling,
    Paused,
    Stopped,
}

/// Result of a start or resume request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerStatus {
    Scheduling,
    /// The clock could not be read; nothing changed
    NotScheduling,
}

pub struct ClockScheduler {
    state: SchedulerState,
    anchor: f64,
    beat: f64,
    next_index: u64,
    lookahead: f64,
    click_duration: f64,
}

impl ClockScheduler {
    pub fn new(lookahead: f64, click_duration: f64) -> Self {
        Self {
            state: SchedulerState::Idle,
            anchor: 0.0,
            beat: 0.0,
            next_index: 0,
            lookahead: lookahead.max(0.0),
            click_duration: click_duration.max(0.0),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.lookahead_seconds(), config.click_duration_seconds())
    }

    /// Start emitting beats on the grid `anchor + k * 60 / bpm`.
    ///
    /// The first emitted beat is the earliest grid point not before `now`
    /// and never before the anchor itself.
    ///
    /// # Errors
    /// `InvalidTempo` for a non-positive or non-finite `bpm`
    pub fn start(
        &mut self,
        now: Option<f64>,
        anchor: f64,
        bpm: f64,
    ) -> Result<SchedulerStatus, ExerciseError> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(ExerciseError::InvalidTempo { bpm });
        }
        let Some(now) = now else {
            log::warn!("[Transport] Clock unavailable, metronome not started");
            return Ok(SchedulerStatus::NotScheduling);
        };

        self.anchor = anchor;
        self.beat = 60.0 / bpm;
        self.next_index = self.first_index_at(now);
        self.state = SchedulerState::Scheduling;
        log::debug!(
            "[Transport] Metronome started: anchor={:.3}s beat={:.3}s first_index={}",
            anchor,
            self.beat,
            self.next_index
        );
        Ok(SchedulerStatus::Scheduling)
    }

    fn first_index_at(&self, now: f64) -> u64 {
        let beats = (now - self.anchor) / self.beat;
        if beats <= 0.0 {
            0
        } else {
            (beats - BEAT_EPSILON).ceil().max(0.0) as u64
        }
    }

    /// Append every beat due before `now + lookahead` to `out`.
    ///
    /// Returns the number of clicks appended.
    pub fn tick(&mut self, now: Option<f64>, out: &mut Vec<ScheduledEvent>) -> usize {
        let Some(now) = now else {
            return 0;
        };
        if self.state != SchedulerState::Scheduling {
            return 0;
        }

        let horizon = now + self.lookahead;
        let mut emitted = 0;
        loop {
            let time = self.beat_time(self.next_index);
            if time >= horizon {
                break;
            }
            out.push(ScheduledEvent::click(time, self.click_duration));
            self.next_index += 1;
            emitted += 1;
        }
        emitted
    }

    /// Stop emitting; anchor and tempo are kept. Idempotent.
    pub fn pause(&mut self) {
        if self.state == SchedulerState::Scheduling {
            self.state = SchedulerState::Paused;
        }
    }

    /// Continue from the current clock reading.
    ///
    /// Beats that already went out are never emitted again, even when the
    /// clock reads earlier than the last emitted beat.
    pub fn resume(&mut self, now: Option<f64>) -> SchedulerStatus {
        match self.state {
            SchedulerState::Scheduling => return SchedulerStatus::Scheduling,
            SchedulerState::Paused => {}
            SchedulerState::Idle | SchedulerState::Stopped => {
                return SchedulerStatus::NotScheduling
            }
        }
        let Some(now) = now else {
            return SchedulerStatus::NotScheduling;
        };
        self.next_index = self.first_index_at(now).max(self.next_index);
        self.state = SchedulerState::Scheduling;
        SchedulerStatus::Scheduling
    }

    /// Clear all state. Idempotent.
    pub fn stop(&mut self) {
        self.next_index = 0;
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Time of the next beat to be emitted, while scheduling or paused
    pub fn next_beat_time(&self) -> Option<f64> {
        match self.state {
            SchedulerState::Scheduling | SchedulerState::Paused => {
                Some(self.beat_time(self.next_index))
            }
            SchedulerState::Idle | SchedulerState::Stopped => None,
        }
    }

    fn beat_time(&self, index: u64) -> f64 {
        self.anchor + index as f64 * self.beat
    }
}
