// Transport - metronome and exercise run on one audio clock
//
// The transport owns a ClockScheduler and the active ExerciseRun. Both are
// ticked from the same clock reading; generated notes are held back until
// they enter the look-ahead window, so the events handed out across ticks
// are in non-decreasing start-time order with clicks and notes interleaved.

use std::collections::VecDeque;

use serde::Serialize;

use crate::audio::clock::AudioClock;
use crate::config::AppConfig;
use crate::error::{log_exercise_error, ExerciseError};
use crate::exercise::{Exercise, ExerciseRun, RunOptions, ScheduledEvent, SchedulerAnchor};

pub mod driver;
pub mod metronome;

pub use driver::{TransportCommand, TransportDriver, TransportEvent, TransportHandle};
pub use metronome::{ClockScheduler, SchedulerState, SchedulerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportState {
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

/// Events released by one [`Transport::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportTick {
    /// Clicks and notes in start-time order
    pub events: Vec<ScheduledEvent>,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSettings {
    pub lookahead: f64,
    pub click_duration: f64,
    pub metronome_enabled: bool,
    pub run: RunOptions,
}

impl TransportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            lookahead: config.scheduler.lookahead_seconds(),
            click_duration: config.scheduler.click_duration_seconds(),
            metronome_enabled: config.exercise.metronome_enabled,
            run: RunOptions::from_config(config),
        }
        .normalized()
    }

    /// Raise the generation lead to at least the look-ahead.
    ///
    /// A note must be generated before any later click can enter the
    /// look-ahead window, otherwise the click is released first.
    pub fn normalized(mut self) -> Self {
        if self.run.sequence_lead < self.lookahead {
            log::warn!(
                "[Transport] Sequence lead {:.3}s is shorter than look-ahead {:.3}s, using {:.3}s",
                self.run.sequence_lead,
                self.lookahead,
                self.lookahead
            );
            self.run.sequence_lead = self.lookahead;
        }
        self
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct Transport {
    settings: TransportSettings,
    metronome: ClockScheduler,
    run: Option<ExerciseRun>,
    exercise: Option<Exercise>,
    /// Generated notes not yet inside the look-ahead window
    queued: VecDeque<ScheduledEvent>,
    /// Notes starting before the last resume are skipped
    resumed_at: Option<f64>,
    state: TransportState,
}

impl Transport {
    pub fn new(settings: TransportSettings) -> Self {
        let settings = settings.normalized();
        Self {
            settings,
            metronome: ClockScheduler::new(settings.lookahead, settings.click_duration),
            run: None,
            exercise: None,
            queued: VecDeque::new(),
            resumed_at: None,
            state: TransportState::Idle,
        }
    }

    /// Start `exercise` from the bottom of its range.
    ///
    /// The first rendition and the metronome grid begin one generation lead
    /// after `now`. Any run already in progress is replaced.
    ///
    /// # Errors
    /// Definition errors, raised before any state changes
    pub fn start(
        &mut self,
        exercise: Exercise,
        now: Option<f64>,
    ) -> Result<SchedulerStatus, ExerciseError> {
        if let Err(err) = exercise.validate() {
            log_exercise_error(&err, "start");
            return Err(err);
        }
        let Some(now) = now else {
            log::warn!("[Transport] Clock unavailable, exercise not started");
            return Ok(SchedulerStatus::NotScheduling);
        };

        let start_time = now + self.settings.run.sequence_lead;
        let anchor = SchedulerAnchor {
            root_midi: exercise.range.min_midi,
            sequence_start_time: start_time,
        };
        let run = ExerciseRun::new(exercise.clone(), anchor, self.settings.run)?;

        self.metronome.stop();
        if self.settings.metronome_enabled {
            self.metronome.start(Some(now), start_time, exercise.bpm)?;
        }
        self.queued.clear();
        self.resumed_at = None;
        log::info!(
            "[Transport] Started: {} events at {} bpm, range {}..={}, first rendition at {:.3}s",
            exercise.pattern.len(),
            exercise.bpm,
            exercise.range.min_midi,
            exercise.range.max_midi,
            start_time
        );
        self.run = Some(run);
        self.exercise = Some(exercise);
        self.state = TransportState::Running;
        Ok(SchedulerStatus::Scheduling)
    }

    /// Same as [`Transport::start`], reading the time from `clock`
    pub fn start_on(
        &mut self,
        exercise: Exercise,
        clock: &dyn AudioClock,
    ) -> Result<SchedulerStatus, ExerciseError> {
        self.start(exercise, clock.now())
    }

    /// Release every event that has entered the look-ahead window.
    pub fn tick(&mut self, now: Option<f64>) -> TransportTick {
        let mut tick = TransportTick::default();
        let Some(now) = now else {
            return tick;
        };
        if self.state != TransportState::Running {
            return tick;
        }
        let Some(run) = self.run.as_mut() else {
            return tick;
        };

        let generated = run.tick(now);
        let skip_before = self.resumed_at.unwrap_or(f64::NEG_INFINITY);
        self.queued.extend(
            generated
                .events
                .into_iter()
                .filter(|event| event.start_time >= skip_before),
        );

        let horizon = now + self.settings.lookahead;
        while let Some(event) = self.queued.front() {
            if event.start_time >= horizon {
                break;
            }
            tick.events.extend(self.queued.pop_front());
        }
        self.metronome.tick(Some(now), &mut tick.events);
        tick.events
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        if generated.completed {
            // Completion is due at the end of the last note, so nothing is left queued
            tick.events.extend(self.queued.drain(..));
            self.metronome.stop();
            self.state = TransportState::Completed;
            tick.completed = true;
            log::info!("[Transport] Exercise completed at {:.3}s", now);
        }
        tick
    }

    /// Suspend scheduling; anchor, direction and queued notes are kept.
    pub fn pause(&mut self) -> Result<(), ExerciseError> {
        match self.state {
            TransportState::Running => {
                if let Some(run) = self.run.as_mut() {
                    run.pause();
                }
                self.metronome.pause();
                self.state = TransportState::Paused;
                log::info!("[Transport] Paused");
                Ok(())
            }
            TransportState::Paused => Ok(()),
            _ => Err(ExerciseError::NotRunning),
        }
    }

    /// Continue a paused run against its original absolute anchors.
    ///
    /// Notes that would have started during the pause are skipped, whether
    /// already queued or generated late; later notes keep their times.
    pub fn resume(&mut self, now: Option<f64>) -> Result<SchedulerStatus, ExerciseError> {
        match self.state {
            TransportState::Running => return Ok(SchedulerStatus::Scheduling),
            TransportState::Paused => {}
            _ => return Err(ExerciseError::NotRunning),
        }
        let Some(now) = now else {
            return Ok(SchedulerStatus::NotScheduling);
        };

        let before = self.queued.len();
        self.queued.retain(|event| event.start_time >= now);
        if before != self.queued.len() {
            log::debug!(
                "[Transport] Dropped {} notes that started during pause",
                before - self.queued.len()
            );
        }
        self.resumed_at = Some(now);
        if let Some(run) = self.run.as_mut() {
            run.resume();
        }
        if self.settings.metronome_enabled {
            self.metronome.resume(Some(now));
        }
        self.state = TransportState::Running;
        log::info!("[Transport] Resumed at {:.3}s", now);
        Ok(SchedulerStatus::Scheduling)
    }

    /// Discard the run and all scheduled state. Idempotent.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.as_mut() {
            run.stop();
        }
        self.run = None;
        self.metronome.stop();
        self.queued.clear();
        if self.state != TransportState::Stopped {
            log::info!("[Transport] Stopped");
        }
        self.state = TransportState::Stopped;
    }

    /// Stop and start the last exercise again from the bottom of its range.
    ///
    /// # Errors
    /// `NotRunning` if no exercise was ever started
    pub fn restart(&mut self, now: Option<f64>) -> Result<SchedulerStatus, ExerciseError> {
        let Some(exercise) = self.exercise.clone() else {
            return Err(ExerciseError::NotRunning);
        };
        self.stop();
        self.start(exercise, now)
    }

    /// Seconds until the next tick has anything to do, while running
    pub fn next_wakeup(&self, now: f64) -> Option<f64> {
        if self.state != TransportState::Running {
            return None;
        }
        let lookahead = self.settings.lookahead;
        let release = |time: f64| (time - lookahead - now).max(0.0);

        [
            self.run.as_ref().and_then(|run| run.next_wakeup(now)),
            self.queued.front().map(|event| release(event.start_time)),
            self.metronome
                .next_beat_time()
                .filter(|_| self.metronome.state() == SchedulerState::Scheduling)
                .map(release),
        ]
        .into_iter()
        .flatten()
        .reduce(f64::min)
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn run(&self) -> Option<&ExerciseRun> {
        self.run.as_ref()
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}
