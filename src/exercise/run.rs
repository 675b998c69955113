// ExerciseRun - key-walking state machine for one exercise
//
// Holds a single pending anchor (root + start time). When the clock reaches
// the anchor's start minus the generation lead, the rendition is expanded,
// the anchor is replaced by the next one, and the events are handed out.
// Nothing here reads a clock or sleeps: callers pass `now` in.

use serde::Serialize;

use super::sequence::{expand, max_semitone_offset};
use super::{Direction, Exercise, Role, ScheduledEvent, SchedulerAnchor};
use crate::config::AppConfig;
use crate::error::ExerciseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Running,
    Paused,
    /// The root walked out of range and the last rendition has ended
    Completed,
    Stopped,
}

/// Tunables that are not part of the exercise definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// Silent beats between renditions
    pub gap_beats: f64,
    /// Seconds before a rendition starts that it is generated
    pub sequence_lead: f64,
    /// Render a Preview pass of each root before its Target pass
    pub preview_before_target: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            gap_beats: super::DEFAULT_GAP_BEATS,
            sequence_lead: 0.2,
            preview_before_target: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            gap_beats: config.exercise.gap_beats.max(0.0),
            sequence_lead: config.scheduler.sequence_lead_seconds(),
            preview_before_target: config.exercise.preview_before_target,
        }
    }
}

/// Events generated by one call to [`ExerciseRun::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTick {
    pub events: Vec<ScheduledEvent>,
    /// Set on the tick that observes the run's completion
    pub completed: bool,
}

pub struct ExerciseRun {
    exercise: Exercise,
    options: RunOptions,
    max_offset: i32,
    direction: Direction,
    pending: Option<SchedulerAnchor>,
    completion_time: Option<f64>,
    phase: RunPhase,
    sequences_generated: u32,
}

impl ExerciseRun {
    /// Validate `exercise` and create a run whose first rendition starts at
    /// `anchor`, walking upward.
    ///
    /// # Errors
    /// Any definition error; no run is created from an invalid definition
    pub fn new(
        exercise: Exercise,
        anchor: SchedulerAnchor,
        options: RunOptions,
    ) -> Result<Self, ExerciseError> {
        exercise.validate()?;
        let max_offset = max_semitone_offset(&exercise.pattern);
        Ok(Self {
            exercise,
            options,
            max_offset,
            direction: Direction::Ascending,
            pending: Some(anchor),
            completion_time: None,
            phase: RunPhase::Running,
            sequences_generated: 0,
        })
    }

    /// Generate every rendition whose generation time has been reached.
    pub fn tick(&mut self, now: f64) -> RunTick {
        let mut tick = RunTick::default();
        if self.phase != RunPhase::Running {
            return tick;
        }

        while let Some(anchor) = self.pending {
            if anchor.sequence_start_time - self.options.sequence_lead > now {
                break;
            }
            self.generate(anchor, &mut tick.events);
        }

        if let Some(end) = self.completion_time {
            if now >= end {
                self.phase = RunPhase::Completed;
                tick.completed = true;
            }
        }
        tick
    }

    fn generate(&mut self, anchor: SchedulerAnchor, events: &mut Vec<ScheduledEvent>) {
        let beat = self.exercise.beat_duration();
        let gap = self.options.gap_beats * beat;
        let root = anchor.root_midi;
        let mut start = anchor.sequence_start_time;

        if self.options.preview_before_target {
            let preview = expand(&self.exercise.pattern, root, start, beat, Role::Preview);
            events.extend(preview.events);
            start += preview.total_duration + gap;
        }
        let target = expand(&self.exercise.pattern, root, start, beat, Role::Target);
        events.extend(target.events);
        let end = start + target.total_duration;
        self.sequences_generated += 1;

        let range = self.exercise.range;
        let mut next = root + self.direction.step();
        if self.direction == Direction::Ascending && next + self.max_offset > range.max_midi {
            self.direction = Direction::Descending;
            next = root - 1;
        }

        if self.direction == Direction::Descending && next < range.min_midi {
            self.pending = None;
            self.completion_time = Some(end);
            log::info!(
                "[Exercise] Last rendition on root {} ends at {:.3}s",
                root,
                end
            );
        } else {
            self.pending = Some(SchedulerAnchor {
                root_midi: next,
                sequence_start_time: end + gap,
            });
        }
    }

    /// Suspend generation, keeping the pending anchor. Idempotent.
    pub fn pause(&mut self) {
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Paused;
        }
    }

    /// Continue against the original absolute anchor times. No-op unless paused.
    pub fn resume(&mut self) {
        if self.phase == RunPhase::Paused {
            self.phase = RunPhase::Running;
        }
    }

    /// Discard all state. Idempotent.
    pub fn stop(&mut self) {
        self.pending = None;
        self.completion_time = None;
        self.phase = RunPhase::Stopped;
    }

    /// Seconds until the next generation or completion is due, if any
    pub fn next_wakeup(&self, now: f64) -> Option<f64> {
        if self.phase != RunPhase::Running {
            return None;
        }
        let generation = self
            .pending
            .map(|anchor| anchor.sequence_start_time - self.options.sequence_lead);
        let due = match (generation, self.completion_time) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return None,
        };
        Some((due - now).max(0.0))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Anchor of the next rendition, if one is pending
    pub fn pending_anchor(&self) -> Option<SchedulerAnchor> {
        self.pending
    }

    pub fn completion_time(&self) -> Option<f64> {
        self.completion_time
    }

    pub fn sequences_generated(&self) -> u32 {
        self.sequences_generated
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{MusicalEvent, VocalRange};

    fn exercise(pattern: Vec<MusicalEvent>) -> Exercise {
        Exercise {
            pattern,
            bpm: 60.0,
            range: VocalRange {
                min_midi: 48,
                max_midi: 60,
            },
        }
    }

    fn fifth() -> Vec<MusicalEvent> {
        vec![MusicalEvent::note(0, 1.0), MusicalEvent::note(7, 1.0)]
    }

    fn start(root_midi: i32, time: f64) -> SchedulerAnchor {
        SchedulerAnchor {
            root_midi,
            sequence_start_time: time,
        }
    }

    #[test]
    fn test_first_rendition_waits_for_lead() {
        let mut run = ExerciseRun::new(exercise(fifth()), start(48, 10.0), RunOptions::default())
            .unwrap();
        assert!(run.tick(9.7).events.is_empty());

        let tick = run.tick(9.8);
        assert_eq!(tick.events.len(), 2);
        assert_eq!(tick.events[0].start_time, 10.0);
        assert_eq!(tick.events[0].midi, Some(48));
        assert_eq!(tick.events[1].midi, Some(55));

        // 2 beats of pattern + 2 beat gap at 60 bpm
        assert_eq!(run.pending_anchor(), Some(start(49, 14.0)));
    }

    #[test]
    fn test_walks_up_turns_and_walks_down() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 0.0), RunOptions::default()).unwrap();
        let mut events = Vec::new();
        let mut now = 0.0;
        while run.phase() == RunPhase::Running && now < 1000.0 {
            events.extend(run.tick(now).events);
            now += 0.25;
        }
        // Two notes per rendition, root first
        let roots: Vec<i32> = events.chunks(2).filter_map(|pair| pair[0].midi).collect();
        assert_eq!(
            roots,
            vec![48, 49, 50, 51, 52, 53, 52, 51, 50, 49, 48]
        );
        assert_eq!(run.phase(), RunPhase::Completed);
        assert_eq!(run.sequences_generated(), 11);
    }

    #[test]
    fn test_flip_happens_exactly_at_upper_bound() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(53, 0.0), RunOptions::default()).unwrap();
        run.tick(0.0);
        // 54 + 7 > 60, so the next root is 52
        assert_eq!(run.direction(), Direction::Descending);
        assert_eq!(run.pending_anchor().map(|a| a.root_midi), Some(52));
    }

    #[test]
    fn test_pattern_wider_than_range_runs_once() {
        let octave = vec![MusicalEvent::note(0, 1.0), MusicalEvent::note(12, 1.0)];
        let mut run = ExerciseRun::new(exercise(octave), start(48, 0.0), RunOptions::default())
            .unwrap();

        let tick = run.tick(0.0);
        assert_eq!(tick.events.len(), 2);
        assert!(!tick.completed);
        assert_eq!(run.pending_anchor(), None);
        assert_eq!(run.completion_time(), Some(2.0));

        assert!(!run.tick(1.9).completed);
        let tick = run.tick(2.0);
        assert!(tick.completed);
        assert!(tick.events.is_empty());
        assert_eq!(run.phase(), RunPhase::Completed);
        assert_eq!(run.sequences_generated(), 1);
    }

    #[test]
    fn test_roots_never_leave_range() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 0.0), RunOptions::default()).unwrap();
        let mut now = 0.0;
        while run.phase() == RunPhase::Running && now < 1000.0 {
            for event in run.tick(now).events {
                let midi = event.midi.unwrap();
                assert!((48..=60).contains(&midi), "midi {} out of range", midi);
            }
            now += 1.0;
        }
        assert_eq!(run.phase(), RunPhase::Completed);
    }

    #[test]
    fn test_pause_keeps_anchor_and_resume_uses_original_times() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 0.0), RunOptions::default()).unwrap();
        run.tick(0.0);
        let anchor = run.pending_anchor();
        let direction = run.direction();

        run.pause();
        run.pause();
        assert_eq!(run.phase(), RunPhase::Paused);
        assert!(run.tick(100.0).events.is_empty());
        assert_eq!(run.pending_anchor(), anchor);
        assert_eq!(run.direction(), direction);
        assert_eq!(run.next_wakeup(100.0), None);

        run.resume();
        let tick = run.tick(3.9);
        assert_eq!(tick.events[0].start_time, 4.0);
        assert_eq!(tick.events[0].midi, Some(49));
    }

    #[test]
    fn test_resume_without_pause_is_noop() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 0.0), RunOptions::default()).unwrap();
        run.tick(0.0);
        let anchor = run.pending_anchor();
        run.resume();
        assert_eq!(run.phase(), RunPhase::Running);
        assert_eq!(run.pending_anchor(), anchor);
        assert_eq!(run.direction(), Direction::Ascending);
    }

    #[test]
    fn test_stop_discards_state() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 0.0), RunOptions::default()).unwrap();
        run.stop();
        run.stop();
        assert_eq!(run.phase(), RunPhase::Stopped);
        assert_eq!(run.pending_anchor(), None);
        assert!(run.tick(0.0).events.is_empty());
        run.resume();
        assert_eq!(run.phase(), RunPhase::Stopped);
    }

    #[test]
    fn test_preview_pass_precedes_target() {
        let options = RunOptions {
            preview_before_target: true,
            ..RunOptions::default()
        };
        let mut run = ExerciseRun::new(exercise(fifth()), start(48, 0.0), options).unwrap();
        let events = run.tick(0.0).events;

        let roles: Vec<(Role, f64)> = events.iter().map(|e| (e.role, e.start_time)).collect();
        assert_eq!(
            roles,
            vec![
                (Role::Preview, 0.0),
                (Role::Preview, 1.0),
                (Role::Target, 4.0),
                (Role::Target, 5.0)
            ]
        );
        assert_eq!(run.pending_anchor(), Some(start(49, 8.0)));
    }

    #[test]
    fn test_next_wakeup_reports_generation_delay() {
        let mut run =
            ExerciseRun::new(exercise(fifth()), start(48, 1.0), RunOptions::default()).unwrap();
        let wake = run.next_wakeup(0.0).unwrap();
        assert!((wake - 0.8).abs() < 1e-9);
        assert_eq!(run.next_wakeup(5.0), Some(0.0));

        run.tick(0.8);
        let wake = run.next_wakeup(1.0).unwrap();
        assert!((wake - (5.0 - 0.2 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let mut bad = exercise(fifth());
        bad.range = VocalRange {
            min_midi: 60,
            max_midi: 60,
        };
        assert!(ExerciseRun::new(bad, start(60, 0.0), RunOptions::default()).is_err());

        assert_eq!(
            ExerciseRun::new(exercise(vec![]), start(48, 0.0), RunOptions::default()).err(),
            Some(ExerciseError::EmptyPattern)
        );
    }
}
