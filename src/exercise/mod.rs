//! Exercise definitions and the key-walking sequencer.
//!
//! An exercise is an ordered pattern of notes and rests relative to a root
//! pitch. Each cycle renders the pattern on the current root, then moves the
//! root a semitone up until the top of the pattern would leave the singer's
//! range, turns around, and walks down until the root would drop below it.

use serde::{Deserialize, Serialize};

use crate::error::ExerciseError;
use crate::music::midi_to_hz;

mod run;
mod sequence;

pub use run::{ExerciseRun, RunOptions, RunPhase, RunTick};
pub use sequence::{build_sequence, max_semitone_offset, Sequence};

/// Silent beats between consecutive renditions
pub const DEFAULT_GAP_BEATS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Note,
    Rest,
}

/// One step of an exercise pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicalEvent {
    pub kind: EventKind,
    /// Semitones above the root; ignored for rests
    #[serde(default)]
    pub semitone_offset: i32,
    pub duration_beats: f64,
}

impl MusicalEvent {
    pub fn note(semitone_offset: i32, duration_beats: f64) -> Self {
        Self {
            kind: EventKind::Note,
            semitone_offset,
            duration_beats,
        }
    }

    pub fn rest(duration_beats: f64) -> Self {
        Self {
            kind: EventKind::Rest,
            semitone_offset: 0,
            duration_beats,
        }
    }
}

/// Inclusive MIDI note bounds of the singer's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocalRange {
    pub min_midi: i32,
    pub max_midi: i32,
}

impl VocalRange {
    pub fn new(min_midi: i32, max_midi: i32) -> Result<Self, ExerciseError> {
        let range = Self { min_midi, max_midi };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ExerciseError> {
        if self.min_midi >= self.max_midi {
            return Err(ExerciseError::InvalidVocalRange {
                min: self.min_midi,
                max: self.max_midi,
            });
        }
        Ok(())
    }
}

/// Direction the root moves between renditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// +1 or -1 semitone per rendition
    pub fn step(&self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// Root and start time of the next rendition to generate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerAnchor {
    pub root_midi: i32,
    /// Absolute clock time the rendition starts at
    pub sequence_start_time: f64,
}

/// What a scheduled event is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Demonstration rendition played before the singer's turn
    Preview,
    /// Rendition the singer performs
    Target,
    /// Metronome click
    Metronome,
}

/// Event with absolute timing, ready for synthesis and the note timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Absolute clock time in seconds
    pub start_time: f64,
    pub duration: f64,
    /// MIDI note for note events
    pub midi: Option<i32>,
    pub frequency_hz: Option<f64>,
    pub role: Role,
}

impl ScheduledEvent {
    pub fn note(midi: i32, start_time: f64, duration: f64, role: Role) -> Self {
        Self {
            start_time,
            duration,
            midi: Some(midi),
            frequency_hz: Some(midi_to_hz(midi)),
            role,
        }
    }

    pub fn click(start_time: f64, duration: f64) -> Self {
        Self {
            start_time,
            duration,
            midi: None,
            frequency_hz: None,
            role: Role::Metronome,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Complete exercise definition supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub pattern: Vec<MusicalEvent>,
    pub bpm: f64,
    pub range: VocalRange,
}

impl Exercise {
    /// Check the whole definition; nothing is built from an invalid one
    pub fn validate(&self) -> Result<(), ExerciseError> {
        self.range.validate()?;
        sequence::validate(&self.pattern, self.bpm)
    }

    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }
}
