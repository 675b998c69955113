use super::{EventKind, MusicalEvent, Role, ScheduledEvent};
use crate::error::ExerciseError;

/// One rendition of a pattern on a fixed root
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Note events in start-time order; rests produce no event
    pub events: Vec<ScheduledEvent>,
    /// Length of the rendition in seconds, rests included
    pub total_duration: f64,
}

pub(crate) fn validate(pattern: &[MusicalEvent], bpm: f64) -> Result<(), ExerciseError> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(ExerciseError::InvalidTempo { bpm });
    }
    if pattern.is_empty() {
        return Err(ExerciseError::EmptyPattern);
    }
    for (index, event) in pattern.iter().enumerate() {
        if !(event.duration_beats.is_finite() && event.duration_beats > 0.0) {
            return Err(ExerciseError::InvalidDuration {
                index,
                duration_beats: event.duration_beats,
            });
        }
    }
    Ok(())
}

/// Largest semitone offset of any note in the pattern, or 0 with no notes
pub fn max_semitone_offset(pattern: &[MusicalEvent]) -> i32 {
    pattern
        .iter()
        .filter(|event| event.kind == EventKind::Note)
        .map(|event| event.semitone_offset)
        .max()
        .unwrap_or(0)
        .max(0)
}

/// Expand a pattern into absolutely timed events on `root_midi`.
///
/// # Arguments
/// * `pattern` - Notes and rests in order
/// * `root_midi` - MIDI note that offset 0 maps to
/// * `start_time` - Absolute clock time of the first event
/// * `bpm` - Tempo; one beat lasts `60 / bpm` seconds
/// * `role` - Role stamped on every produced event
///
/// # Errors
/// The whole pattern is validated first; no partial sequence is produced
pub fn build_sequence(
    pattern: &[MusicalEvent],
    root_midi: i32,
    start_time: f64,
    bpm: f64,
    role: Role,
) -> Result<Sequence, ExerciseError> {
    validate(pattern, bpm)?;
    Ok(expand(pattern, root_midi, start_time, 60.0 / bpm, role))
}

/// Expansion of an already validated pattern
pub(crate) fn expand(
    pattern: &[MusicalEvent],
    root_midi: i32,
    start_time: f64,
    beat_duration: f64,
    role: Role,
) -> Sequence {
    let mut cursor = 0.0;
    let mut events = Vec::with_capacity(pattern.len());
    for event in pattern {
        let duration = event.duration_beats * beat_duration;
        if event.kind == EventKind::Note {
            events.push(ScheduledEvent::note(
                root_midi + event.semitone_offset,
                start_time + cursor,
                duration,
                role,
            ));
        }
        cursor += duration;
    }

    Sequence {
        events,
        total_duration: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arpeggio_at_sixty_bpm() {
        let pattern = [
            MusicalEvent::note(0, 1.0),
            MusicalEvent::note(7, 1.0),
            MusicalEvent::note(12, 2.0),
        ];
        let sequence = build_sequence(&pattern, 60, 10.0, 60.0, Role::Target).unwrap();

        let timing: Vec<(Option<i32>, f64, f64)> = sequence
            .events
            .iter()
            .map(|e| (e.midi, e.start_time, e.duration))
            .collect();
        assert_eq!(
            timing,
            vec![
                (Some(60), 10.0, 1.0),
                (Some(67), 11.0, 1.0),
                (Some(72), 12.0, 2.0)
            ]
        );
        assert_eq!(sequence.total_duration, 4.0);
        assert!(sequence.events.iter().all(|e| e.role == Role::Target));
    }

    #[test]
    fn test_rests_only_advance_time() {
        let pattern = [
            MusicalEvent::note(0, 1.0),
            MusicalEvent::rest(2.0),
            MusicalEvent::note(2, 1.0),
        ];
        let sequence = build_sequence(&pattern, 48, 0.0, 120.0, Role::Preview).unwrap();
        assert_eq!(sequence.events.len(), 2);
        assert_eq!(sequence.events[1].start_time, 1.5);
        assert_eq!(sequence.events[1].midi, Some(50));
        assert_eq!(sequence.total_duration, 2.0);
    }

    #[test]
    fn test_invalid_duration_rejects_whole_pattern() {
        let pattern = [MusicalEvent::note(0, 1.0), MusicalEvent::note(4, 0.0)];
        assert_eq!(
            build_sequence(&pattern, 60, 0.0, 60.0, Role::Target),
            Err(ExerciseError::InvalidDuration {
                index: 1,
                duration_beats: 0.0
            })
        );

        let pattern = [MusicalEvent::rest(f64::NAN)];
        assert!(matches!(
            build_sequence(&pattern, 60, 0.0, 60.0, Role::Target),
            Err(ExerciseError::InvalidDuration { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_tempo_and_empty_pattern() {
        let pattern = [MusicalEvent::note(0, 1.0)];
        assert!(matches!(
            build_sequence(&pattern, 60, 0.0, -10.0, Role::Target),
            Err(ExerciseError::InvalidTempo { .. })
        ));
        assert_eq!(
            build_sequence(&[], 60, 0.0, 60.0, Role::Target),
            Err(ExerciseError::EmptyPattern)
        );
    }

    #[test]
    fn test_max_semitone_offset() {
        let pattern = [
            MusicalEvent::note(4, 1.0),
            MusicalEvent::rest(1.0),
            MusicalEvent::note(12, 1.0),
            MusicalEvent::note(-3, 1.0),
        ];
        assert_eq!(max_semitone_offset(&pattern), 12);
        assert_eq!(max_semitone_offset(&[MusicalEvent::rest(1.0)]), 0);
        assert_eq!(max_semitone_offset(&[MusicalEvent::note(-5, 1.0)]), 0);
    }
}
