//! Integration tests for exercise sequencing and the transport
//!
//! Covers the sequence expansion contract, a full key walk on a manual
//! clock, pause/resume across a whole run and the async driver.

use std::sync::Arc;
use std::time::Duration;

use vocal_trainer::audio::ManualClock;
use vocal_trainer::config::AppConfig;
use vocal_trainer::exercise::{
    build_sequence, Exercise, MusicalEvent, Role, ScheduledEvent, VocalRange,
};
use vocal_trainer::transport::{
    Transport, TransportDriver, TransportEvent, TransportSettings, TransportState,
};

fn arpeggio() -> Vec<MusicalEvent> {
    vec![
        MusicalEvent::note(0, 1.0),
        MusicalEvent::note(7, 1.0),
        MusicalEvent::note(12, 2.0),
    ]
}

fn five_note_scale() -> Exercise {
    Exercise {
        pattern: vec![
            MusicalEvent::note(0, 1.0),
            MusicalEvent::note(2, 1.0),
            MusicalEvent::note(4, 1.0),
            MusicalEvent::note(5, 1.0),
            MusicalEvent::note(7, 2.0),
        ],
        bpm: 120.0,
        range: VocalRange {
            min_midi: 48,
            max_midi: 60,
        },
    }
}

/// Tick a transport on a manual clock until it completes
fn simulate(transport: &mut Transport, clock: &ManualClock, limit: f64) -> Vec<ScheduledEvent> {
    use vocal_trainer::audio::AudioClock;

    let mut events = Vec::new();
    while clock.now().unwrap() <= limit {
        let tick = transport.tick(clock.now());
        events.extend(tick.events);
        if tick.completed {
            break;
        }
        clock.advance(0.025);
    }
    events
}

fn roots(events: &[ScheduledEvent], notes_per_rendition: usize) -> Vec<i32> {
    events
        .iter()
        .filter(|e| e.role == Role::Target)
        .collect::<Vec<_>>()
        .chunks(notes_per_rendition)
        .map(|rendition| rendition[0].midi.unwrap())
        .collect()
}

#[test]
fn test_arpeggio_sequence_timing() {
    let sequence = build_sequence(&arpeggio(), 60, 10.0, 60.0, Role::Target).unwrap();
    let notes: Vec<(i32, f64, f64)> = sequence
        .events
        .iter()
        .map(|e| (e.midi.unwrap(), e.start_time, e.duration))
        .collect();
    assert_eq!(notes, vec![(60, 10.0, 1.0), (67, 11.0, 1.0), (72, 12.0, 2.0)]);
    assert_eq!(sequence.total_duration, 4.0);
}

#[test]
fn test_full_key_walk_on_manual_clock() {
    let clock = ManualClock::new(0.0);
    let mut config = AppConfig::default();
    config.exercise.metronome_enabled = false;
    let mut transport = Transport::new(TransportSettings::from_config(&config));
    transport.start_on(five_note_scale(), &clock).unwrap();

    let events = simulate(&mut transport, &clock, 300.0);
    assert_eq!(transport.state(), TransportState::Completed);
    assert_eq!(
        roots(&events, 5),
        vec![48, 49, 50, 51, 52, 53, 52, 51, 50, 49, 48]
    );
    assert!(events
        .iter()
        .all(|e| (48..=60).contains(&e.midi.unwrap())));

    // 6 beats of pattern plus a 2 beat gap at 120 bpm
    let starts: Vec<f64> = events
        .iter()
        .filter(|e| e.role == Role::Target)
        .step_by(5)
        .map(|e| e.start_time)
        .collect();
    assert!(starts
        .windows(2)
        .all(|pair| ((pair[1] - pair[0]) - 4.0).abs() < 1e-9));
}

#[test]
fn test_clicks_and_notes_stay_ordered() {
    let clock = ManualClock::new(3.0);
    let mut transport = Transport::new(TransportSettings::default());
    transport.start_on(five_note_scale(), &clock).unwrap();

    let events = simulate(&mut transport, &clock, 300.0);
    assert!(events
        .windows(2)
        .all(|pair| pair[0].start_time <= pair[1].start_time));

    // Every note onset coincides with a click
    let clicks: Vec<f64> = events
        .iter()
        .filter(|e| e.role == Role::Metronome)
        .map(|e| e.start_time)
        .collect();
    for note in events.iter().filter(|e| e.role == Role::Target) {
        assert!(
            clicks.iter().any(|t| (t - note.start_time).abs() < 1e-9),
            "note at {} has no click",
            note.start_time
        );
    }
}

#[test]
fn test_long_pause_skips_renditions_it_missed() {
    let clock = ManualClock::new(0.0);
    let mut transport = Transport::new(TransportSettings::default());
    transport.start_on(five_note_scale(), &clock).unwrap();

    // Renditions start every 4 s from 0.2; pause in the gap after the third
    let mut events = simulate(&mut transport, &clock, 11.5);
    transport.pause().unwrap();
    clock.set(40.0);
    transport.resume(Some(40.0)).unwrap();
    events.extend(simulate(&mut transport, &clock, 400.0));

    assert_eq!(transport.state(), TransportState::Completed);
    // Anchors keep their absolute times: 51..=53 and back down to 49 fell
    // inside the pause, the rendition at 40.2 is on root 48 and ends the walk
    assert_eq!(roots(&events, 5), vec![48, 49, 50, 48]);
    assert!(events
        .windows(2)
        .all(|pair| pair[0].start_time <= pair[1].start_time));
}

#[test]
fn test_preview_renditions_precede_targets() {
    let clock = ManualClock::new(0.0);
    let mut config = AppConfig::default();
    config.exercise.preview_before_target = true;
    config.exercise.metronome_enabled = false;
    let mut transport = Transport::new(TransportSettings::from_config(&config));

    let mut exercise = five_note_scale();
    exercise.range.max_midi = 55;
    transport.start_on(exercise, &clock).unwrap();
    let events = simulate(&mut transport, &clock, 120.0);

    let roles: Vec<Role> = events.iter().map(|e| e.role).collect();
    assert_eq!(&roles[..5], &[Role::Preview; 5]);
    assert_eq!(&roles[5..10], &[Role::Target; 5]);
    assert_eq!(events[0].midi, events[5].midi);
}

#[tokio::test]
async fn test_driver_broadcasts_run_over_stream() {
    use tokio_stream::StreamExt;

    let clock = ManualClock::new(0.0);
    let mut config = AppConfig::default();
    config.scheduler.tick_interval_ms = 1;
    let (driver, handle) = TransportDriver::new(
        Transport::new(TransportSettings::from_config(&config)),
        Arc::new(clock.clone()),
        &config.scheduler,
    );
    let mut stream = Box::pin(handle.event_stream());
    let task = driver.spawn();

    let mut exercise = five_note_scale();
    exercise.pattern = vec![MusicalEvent::note(0, 1.0), MusicalEvent::note(12, 1.0)];
    handle.start(exercise).await.unwrap();
    clock.set(30.0);

    let mut targets = 0;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("driver keeps publishing")
            .expect("stream open");
        match event {
            TransportEvent::Scheduled(event) if event.role == Role::Target => targets += 1,
            TransportEvent::Completed => break,
            _ => {}
        }
    }
    assert_eq!(targets, 2);

    handle.shutdown().await.unwrap();
    let transport = task.await.unwrap();
    assert_eq!(transport.state(), TransportState::Stopped);
}
