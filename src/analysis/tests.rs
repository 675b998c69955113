use super::*;
use crate::analysis::pitch::PitchEstimate;
use crate::audio::buffer_pool::BufferPool;
use crate::fixtures::sine;

const SAMPLE_RATE: u32 = 44_100;

fn analyzer() -> (VoiceAnalyzer, AnalyzerControl, PitchMonitor) {
    channel(&AppConfig::default(), SAMPLE_RATE).unwrap()
}

#[test]
fn test_channel_rejects_bad_window() {
    let mut config = AppConfig::default();
    config.pitch.window_size = 8;
    assert!(matches!(
        channel(&config, SAMPLE_RATE),
        Err(AudioError::InvalidWindowSize { size: 8, .. })
    ));
}

#[test]
fn test_window_completes_after_enough_blocks() {
    let (mut analyzer, _control, monitor) = analyzer();
    let signal = sine(220.0, 0.5, SAMPLE_RATE, 2048);

    for block in signal.chunks(512).take(3) {
        let result = analyzer.process_block(block);
        assert!(result.estimation.is_none());
        assert!(result.rms > 0.3);
    }
    assert_eq!(monitor.latest().estimate, PitchEstimate::NoPitch);
    assert!(monitor.latest().rms > 0.3);

    let result = analyzer.process_block(&signal[1536..]);
    let estimation = result.estimation.expect("fourth block completes the window");
    let hz = estimation.estimate.frequency().unwrap();
    assert!((hz - 220.0).abs() < 2.2);

    let reading = monitor.latest();
    assert_eq!(reading.estimate, estimation.estimate);
    assert_eq!(reading.sequence, 4);
    assert_eq!(analyzer.stats().windows, 1);
    assert_eq!(analyzer.stats().pitched_windows, 1);
}

#[test]
fn test_silent_windows_are_counted_as_gated() {
    let (mut analyzer, _control, monitor) = analyzer();
    let silence = vec![0.0f32; 2048];
    let result = analyzer.process_block(&silence);
    assert_eq!(result.estimation.unwrap().verdict, Verdict::NoSignal);
    assert_eq!(analyzer.stats().gated_windows, 1);
    assert_eq!(monitor.latest().level_percent, 0.0);
}

#[test]
fn test_commands_apply_before_next_block() {
    let (mut analyzer, mut control, _monitor) = analyzer();
    control.set_algorithm(Algorithm::Mpm).unwrap();
    control.set_noise_gate_threshold(0.05).unwrap();
    control.set_bias(1.0).unwrap();
    control.set_gate_mode(GateMode::Instant).unwrap();

    // Nothing applied until the analyzer runs
    assert_eq!(analyzer.tracker().config().algorithm, Algorithm::Yin);

    analyzer.process_block(&[0.0; 16]);
    let config = analyzer.tracker().config();
    assert_eq!(config.algorithm, Algorithm::Mpm);
    assert_eq!(config.noise_gate_threshold, 0.05);
    assert_eq!(config.pyin_bias, 1.0);
    assert_eq!(config.pyin_gate_mode, GateMode::Instant);
    assert_eq!(analyzer.stats().commands_applied, 4);
}

#[test]
fn test_reset_clears_history_and_partial_window() {
    let (mut analyzer, mut control, _monitor) = analyzer();
    control.set_algorithm(Algorithm::Pyin).unwrap();
    analyzer.process_block(&sine(220.0, 0.5, SAMPLE_RATE, 2048));
    assert!(analyzer.tracker().history().previous_frequency().is_some());

    analyzer.process_block(&[0.5; 100]);
    control.reset().unwrap();
    analyzer.process_block(&[]);

    assert_eq!(analyzer.tracker().history().previous_frequency(), None);
    // Partial window was discarded, so 2048 fresh samples complete one
    assert!(analyzer
        .process_block(&vec![0.0; 2048])
        .estimation
        .is_some());
}

#[test]
fn test_full_command_queue_is_reported() {
    let mut config = AppConfig::default();
    config.audio.command_queue_capacity = 2;
    let (_analyzer, mut control, _monitor) = channel(&config, SAMPLE_RATE).unwrap();

    control.set_bias(1.0).unwrap();
    control.set_bias(2.0).unwrap();
    match control.set_algorithm(Algorithm::Hps) {
        Err(AudioError::CommandQueueFull { command }) => assert!(command.contains("Hps")),
        other => panic!("expected CommandQueueFull, got {:?}", other),
    }
}

#[test]
fn test_session_processes_blocks_from_pool() {
    let (analyzer, _control, monitor) = analyzer();
    let (mut capture, analysis) = BufferPool::new(8, 512).split();
    let mut session = AnalysisSession::new(1);
    session.start(analyzer, analysis).unwrap();
    assert!(session.is_running());

    let signal = sine(330.0, 0.5, SAMPLE_RATE, 2048);
    for block in signal.chunks(512) {
        while !capture.send(block) {
            std::thread::yield_now();
        }
    }

    let analyzer = session.stop().unwrap();
    assert!(!session.is_running());
    assert_eq!(analyzer.stats().blocks, 4);
    let hz = monitor.latest().estimate.frequency().unwrap();
    assert!((hz - 330.0).abs() < 3.3);
}

#[test]
fn test_session_lifecycle_errors() {
    let mut session = AnalysisSession::new(0);
    assert!(matches!(session.stop(), Err(AudioError::NotRunning)));

    let (first, _c1, _m1) = analyzer();
    let (second, _c2, _m2) = analyzer();
    let (_capture, analysis) = BufferPool::new(2, 64).split();
    let (_capture2, analysis2) = BufferPool::new(2, 64).split();

    session.start(first, analysis).unwrap();
    assert!(matches!(
        session.start(second, analysis2),
        Err(AudioError::AlreadyRunning)
    ));
    session.stop().unwrap();
}
