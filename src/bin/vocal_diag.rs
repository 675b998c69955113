use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use vocal_trainer::analysis;
use vocal_trainer::audio::clock::{AudioClock, ManualClock};
use vocal_trainer::exercise::{Exercise, MusicalEvent, VocalRange};
use vocal_trainer::fixtures::{harmonic_tone, read_wav};
use vocal_trainer::music::hz_to_midi;
use vocal_trainer::transport::{Transport, TransportSettings};
use vocal_trainer::{Algorithm, AppConfig, Verdict};

#[derive(Parser, Debug)]
#[command(
    name = "vocal_diag",
    about = "Offline diagnostics for the vocal trainer pitch pipeline and exercise transport"
)]
struct Cli {
    /// JSON configuration file (defaults are used when missing)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream a synthetic tone through the analysis pipeline
    Tone {
        #[arg(long, default_value_t = 220.0)]
        frequency: f32,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
        /// Number of partials (1 = pure sine)
        #[arg(long, default_value_t = 1)]
        harmonics: usize,
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,
        #[arg(long, value_parser = parse_algorithm)]
        algorithm: Option<Algorithm>,
    },
    /// Stream a WAV file through the analysis pipeline
    Wav {
        path: PathBuf,
        #[arg(long, value_parser = parse_algorithm)]
        algorithm: Option<Algorithm>,
    },
    /// Simulate an exercise run on a manual clock and print scheduled events
    Exercise {
        /// Comma separated `offset:beats` notes, `r:beats` for rests
        #[arg(long, default_value = "0:1,2:1,4:1,5:1,7:2")]
        pattern: String,
        #[arg(long, default_value_t = 90.0)]
        bpm: f64,
        #[arg(long, default_value_t = 48)]
        min_midi: i32,
        #[arg(long, default_value_t = 60)]
        max_midi: i32,
        /// Play a preview rendition before each target rendition
        #[arg(long)]
        preview: bool,
        /// Leave out metronome clicks
        #[arg(long)]
        no_metronome: bool,
        /// Stop the simulation after this many clock seconds
        #[arg(long, default_value_t = 600.0)]
        max_seconds: f64,
    },
}

#[derive(Serialize)]
struct WindowReport {
    time_s: f64,
    frequency_hz: Option<f32>,
    midi: Option<f64>,
    verdict: Verdict,
    rms: f32,
}

#[derive(Serialize)]
struct StreamSummary {
    algorithm: &'static str,
    sample_rate: u32,
    windows: u64,
    pitched_windows: u64,
    gated_windows: u64,
    median_hz: Option<f32>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Tone {
            frequency,
            amplitude,
            harmonics,
            seconds,
            algorithm,
        } => {
            let sample_rate = config.audio.sample_rate;
            let len = (seconds.max(0.0) * sample_rate as f32) as usize;
            let samples = harmonic_tone(frequency, amplitude, harmonics, sample_rate, len);
            run_stream(config, &samples, sample_rate, algorithm)
        }
        Commands::Wav { path, algorithm } => {
            let (samples, sample_rate) = read_wav(&path)?;
            run_stream(config, &samples, sample_rate, algorithm)
        }
        Commands::Exercise {
            pattern,
            bpm,
            min_midi,
            max_midi,
            preview,
            no_metronome,
            max_seconds,
        } => {
            let exercise = Exercise {
                pattern: parse_pattern(&pattern)?,
                bpm,
                range: VocalRange {
                    min_midi,
                    max_midi,
                },
            };
            let mut config = config;
            config.exercise.preview_before_target |= preview;
            config.exercise.metronome_enabled &= !no_metronome;
            run_exercise(&config, exercise, max_seconds)
        }
    }
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    Algorithm::ALL
        .into_iter()
        .find(|algorithm| algorithm.name().eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            let names: Vec<&str> = Algorithm::ALL.iter().map(|a| a.name()).collect();
            format!("unknown algorithm '{}', expected one of {}", value, names.join(", "))
        })
}

fn parse_pattern(pattern: &str) -> Result<Vec<MusicalEvent>> {
    pattern
        .split(',')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(|step| {
            let (pitch, beats) = step
                .split_once(':')
                .ok_or_else(|| anyhow!("pattern step '{}' is not offset:beats", step))?;
            let beats: f64 = beats
                .parse()
                .with_context(|| format!("invalid beat count in '{}'", step))?;
            if pitch.eq_ignore_ascii_case("r") {
                Ok(MusicalEvent::rest(beats))
            } else {
                let offset: i32 = pitch
                    .parse()
                    .with_context(|| format!("invalid semitone offset in '{}'", step))?;
                Ok(MusicalEvent::note(offset, beats))
            }
        })
        .collect()
}

/// Feed `samples` block by block and print one JSON line per window
fn run_stream(
    mut config: AppConfig,
    samples: &[f32],
    sample_rate: u32,
    algorithm: Option<Algorithm>,
) -> Result<ExitCode> {
    if let Some(algorithm) = algorithm {
        config.pitch.algorithm = algorithm;
    }
    let (mut analyzer, _control, _monitor) = analysis::channel(&config, sample_rate)
        .with_context(|| format!("building analyzer for {} Hz", sample_rate))?;

    let block_size = config.audio.block_size.max(1);
    let mut consumed = 0usize;
    let mut pitched = Vec::new();
    for block in samples.chunks(block_size) {
        consumed += block.len();
        let result = analyzer.process_block(block);
        let Some(estimation) = result.estimation else {
            continue;
        };
        let frequency_hz = estimation.estimate.frequency();
        pitched.extend(frequency_hz);
        let report = WindowReport {
            time_s: consumed as f64 / sample_rate as f64,
            frequency_hz,
            midi: frequency_hz.and_then(|hz| hz_to_midi(hz as f64)),
            verdict: estimation.verdict,
            rms: estimation.rms,
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    pitched.sort_by(|a, b| a.total_cmp(b));
    let stats = analyzer.stats();
    let summary = StreamSummary {
        algorithm: config.pitch.algorithm.name(),
        sample_rate,
        windows: stats.windows,
        pitched_windows: stats.pitched_windows,
        gated_windows: stats.gated_windows,
        median_hz: pitched.get(pitched.len() / 2).copied(),
    };
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);

    if stats.windows == 0 {
        eprintln!(
            "Input shorter than one analysis window ({} samples)",
            config.pitch.window_size
        );
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

/// Tick a transport on a manual clock and print every released event
fn run_exercise(config: &AppConfig, exercise: Exercise, max_seconds: f64) -> Result<ExitCode> {
    let clock = ManualClock::new(0.0);
    let mut transport = Transport::new(TransportSettings::from_config(config));
    transport.start_on(exercise, &clock)?;

    let step = config.scheduler.tick_interval_ms.max(1) as f64 / 1000.0;
    let mut notes = 0usize;
    loop {
        let now = clock.now().unwrap_or_default();
        if now > max_seconds {
            bail!("exercise did not complete within {} seconds", max_seconds);
        }
        let tick = transport.tick(clock.now());
        for event in &tick.events {
            notes += usize::from(event.midi.is_some());
            println!("{}", serde_json::to_string(event)?);
        }
        if tick.completed {
            eprintln!("Completed at {:.3}s with {} notes", now, notes);
            return Ok(ExitCode::SUCCESS);
        }
        clock.advance(step);
    }
}
