//! TransportDriver: async timer loop around a [`Transport`].
//!
//! The driver owns the transport and ticks it from an [`AudioClock`] every
//! `tick_interval_ms`. Commands arrive over an `mpsc` channel and results
//! leave over a `broadcast` channel, so any number of renderers, timelines
//! or loggers can subscribe.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{SchedulerStatus, Transport, TransportState};
use crate::audio::clock::AudioClock;
use crate::config::SchedulerConfig;
use crate::error::{ErrorCode, ExerciseError};
use crate::exercise::{Exercise, ScheduledEvent};

/// Capacity of the command channel
const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub enum TransportCommand {
    Start(Exercise),
    Pause,
    Resume,
    Stop,
    Restart,
    /// End the driver loop and hand the transport back
    Shutdown,
}

/// Broadcast by the driver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    Scheduled(ScheduledEvent),
    StateChanged { state: TransportState },
    /// Start or resume could not read the clock
    ClockUnavailable,
    Completed,
    /// A command failed; the transport is unchanged
    Rejected { code: i32, message: String },
}

enum Wake {
    Tick,
    Command(Option<TransportCommand>),
}

/// Cloneable handle for controlling a running driver
#[derive(Clone)]
pub struct TransportHandle {
    commands: mpsc::Sender<TransportCommand>,
    events: broadcast::Sender<TransportEvent>,
}

impl TransportHandle {
    pub async fn send(&self, command: TransportCommand) -> Result<(), ExerciseError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ExerciseError::ChannelClosed {
                channel: "transport_commands".to_string(),
            })
    }

    pub async fn start(&self, exercise: Exercise) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Start(exercise)).await
    }

    pub async fn pause(&self) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Stop).await
    }

    pub async fn restart(&self) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Restart).await
    }

    pub async fn shutdown(&self) -> Result<(), ExerciseError> {
        self.send(TransportCommand::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    /// Event stream for this subscriber; lagged gaps are skipped
    pub fn event_stream(&self) -> impl Stream<Item = TransportEvent> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(error = %err, "transport subscriber lagged");
                None
            }
        })
    }
}

pub struct TransportDriver {
    transport: Transport,
    clock: Arc<dyn AudioClock>,
    commands: mpsc::Receiver<TransportCommand>,
    events: broadcast::Sender<TransportEvent>,
    tick_interval: Duration,
}

impl TransportDriver {
    pub fn new(
        transport: Transport,
        clock: Arc<dyn AudioClock>,
        config: &SchedulerConfig,
    ) -> (Self, TransportHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let driver = Self {
            transport,
            clock,
            commands: command_rx,
            events: event_tx.clone(),
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
        };
        let handle = TransportHandle {
            commands: command_tx,
            events: event_tx,
        };
        (driver, handle)
    }

    /// Spawn [`TransportDriver::run`] on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<Transport> {
        tokio::spawn(self.run())
    }

    /// Tick and serve commands until shutdown or until every handle is dropped.
    #[tracing::instrument(name = "transport_driver", skip_all)]
    pub async fn run(mut self) -> Transport {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.tick_interval.as_millis() as u64, "driver started");

        loop {
            let wake = tokio::select! {
                _ = interval.tick() => Wake::Tick,
                command = self.commands.recv() => Wake::Command(command),
            };
            match wake {
                Wake::Tick => self.on_tick(),
                Wake::Command(Some(TransportCommand::Shutdown)) | Wake::Command(None) => break,
                Wake::Command(Some(command)) => self.apply(command),
            }
        }

        self.transport.stop();
        tracing::info!("driver stopped");
        self.transport
    }

    fn on_tick(&mut self) {
        let tick = self.transport.tick(self.clock.now());
        for event in tick.events {
            self.publish(TransportEvent::Scheduled(event));
        }
        if tick.completed {
            self.publish(TransportEvent::Completed);
            self.publish_state();
        }
    }

    fn apply(&mut self, command: TransportCommand) {
        tracing::debug!(?command, "transport command");
        let now = self.clock.now();
        let result = match command {
            TransportCommand::Start(exercise) => self.transport.start(exercise, now),
            TransportCommand::Pause => self
                .transport
                .pause()
                .map(|_| SchedulerStatus::Scheduling),
            TransportCommand::Resume => self.transport.resume(now),
            TransportCommand::Stop => {
                self.transport.stop();
                Ok(SchedulerStatus::Scheduling)
            }
            TransportCommand::Restart => self.transport.restart(now),
            TransportCommand::Shutdown => return,
        };

        match result {
            Ok(SchedulerStatus::Scheduling) => {
                self.publish_state();
                // Events due right away go out without waiting for the next interval
                self.on_tick();
            }
            Ok(SchedulerStatus::NotScheduling) => self.publish(TransportEvent::ClockUnavailable),
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "transport command rejected");
                self.publish(TransportEvent::Rejected {
                    code: err.code(),
                    message: err.message(),
                });
            }
        }
    }

    fn publish_state(&self) {
        self.publish(TransportEvent::StateChanged {
            state: self.transport.state(),
        });
    }

    fn publish(&self, event: TransportEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}
