//! Sharing session controller.
//!
//! One task owns the [`SessionState`]. Commands from HTTP handlers and fixes
//! from the sampler are queued to it and processed one at a time, so the
//! remote record only ever sees writes in the order the session issued them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::errors::SharingError;
use domain::services::{DeviceRecordStore, Effect, LocationSource, SessionEvent, SessionState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::jobs::{LocationSampler, Sample, SamplerHandle};
use crate::middleware::metrics::{record_location_pushed, record_session_transition};

const COMMAND_BUFFER: usize = 32;
const SAMPLE_BUFFER: usize = 16;

/// Error returned by controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Sharing(#[from] SharingError),

    #[error("Sharing session is not running")]
    Closed,
}

/// Collaborators the session talks to.
#[derive(Clone)]
pub struct SharingDeps {
    pub records: Arc<dyn DeviceRecordStore>,
    pub location: Arc<dyn LocationSource>,
}

#[derive(Debug, Clone, Copy)]
pub struct SharingSettings {
    pub sampling_interval: Duration,
    pub stop_grace: Duration,
}

type Reply = oneshot::Sender<Result<SessionState, SharingError>>;

enum Command {
    Start {
        device_name: Option<String>,
        reply: Reply,
    },
    Stop {
        reply: Reply,
    },
    EditName {
        device_name: String,
        reply: Reply,
    },
}

/// Cloneable handle to the session task.
#[derive(Clone)]
pub struct SharingController {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
}

impl SharingController {
    /// Spawn the session task. It runs until every handle is dropped.
    pub fn spawn(
        initial: SessionState,
        deps: SharingDeps,
        settings: SharingSettings,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_BUFFER);
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let runner = SessionRunner {
            state: initial,
            deps,
            settings,
            sampler: None,
            generation: 0,
            samples_tx,
            publisher: state_tx,
        };
        let handle = tokio::spawn(runner.run(commands_rx, samples_rx));

        (
            Self {
                commands: commands_tx,
                state: state_rx,
            },
            handle,
        )
    }

    /// Latest published session state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Start sharing. `None` keeps the name currently in the session.
    pub async fn start(&self, device_name: Option<String>) -> Result<SessionState, ControllerError> {
        self.request(|reply| Command::Start { device_name, reply })
            .await
    }

    pub async fn stop(&self) -> Result<SessionState, ControllerError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Stop when active, start otherwise.
    pub async fn toggle(&self) -> Result<SessionState, ControllerError> {
        if self.state().is_active() {
            self.stop().await
        } else {
            self.start(None).await
        }
    }

    pub async fn edit_name(&self, device_name: String) -> Result<SessionState, ControllerError> {
        self.request(|reply| Command::EditName { device_name, reply })
            .await
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> Command,
    ) -> Result<SessionState, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| ControllerError::Closed)?;
        let result = reply_rx.await.map_err(|_| ControllerError::Closed)?;
        Ok(result?)
    }
}

struct SessionRunner {
    state: SessionState,
    deps: SharingDeps,
    settings: SharingSettings,
    sampler: Option<SamplerHandle>,
    generation: u64,
    samples_tx: mpsc::Sender<Sample>,
    publisher: watch::Sender<SessionState>,
}

impl SessionRunner {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut samples: mpsc::Receiver<Sample>,
    ) {
        info!(device_id = %self.state.device_id(), "Sharing session ready");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(sample) = samples.recv() => self.on_sample(sample).await,
            }
        }

        self.cancel_sampler().await;
        info!("Sharing session closed");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { device_name, reply } => {
                let was_active = self.state.is_active();
                let device_name =
                    device_name.unwrap_or_else(|| self.state.device_name().to_string());
                self.dispatch(SessionEvent::StartRequested { device_name })
                    .await;

                if let Some(outcome) = start_outcome(was_active, &self.state) {
                    record_session_transition(outcome);
                }
                let result = match self.state.last_error() {
                    Some(err) if !self.state.is_active() => Err(err.clone()),
                    _ => Ok(self.state.clone()),
                };
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let was_active = self.state.is_active();
                self.dispatch(SessionEvent::StopRequested { at: Utc::now() })
                    .await;

                let result = match self.state.last_error() {
                    Some(err) => {
                        record_session_transition("failed");
                        Err(err.clone())
                    }
                    None => {
                        if was_active {
                            record_session_transition("stopped");
                        }
                        Ok(self.state.clone())
                    }
                };
                let _ = reply.send(result);
            }
            Command::EditName { device_name, reply } => {
                self.dispatch(SessionEvent::NameEdited(device_name)).await;

                let result = match self.state.last_error() {
                    Some(SharingError::DeviceNameLocked) => Err(SharingError::DeviceNameLocked),
                    _ => Ok(self.state.clone()),
                };
                let _ = reply.send(result);
            }
        }
    }

    async fn on_sample(&mut self, sample: Sample) {
        if sample.generation != self.generation {
            debug!(
                sample_generation = sample.generation,
                current_generation = self.generation,
                "Dropping fix from a cancelled sampler"
            );
            return;
        }
        self.dispatch(SessionEvent::SampleTaken(sample.position))
            .await;
    }

    /// Apply `event` and run every effect it triggers until the session settles.
    async fn dispatch(&mut self, event: SessionEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let transition = self.state.clone().apply(event);
            self.state = transition.state;
            self.publisher.send_replace(self.state.clone());

            for effect in transition.effects {
                if let Some(next) = self.execute(effect).await {
                    pending.push_back(next);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::LookupOwnRecord { device_id } => {
                Some(match self.deps.records.find_by_device_id(device_id).await {
                    Ok(record) => SessionEvent::OwnRecordLoaded(record),
                    Err(e) => SessionEvent::Failed(e.into()),
                })
            }
            Effect::LookupNameOwner { device_name } => Some(
                match self.deps.records.find_by_device_name(&device_name).await {
                    Ok(owner) => SessionEvent::NameOwnerLoaded(owner),
                    Err(e) => SessionEvent::Failed(e.into()),
                },
            ),
            Effect::FetchPosition => Some(match self.deps.location.fetch_current_position().await {
                Ok(position) => SessionEvent::PositionFetched(position),
                Err(e) => {
                    warn!(error = %e, "Could not get the current position");
                    SessionEvent::Failed(e.into())
                }
            }),
            Effect::InsertRecord(new_record) => {
                Some(match self.deps.records.insert(new_record).await {
                    Ok(record) => {
                        info!(
                            record_id = record.id,
                            device_name = %record.device_name,
                            "Device record created"
                        );
                        SessionEvent::RecordWritten {
                            record,
                            at: Utc::now(),
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Device record insert failed");
                        SessionEvent::Failed(e.into())
                    }
                })
            }
            Effect::UpdateRecord { record_id, patch } => {
                let is_push = self.state.is_active();
                match self.deps.records.update(record_id, patch).await {
                    Ok(record) => {
                        if is_push {
                            record_location_pushed();
                            debug!(record_id, "Location pushed");
                            None
                        } else {
                            info!(record_id, is_active = record.is_active, "Device record updated");
                            Some(SessionEvent::RecordWritten {
                                record,
                                at: Utc::now(),
                            })
                        }
                    }
                    Err(e) => {
                        warn!(record_id, error = %e, "Device record update failed");
                        Some(SessionEvent::Failed(e.into()))
                    }
                }
            }
            Effect::StartSampler => {
                self.start_sampler().await;
                None
            }
            Effect::CancelSampler => {
                self.cancel_sampler().await;
                None
            }
        }
    }

    async fn start_sampler(&mut self) {
        self.cancel_sampler().await;
        self.generation += 1;

        let sampler = LocationSampler::new(
            self.deps.location.clone(),
            self.settings.sampling_interval,
            self.generation,
        );
        self.sampler = Some(sampler.spawn(self.samples_tx.clone()));
    }

    async fn cancel_sampler(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            debug!(generation = sampler.generation(), "Cancelling sampler");
            sampler.shutdown(self.settings.stop_grace).await;
        }
    }
}

/// Transition counted after a start command, if any.
///
/// A start that finds the session already active changes nothing.
fn start_outcome(was_active: bool, state: &SessionState) -> Option<&'static str> {
    match state.last_error() {
        Some(_) if !state.is_active() => Some("failed"),
        _ if !was_active && state.is_active() => Some("started"),
        _ => None,
    }
}
