//! Sharing session state machine.
//!
//! The session is a plain value. Every input (a user action, a sampled
//! position, or the result of an earlier effect) is fed to
//! [`SessionState::apply`], which returns the next state together with the
//! effects the caller must execute. Results of those effects come back as
//! further [`SessionEvent`]s. Nothing in this module performs I/O.
//!
//! ```text
//! Idle --start--> Starting --(lookup, name check, fix, write)--> Active
//!  ^                 |                                              |
//!  +----failure------+                                              |
//!  +-------------------------- Stopping <------------stop-----------+
//! ```
//!
//! The display name check is read-then-write: two devices may both see a
//! name as free and both attempt the write. Only a backend constraint can
//! pick a winner; the session does not serialize competing devices.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::SharingError;
use crate::models::{DeviceRecord, DeviceRecordPatch, NewDeviceRecord, Position};

/// Progress through the `Starting` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStep {
    /// Waiting for the lookup of this device's own record.
    LookingUpOwnRecord,
    /// Waiting for the lookup of whoever holds the requested name.
    CheckingName { own_record: Option<i64> },
    /// Waiting for a position fix to write.
    FetchingPosition { own_record: Option<i64> },
    /// Waiting for the insert or update to land.
    Writing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting(StartStep),
    Active,
    Stopping,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting(_) => "starting",
            Phase::Active => "active",
            Phase::Stopping => "stopping",
        }
    }
}

/// Inputs to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The user typed into the display name field.
    NameEdited(String),
    /// The user asked to start sharing under `device_name`.
    StartRequested { device_name: String },
    /// Result of [`Effect::LookupOwnRecord`].
    OwnRecordLoaded(Option<DeviceRecord>),
    /// Result of [`Effect::LookupNameOwner`].
    NameOwnerLoaded(Option<DeviceRecord>),
    /// Result of [`Effect::FetchPosition`].
    PositionFetched(Position),
    /// An insert or update completed; `at` is when the caller observed it.
    RecordWritten {
        record: DeviceRecord,
        at: DateTime<Utc>,
    },
    /// The periodic sampler produced a fix.
    SampleTaken(Position),
    /// The user asked to stop sharing.
    StopRequested { at: DateTime<Utc> },
    /// An effect failed.
    Failed(SharingError),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LookupOwnRecord { device_id: Uuid },
    LookupNameOwner { device_name: String },
    FetchPosition,
    InsertRecord(NewDeviceRecord),
    UpdateRecord {
        record_id: i64,
        patch: DeviceRecordPatch,
    },
    /// Begin periodic sampling. Any previous sampler has already been
    /// cancelled by an earlier effect in the same list.
    StartSampler,
    CancelSampler,
}

/// Next state plus the effects to execute, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(state: SessionState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    fn settled(state: SessionState) -> Self {
        Self::new(state, Vec::new())
    }
}

/// Local, ephemeral state of the sharing session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    device_id: Uuid,
    device_type: String,
    device_name: String,
    phase: Phase,
    record_id: Option<i64>,
    current_location: Option<Position>,
    old_location: Option<Position>,
    sampler_running: bool,
    session_started_at: Option<DateTime<Utc>>,
    deactivation_pending: bool,
    last_error: Option<SharingError>,
}

impl SessionState {
    pub fn new(device_id: Uuid, device_type: impl Into<String>) -> Self {
        Self {
            device_id,
            device_type: device_type.into(),
            device_name: String::new(),
            phase: Phase::Idle,
            record_id: None,
            current_location: None,
            old_location: None,
            sampler_running: false,
            session_started_at: None,
            deactivation_pending: false,
            last_error: None,
        }
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// The display name may only change before sharing is under way.
    pub fn name_editable(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Starting(_))
    }

    /// Id of the remote record this session writes to, once known.
    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub fn current_location(&self) -> Option<Position> {
        self.current_location
    }

    pub fn old_location(&self) -> Option<Position> {
        self.old_location
    }

    pub fn sampler_running(&self) -> bool {
        self.sampler_running
    }

    /// When sharing last started or stopped.
    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    /// True when the last stop could not mark the record inactive.
    pub fn deactivation_pending(&self) -> bool {
        self.deactivation_pending
    }

    /// Error raised by the most recent start or stop, if it failed.
    pub fn last_error(&self) -> Option<&SharingError> {
        self.last_error.as_ref()
    }

    /// Feed one event to the session.
    pub fn apply(self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::NameEdited(name) => self.on_name_edited(name),
            SessionEvent::StartRequested { device_name } => self.on_start_requested(device_name),
            SessionEvent::OwnRecordLoaded(record) => self.on_own_record_loaded(record),
            SessionEvent::NameOwnerLoaded(owner) => self.on_name_owner_loaded(owner),
            SessionEvent::PositionFetched(position) => self.on_position_fetched(position),
            SessionEvent::RecordWritten { record, at } => self.on_record_written(record, at),
            SessionEvent::SampleTaken(position) => self.on_sample_taken(position),
            SessionEvent::StopRequested { at } => self.on_stop_requested(at),
            SessionEvent::Failed(err) => self.on_failed(err),
        }
    }

    fn on_name_edited(mut self, name: String) -> Transition {
        if self.name_editable() {
            self.device_name = name;
            self.last_error = None;
        } else {
            self.last_error = Some(SharingError::DeviceNameLocked);
        }
        Transition::settled(self)
    }

    fn on_start_requested(mut self, device_name: String) -> Transition {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = self.phase.as_str(), "Ignoring start request");
            return Transition::settled(self);
        }
        self.last_error = None;

        let Some(name) = shared::validation::normalize_device_name(&device_name) else {
            self.device_name = device_name;
            return self.abort_start(SharingError::DeviceNameRequired);
        };
        if shared::validation::validate_device_name_length(&name).is_err() {
            self.device_name = device_name;
            return self.abort_start(SharingError::DeviceNameTooLong);
        }

        self.device_name = name;
        self.phase = Phase::Starting(StartStep::LookingUpOwnRecord);
        let effects = vec![Effect::LookupOwnRecord {
            device_id: self.device_id,
        }];
        Transition::new(self, effects)
    }

    fn on_own_record_loaded(mut self, record: Option<DeviceRecord>) -> Transition {
        if self.phase != Phase::Starting(StartStep::LookingUpOwnRecord) {
            return Transition::settled(self);
        }

        let own_record = record.map(|r| r.id);
        self.phase = Phase::Starting(StartStep::CheckingName { own_record });
        let effects = vec![Effect::LookupNameOwner {
            device_name: self.device_name.clone(),
        }];
        Transition::new(self, effects)
    }

    fn on_name_owner_loaded(mut self, owner: Option<DeviceRecord>) -> Transition {
        let Phase::Starting(StartStep::CheckingName { own_record }) = self.phase else {
            return Transition::settled(self);
        };

        // A new device may not reuse any name; an existing one may keep its own.
        if let Some(owner) = owner {
            if Some(owner.id) != own_record {
                let name = self.device_name.clone();
                return self.abort_start(SharingError::DeviceNameTaken(name));
            }
        }

        self.phase = Phase::Starting(StartStep::FetchingPosition { own_record });
        Transition::new(self, vec![Effect::FetchPosition])
    }

    fn on_position_fetched(mut self, position: Position) -> Transition {
        let Phase::Starting(StartStep::FetchingPosition { own_record }) = self.phase else {
            return Transition::settled(self);
        };

        self.record_location(position);
        self.phase = Phase::Starting(StartStep::Writing);

        let effect = match own_record {
            None => Effect::InsertRecord(NewDeviceRecord {
                device_id: self.device_id,
                device_name: self.device_name.clone(),
                device_type: self.device_type.clone(),
                latitude: position.latitude,
                longitude: position.longitude,
                is_active: true,
            }),
            Some(record_id) => Effect::UpdateRecord {
                record_id,
                patch: DeviceRecordPatch::activate(self.device_name.clone(), position),
            },
        };
        Transition::new(self, vec![effect])
    }

    fn on_record_written(mut self, record: DeviceRecord, at: DateTime<Utc>) -> Transition {
        match self.phase {
            Phase::Starting(StartStep::Writing) => {
                self.phase = Phase::Active;
                self.record_id = Some(record.id);
                self.device_name = record.device_name;
                self.session_started_at = Some(at);
                self.deactivation_pending = false;

                let mut effects = Vec::with_capacity(2);
                if self.sampler_running {
                    effects.push(Effect::CancelSampler);
                }
                effects.push(Effect::StartSampler);
                self.sampler_running = true;
                Transition::new(self, effects)
            }
            Phase::Stopping => {
                self.phase = Phase::Idle;
                self.deactivation_pending = false;
                Transition::settled(self)
            }
            _ => Transition::settled(self),
        }
    }

    fn on_sample_taken(mut self, position: Position) -> Transition {
        if self.phase != Phase::Active {
            return Transition::settled(self);
        }

        let previous = self.current_location;
        self.record_location(position);

        if previous == Some(position) {
            return Transition::settled(self);
        }
        match self.record_id {
            Some(record_id) => Transition::new(
                self,
                vec![Effect::UpdateRecord {
                    record_id,
                    patch: DeviceRecordPatch::location(position),
                }],
            ),
            None => Transition::settled(self),
        }
    }

    fn on_stop_requested(mut self, at: DateTime<Utc>) -> Transition {
        match self.phase {
            Phase::Active => {
                self.last_error = None;
                self.session_started_at = Some(at);

                let mut effects = Vec::with_capacity(2);
                if self.sampler_running {
                    effects.push(Effect::CancelSampler);
                    self.sampler_running = false;
                }
                match self.record_id {
                    Some(record_id) => {
                        self.phase = Phase::Stopping;
                        effects.push(Effect::UpdateRecord {
                            record_id,
                            patch: DeviceRecordPatch::deactivate(),
                        });
                    }
                    None => self.phase = Phase::Idle,
                }
                Transition::new(self, effects)
            }
            Phase::Idle => {
                self.last_error = None;
                match (self.deactivation_pending, self.record_id) {
                    // Retry a deactivation that failed during an earlier stop.
                    (true, Some(record_id)) => {
                        self.phase = Phase::Stopping;
                        self.session_started_at = Some(at);
                        Transition::new(
                            self,
                            vec![Effect::UpdateRecord {
                                record_id,
                                patch: DeviceRecordPatch::deactivate(),
                            }],
                        )
                    }
                    _ => Transition::settled(self),
                }
            }
            Phase::Starting(_) | Phase::Stopping => {
                tracing::debug!(phase = self.phase.as_str(), "Ignoring stop request");
                Transition::settled(self)
            }
        }
    }

    fn on_failed(mut self, err: SharingError) -> Transition {
        match self.phase {
            Phase::Starting(_) => self.abort_start(err),
            Phase::Stopping => {
                self.phase = Phase::Idle;
                self.deactivation_pending = true;
                self.last_error = Some(err);
                Transition::settled(self)
            }
            // Only pushes fail while active. Fall back to the last fix that
            // reached the record so the next sample is compared against it.
            Phase::Active => {
                self.current_location = self.old_location;
                Transition::settled(self)
            }
            Phase::Idle => Transition::settled(self),
        }
    }

    fn abort_start(mut self, err: SharingError) -> Transition {
        self.phase = Phase::Idle;
        self.last_error = Some(err);
        Transition::settled(self)
    }

    fn record_location(&mut self, position: Position) {
        self.old_location = self.current_location;
        self.current_location = Some(position);
    }
}
