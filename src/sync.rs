//! Synchronizer - Turns inbound server events into store mutations
//!
//! Every inbound `[event, payload]` frame is mapped onto the [`Store`] and
//! announced as a [`Notification`]. Messages are handled one at a time; a
//! message that fails validation is dropped on its own and surfaced once as
//! [`Notification::Error`], leaving the store untouched.
//!
//! ```text
//!  Disconnected ──connected()──▶ ConnectedNotReady ──ready──▶ Ready
//!       ▲                                                     │  ▲
//!       └────────────── disconnected(expected) ────────────── │  │ stage-left
//!                                                  stage-joined ▼  │
//!                                                           InStage
//! ```

mod hydrate;
mod notification;
mod worker;

pub use notification::{Change, Notification};
pub use worker::{SyncCommand, SyncWorker, SyncWorkerHandle};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result, StoreError};
use crate::events::Inbound;
use crate::model::{Device, Entity, EntityKind, TurnConfig, ID_FIELD};
use crate::signal::Signal;
use crate::store::Store;
use crate::transport::parse_frame;

/// Connection lifecycle as seen by the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    ConnectedNotReady,
    Ready,
    InStage,
}

/// Where inbound frames are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the transport's own thread
    #[default]
    Inline,
    /// On a dedicated tokio task, in arrival order
    Worker,
}

/// Device fields that drive the selection notifications
const AUDIO_DRIVER: &str = "audioDriver";
const INPUT_SOUND_CARD: &str = "inputSoundCardId";
const OUTPUT_SOUND_CARD: &str = "outputSoundCardId";

pub struct Synchronizer {
    store: Arc<Store>,
    notifications: Signal<Notification>,
    state: Mutex<SyncState>,
}

impl Synchronizer {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            notifications: Signal::new(),
            state: Mutex::new(SyncState::Disconnected),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Notification source; connect callbacks or open a stream here
    pub fn notifications(&self) -> &Signal<Notification> {
        &self.notifications
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    fn set_state(&self, next: SyncState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = ?*state, to = ?next, "Sync state changed");
            *state = next;
        }
    }

    fn emit(&self, notification: Notification) {
        self.notifications.emit(notification);
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Transport opened a connection
    pub fn connected(&self) {
        let mut state = self.state.lock();
        if *state == SyncState::Disconnected {
            *state = SyncState::ConnectedNotReady;
            info!("Connected, waiting for ready");
        }
    }

    /// Transport lost or closed the connection
    ///
    /// Replicated state is kept as is; only `stage-left` tears down.
    pub fn disconnected(&self, expected: bool) {
        self.set_state(SyncState::Disconnected);
        if expected {
            info!("Disconnected");
        } else {
            warn!("Connection lost");
        }
        self.emit(Notification::Disconnected { expected });
    }

    // =========================================================================
    // Inbound dispatch
    // =========================================================================

    /// Handle one raw `[event, payload]` frame
    pub fn handle_frame(&self, frame: Value) -> Result<()> {
        match parse_frame(frame) {
            Ok((event, payload)) => self.handle_message(&event, payload),
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Handle one inbound message
    ///
    /// Errors are also published as [`Notification::Error`].
    pub fn handle_message(&self, event: &str, payload: Value) -> Result<()> {
        trace!(event, "Inbound message");

        let result = match Inbound::parse(event) {
            Some(inbound) => self.dispatch(event, inbound, payload),
            None => Err(Error::UnknownEvent(event.to_string())),
        };

        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn report(&self, err: &Error) {
        warn!(error = %err, "Inbound message dropped");
        self.emit(Notification::Error(err.clone()));
    }

    fn dispatch(&self, event: &str, inbound: Inbound, payload: Value) -> Result<()> {
        match inbound {
            Inbound::Ready => self.on_ready(event, payload),
            Inbound::LocalDeviceReady => self.on_local_device_ready(event, payload),
            Inbound::UserReady => self.on_user_ready(event, payload),
            Inbound::StageJoined => hydrate::stage_joined(self, event, payload),
            Inbound::StageLeft => {
                self.on_stage_left();
                Ok(())
            }
            Inbound::TurnServersChanged => self.on_turn_servers_changed(event, payload),
            Inbound::P2pRestart => {
                let restart = parse_typed(event, payload)?;
                self.emit(Notification::P2pRestart(restart));
                Ok(())
            }
            Inbound::P2pOfferSent => {
                let offer = parse_typed(event, payload)?;
                self.emit(Notification::P2pOffer(offer));
                Ok(())
            }
            Inbound::P2pAnswerSent => {
                let answer = parse_typed(event, payload)?;
                self.emit(Notification::P2pAnswer(answer));
                Ok(())
            }
            Inbound::IceCandidateSent => {
                let candidate = parse_typed(event, payload)?;
                self.emit(Notification::IceCandidate(candidate));
                Ok(())
            }
            Inbound::Added(kind) => self.on_added(event, kind, payload),
            Inbound::Changed(kind) => self.on_changed(event, kind, payload),
            Inbound::Removed(kind) => self.on_removed(event, kind, payload),
        }
    }

    // =========================================================================
    // Session events
    // =========================================================================

    fn on_ready(&self, event: &str, payload: Value) -> Result<()> {
        if let Some(turn) = payload.get("turn").filter(|turn| !turn.is_null()) {
            let turn: TurnConfig =
                serde_json::from_value(turn.clone()).map_err(|err| Error::invalid(event, err))?;
            debug!(urls = turn.urls.len(), "TURN configuration received");
            self.store.session.set_turn(turn);
        }

        self.store.set_ready(true);
        self.set_state(SyncState::Ready);
        info!("Server ready");
        self.emit(Notification::Ready);
        Ok(())
    }

    fn on_local_device_ready(&self, event: &str, payload: Value) -> Result<()> {
        let device = self
            .store
            .devices
            .create(payload)
            .map_err(|err| Error::invalid(event, err))?;
        self.store.session.local_device_id.set(device.id.clone());
        info!(device = %device.id, "Local device ready");

        self.emit(Notification::LocalDeviceReady(device.clone()));
        self.emit(Notification::Added(Entity::Device(device.clone())));
        self.emit(Notification::AudioDriverSelected(device.audio_driver));
        self.emit(Notification::InputSoundCardSelected(device.input_sound_card_id));
        self.emit(Notification::OutputSoundCardSelected(device.output_sound_card_id));
        Ok(())
    }

    fn on_user_ready(&self, event: &str, payload: Value) -> Result<()> {
        let user = self
            .store
            .users
            .create(payload)
            .map_err(|err| Error::invalid(event, err))?;
        self.store.session.user_id.set(user.id.clone());
        info!(user = %user.id, "Local user ready");

        self.emit(Notification::LocalUserReady(user.clone()));
        self.emit(Notification::Added(Entity::User(user)));
        Ok(())
    }

    /// Leave the stage: drop members and tracks, keep stages, groups and
    /// stage devices
    fn on_stage_left(&self) {
        self.store.session.reset_stage();
        let members = self.store.stage_members.remove_all();
        let audio = self.store.audio_tracks.remove_all();
        let video = self.store.video_tracks.remove_all();
        info!(members, audio, video, "Stage left");

        if self.state() == SyncState::InStage {
            self.set_state(SyncState::Ready);
        }
        self.emit(Notification::StageLeft);
    }

    fn on_turn_servers_changed(&self, event: &str, payload: Value) -> Result<()> {
        // Either a bare url list or { urls: [...] }
        let urls = match payload {
            Value::Object(mut map) => map.remove("urls").unwrap_or(Value::Null),
            other => other,
        };
        let urls: Vec<String> =
            serde_json::from_value(urls).map_err(|err| Error::invalid(event, err))?;

        self.store.session.set_turn_urls(urls.clone());
        self.emit(Notification::TurnServersChanged(urls));
        Ok(())
    }

    // =========================================================================
    // Entity events
    // =========================================================================

    fn on_added(&self, event: &str, kind: EntityKind, payload: Value) -> Result<()> {
        let entity = self
            .store
            .collection(kind)
            .create_entity(payload)
            .map_err(|err| Error::invalid(event, err))?;
        trace!(%kind, id = entity.id(), "Added");
        self.emit(Notification::Added(entity));
        Ok(())
    }

    fn on_changed(&self, event: &str, kind: EntityKind, payload: Value) -> Result<()> {
        let Some(id) = payload.get(ID_FIELD).and_then(Value::as_str).map(str::to_owned) else {
            return Err(Error::invalid(event, "patch has no string _id"));
        };

        let entity = match self.store.collection(kind).update_entity(&id, &payload) {
            Ok(entity) => entity,
            Err(StoreError::NotFound { .. }) => {
                debug!(%kind, id = %id, "Change for unknown record ignored");
                return Ok(());
            }
            Err(err) => return Err(Error::invalid(event, err)),
        };

        let change = Change {
            kind,
            id,
            patch: payload,
            store: Arc::clone(&self.store),
        };
        let selections = match &entity {
            Entity::Device(device) if self.store.session.local_device_id.is(&device.id) => {
                self.selection_changes(&change, device)
            }
            _ => Vec::new(),
        };

        self.emit(Notification::Changed(change));
        for notification in selections {
            self.emit(notification);
        }
        Ok(())
    }

    fn selection_changes(&self, change: &Change, device: &Device) -> Vec<Notification> {
        let mut out = Vec::new();
        if change.touches(&[AUDIO_DRIVER]) {
            out.push(Notification::AudioDriverSelected(device.audio_driver.clone()));
        }
        if change.touches(&[INPUT_SOUND_CARD]) {
            out.push(Notification::InputSoundCardSelected(
                device.input_sound_card_id.clone(),
            ));
        }
        if change.touches(&[OUTPUT_SOUND_CARD]) {
            out.push(Notification::OutputSoundCardSelected(
                device.output_sound_card_id.clone(),
            ));
        }
        out
    }

    fn on_removed(&self, event: &str, kind: EntityKind, payload: Value) -> Result<()> {
        let id = match &payload {
            Value::String(id) => id.as_str(),
            Value::Object(map) => match map.get(ID_FIELD).and_then(Value::as_str) {
                Some(id) => id,
                None => return Err(Error::invalid(event, "removal has no string _id")),
            },
            _ => return Err(Error::invalid(event, "removal payload is not an id")),
        };

        match self.store.collection(kind).remove_entity(id) {
            Some(entity) => {
                trace!(%kind, id, "Removed");
                self.emit(Notification::Removed(entity));
            }
            None => debug!(%kind, id, "Removal of unknown record ignored"),
        }
        Ok(())
    }
}

fn parse_typed<T: serde::de::DeserializeOwned>(event: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|err| Error::invalid(event, err))
}
