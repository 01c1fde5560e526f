//! Client - Wires a transport to the replica and offers typed requests
//!
//! The client owns the [`Store`], the [`Synchronizer`] feeding it and,
//! in [`DispatchMode::Worker`], the [`SyncWorker`] that applies inbound
//! frames off the transport's thread. Outbound helpers wrap the event
//! vocabulary in [`outbound`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::events::outbound;
use crate::mixer::AudioMixer;
use crate::model::{IceCandidate, P2pAnswer, P2pOffer, P2pRestart, ID_FIELD};
use crate::signal::Signal;
use crate::store::Store;
use crate::sync::{DispatchMode, Notification, SyncWorker, SyncWorkerHandle, Synchronizer};
use crate::transport::Transport;

/// Stage and group an invite code points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub stage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

pub struct Client {
    transport: Arc<dyn Transport>,
    sync: Arc<Synchronizer>,
    worker: Option<SyncWorkerHandle>,
    api_url: String,
    use_balance: bool,
}

impl Client {
    /// Create a client around `transport`
    ///
    /// Worker dispatch needs a tokio runtime; without one the client falls
    /// back to inline dispatch.
    pub fn new(transport: Arc<dyn Transport>, dispatch: DispatchMode) -> Self {
        let defaults = ClientConfig::default();
        Self::build(
            transport,
            dispatch,
            defaults.api_url,
            defaults.use_balance,
        )
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self::build(
            transport,
            config.dispatch,
            config.api_url.clone(),
            config.use_balance,
        )
    }

    fn build(
        transport: Arc<dyn Transport>,
        dispatch: DispatchMode,
        api_url: String,
        use_balance: bool,
    ) -> Self {
        let sync = Arc::new(Synchronizer::new(Arc::new(Store::new())));

        let worker = match dispatch {
            DispatchMode::Inline => None,
            DispatchMode::Worker => {
                if tokio::runtime::Handle::try_current().is_ok() {
                    Some(SyncWorker::spawn(Arc::clone(&sync)))
                } else {
                    warn!("No tokio runtime, falling back to inline dispatch");
                    None
                }
            }
        };

        match &worker {
            Some(handle) => {
                let frames = handle.clone();
                transport.on_message(Arc::new(move |frame| frames.submit(frame)));
                let closes = handle.clone();
                transport.on_disconnect(Arc::new(move |expected| closes.disconnected(expected)));
            }
            None => {
                let frames = Arc::clone(&sync);
                transport.on_message(Arc::new(move |frame| {
                    // Failures are published as Notification::Error
                    let _ = frames.handle_frame(frame);
                }));
                let closes = Arc::clone(&sync);
                transport.on_disconnect(Arc::new(move |expected| closes.disconnected(expected)));
            }
        }

        debug!(?dispatch, worker = worker.is_some(), "Client created");

        Self {
            transport,
            sync,
            worker,
            api_url,
            use_balance,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &Arc<Store> {
        self.sync.store()
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    pub fn notifications(&self) -> &Signal<Notification> {
        self.sync.notifications()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Dispatch mode actually in effect
    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.worker.is_some() {
            DispatchMode::Worker
        } else {
            DispatchMode::Inline
        }
    }

    /// Attach a new gain mixer to this client's notifications
    pub fn mixer(&self) -> Arc<AudioMixer> {
        AudioMixer::attach(&self.sync, self.use_balance)
    }

    /// Wait until every frame received so far has been applied
    ///
    /// Returns false if the worker is gone. Inline dispatch is always
    /// settled.
    pub async fn flush(&self) -> bool {
        match &self.worker {
            Some(worker) => worker.flush().await,
            None => true,
        }
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to the configured endpoint
    ///
    /// # Arguments
    /// * `token` - Session token issued by the auth service
    /// * `initial_device` - Description of this device sent with the handshake
    pub async fn connect(&self, token: &str, initial_device: Value) -> Result<()> {
        let url = self.api_url.clone();
        self.connect_to(&url, token, initial_device).await
    }

    pub async fn connect_to(&self, url: &str, token: &str, initial_device: Value) -> Result<()> {
        info!(url, "Connecting");
        self.transport.connect(url, token, initial_device).await?;
        match &self.worker {
            Some(worker) => worker.connected(),
            None => self.sync.connected(),
        }
        Ok(())
    }

    /// Close the connection; the replica is kept until `stage-left`
    pub async fn disconnect(&self) -> Result<()> {
        self.transport.disconnect().await?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Fire-and-forget send
    pub async fn send(&self, event: &str, payload: Value) -> Result<()> {
        debug!(event, "Sending");
        self.transport.send(event, payload, None).await?;
        Ok(())
    }

    /// Send and wait for the acknowledgement
    ///
    /// The first reply element is the error slot: anything but `null`
    /// rejects the request. The remaining elements are returned.
    pub async fn request(&self, event: &str, payload: Value) -> Result<Vec<Value>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        debug!(event, "Requesting");
        self.transport.send(event, payload, Some(reply_tx)).await?;

        let mut args = reply_rx
            .await
            .map_err(|_| Error::NoReply(event.to_string()))?;

        if args.is_empty() {
            return Ok(args);
        }
        let error = args.remove(0);
        if !error.is_null() {
            let reason = match error {
                Value::String(reason) => reason,
                other => other.to_string(),
            };
            warn!(event, %reason, "Request rejected");
            return Err(Error::Rejected {
                event: event.to_string(),
                reason,
            });
        }
        Ok(args)
    }

    /// Send a patch for `id`, adding the `_id` field
    async fn send_patch(&self, event: &str, id: &str, patch: Value) -> Result<()> {
        let payload = with_id(event, id, patch)?;
        self.send(event, payload).await
    }

    // Stages

    pub async fn create_stage(&self, stage: Value) -> Result<()> {
        self.send(outbound::CREATE_STAGE, stage).await
    }

    pub async fn change_stage(&self, stage_id: &str, patch: Value) -> Result<()> {
        self.send_patch(outbound::CHANGE_STAGE, stage_id, patch).await
    }

    pub async fn remove_stage(&self, stage_id: &str) -> Result<()> {
        self.send(outbound::REMOVE_STAGE, json!(stage_id)).await
    }

    /// Join a stage; resolves once the server accepted the join
    ///
    /// Hydration itself arrives separately as `stage-joined`.
    pub async fn join_stage(
        &self,
        stage_id: &str,
        group_id: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        let mut payload = Map::new();
        payload.insert("stageId".into(), json!(stage_id));
        if let Some(group_id) = group_id {
            payload.insert("groupId".into(), json!(group_id));
        }
        if let Some(password) = password {
            payload.insert("password".into(), json!(password));
        }
        self.request(outbound::JOIN_STAGE, Value::Object(payload))
            .await
            .map(|_| ())
    }

    pub async fn leave_stage(&self) -> Result<()> {
        self.send(outbound::LEAVE_STAGE, Value::Null).await
    }

    /// Leave and drop the membership on the server
    pub async fn leave_stage_for_good(&self, stage_id: &str) -> Result<()> {
        self.send(outbound::FORGET_STAGE, json!(stage_id)).await
    }

    // Groups

    pub async fn create_group(&self, stage_id: &str, group: Value) -> Result<()> {
        let Value::Object(mut group) = group else {
            return Err(Error::invalid(outbound::CREATE_GROUP, "group is not an object"));
        };
        group.insert("stageId".into(), json!(stage_id));
        self.send(outbound::CREATE_GROUP, Value::Object(group)).await
    }

    pub async fn change_group(&self, group_id: &str, patch: Value) -> Result<()> {
        self.send_patch(outbound::CHANGE_GROUP, group_id, patch).await
    }

    pub async fn remove_group(&self, group_id: &str) -> Result<()> {
        self.send(outbound::REMOVE_GROUP, json!(group_id)).await
    }

    /// Set the local viewer's override for `group_id`
    pub async fn set_custom_group(&self, group_id: &str, patch: Value) -> Result<()> {
        let Value::Object(mut payload) = patch else {
            return Err(Error::invalid(outbound::SET_CUSTOM_GROUP, "patch is not an object"));
        };
        payload.insert("groupId".into(), json!(group_id));
        if let Some(target) = self.store().session.group_id.get() {
            payload
                .entry("targetGroupId")
                .or_insert_with(|| json!(target));
        }
        self.send(outbound::SET_CUSTOM_GROUP, Value::Object(payload)).await
    }

    pub async fn remove_custom_group(&self, custom_group_id: &str) -> Result<()> {
        self.send(outbound::REMOVE_CUSTOM_GROUP, json!(custom_group_id))
            .await
    }

    // Devices and sound cards

    pub async fn change_device(&self, device_id: &str, patch: Value) -> Result<()> {
        self.send_patch(outbound::CHANGE_DEVICE, device_id, patch).await
    }

    /// Change the local device, if one is known
    pub async fn change_local_device(&self, patch: Value) -> Result<()> {
        let Some(device_id) = self.store().session.local_device_id.get() else {
            return Err(Error::invalid(outbound::CHANGE_DEVICE, "no local device"));
        };
        self.change_device(&device_id, patch).await
    }

    /// Announce or replace a sound card of the local device
    pub async fn set_sound_card(&self, sound_card: Value) -> Result<()> {
        self.send(outbound::SET_SOUND_CARD, sound_card).await
    }

    pub async fn change_sound_card(&self, sound_card_id: &str, patch: Value) -> Result<()> {
        self.send_patch(outbound::CHANGE_SOUND_CARD, sound_card_id, patch)
            .await
    }

    // Audio tracks

    pub async fn create_audio_track(&self, track: Value) -> Result<()> {
        self.send(outbound::CREATE_AUDIO_TRACK, track).await
    }

    pub async fn change_audio_track(&self, track_id: &str, patch: Value) -> Result<()> {
        self.send_patch(outbound::CHANGE_AUDIO_TRACK, track_id, patch)
            .await
    }

    pub async fn remove_audio_track(&self, track_id: &str) -> Result<()> {
        self.send(outbound::REMOVE_AUDIO_TRACK, json!(track_id)).await
    }

    // Invites

    /// Ask the server for an invite code
    pub async fn encode_invite(&self, stage_id: &str, group_id: Option<&str>) -> Result<String> {
        let invite = Invite {
            stage_id: stage_id.to_string(),
            group_id: group_id.map(str::to_string),
        };
        let payload = serde_json::to_value(&invite)
            .map_err(|e| Error::invalid(outbound::ENCODE_INVITE, e))?;

        let reply = self.request(outbound::ENCODE_INVITE, payload).await?;
        match reply.into_iter().next() {
            Some(Value::String(code)) => Ok(code),
            other => Err(Error::invalid(
                outbound::ENCODE_INVITE,
                format!("expected invite code, got {:?}", other),
            )),
        }
    }

    /// Resolve an invite code into its stage and group
    pub async fn decode_invite(&self, code: &str) -> Result<Invite> {
        let reply = self.request(outbound::DECODE_INVITE, json!(code)).await?;
        let value = reply.into_iter().next().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| Error::invalid(outbound::DECODE_INVITE, e))
    }

    // Peer signaling

    pub async fn send_p2p_restart(&self, restart: &P2pRestart) -> Result<()> {
        self.send_typed(outbound::SEND_P2P_RESTART, restart).await
    }

    pub async fn send_p2p_offer(&self, offer: &P2pOffer) -> Result<()> {
        self.send_typed(outbound::SEND_P2P_OFFER, offer).await
    }

    pub async fn send_p2p_answer(&self, answer: &P2pAnswer) -> Result<()> {
        self.send_typed(outbound::SEND_P2P_ANSWER, answer).await
    }

    pub async fn send_ice_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        self.send_typed(outbound::SEND_ICE_CANDIDATE, candidate)
            .await
    }

    async fn send_typed<T: Serialize>(&self, event: &str, message: &T) -> Result<()> {
        let payload = serde_json::to_value(message).map_err(|e| Error::invalid(event, e))?;
        self.send(event, payload).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.shutdown();
        }
    }
}

/// Add `_id` to an object patch
fn with_id(event: &str, id: &str, patch: Value) -> Result<Value> {
    let mut fields = match patch {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        _ => return Err(Error::invalid(event, "patch is not an object")),
    };
    fields.insert(ID_FIELD.to_string(), json!(id));
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests;
