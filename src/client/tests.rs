//! Tests for the client facade over a scripted transport

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::*;
use crate::error::TransportError;
use crate::events::inbound;
use crate::sync::SyncState;
use crate::transport::{frame, DisconnectHandler, MessageHandler, Reply};

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

#[derive(Default)]
struct MockTransport {
    connected: AtomicBool,
    url: Mutex<Option<String>>,
    sent: Mutex<Vec<(String, Value)>>,
    /// Answer for requests; `None` drops the reply slot
    reply: Mutex<Option<Vec<Value>>>,
    on_message: Mutex<Option<MessageHandler>>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl MockTransport {
    fn replying(reply: Vec<Value>) -> Arc<Self> {
        let transport = Arc::new(Self::default());
        *transport.reply.lock() = Some(reply);
        transport
    }

    fn deliver(&self, event: &str, payload: Value) {
        let handler = self.on_message.lock().clone();
        if let Some(handler) = handler {
            handler(frame(event, payload));
        }
    }

    fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let handler = self.on_disconnect.lock().clone();
        if let Some(handler) = handler {
            handler(false);
        }
    }

    fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().clone()
    }

    fn last_sent(&self) -> (String, Value) {
        self.sent.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        url: &str,
        _token: &str,
        _initial_payload: Value,
    ) -> Result<(), TransportError> {
        *self.url.lock() = Some(url.to_string());
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        let handler = self.on_disconnect.lock().clone();
        if let Some(handler) = handler {
            handler(true);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(
        &self,
        event: &str,
        payload: Value,
        reply: Option<Reply>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push((event.to_string(), payload));
        if let (Some(reply), Some(answer)) = (reply, self.reply.lock().clone()) {
            let _ = reply.send(answer);
        }
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.on_message.lock() = Some(handler);
    }

    fn on_disconnect(&self, handler: DisconnectHandler) {
        *self.on_disconnect.lock() = Some(handler);
    }
}

async fn connected(transport: Arc<MockTransport>, dispatch: DispatchMode) -> Client {
    let client = Client::new(transport, dispatch);
    client.connect("token", json!({ "type": "jammer" })).await.unwrap();
    client
}

fn ready_sequence(transport: &MockTransport) {
    transport.deliver(inbound::READY, json!({ "turn": { "urls": ["turn:t1"] } }));
    transport.deliver(
        inbound::LOCAL_DEVICE_READY,
        json!({ "_id": "d1", "userId": "u1", "type": "jammer" }),
    );
    transport.deliver(inbound::USER_READY, json!({ "_id": "u1", "name": "Ana" }));
}

// ============================================================================
// CONNECTION
// ============================================================================

#[tokio::test]
async fn test_connect_uses_configured_url() {
    let transport = Arc::new(MockTransport::default());
    let config = ClientConfig {
        api_url: "wss://stage.example.org".into(),
        ..ClientConfig::default()
    };
    let client = Client::from_config(transport.clone(), &config);
    assert!(!client.is_connected());

    client.connect("token", Value::Null).await.unwrap();
    assert!(client.is_connected());
    assert_eq!(transport.url.lock().as_deref(), Some("wss://stage.example.org"));
    assert_eq!(client.synchronizer().state(), SyncState::ConnectedNotReady);
}

#[tokio::test]
async fn test_inline_dispatch_replicates() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    assert_eq!(client.dispatch_mode(), DispatchMode::Inline);

    ready_sequence(&transport);
    assert!(client.store().is_ready());
    assert_eq!(client.store().local_device().unwrap().id, "d1");
    assert_eq!(client.store().user().unwrap().id, "u1");

    // Malformed frames are dropped without touching the store
    let handler = transport.on_message.lock().clone().unwrap();
    handler(json!({ "not": "a frame" }));
    assert_eq!(client.store().devices.len(), 1);
}

#[tokio::test]
async fn test_worker_dispatch_replicates_in_order() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Worker).await;
    assert_eq!(client.dispatch_mode(), DispatchMode::Worker);

    ready_sequence(&transport);
    transport.deliver(inbound::DEVICE_CHANGED, json!({ "_id": "d1", "balance": 0.5 }));

    assert!(client.flush().await);
    assert_eq!(client.synchronizer().state(), SyncState::Ready);
    assert_eq!(client.store().local_device().unwrap().balance, 0.5);
}

#[test]
fn test_worker_falls_back_without_runtime() {
    let client = Client::new(Arc::new(MockTransport::default()), DispatchMode::Worker);
    assert_eq!(client.dispatch_mode(), DispatchMode::Inline);
}

#[tokio::test]
async fn test_connection_loss_keeps_replica() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    ready_sequence(&transport);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = client.notifications().connect(move |n: &Notification| {
        if let Notification::Disconnected { expected } = n {
            sink.lock().push(*expected);
        }
    });

    transport.drop_connection();
    client.disconnect().await.unwrap();

    assert_eq!(*seen.lock(), vec![false, true]);
    assert_eq!(client.synchronizer().state(), SyncState::Disconnected);
    assert!(client.store().local_device().is_some());
}

// ============================================================================
// REQUESTS
// ============================================================================

#[tokio::test]
async fn test_send_requires_connection() {
    let client = Client::new(Arc::new(MockTransport::default()), DispatchMode::Inline);
    let err = client.leave_stage().await.unwrap_err();
    assert_eq!(err, Error::Transport(TransportError::NotConnected));
}

#[tokio::test]
async fn test_request_outcomes() {
    let ok = MockTransport::replying(vec![Value::Null, json!("payload")]);
    let client = connected(ok, DispatchMode::Inline).await;
    assert_eq!(
        client.request("custom", json!({})).await.unwrap(),
        vec![json!("payload")]
    );

    let rejected = MockTransport::replying(vec![json!("Invalid password")]);
    let client = connected(rejected, DispatchMode::Inline).await;
    let err = client.join_stage("s1", None, Some("nope")).await.unwrap_err();
    assert_eq!(
        err,
        Error::Rejected {
            event: outbound::JOIN_STAGE.into(),
            reason: "Invalid password".into()
        }
    );

    let silent = Arc::new(MockTransport::default());
    let client = connected(silent, DispatchMode::Inline).await;
    let err = client.request("custom", Value::Null).await.unwrap_err();
    assert_eq!(err, Error::NoReply("custom".into()));
}

#[tokio::test]
async fn test_join_stage_payload() {
    let transport = MockTransport::replying(vec![Value::Null]);
    let client = connected(transport.clone(), DispatchMode::Inline).await;

    client.join_stage("s1", Some("g1"), None).await.unwrap();
    assert_eq!(
        transport.last_sent(),
        (
            outbound::JOIN_STAGE.to_string(),
            json!({ "stageId": "s1", "groupId": "g1" })
        )
    );
}

#[tokio::test]
async fn test_patch_helpers_add_id() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;

    client.change_group("g1", json!({ "muted": true })).await.unwrap();
    client.change_audio_track("t1", Value::Null).await.unwrap();
    client.remove_stage("s1").await.unwrap();

    assert_eq!(
        transport.sent(),
        vec![
            (
                outbound::CHANGE_GROUP.to_string(),
                json!({ "_id": "g1", "muted": true })
            ),
            (outbound::CHANGE_AUDIO_TRACK.to_string(), json!({ "_id": "t1" })),
            (outbound::REMOVE_STAGE.to_string(), json!("s1")),
        ]
    );

    let err = client.change_device("d1", json!([1])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidPayload { .. }));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn test_custom_group_targets_viewer_group() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    client.store().session.group_id.set("g1");

    client
        .set_custom_group("g2", json!({ "volume": 0.5 }))
        .await
        .unwrap();
    assert_eq!(
        transport.last_sent().1,
        json!({ "groupId": "g2", "targetGroupId": "g1", "volume": 0.5 })
    );
}

#[tokio::test]
async fn test_change_local_device() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    assert!(client.change_local_device(json!({ "balance": 1.0 })).await.is_err());

    ready_sequence(&transport);
    client
        .change_local_device(json!({ "balance": 1.0 }))
        .await
        .unwrap();
    assert_eq!(
        transport.last_sent(),
        (
            outbound::CHANGE_DEVICE.to_string(),
            json!({ "_id": "d1", "balance": 1.0 })
        )
    );
}

#[tokio::test]
async fn test_invites() {
    let transport = MockTransport::replying(vec![Value::Null, json!("abc123")]);
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    assert_eq!(client.encode_invite("s1", Some("g1")).await.unwrap(), "abc123");
    assert_eq!(
        transport.last_sent().1,
        json!({ "stageId": "s1", "groupId": "g1" })
    );

    *transport.reply.lock() = Some(vec![Value::Null, json!({ "stageId": "s1" })]);
    let invite = client.decode_invite("abc123").await.unwrap();
    assert_eq!(
        invite,
        Invite {
            stage_id: "s1".into(),
            group_id: None
        }
    );

    *transport.reply.lock() = Some(vec![Value::Null]);
    assert!(matches!(
        client.decode_invite("abc123").await,
        Err(Error::InvalidPayload { .. })
    ));
}

// ============================================================================
// MIXER
// ============================================================================

#[tokio::test]
async fn test_mixer_follows_client() {
    let transport = Arc::new(MockTransport::default());
    let client = connected(transport.clone(), DispatchMode::Inline).await;
    let mixer = client.mixer();
    assert!(!mixer.uses_balance());

    ready_sequence(&transport);
    transport.deliver(
        inbound::STAGE_JOINED,
        json!({
            "stageId": "s1",
            "groupId": "g1",
            "groups": [{ "_id": "g1", "stageId": "s1", "volume": 0.5 }],
            "stageMembers": [{ "_id": "m1", "stageId": "s1", "groupId": "g1", "userId": "u1" }],
            "audioTracks": [{
                "_id": "t1", "userId": "u1", "deviceId": "d1", "stageId": "s1",
                "stageMemberId": "m1", "stageDeviceId": "sd1"
            }]
        }),
    );

    assert_eq!(mixer.gain("t1").unwrap().volume, 0.5);
    assert_eq!(client.synchronizer().state(), SyncState::InStage);
}
