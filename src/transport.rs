//! Transport seam between the replica and the socket layer
//!
//! Socket framing, reconnection and authentication live behind this trait.
//! The replica only sees whole `[eventName, payload]` frames going in and
//! `(event, payload)` requests going out.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, TransportError};

/// Callback for inbound frames
///
/// # Arguments
/// * `frame` - The raw frame, expected to be `[eventName, payload]`
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Callback for a closed connection
///
/// # Arguments
/// * `expected` - True if the disconnect was requested locally
pub type DisconnectHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Reply slot fulfilled with the server's acknowledgement arguments
pub type Reply = oneshot::Sender<Vec<Value>>;

/// Bidirectional event channel to the stage server
///
/// All methods take `&self`; implementations keep their connection state
/// behind interior mutability so the transport can be shared as
/// `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection
    ///
    /// # Arguments
    /// * `url` - Server endpoint
    /// * `token` - Session token issued by the auth service
    /// * `initial_payload` - Sent with the handshake (device description)
    async fn connect(
        &self,
        url: &str,
        token: &str,
        initial_payload: Value,
    ) -> Result<(), TransportError>;

    /// Close the connection; handlers see `expected = true`
    async fn disconnect(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Send one event
    ///
    /// When `reply` is given, the transport fulfils it once the correlated
    /// acknowledgement arrives. No timeout applies at this layer.
    async fn send(
        &self,
        event: &str,
        payload: Value,
        reply: Option<Reply>,
    ) -> Result<(), TransportError>;

    /// Install the inbound frame handler
    fn on_message(&self, handler: MessageHandler);

    /// Install the disconnect handler
    fn on_disconnect(&self, handler: DisconnectHandler);
}

/// Split an inbound frame into event name and payload
///
/// Only two-element `[event, payload]` arrays are accepted.
pub fn parse_frame(frame: Value) -> Result<(String, Value), Error> {
    let Value::Array(mut items) = frame else {
        return Err(Error::invalid("<frame>", "frame is not an array"));
    };
    if items.len() != 2 {
        return Err(Error::invalid(
            "<frame>",
            format!("expected [event, payload], got {} elements", items.len()),
        ));
    }

    let payload = items.pop().unwrap_or(Value::Null);
    match items.pop() {
        Some(Value::String(event)) => Ok((event, payload)),
        _ => Err(Error::invalid("<frame>", "event name is not a string")),
    }
}

/// Build an outbound frame
pub fn frame(event: &str, payload: Value) -> Value {
    Value::Array(vec![Value::String(event.to_string()), payload])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_frame() {
        let (event, payload) = parse_frame(json!(["ready", { "turn": {} }])).unwrap();
        assert_eq!(event, "ready");
        assert_eq!(payload, json!({ "turn": {} }));

        let (event, payload) = parse_frame(json!(["stage-left", null])).unwrap();
        assert_eq!(event, "stage-left");
        assert_eq!(payload, Value::Null);

        // The payload slot is mandatory
        assert!(matches!(
            parse_frame(json!(["stage-left"])),
            Err(Error::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_malformed_frames() {
        for bad in [
            json!({ "event": "ready" }),
            json!([]),
            json!(["ready"]),
            json!([1, 2]),
            json!(["a", 1, 2]),
            json!("ready"),
        ] {
            assert!(
                matches!(parse_frame(bad.clone()), Err(Error::InvalidPayload { .. })),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let built = frame("join-stage", json!({ "stageId": "s1" }));
        let (event, payload) = parse_frame(built).unwrap();
        assert_eq!(event, "join-stage");
        assert_eq!(payload["stageId"], "s1");
    }
}
