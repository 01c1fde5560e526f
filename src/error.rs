//! Error types for the replica, the synchronizer and the transport seam

use thiserror::Error;

use crate::model::EntityKind;

/// Failures raised by a store collection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Payload (or patched snapshot) does not parse under the record shape
    #[error("{kind} '{id}' failed validation: {reason}")]
    Invalid {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    #[error("{kind} payload has no string _id")]
    MissingId { kind: EntityKind },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} payload is not a JSON object")]
    NotAnObject { kind: EntityKind },
}

/// Failures reported by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("connect failed: {0}")]
    Connect(String),
}

/// Errors surfaced by the synchronizer and the client facade
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// One inbound message was dropped
    #[error("invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The server answered a request with an error
    #[error("request '{event}' rejected: {reason}")]
    Rejected { event: String, reason: String },

    /// The reply channel was dropped before an answer arrived
    #[error("no reply to '{0}'")]
    NoReply(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    pub(crate) fn invalid(event: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidPayload {
            event: event.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
