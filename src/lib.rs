//! stage-replica - Client-side replica of a collaborative stage
//!
//! Keeps a queryable local copy of server-authoritative stage state fed by
//! `[event, payload]` frames, and resolves for every audio track the gain
//! the local viewer should hear.
//!
//! ```text
//!  Transport ──frames──▶ Synchronizer ──▶ Store (collections + session)
//!                             │
//!                             └──Notification──▶ AudioMixer ──▶ GainChanged
//! ```
//!
//! [`client::Client`] wires these together over any [`transport::Transport`].

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod mixer;
pub mod model;
pub mod signal;
pub mod store;
pub mod sync;
pub mod transport;

pub use client::{Client, Invite};
pub use config::ClientConfig;
pub use error::{Error, Result, StoreError, TransportError};
pub use mixer::{AudioMixer, Gain, GainChanged};
pub use model::{Entity, EntityKind};
pub use signal::{Signal, Subscription};
pub use store::Store;
pub use sync::{DispatchMode, Notification, SyncState, Synchronizer};
pub use transport::Transport;
