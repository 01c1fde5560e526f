//! Typed notifications emitted by the synchronizer

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::model::{
    Device, Entity, EntityKind, IceCandidate, P2pAnswer, P2pOffer, P2pRestart, User,
};
use crate::store::{touches, Store};

/// A record was patched
#[derive(Clone)]
pub struct Change {
    pub kind: EntityKind,
    pub id: String,
    /// The patch as received, including `_id`
    pub patch: Value,
    /// Store the patch was applied to
    pub store: Arc<Store>,
}

impl Change {
    /// Current state of the patched record
    pub fn entity(&self) -> Option<Entity> {
        self.store.collection(self.kind).get_entity(&self.id)
    }

    /// True if the patch mentions any of `fields`
    pub fn touches(&self, fields: &[&str]) -> bool {
        touches(&self.patch, fields)
    }
}

impl std::fmt::Debug for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Change")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("patch", &self.patch)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Notification {
    Added(Entity),
    Changed(Change),
    /// Carries the record as it was before removal
    Removed(Entity),

    Ready,
    LocalDeviceReady(Device),
    LocalUserReady(User),
    StageJoined {
        stage_id: String,
        group_id: Option<String>,
    },
    /// Members and tracks were cleared without per-entity removals
    StageLeft,
    Disconnected {
        expected: bool,
    },

    AudioDriverSelected(Option<String>),
    InputSoundCardSelected(Option<String>),
    OutputSoundCardSelected(Option<String>),

    TurnServersChanged(Vec<String>),

    P2pRestart(P2pRestart),
    P2pOffer(P2pOffer),
    P2pAnswer(P2pAnswer),
    IceCandidate(IceCandidate),

    /// One inbound message was dropped
    Error(Error),
}

impl Notification {
    /// Entity kind for `Added`/`Changed`/`Removed`
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Notification::Added(entity) | Notification::Removed(entity) => Some(entity.kind()),
            Notification::Changed(change) => Some(change.kind),
            _ => None,
        }
    }
}
