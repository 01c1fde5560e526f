//! Cascade resolution: which tracks an event touches and what they resolve to

use std::collections::BTreeSet;

use tracing::trace;

use super::gain::{balance, Gain};
use crate::model::{AudioTrack, Entity, EntityKind};
use crate::store::Store;
use crate::sync::Notification;

const VOLUME_FIELDS: &[&str] = &["volume", "muted"];
const MEMBER_FIELDS: &[&str] = &["volume", "muted", "groupId"];
const OVERRIDE_TARGET_FIELDS: &[&str] = &["groupId", "targetGroupId"];
const BALANCE_FIELD: &str = "balance";

/// Tracks whose cached gain is stale after one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affected {
    Nothing,
    All,
    Tracks(BTreeSet<String>),
    Evict(String),
    /// Drop the whole cache
    Clear,
}

impl Affected {
    fn tracks(tracks: Vec<AudioTrack>) -> Self {
        if tracks.is_empty() {
            Affected::Nothing
        } else {
            Affected::Tracks(tracks.into_iter().map(|t| t.id).collect())
        }
    }
}

/// Resolve the effective gain of `track` for the local viewer
///
/// Missing member or group contribute a factor of 1 and no mute. The
/// viewer's override for the member's group replaces the group values.
pub fn resolve(store: &Store, track: &AudioTrack, use_balance: bool) -> Gain {
    let viewer_group = store.session.group_id.get();
    let member = store.stage_members.get(&track.stage_member_id);
    let member_group = member.as_ref().and_then(|m| m.group_id.clone());

    let mut volume = track.volume.volume;
    let mut muted = track.volume.muted;

    if let Some(member) = &member {
        volume *= member.volume.volume;
        muted |= member.volume.muted;
    }

    if let Some(group_id) = &member_group {
        let custom = viewer_group
            .as_deref()
            .and_then(|viewer| store.custom_group_by_group_and_target(group_id, viewer));
        match custom {
            Some(custom) => {
                volume *= custom.volume.volume;
                muted |= custom.volume.muted;
            }
            None => {
                if let Some(group) = store.groups.get(group_id) {
                    volume *= group.volume.volume;
                    muted |= group.volume.muted;
                }
            }
        }
    }

    if use_balance {
        if let Some(local) = store.local_device() {
            volume *= balance(local.balance, track.device_id == local.id);
        }
    }

    trace!(track = %track.id, volume, muted, "Gain resolved");
    Gain { volume, muted }
}

/// Work out which cached gains a notification invalidates
pub fn affected(store: &Store, notification: &Notification, use_balance: bool) -> Affected {
    match notification {
        Notification::Ready | Notification::StageJoined { .. } => Affected::All,
        Notification::StageLeft => Affected::Clear,

        Notification::Added(entity) => match entity {
            Entity::AudioTrack(track) => Affected::Tracks(BTreeSet::from([track.id.clone()])),
            Entity::StageMember(member) => {
                Affected::tracks(store.audio_tracks_by_stage_member(&member.id))
            }
            Entity::Group(group) => Affected::tracks(store.audio_tracks_by_group(&group.id)),
            Entity::CustomGroup(custom) => {
                if store.session.group_id.is(&custom.target_group_id) {
                    Affected::tracks(store.audio_tracks_by_group(&custom.group_id))
                } else {
                    Affected::Nothing
                }
            }
            _ => Affected::Nothing,
        },

        Notification::Changed(change) => match change.kind {
            EntityKind::AudioTrack if change.touches(VOLUME_FIELDS) => {
                Affected::Tracks(BTreeSet::from([change.id.clone()]))
            }
            EntityKind::StageDevice if change.touches(VOLUME_FIELDS) => {
                Affected::tracks(store.audio_tracks_by_stage_device(&change.id))
            }
            EntityKind::StageMember if change.touches(MEMBER_FIELDS) => {
                Affected::tracks(store.audio_tracks_by_stage_member(&change.id))
            }
            EntityKind::Group if change.touches(VOLUME_FIELDS) => {
                Affected::tracks(store.audio_tracks_by_group(&change.id))
            }
            // Retargeted override: the old pair is gone from the store
            EntityKind::CustomGroup if change.touches(OVERRIDE_TARGET_FIELDS) => Affected::All,
            EntityKind::CustomGroup if change.touches(VOLUME_FIELDS) => {
                match store.custom_groups.get(&change.id) {
                    Some(custom) if store.session.group_id.is(&custom.target_group_id) => {
                        Affected::tracks(store.audio_tracks_by_group(&custom.group_id))
                    }
                    _ => Affected::Nothing,
                }
            }
            EntityKind::Device
                if use_balance
                    && change.touches(&[BALANCE_FIELD])
                    && store.session.local_device_id.is(&change.id) =>
            {
                Affected::All
            }
            _ => Affected::Nothing,
        },

        Notification::Removed(entity) => match entity {
            Entity::AudioTrack(track) => Affected::Evict(track.id.clone()),
            Entity::Group(group) => Affected::tracks(store.audio_tracks_by_group(&group.id)),
            Entity::StageMember(member) => {
                Affected::tracks(store.audio_tracks_by_stage_member(&member.id))
            }
            Entity::CustomGroup(custom) => {
                if store.session.group_id.is(&custom.target_group_id) {
                    Affected::tracks(store.audio_tracks_by_group(&custom.group_id))
                } else {
                    Affected::Nothing
                }
            }
            _ => Affected::Nothing,
        },

        _ => Affected::Nothing,
    }
}
