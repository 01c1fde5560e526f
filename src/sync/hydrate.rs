//! Bulk hydration on `stage-joined`
//!
//! Arrays are created parents first so that a subscriber reacting to one
//! `Added` notification can already query everything above it.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Notification, SyncState, Synchronizer};
use crate::error::{Error, Result};
use crate::model::{Entity, EntityKind};

/// Payload keys in hydration order
const ORDER: &[(&str, EntityKind)] = &[
    ("users", EntityKind::User),
    ("stage", EntityKind::Stage),
    ("groups", EntityKind::Group),
    ("customGroups", EntityKind::CustomGroup),
    ("customGroupVolumes", EntityKind::CustomGroupVolume),
    ("customGroupPositions", EntityKind::CustomGroupPosition),
    ("stageMembers", EntityKind::StageMember),
    ("customStageMemberVolumes", EntityKind::CustomStageMemberVolume),
    ("customStageMemberPositions", EntityKind::CustomStageMemberPosition),
    ("stageDevices", EntityKind::StageDevice),
    ("customStageDeviceVolumes", EntityKind::CustomStageDeviceVolume),
    ("customStageDevicePositions", EntityKind::CustomStageDevicePosition),
    ("audioTracks", EntityKind::AudioTrack),
    ("customAudioTrackVolumes", EntityKind::CustomAudioTrackVolume),
    ("customAudioTrackPositions", EntityKind::CustomAudioTrackPosition),
    ("videoTracks", EntityKind::VideoTrack),
];

/// Older servers prefix remote collections
const ALIASES: &[(&str, &str)] = &[
    ("users", "remoteUsers"),
    ("audioTracks", "remoteAudioTracks"),
    ("videoTracks", "remoteVideoTracks"),
];

pub(super) fn stage_joined(sync: &Synchronizer, event: &str, mut payload: Value) -> Result<()> {
    let Some(map) = payload.as_object_mut() else {
        return Err(Error::invalid(event, "payload is not an object"));
    };
    let Some(stage_id) = map.get("stageId").and_then(Value::as_str).map(str::to_owned) else {
        return Err(Error::invalid(event, "missing stageId"));
    };
    let payload_group = map.get("groupId").and_then(Value::as_str).map(str::to_owned);
    let payload_member = map
        .get("stageMemberId")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let store = sync.store();
    let local_device = store.session.local_device_id.get();
    let mut created = 0usize;

    // Set again below if this stage carries the local stage device
    store.session.stage_device_id.reset();

    for (key, kind) in ORDER {
        let items = take_items(map, key);
        let collection = store.collection(*kind);

        for item in items {
            let entity = match collection.create_entity(item) {
                Ok(entity) => entity,
                Err(err) => {
                    warn!(key, error = %err, "Skipping invalid item in stage-joined");
                    continue;
                }
            };

            if let Entity::StageDevice(stage_device) = &entity {
                if stage_device.stage_id == stage_id
                    && local_device.as_deref() == Some(stage_device.device_id.as_str())
                {
                    debug!(stage_device = %stage_device.id, "Local stage device hydrated");
                    store.session.stage_device_id.set(stage_device.id.clone());
                }
            }

            created += 1;
            sync.emit(Notification::Added(entity));
        }
    }

    // Fall back to the local user's membership in this stage
    let member = match payload_member {
        Some(id) => Some(id),
        None => store.session.user_id.get().and_then(|user_id| {
            store
                .stage_members
                .find(|m| m.user_id == user_id && m.stage_id == stage_id)
                .map(|m| m.id)
        }),
    };
    let group_id = payload_group.or_else(|| {
        member
            .as_deref()
            .and_then(|id| store.stage_members.get(id))
            .and_then(|m| m.group_id)
    });

    store.session.stage_id.set(stage_id.clone());
    match &group_id {
        Some(group) => store.session.group_id.set(group.clone()),
        None => store.session.group_id.reset(),
    }
    match &member {
        Some(member) => store.session.stage_member_id.set(member.clone()),
        None => store.session.stage_member_id.reset(),
    }

    sync.set_state(SyncState::InStage);
    info!(stage = %stage_id, group = ?group_id, created, "Stage joined");
    sync.emit(Notification::StageJoined { stage_id, group_id });
    Ok(())
}

/// Remove `key` (or its legacy alias) from the payload as a list of items
///
/// A single object counts as a one-element list; anything else is skipped.
fn take_items(map: &mut serde_json::Map<String, Value>, key: &str) -> Vec<Value> {
    let value = map.remove(key).or_else(|| {
        ALIASES
            .iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, alias)| map.remove(*alias))
    });

    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(object @ Value::Object(_)) => vec![object],
        Some(other) => {
            warn!(key, value = %other, "Expected an array in stage-joined");
            Vec::new()
        }
    }
}
