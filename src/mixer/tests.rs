//! Tests for the gain cascade and cache maintenance

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::*;
use crate::events::inbound;

// ============================================================================
// FIXTURES
// ============================================================================

struct Rig {
    sync: Arc<Synchronizer>,
    mixer: Arc<AudioMixer>,
}

impl Rig {
    fn new(use_balance: bool) -> Self {
        let sync = Arc::new(Synchronizer::new(Arc::new(Store::new())));
        let mixer = AudioMixer::attach(&sync, use_balance);
        Self { sync, mixer }
    }

    fn send(&self, event: &str, payload: Value) {
        self.sync.handle_message(event, payload).unwrap();
    }

    fn gain(&self, track: &str) -> Gain {
        self.mixer.gain(track).unwrap()
    }

    /// Local device d1 in group g1; remote member m2 in group g2
    fn joined(use_balance: bool) -> Self {
        let rig = Self::new(use_balance);
        rig.send(
            inbound::LOCAL_DEVICE_READY,
            json!({ "_id": "d1", "userId": "u1", "balance": 0.0 }),
        );
        rig.send(inbound::USER_READY, json!({ "_id": "u1" }));
        rig.send(inbound::STAGE_JOINED, stage_payload());
        rig
    }
}

fn stage_payload() -> Value {
    json!({
        "stageId": "s1",
        "groupId": "g1",
        "stage": { "_id": "s1", "name": "Jam" },
        "groups": [
            { "_id": "g1", "stageId": "s1", "volume": 1.0 },
            { "_id": "g2", "stageId": "s1", "volume": 1.0 }
        ],
        "stageMembers": [
            { "_id": "m1", "stageId": "s1", "groupId": "g1", "userId": "u1" },
            { "_id": "m2", "stageId": "s1", "groupId": "g2", "userId": "u2", "volume": 0.8 }
        ],
        "stageDevices": [
            { "_id": "sd1", "userId": "u1", "deviceId": "d1", "stageId": "s1", "stageMemberId": "m1" },
            { "_id": "sd2", "userId": "u2", "deviceId": "d2", "stageId": "s1", "stageMemberId": "m2" }
        ],
        "audioTracks": [
            track("t1", "m1", "sd1", "d1", 1.0),
            track("t2", "m2", "sd2", "d2", 0.5)
        ]
    })
}

fn track(id: &str, member: &str, stage_device: &str, device: &str, volume: f64) -> Value {
    json!({
        "_id": id,
        "userId": "u",
        "deviceId": device,
        "stageId": "s1",
        "stageMemberId": member,
        "stageDeviceId": stage_device,
        "volume": volume
    })
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// ============================================================================
// CASCADE
// ============================================================================

#[test]
fn test_cascade_product_and_group_mute() {
    let rig = Rig::joined(false);

    let gain = rig.gain("t2");
    assert_close(gain.volume, 0.4);
    assert!(!gain.muted);

    // Muting the group flips the track without any track event
    rig.send(inbound::GROUP_CHANGED, json!({ "_id": "g2", "muted": true }));
    let gain = rig.gain("t2");
    assert_close(gain.volume, 0.4);
    assert!(gain.muted);

    // Other groups are untouched
    assert!(!rig.gain("t1").muted);
}

#[test]
fn test_member_and_track_changes() {
    let rig = Rig::joined(false);

    rig.send(inbound::STAGE_MEMBER_CHANGED, json!({ "_id": "m2", "volume": 0.5 }));
    assert_close(rig.gain("t2").volume, 0.25);

    rig.send(inbound::AUDIO_TRACK_CHANGED, json!({ "_id": "t2", "muted": true }));
    assert!(rig.gain("t2").muted);

    // Irrelevant fields do not recompute
    let seen = Arc::new(Mutex::new(0usize));
    let counter = seen.clone();
    let _sub = rig.mixer.gain_changed().connect(move |_| *counter.lock() += 1);
    rig.send(inbound::AUDIO_TRACK_CHANGED, json!({ "_id": "t2", "type": "mic" }));
    assert_eq!(*seen.lock(), 0);

    rig.send(inbound::STAGE_DEVICE_CHANGED, json!({ "_id": "sd2", "volume": 0.1 }));
    assert_eq!(*seen.lock(), 1);
}

#[test]
fn test_member_moves_group() {
    let rig = Rig::joined(false);
    rig.send(inbound::GROUP_CHANGED, json!({ "_id": "g1", "volume": 0.5 }));

    rig.send(inbound::STAGE_MEMBER_CHANGED, json!({ "_id": "m2", "groupId": "g1" }));
    assert_close(rig.gain("t2").volume, 0.5 * 0.8 * 0.5);
}

#[test]
fn test_override_takes_precedence_over_group() {
    let rig = Rig::joined(false);

    rig.send(
        inbound::CUSTOM_GROUP_ADDED,
        json!({ "_id": "cg1", "groupId": "g2", "targetGroupId": "g1", "volume": 0.25 }),
    );
    assert_close(rig.gain("t2").volume, 0.5 * 0.8 * 0.25);

    // Group mute is ignored while the override applies
    rig.send(inbound::GROUP_CHANGED, json!({ "_id": "g2", "muted": true }));
    assert!(!rig.gain("t2").muted);

    rig.send(inbound::CUSTOM_GROUP_CHANGED, json!({ "_id": "cg1", "muted": true }));
    assert!(rig.gain("t2").muted);

    rig.send(inbound::CUSTOM_GROUP_REMOVED, json!("cg1"));
    let gain = rig.gain("t2");
    assert_close(gain.volume, 0.4);
    assert!(gain.muted, "falls back to the muted group");
}

#[test]
fn test_override_for_other_viewer_is_ignored() {
    let rig = Rig::joined(false);

    rig.send(
        inbound::CUSTOM_GROUP_ADDED,
        json!({ "_id": "cg1", "groupId": "g2", "targetGroupId": "g9", "volume": 0.0 }),
    );
    assert_close(rig.gain("t2").volume, 0.4);

    // Retargeting onto the viewer applies it
    rig.send(inbound::CUSTOM_GROUP_CHANGED, json!({ "_id": "cg1", "targetGroupId": "g1" }));
    assert_close(rig.gain("t2").volume, 0.0);
}

// ============================================================================
// CACHE MAINTENANCE
// ============================================================================

#[test]
fn test_removal_cascade_falls_back_to_unity() {
    let rig = Rig::joined(false);
    rig.send(inbound::GROUP_CHANGED, json!({ "_id": "g2", "volume": 0.5, "muted": true }));
    assert!(rig.gain("t2").muted);

    rig.send(inbound::GROUP_REMOVED, json!("g2"));
    let gain = rig.gain("t2");
    assert_close(gain.volume, 0.4);
    assert!(!gain.muted);

    rig.send(inbound::STAGE_MEMBER_REMOVED, json!("m2"));
    assert_close(rig.gain("t2").volume, 0.5);

    rig.send(inbound::AUDIO_TRACK_REMOVED, json!("t2"));
    assert!(rig.mixer.gain("t2").is_none());
}

#[test]
fn test_hydration_order_independence() {
    // Members listed before their groups, tracks before members
    let payload = json!({
        "stageId": "s1",
        "groupId": "g1",
        "audioTracks": [track("t2", "m2", "sd2", "d2", 0.5)],
        "stageMembers": [{ "_id": "m2", "stageId": "s1", "groupId": "g2", "userId": "u2", "volume": 0.8 }],
        "groups": [{ "_id": "g2", "stageId": "s1", "volume": 0.5 }]
    });

    let rig = Rig::new(false);
    rig.send(inbound::STAGE_JOINED, payload);
    assert_close(rig.gain("t2").volume, 0.2);

    // Same state reached by incremental events in reverse order
    let incremental = Rig::new(false);
    incremental.send(inbound::AUDIO_TRACK_ADDED, track("t2", "m2", "sd2", "d2", 0.5));
    incremental.send(
        inbound::STAGE_MEMBER_ADDED,
        json!({ "_id": "m2", "stageId": "s1", "groupId": "g2", "userId": "u2", "volume": 0.8 }),
    );
    incremental.send(inbound::GROUP_ADDED, json!({ "_id": "g2", "stageId": "s1", "volume": 0.5 }));
    assert_eq!(incremental.gain("t2"), rig.gain("t2"));
}

#[test]
fn test_stage_left_clears_cache() {
    let rig = Rig::joined(false);
    assert_eq!(rig.mixer.len(), 2);

    rig.send(inbound::STAGE_LEFT, Value::Null);
    assert!(rig.mixer.is_empty());
}

#[test]
fn test_gain_changed_signal() {
    let rig = Rig::new(false);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = rig
        .mixer
        .gain_changed()
        .connect(move |change: &GainChanged| sink.lock().push(change.clone()));

    rig.send(inbound::AUDIO_TRACK_ADDED, track("t9", "m9", "sd9", "d9", 0.3));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].track_id, "t9");
    assert_close(seen[0].gain.volume, 0.3);
}

#[test]
fn test_dropped_mixer_stops_listening() {
    let rig = Rig::joined(false);
    let callbacks = rig.sync.notifications().callback_count();

    drop(rig.mixer);
    assert_eq!(rig.sync.notifications().callback_count(), callbacks - 1);
    rig.sync
        .handle_message(inbound::GROUP_CHANGED, json!({ "_id": "g2", "muted": true }))
        .unwrap();
}

// ============================================================================
// BALANCE
// ============================================================================

#[test]
fn test_balance_weights_local_and_remote_tracks() {
    let rig = Rig::joined(true);

    // balance 0: both sides at sqrt(0.5)
    assert_close(rig.gain("t1").volume, 0.5f64.sqrt());
    assert_close(rig.gain("t2").volume, 0.4 * 0.5f64.sqrt());

    rig.send(inbound::DEVICE_CHANGED, json!({ "_id": "d1", "balance": 0.5 }));
    assert_close(rig.gain("t1").volume, 0.25f64.sqrt());
    assert_close(rig.gain("t2").volume, 0.4 * 0.75f64.sqrt());
}

#[test]
fn test_balance_ignored_when_disabled() {
    let rig = Rig::joined(false);
    rig.send(inbound::DEVICE_CHANGED, json!({ "_id": "d1", "balance": 1.0 }));
    assert_close(rig.gain("t1").volume, 1.0);
}

// ============================================================================
// SAMPLE SCALING
// ============================================================================

#[test]
fn test_apply_gain_to_buffers() {
    let rig = Rig::joined(false);

    let mut buf = [1.0f32; 4];
    rig.mixer.apply_gain("t2", &mut buf);
    assert!(buf.iter().all(|s| (*s - 0.4).abs() < 1e-6));

    let mut untouched = [0.7f64; 2];
    rig.mixer.apply_gain("unknown", &mut untouched);
    assert_eq!(untouched, [0.7, 0.7]);

    rig.send(inbound::AUDIO_TRACK_CHANGED, json!({ "_id": "t1", "muted": true }));
    assert_eq!(rig.mixer.apply_gain_sample("t1", 0.9f64), 0.0);
    assert_eq!(rig.mixer.apply_gain_sample("unknown", 0.9f64), 0.9);
}
