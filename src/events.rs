//! Event vocabulary exchanged with the stage server
//!
//! Inbound names are parsed into [`Inbound`]; outbound names are plain
//! constants passed to [`Transport::send`](crate::transport::Transport::send).

use crate::model::EntityKind;

/// Events sent by the server
pub mod inbound {
    pub const READY: &str = "ready";
    pub const LOCAL_DEVICE_READY: &str = "local-device-ready";
    pub const USER_READY: &str = "user-ready";
    pub const STAGE_JOINED: &str = "stage-joined";
    pub const STAGE_LEFT: &str = "stage-left";
    pub const TURN_SERVERS_CHANGED: &str = "turn-servers-changed";

    pub const P2P_RESTART: &str = "p2p-restart";
    pub const P2P_OFFER_SENT: &str = "p2p-offer-sent";
    pub const P2P_ANSWER_SENT: &str = "p2p-answer-sent";
    pub const ICE_CANDIDATE_SENT: &str = "ice-candidate-sent";

    macro_rules! kind_events {
        ($($name:literal => $added:ident, $changed:ident, $removed:ident;)+) => {
            $(
                pub const $added: &str = concat!($name, "-added");
                pub const $changed: &str = concat!($name, "-changed");
                pub const $removed: &str = concat!($name, "-removed");
            )+
        };
    }

    kind_events! {
        "device" => DEVICE_ADDED, DEVICE_CHANGED, DEVICE_REMOVED;
        "user" => USER_ADDED, USER_CHANGED, USER_REMOVED;
        "stage" => STAGE_ADDED, STAGE_CHANGED, STAGE_REMOVED;
        "group" => GROUP_ADDED, GROUP_CHANGED, GROUP_REMOVED;
        "custom-group" => CUSTOM_GROUP_ADDED, CUSTOM_GROUP_CHANGED, CUSTOM_GROUP_REMOVED;
        "custom-group-position" => CUSTOM_GROUP_POSITION_ADDED, CUSTOM_GROUP_POSITION_CHANGED, CUSTOM_GROUP_POSITION_REMOVED;
        "custom-group-volume" => CUSTOM_GROUP_VOLUME_ADDED, CUSTOM_GROUP_VOLUME_CHANGED, CUSTOM_GROUP_VOLUME_REMOVED;
        "stage-member" => STAGE_MEMBER_ADDED, STAGE_MEMBER_CHANGED, STAGE_MEMBER_REMOVED;
        "custom-stage-member-position" => CUSTOM_STAGE_MEMBER_POSITION_ADDED, CUSTOM_STAGE_MEMBER_POSITION_CHANGED, CUSTOM_STAGE_MEMBER_POSITION_REMOVED;
        "custom-stage-member-volume" => CUSTOM_STAGE_MEMBER_VOLUME_ADDED, CUSTOM_STAGE_MEMBER_VOLUME_CHANGED, CUSTOM_STAGE_MEMBER_VOLUME_REMOVED;
        "stage-device" => STAGE_DEVICE_ADDED, STAGE_DEVICE_CHANGED, STAGE_DEVICE_REMOVED;
        "custom-stage-device-position" => CUSTOM_STAGE_DEVICE_POSITION_ADDED, CUSTOM_STAGE_DEVICE_POSITION_CHANGED, CUSTOM_STAGE_DEVICE_POSITION_REMOVED;
        "custom-stage-device-volume" => CUSTOM_STAGE_DEVICE_VOLUME_ADDED, CUSTOM_STAGE_DEVICE_VOLUME_CHANGED, CUSTOM_STAGE_DEVICE_VOLUME_REMOVED;
        "sound-card" => SOUND_CARD_ADDED, SOUND_CARD_CHANGED, SOUND_CARD_REMOVED;
        "audio-track" => AUDIO_TRACK_ADDED, AUDIO_TRACK_CHANGED, AUDIO_TRACK_REMOVED;
        "custom-audio-track-position" => CUSTOM_AUDIO_TRACK_POSITION_ADDED, CUSTOM_AUDIO_TRACK_POSITION_CHANGED, CUSTOM_AUDIO_TRACK_POSITION_REMOVED;
        "custom-audio-track-volume" => CUSTOM_AUDIO_TRACK_VOLUME_ADDED, CUSTOM_AUDIO_TRACK_VOLUME_CHANGED, CUSTOM_AUDIO_TRACK_VOLUME_REMOVED;
        "video-track" => VIDEO_TRACK_ADDED, VIDEO_TRACK_CHANGED, VIDEO_TRACK_REMOVED;
    }
}

/// Requests sent to the server
pub mod outbound {
    pub const CHANGE_DEVICE: &str = "change-device";
    pub const SET_SOUND_CARD: &str = "set-sound-card";
    pub const CHANGE_SOUND_CARD: &str = "change-sound-card";

    pub const CREATE_AUDIO_TRACK: &str = "create-audio-track";
    pub const SET_AUDIO_TRACK: &str = "set-audio-track";
    pub const CHANGE_AUDIO_TRACK: &str = "change-audio-track";
    pub const REMOVE_AUDIO_TRACK: &str = "remove-audio-track";

    pub const CREATE_STAGE: &str = "create-stage";
    pub const CHANGE_STAGE: &str = "change-stage";
    pub const REMOVE_STAGE: &str = "remove-stage";

    pub const CREATE_GROUP: &str = "create-group";
    pub const CHANGE_GROUP: &str = "change-group";
    pub const REMOVE_GROUP: &str = "remove-group";

    pub const SET_CUSTOM_GROUP: &str = "set-custom-group";
    pub const REMOVE_CUSTOM_GROUP: &str = "remove-custom-group";

    pub const JOIN_STAGE: &str = "join-stage";
    pub const LEAVE_STAGE: &str = "leave-stage";
    pub const FORGET_STAGE: &str = "forget-stage";

    pub const ENCODE_INVITE: &str = "encode-invite";
    pub const DECODE_INVITE: &str = "decode-invite";

    pub const SEND_P2P_RESTART: &str = "send-p2p-restart";
    pub const SEND_P2P_OFFER: &str = "send-p2p-offer";
    pub const SEND_P2P_ANSWER: &str = "send-p2p-answer";
    pub const SEND_ICE_CANDIDATE: &str = "send-ice-candidate";
}

/// A recognised inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Ready,
    LocalDeviceReady,
    UserReady,
    StageJoined,
    StageLeft,
    TurnServersChanged,
    P2pRestart,
    P2pOfferSent,
    P2pAnswerSent,
    IceCandidateSent,
    Added(EntityKind),
    Changed(EntityKind),
    Removed(EntityKind),
}

impl Inbound {
    /// Parse an event name, `None` if it is not part of the vocabulary
    pub fn parse(name: &str) -> Option<Self> {
        let fixed = match name {
            inbound::READY => Some(Inbound::Ready),
            inbound::LOCAL_DEVICE_READY => Some(Inbound::LocalDeviceReady),
            inbound::USER_READY => Some(Inbound::UserReady),
            inbound::STAGE_JOINED => Some(Inbound::StageJoined),
            inbound::STAGE_LEFT => Some(Inbound::StageLeft),
            inbound::TURN_SERVERS_CHANGED => Some(Inbound::TurnServersChanged),
            inbound::P2P_RESTART => Some(Inbound::P2pRestart),
            inbound::P2P_OFFER_SENT => Some(Inbound::P2pOfferSent),
            inbound::P2P_ANSWER_SENT => Some(Inbound::P2pAnswerSent),
            inbound::ICE_CANDIDATE_SENT => Some(Inbound::IceCandidateSent),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        if let Some(kind) = name.strip_suffix("-added").and_then(EntityKind::from_str) {
            return Some(Inbound::Added(kind));
        }
        if let Some(kind) = name.strip_suffix("-changed").and_then(EntityKind::from_str) {
            return Some(Inbound::Changed(kind));
        }
        name.strip_suffix("-removed")
            .and_then(EntityKind::from_str)
            .map(Inbound::Removed)
    }
}

/// Name of the `<kind>-added` event
pub fn added(kind: EntityKind) -> String {
    format!("{}-added", kind.as_str())
}

/// Name of the `<kind>-changed` event
pub fn changed(kind: EntityKind) -> String {
    format!("{}-changed", kind.as_str())
}

/// Name of the `<kind>-removed` event
pub fn removed(kind: EntityKind) -> String {
    format!("{}-removed", kind.as_str())
}
