//! Entity records replicated from the stage server
//!
//! Every record is stored as a raw JSON snapshot and parsed on demand into
//! one of the typed structs below. The [`Record`] trait ties a struct to its
//! [`EntityKind`] and lets the generic store and synchronizer handle all
//! eighteen kinds through one code path.

mod entities;
mod overrides;
mod properties;
mod signaling;

pub use entities::{
    AudioTrack, Channel, Device, Group, SoundCard, Stage, StageDevice, StageMember, User,
    VideoTrack,
};
pub use overrides::{
    CustomAudioTrackPosition, CustomAudioTrackVolume, CustomGroup, CustomGroupPosition,
    CustomGroupVolume, CustomStageDevicePosition, CustomStageDeviceVolume,
    CustomStageMemberPosition, CustomStageMemberVolume,
};
pub use properties::{Directivity, Position, VolumeProperties};
pub use signaling::{IceCandidate, IceCandidateInit, P2pAnswer, P2pOffer, P2pRestart, SessionDescription, TurnConfig};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Identity field shared by every record on the wire
pub const ID_FIELD: &str = "_id";

/// Kind of a replicated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Device,
    User,
    Stage,
    Group,
    CustomGroup,
    CustomGroupPosition,
    CustomGroupVolume,
    StageMember,
    CustomStageMemberPosition,
    CustomStageMemberVolume,
    StageDevice,
    CustomStageDevicePosition,
    CustomStageDeviceVolume,
    SoundCard,
    AudioTrack,
    CustomAudioTrackPosition,
    CustomAudioTrackVolume,
    VideoTrack,
}

impl EntityKind {
    /// All entity kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Device,
            EntityKind::User,
            EntityKind::Stage,
            EntityKind::Group,
            EntityKind::CustomGroup,
            EntityKind::CustomGroupPosition,
            EntityKind::CustomGroupVolume,
            EntityKind::StageMember,
            EntityKind::CustomStageMemberPosition,
            EntityKind::CustomStageMemberVolume,
            EntityKind::StageDevice,
            EntityKind::CustomStageDevicePosition,
            EntityKind::CustomStageDeviceVolume,
            EntityKind::SoundCard,
            EntityKind::AudioTrack,
            EntityKind::CustomAudioTrackPosition,
            EntityKind::CustomAudioTrackVolume,
            EntityKind::VideoTrack,
        ]
    }

    /// Kebab-case name used as the event prefix (e.g. "sound-card")
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Device => "device",
            EntityKind::User => "user",
            EntityKind::Stage => "stage",
            EntityKind::Group => "group",
            EntityKind::CustomGroup => "custom-group",
            EntityKind::CustomGroupPosition => "custom-group-position",
            EntityKind::CustomGroupVolume => "custom-group-volume",
            EntityKind::StageMember => "stage-member",
            EntityKind::CustomStageMemberPosition => "custom-stage-member-position",
            EntityKind::CustomStageMemberVolume => "custom-stage-member-volume",
            EntityKind::StageDevice => "stage-device",
            EntityKind::CustomStageDevicePosition => "custom-stage-device-position",
            EntityKind::CustomStageDeviceVolume => "custom-stage-device-volume",
            EntityKind::SoundCard => "sound-card",
            EntityKind::AudioTrack => "audio-track",
            EntityKind::CustomAudioTrackPosition => "custom-audio-track-position",
            EntityKind::CustomAudioTrackVolume => "custom-audio-track-volume",
            EntityKind::VideoTrack => "video-track",
        }
    }

    /// Parse from the kebab-case name
    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed record that can live in a store collection
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind of entity this record represents
    const KIND: EntityKind;

    /// Unique identity within the collection
    fn id(&self) -> &str;

    /// Wrap into the kind-erased [`Entity`]
    fn into_entity(self) -> Entity;
}

/// Generates the [`Entity`] enum and the `Record` impls from one list
macro_rules! entities {
    ($($kind:ident),+ $(,)?) => {
        /// Any replicated record, tagged by kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum Entity {
            $($kind($kind),)+
        }

        impl Entity {
            /// Kind of the wrapped record
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Entity::$kind(_) => EntityKind::$kind,)+
                }
            }

            /// Identity of the wrapped record
            pub fn id(&self) -> &str {
                match self {
                    $(Entity::$kind(record) => &record.id,)+
                }
            }
        }

        $(
            impl Record for $kind {
                const KIND: EntityKind = EntityKind::$kind;

                fn id(&self) -> &str {
                    &self.id
                }

                fn into_entity(self) -> Entity {
                    Entity::$kind(self)
                }
            }
        )+
    };
}

entities!(
    Device,
    User,
    Stage,
    Group,
    CustomGroup,
    CustomGroupPosition,
    CustomGroupVolume,
    StageMember,
    CustomStageMemberPosition,
    CustomStageMemberVolume,
    StageDevice,
    CustomStageDevicePosition,
    CustomStageDeviceVolume,
    SoundCard,
    AudioTrack,
    CustomAudioTrackPosition,
    CustomAudioTrackVolume,
    VideoTrack,
);
