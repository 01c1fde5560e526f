//! Store - Thread-safe replica of the server's shared state
//!
//! One [`Collection`] per entity kind plus the [`Session`] cells. The store
//! performs no I/O and holds no lock across a notification callback.

mod collection;
mod merge;
mod queries;
mod session;

pub use collection::{AnyCollection, Collection};
pub use merge::{merge_patch, touches};
pub use session::{Session, SessionCell};

use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::{
    AudioTrack, CustomAudioTrackPosition, CustomAudioTrackVolume, CustomGroup,
    CustomGroupPosition, CustomGroupVolume, CustomStageDevicePosition, CustomStageDeviceVolume,
    CustomStageMemberPosition, CustomStageMemberVolume, Device, EntityKind, Group, SoundCard,
    Stage, StageDevice, StageMember, User, VideoTrack,
};

/// Local replica of every replicated collection
#[derive(Default)]
pub struct Store {
    pub devices: Collection<Device>,
    pub users: Collection<User>,
    pub stages: Collection<Stage>,
    pub groups: Collection<Group>,
    pub custom_groups: Collection<CustomGroup>,
    pub custom_group_positions: Collection<CustomGroupPosition>,
    pub custom_group_volumes: Collection<CustomGroupVolume>,
    pub stage_members: Collection<StageMember>,
    pub custom_stage_member_positions: Collection<CustomStageMemberPosition>,
    pub custom_stage_member_volumes: Collection<CustomStageMemberVolume>,
    pub stage_devices: Collection<StageDevice>,
    pub custom_stage_device_positions: Collection<CustomStageDevicePosition>,
    pub custom_stage_device_volumes: Collection<CustomStageDeviceVolume>,
    pub sound_cards: Collection<SoundCard>,
    pub audio_tracks: Collection<AudioTrack>,
    pub custom_audio_track_positions: Collection<CustomAudioTrackPosition>,
    pub custom_audio_track_volumes: Collection<CustomAudioTrackVolume>,
    pub video_tracks: Collection<VideoTrack>,

    pub session: Session,
    ready: AtomicBool,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind-erased access to the collection holding `kind`
    pub fn collection(&self, kind: EntityKind) -> &dyn AnyCollection {
        match kind {
            EntityKind::Device => &self.devices,
            EntityKind::User => &self.users,
            EntityKind::Stage => &self.stages,
            EntityKind::Group => &self.groups,
            EntityKind::CustomGroup => &self.custom_groups,
            EntityKind::CustomGroupPosition => &self.custom_group_positions,
            EntityKind::CustomGroupVolume => &self.custom_group_volumes,
            EntityKind::StageMember => &self.stage_members,
            EntityKind::CustomStageMemberPosition => &self.custom_stage_member_positions,
            EntityKind::CustomStageMemberVolume => &self.custom_stage_member_volumes,
            EntityKind::StageDevice => &self.stage_devices,
            EntityKind::CustomStageDevicePosition => &self.custom_stage_device_positions,
            EntityKind::CustomStageDeviceVolume => &self.custom_stage_device_volumes,
            EntityKind::SoundCard => &self.sound_cards,
            EntityKind::AudioTrack => &self.audio_tracks,
            EntityKind::CustomAudioTrackPosition => &self.custom_audio_track_positions,
            EntityKind::CustomAudioTrackVolume => &self.custom_audio_track_volumes,
            EntityKind::VideoTrack => &self.video_tracks,
        }
    }

    /// True once the server sent `ready`
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark whether the server has sent `ready`
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    // =========================================================================
    // Session-derived lookups (not atomic across cell and collection)
    // =========================================================================

    /// Device this client runs as
    pub fn local_device(&self) -> Option<Device> {
        self.session
            .local_device_id
            .get()
            .and_then(|id| self.devices.get(&id))
    }

    /// Signed-in user
    pub fn user(&self) -> Option<User> {
        self.session.user_id.get().and_then(|id| self.users.get(&id))
    }

    /// Stage currently joined
    pub fn stage(&self) -> Option<Stage> {
        self.session.stage_id.get().and_then(|id| self.stages.get(&id))
    }

    /// Viewer's group in the joined stage
    pub fn group(&self) -> Option<Group> {
        self.session.group_id.get().and_then(|id| self.groups.get(&id))
    }

    /// Local membership in the joined stage
    pub fn stage_member(&self) -> Option<StageMember> {
        self.session
            .stage_member_id
            .get()
            .and_then(|id| self.stage_members.get(&id))
    }

    /// Local device's presence in the joined stage
    pub fn stage_device(&self) -> Option<StageDevice> {
        self.session
            .stage_device_id
            .get()
            .and_then(|id| self.stage_devices.get(&id))
    }
}
