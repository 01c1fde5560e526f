//! Relational lookups over the current store contents
//!
//! Plain scans, no indexes. A missing parent yields an empty result.

use std::collections::HashSet;

use tracing::warn;

use super::Store;
use crate::model::{
    AudioTrack, CustomAudioTrackPosition, CustomAudioTrackVolume, CustomGroup,
    CustomGroupPosition, CustomGroupVolume, CustomStageDevicePosition, CustomStageDeviceVolume,
    CustomStageMemberPosition, CustomStageMemberVolume, Group, Record, SoundCard, StageDevice,
    StageMember, VideoTrack,
};

/// Pick the override for one (base, viewer) pair
///
/// Matches arrive ordered by id, so the lowest id wins when the server sent
/// more than one.
fn single<T: Record>(mut matches: Vec<T>, base: &str, viewer: &str) -> Option<T> {
    if matches.len() > 1 {
        let ids: Vec<&str> = matches.iter().map(Record::id).collect();
        warn!(
            kind = %T::KIND,
            base,
            viewer,
            ?ids,
            "Duplicate overrides for one viewer, using the lowest id"
        );
    }
    if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    }
}

impl Store {
    /// Groups of a stage
    pub fn groups_by_stage(&self, stage_id: &str) -> Vec<Group> {
        self.groups.filter(|g| g.stage_id == stage_id)
    }

    // =========================================================================
    // Members and devices
    // =========================================================================

    /// Members of a stage
    pub fn stage_members_by_stage(&self, stage_id: &str) -> Vec<StageMember> {
        self.stage_members.filter(|m| m.stage_id == stage_id)
    }

    /// Members currently assigned to a group
    pub fn stage_members_by_group(&self, group_id: &str) -> Vec<StageMember> {
        self.stage_members
            .filter(|m| m.group_id.as_deref() == Some(group_id))
    }

    /// Stage devices of a stage
    pub fn stage_devices_by_stage(&self, stage_id: &str) -> Vec<StageDevice> {
        self.stage_devices.filter(|d| d.stage_id == stage_id)
    }

    /// Stage devices a member joined with
    pub fn stage_devices_by_stage_member(&self, stage_member_id: &str) -> Vec<StageDevice> {
        self.stage_devices
            .filter(|d| d.stage_member_id == stage_member_id)
    }

    /// A device's stage device in one stage
    pub fn stage_device_by_device_and_stage(
        &self,
        device_id: &str,
        stage_id: &str,
    ) -> Option<StageDevice> {
        self.stage_devices
            .find(|d| d.device_id == device_id && d.stage_id == stage_id)
    }

    /// Sound cards attached to a device
    pub fn sound_cards_by_device(&self, device_id: &str) -> Vec<SoundCard> {
        self.sound_cards.filter(|c| c.device_id == device_id)
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Audio tracks published from a stage device
    pub fn audio_tracks_by_stage_device(&self, stage_device_id: &str) -> Vec<AudioTrack> {
        self.audio_tracks
            .filter(|t| t.stage_device_id == stage_device_id)
    }

    /// Audio tracks of a member
    pub fn audio_tracks_by_stage_member(&self, stage_member_id: &str) -> Vec<AudioTrack> {
        self.audio_tracks
            .filter(|t| t.stage_member_id == stage_member_id)
    }

    /// Audio tracks of every member currently in `group_id`
    pub fn audio_tracks_by_group(&self, group_id: &str) -> Vec<AudioTrack> {
        let members: HashSet<String> = self
            .stage_members_by_group(group_id)
            .into_iter()
            .map(|m| m.id)
            .collect();
        if members.is_empty() {
            return Vec::new();
        }
        self.audio_tracks
            .filter(|t| members.contains(&t.stage_member_id))
    }

    /// Video tracks published from a stage device
    pub fn video_tracks_by_stage_device(&self, stage_device_id: &str) -> Vec<VideoTrack> {
        self.video_tracks
            .filter(|t| t.stage_device_id == stage_device_id)
    }

    /// Video tracks of a member
    pub fn video_tracks_by_stage_member(&self, stage_member_id: &str) -> Vec<VideoTrack> {
        self.video_tracks
            .filter(|t| t.stage_member_id == stage_member_id)
    }

    // =========================================================================
    // Overrides (at most one per base and viewer)
    // =========================================================================

    /// Override of `group_id` as heard from `target_group_id`
    pub fn custom_group_by_group_and_target(
        &self,
        group_id: &str,
        target_group_id: &str,
    ) -> Option<CustomGroup> {
        let matches = self
            .custom_groups
            .filter(|c| c.group_id == group_id && c.target_group_id == target_group_id);
        single(matches, group_id, target_group_id)
    }

    /// A device's position override for a group
    pub fn custom_group_position_by_group_and_device(
        &self,
        group_id: &str,
        device_id: &str,
    ) -> Option<CustomGroupPosition> {
        let matches = self
            .custom_group_positions
            .filter(|c| c.group_id == group_id && c.device_id == device_id);
        single(matches, group_id, device_id)
    }

    /// A device's volume override for a group
    pub fn custom_group_volume_by_group_and_device(
        &self,
        group_id: &str,
        device_id: &str,
    ) -> Option<CustomGroupVolume> {
        let matches = self
            .custom_group_volumes
            .filter(|c| c.group_id == group_id && c.device_id == device_id);
        single(matches, group_id, device_id)
    }

    /// A device's position override for a member
    pub fn custom_stage_member_position_by_stage_member_and_device(
        &self,
        stage_member_id: &str,
        device_id: &str,
    ) -> Option<CustomStageMemberPosition> {
        let matches = self
            .custom_stage_member_positions
            .filter(|c| c.stage_member_id == stage_member_id && c.device_id == device_id);
        single(matches, stage_member_id, device_id)
    }

    /// A device's volume override for a member
    pub fn custom_stage_member_volume_by_stage_member_and_device(
        &self,
        stage_member_id: &str,
        device_id: &str,
    ) -> Option<CustomStageMemberVolume> {
        let matches = self
            .custom_stage_member_volumes
            .filter(|c| c.stage_member_id == stage_member_id && c.device_id == device_id);
        single(matches, stage_member_id, device_id)
    }

    /// A device's position override for a stage device
    pub fn custom_stage_device_position_by_stage_device_and_device(
        &self,
        stage_device_id: &str,
        device_id: &str,
    ) -> Option<CustomStageDevicePosition> {
        let matches = self
            .custom_stage_device_positions
            .filter(|c| c.stage_device_id == stage_device_id && c.device_id == device_id);
        single(matches, stage_device_id, device_id)
    }

    /// A device's volume override for a stage device
    pub fn custom_stage_device_volume_by_stage_device_and_device(
        &self,
        stage_device_id: &str,
        device_id: &str,
    ) -> Option<CustomStageDeviceVolume> {
        let matches = self
            .custom_stage_device_volumes
            .filter(|c| c.stage_device_id == stage_device_id && c.device_id == device_id);
        single(matches, stage_device_id, device_id)
    }

    /// A device's position override for an audio track
    pub fn custom_audio_track_position_by_audio_track_and_device(
        &self,
        audio_track_id: &str,
        device_id: &str,
    ) -> Option<CustomAudioTrackPosition> {
        let matches = self
            .custom_audio_track_positions
            .filter(|c| c.audio_track_id == audio_track_id && c.device_id == device_id);
        single(matches, audio_track_id, device_id)
    }

    /// A device's volume override for an audio track
    pub fn custom_audio_track_volume_by_audio_track_and_device(
        &self,
        audio_track_id: &str,
        device_id: &str,
    ) -> Option<CustomAudioTrackVolume> {
        let matches = self
            .custom_audio_track_volumes
            .filter(|c| c.audio_track_id == audio_track_id && c.device_id == device_id);
        single(matches, audio_track_id, device_id)
    }
}
