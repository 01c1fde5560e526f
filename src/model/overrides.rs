//! Per-viewer override ("custom") entities
//!
//! Each override narrows one base entity as perceived by one viewer. The
//! viewer is a group (`targetGroupId`) for [`CustomGroup`] and a device
//! (`deviceId`) for every other kind.

use serde::{Deserialize, Serialize};

use super::properties::{Position, VolumeProperties};

/// Volume and placement of a group as heard by the members of another group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub group_id: String,
    pub target_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub volume: VolumeProperties,
    #[serde(flatten)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupPosition {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub group_id: String,
    #[serde(flatten)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupVolume {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub group_id: String,
    #[serde(flatten)]
    pub volume: VolumeProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStageMemberPosition {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_member_id: String,
    #[serde(flatten)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStageMemberVolume {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_member_id: String,
    #[serde(flatten)]
    pub volume: VolumeProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStageDevicePosition {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_id: String,
    pub stage_device_id: String,
    #[serde(flatten)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStageDeviceVolume {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_id: String,
    pub stage_device_id: String,
    #[serde(flatten)]
    pub volume: VolumeProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAudioTrackPosition {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub audio_track_id: String,
    pub stage_id: String,
    #[serde(flatten)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAudioTrackVolume {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub audio_track_id: String,
    pub stage_id: String,
    #[serde(flatten)]
    pub volume: VolumeProperties,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_group_parses_volume_and_position() {
        let custom: CustomGroup = serde_json::from_value(json!({
            "_id": "cg1",
            "groupId": "g1",
            "targetGroupId": "g2",
            "volume": 0.25,
            "x": 3
        }))
        .unwrap();

        assert_eq!(custom.target_group_id, "g2");
        assert_eq!(custom.volume.volume, 0.25);
        assert!(!custom.volume.muted);
        assert_eq!(custom.position.x, 3.0);
    }

    #[test]
    fn test_custom_audio_track_volume_requires_track() {
        let result = serde_json::from_value::<CustomAudioTrackVolume>(json!({
            "_id": "c1",
            "userId": "u1",
            "deviceId": "d1",
            "stageId": "s1"
        }));
        assert!(result.is_err());
    }
}
