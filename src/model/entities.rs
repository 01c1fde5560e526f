//! Base entities: devices, users, stages, groups, members and tracks

use serde::{Deserialize, Serialize};

use super::properties::{Position, VolumeProperties};

/// A physical client device (native app, browser tab, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    /// Stable identifier chosen by the client (MAC address, cookie, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub can_video: bool,
    #[serde(default)]
    pub can_audio: bool,
    #[serde(default)]
    pub send_video: bool,
    #[serde(default)]
    pub send_audio: bool,
    #[serde(default)]
    pub receive_video: bool,
    #[serde(default)]
    pub receive_audio: bool,
    /// Selected audio driver, shared by the input and output sound card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_sound_card_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_sound_card_id: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Balance between the own monitor signal (-1) and the others (1)
    #[serde(default)]
    pub balance: f64,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub can_create_stage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_member_id: Option<String>,
}

/// A virtual venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub sound_editors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub video_type: String,
    #[serde(default)]
    pub audio_type: String,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub reflection: f64,
    #[serde(default)]
    pub absorption: f64,
}

/// A sub-division of a stage (band, audience, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: String,
    pub stage_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(flatten)]
    pub volume: VolumeProperties,
    #[serde(flatten)]
    pub position: Position,
}

/// Presence of a user inside one stage and group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMember {
    #[serde(rename = "_id")]
    pub id: String,
    pub stage_id: String,
    /// Members may be parked outside any group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub is_director: bool,
    #[serde(flatten)]
    pub volume: VolumeProperties,
    #[serde(flatten)]
    pub position: Position,
}

/// One device of a stage member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDevice {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub stage_member_id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub send_local: bool,
    #[serde(flatten)]
    pub volume: VolumeProperties,
    #[serde(flatten)]
    pub position: Position,
}

/// One channel of a sound card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// An audio interface attached to a device
///
/// Unique by (audioDriver, label, deviceId, type) besides its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundCard {
    #[serde(rename = "_id")]
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub audio_driver: String,
    /// Either "input" or "output"
    #[serde(default, rename = "type")]
    pub card_type: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub sample_rates: Vec<u32>,
    #[serde(default)]
    pub period_size: u32,
    #[serde(default = "default_num_periods")]
    pub num_periods: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_latency: Option<f64>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub user_id: String,
}

/// A video stream published by a stage device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrack {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_id: String,
    pub stage_member_id: String,
    pub stage_device_id: String,
    #[serde(default, rename = "type")]
    pub track_type: String,
}

/// An audio stream published by a stage device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub stage_id: String,
    pub stage_member_id: String,
    pub stage_device_id: String,
    #[serde(default, rename = "type")]
    pub track_type: String,
    /// Channel index on the source device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_channel: Option<u32>,
    #[serde(flatten)]
    pub volume: VolumeProperties,
    #[serde(flatten)]
    pub position: Position,
}

fn default_volume() -> f64 {
    1.0
}

fn default_num_periods() -> u32 {
    2
}
