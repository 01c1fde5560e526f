//! Property blocks shared by volume-bearing and positioned entities

use serde::{Deserialize, Serialize};

/// Microphone/speaker directivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directivity {
    Omni,
    /// Older servers spell this "cardoid"
    #[default]
    #[serde(alias = "cardoid")]
    Cardioid,
}

/// Gain and mute state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProperties {
    pub volume: f64,
    pub muted: bool,
}

impl Default for VolumeProperties {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

/// Placement of an entity in the virtual room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r_x: f64,
    pub r_y: f64,
    pub r_z: f64,
    pub directivity: Directivity,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: -1.0,
            z: 0.0,
            r_x: 0.0,
            r_y: 0.0,
            r_z: -180.0,
            directivity: Directivity::Cardioid,
        }
    }
}
