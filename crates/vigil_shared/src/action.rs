//! # Player Actions
//!
//! The inbound event stream. The game session layer turns packets into
//! [`PlayerAction`]s; the detection core only ever reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{Vec3, ViewAngle};

/// Player identifier.
pub type PlayerId = u64;

/// Free-form per-action attributes.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Kind of input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Position update.
    Move,
    /// Weapon fired.
    Shoot,
    /// View angle update.
    Aim,
    /// Weapon reload.
    Reload,
    /// Jump.
    Jump,
    /// Crouch toggle.
    Crouch,
    /// World interaction (doors, pickups).
    Interact,
}

/// A metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric measurement.
    Number(f64),
    /// Free text.
    Text(String),
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single input event from one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    /// Acting player.
    pub player_id: PlayerId,
    /// Event kind.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Event time (ms). Non-decreasing per player.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    /// World position at event time.
    #[serde(default)]
    pub position: Vec3,
    /// Aim direction at event time.
    #[serde(default)]
    pub view_angle: ViewAngle,
    /// Shot connected (SHOOT only).
    #[serde(default)]
    pub hit: bool,
    /// Shot was a headshot (SHOOT only).
    #[serde(default)]
    pub headshot: bool,
    /// Additional attributes.
    #[serde(default)]
    pub metadata: Metadata,
}

impl PlayerAction {
    /// Creates an action with no hit and empty metadata.
    #[must_use]
    pub fn new(
        player_id: PlayerId,
        action_type: ActionType,
        timestamp_ms: u64,
        position: Vec3,
        view_angle: ViewAngle,
    ) -> Self {
        Self {
            player_id,
            action_type,
            timestamp_ms,
            position,
            view_angle,
            hit: false,
            headshot: false,
            metadata: Metadata::new(),
        }
    }

    /// Builder: sets hit and headshot flags.
    #[must_use]
    pub fn with_hit(mut self, hit: bool, headshot: bool) -> Self {
        self.hit = hit;
        self.headshot = headshot && hit;
        self
    }

    /// Builder: adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Returns a boolean metadata entry.
    #[must_use]
    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key)? {
            MetaValue::Bool(value) => Some(*value),
            MetaValue::Number(value) => Some(*value != 0.0),
            MetaValue::Text(text) => text.parse().ok(),
        }
    }

    /// Returns a numeric metadata entry. Non-finite numbers read as absent.
    #[must_use]
    pub fn meta_f64(&self, key: &str) -> Option<f64> {
        let value = match self.metadata.get(key)? {
            MetaValue::Number(value) => *value,
            MetaValue::Text(text) => text.parse().ok()?,
            MetaValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Returns true for a fired shot.
    #[must_use]
    pub fn is_shot(&self) -> bool {
        self.action_type == ActionType::Shoot
    }
}
