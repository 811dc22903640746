//! Gateway payload definitions
//!
//! The inbound Hello payload and the payloads of every frame the client sends.

use std::num::NonZeroU64;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cord_core::{Activity, Id};

/// Payload for op 10 (Hello)
///
/// A missing, zero or non-integer interval fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: NonZeroU64,
}

impl HelloPayload {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.get())
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    /// Member count above which guild snapshots list only online members
    pub large_threshold: u32,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, client_name: &str, large_threshold: u32) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::new(client_name),
            large_threshold,
        }
    }
}

/// Client connection properties, sent with `$`-prefixed keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
}

impl IdentifyProperties {
    /// Properties for this host, declaring `client_name` as browser and device
    #[must_use]
    pub fn new(client_name: &str) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: client_name.to_string(),
            device: client_name.to_string(),
        }
    }
}

/// Payload for op 3 (Status Update)
///
/// Both fields are always sent; `null` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    /// Unix time in milliseconds since the client went idle
    pub idle_since: Option<u64>,
    pub game: Option<Activity>,
}

impl StatusUpdatePayload {
    #[must_use]
    pub fn new(idle_since: Option<u64>, game: Option<Activity>) -> Self {
        Self { idle_since, game }
    }
}

/// Payload for op 4 (Voice State Update)
///
/// A `None` channel leaves voice in that guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStatePayload {
    pub guild_id: Id,
    pub channel_id: Option<Id>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl VoiceStatePayload {
    #[must_use]
    pub fn new(guild_id: impl Into<Id>, channel_id: Option<Id>) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id,
            self_mute: false,
            self_deaf: false,
        }
    }
}
