//! Presence value types - online status and current activity

use serde::{Deserialize, Serialize};

use crate::events::PresenceUpdateEvent;

/// User online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// User is online and active
    Online,
    /// User is idle (away from keyboard)
    Idle,
    /// Do not disturb
    Dnd,
    /// User is offline (or invisible)
    #[default]
    Offline,
    /// A status value this client does not know about
    #[serde(other)]
    Unknown,
}

impl Status {
    /// Check if this status should be shown as present
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Online | Self::Idle | Self::Dnd)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The game or stream a user is currently showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// 0 = playing, 1 = streaming
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Stream URL, only meaningful when `kind` is 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    /// A plain "playing" activity
    #[must_use]
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 0,
            url: None,
        }
    }

    /// A streaming activity pointing at `url`
    #[must_use]
    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 1,
            url: Some(url.into()),
        }
    }
}

/// Transient presence of a user, globally or within one guild
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub game: Option<Activity>,
}

impl Presence {
    /// Build a presence from an update, defaulting absent fields
    #[must_use]
    pub fn from_update(update: &PresenceUpdateEvent) -> Self {
        let mut presence = Self::default();
        presence.apply(update);
        presence
    }

    /// Merge an update into this presence
    ///
    /// Fields absent from the update keep their current value; a `game` that
    /// is present but `null` clears the activity.
    pub fn apply(&mut self, update: &PresenceUpdateEvent) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(game) = &update.game {
            self.game.clone_from(game);
        }
    }
}
