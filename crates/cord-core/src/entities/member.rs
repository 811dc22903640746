//! Member entity - a user's membership in one guild

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Presence, User};
use crate::events::PresenceUpdateEvent;
use crate::value_objects::Id;

/// Guild member (guild-local view of a user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    /// Presence as seen in this guild; updated independently per guild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
}

impl Member {
    /// Create a member with no guild-specific data
    pub fn new(user: User) -> Self {
        Self {
            user,
            nick: None,
            roles: Vec::new(),
            joined_at: None,
            deaf: false,
            mute: false,
            presence: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &Id {
        &self.user.id
    }

    /// Nickname if set, otherwise the username
    pub fn display_name(&self) -> Option<&str> {
        self.nick.as_deref().or(self.user.username.as_deref())
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: &Id) -> bool {
        self.roles.contains(role_id)
    }

    /// Merge a presence update into this member's transient status
    pub fn apply_presence(&mut self, update: &PresenceUpdateEvent) {
        self.user.merge_partial(&update.user);
        match &mut self.presence {
            Some(presence) => presence.apply(update),
            None => self.presence = Some(Presence::from_update(update)),
        }
    }
}
