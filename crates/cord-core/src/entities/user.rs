//! User entity - process-wide identity shared across guilds

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Presence;
use crate::events::{PartialUser, PresenceUpdateEvent};
use crate::value_objects::Id;

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    /// Last presence seen for this user in any guild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    /// Wire fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Create a user that only knows its id
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            username: None,
            discriminator: None,
            avatar: None,
            bot: false,
            presence: None,
            extra: Map::new(),
        }
    }

    /// `username#discriminator`, or the bare username
    pub fn tag(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        Some(match &self.discriminator {
            Some(discriminator) => format!("{username}#{discriminator}"),
            None => username.to_string(),
        })
    }

    /// Avatar URL on the CDN if an avatar hash is set
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash))
    }

    /// Merge the identity fields present in a partial user
    pub fn merge_partial(&mut self, partial: &PartialUser) {
        if let Some(username) = &partial.username {
            self.username = Some(username.clone());
        }
        if let Some(discriminator) = &partial.discriminator {
            self.discriminator = Some(discriminator.clone());
        }
        if let Some(avatar) = &partial.avatar {
            self.avatar.clone_from(avatar);
        }
        if let Some(bot) = partial.bot {
            self.bot = bot;
        }
    }

    /// Merge a presence update into the user's last known presence
    pub fn apply_presence(&mut self, update: &PresenceUpdateEvent) {
        self.merge_partial(&update.user);
        match &mut self.presence {
            Some(presence) => presence.apply(update),
            None => self.presence = Some(Presence::from_update(update)),
        }
    }
}

impl From<&PartialUser> for User {
    fn from(partial: &PartialUser) -> Self {
        let mut user = Self::new(partial.id.clone());
        user.merge_partial(partial);
        user
    }
}
