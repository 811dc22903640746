//! Guild entity - a server-side collective of channels and members

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{Channel, Member};
use crate::events::{GuildCreateEvent, UnavailableGuild};
use crate::value_objects::Id;

/// Guild entity as held by the cache
///
/// Channels are owned by the cache's channel map; the guild only keeps the
/// ids of the channels its last snapshot contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    /// True for a READY stub that has not received its snapshot yet
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub members: HashMap<Id, Member>,
    #[serde(default)]
    pub channel_ids: Vec<Id>,
    /// Wire fields this client does not model
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Guild {
    /// Create an empty guild that only knows its id
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            name: None,
            icon: None,
            owner_id: None,
            region: None,
            member_count: None,
            unavailable: false,
            members: HashMap::new(),
            channel_ids: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Build the stub inserted for each guild listed in READY
    pub fn stub(unavailable: &UnavailableGuild) -> Self {
        let mut guild = Self::new(unavailable.id.clone());
        guild.unavailable = unavailable.unavailable;
        guild.extra.clone_from(&unavailable.extra);
        guild
    }

    /// Split a full snapshot into the guild and its id-stamped channels
    ///
    /// The member map is keyed by user id, so duplicate entries in the
    /// snapshot collapse into one member. Duplicate channels collapse the
    /// same way.
    pub fn from_snapshot(snapshot: GuildCreateEvent) -> (Self, Vec<Channel>) {
        let GuildCreateEvent {
            id,
            name,
            icon,
            owner_id,
            region,
            member_count,
            unavailable,
            members,
            channels,
            presences,
            extra,
        } = snapshot;

        let mut members: HashMap<Id, Member> = members
            .into_iter()
            .map(|member| (member.id().clone(), member))
            .collect();

        for presence in &presences {
            if let Some(member) = members.get_mut(&presence.user.id) {
                member.apply_presence(presence);
            }
        }

        // Repeated ids keep their first position and their last contents
        let mut stamped: Vec<Channel> = Vec::with_capacity(channels.len());
        for mut channel in channels {
            channel.guild_id = Some(id.clone());
            match stamped.iter_mut().find(|c| c.id == channel.id) {
                Some(existing) => *existing = channel,
                None => stamped.push(channel),
            }
        }
        let channels = stamped;

        let guild = Self {
            channel_ids: channels.iter().map(|c| c.id.clone()).collect(),
            id,
            name,
            icon,
            owner_id,
            region,
            member_count,
            unavailable,
            members,
            extra,
        };

        (guild, channels)
    }

    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: &Id) -> bool {
        self.owner_id.as_ref() == Some(user_id)
    }

    /// Check if a user is a member of this guild
    #[inline]
    pub fn has_member(&self, user_id: &Id) -> bool {
        self.members.contains_key(user_id)
    }

    /// Get the guild icon URL if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/icons/{}/{}.png", self.id, hash))
    }
}
