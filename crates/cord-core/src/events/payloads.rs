//! Event payload definitions
//!
//! Data structures for the dispatch events that mutate the entity cache.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::entities::{Activity, Channel, Member, Status, User};
use crate::value_objects::Id;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// === Connection Events ===

/// READY event payload
///
/// Sent once after Identify succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,

    /// The authenticated user
    pub user: User,

    /// Guilds the user is in (stubs until their GUILD_CREATE arrives)
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Server-side session id (kept for inspection only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Guild stub in the READY event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Id,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// === Guild Events ===

/// GUILD_CREATE event payload
///
/// Full guild snapshot, sent for each guild after READY or when joining one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildCreateEvent {
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
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub presences: Vec<PresenceUpdateEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// === Presence Events ===

/// User carried by presence updates; only `id` is guaranteed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<bool>,
}

/// PRESENCE_UPDATE event payload (also the element type of a snapshot's `presences`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user: PartialUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub game: Option<Option<Activity>>,
}
