//! Dispatch event routing
//!
//! Tagged union keyed by the dispatch frame's `t` field.

use serde_json::Value;
use std::fmt;

use super::{GuildCreateEvent, PresenceUpdateEvent, ReadyEvent};

/// Event names the cache interprets
///
/// Every other name is opaque to the client and routed as [`DispatchEvent::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Sent after successful Identify
    Ready,
    /// Full guild snapshot
    GuildCreate,
    /// User status or game changed
    PresenceUpdate,
}

impl EventKind {
    /// Get the wire name of the event
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::GuildCreate => "GUILD_CREATE",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
        }
    }

    /// Parse an event kind from its wire name
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded dispatch event
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Ready(Box<ReadyEvent>),
    GuildCreate(Box<GuildCreateEvent>),
    PresenceUpdate(Box<PresenceUpdateEvent>),
    /// Any event the cache does not interpret, carried verbatim
    Other { name: String, data: Value },
}

impl DispatchEvent {
    /// Decode the payload of a dispatch frame named `name`
    ///
    /// Unknown names never fail; known names fail only when their payload does
    /// not match the expected shape.
    pub fn decode(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match EventKind::from_str(name) {
            Some(EventKind::Ready) => Self::Ready(Box::new(serde_json::from_value(data)?)),
            Some(EventKind::GuildCreate) => {
                Self::GuildCreate(Box::new(serde_json::from_value(data)?))
            }
            Some(EventKind::PresenceUpdate) => {
                Self::PresenceUpdate(Box::new(serde_json::from_value(data)?))
            }
            None => Self::Other {
                name: name.to_string(),
                data,
            },
        })
    }

    /// Known kind of this event, if the cache interprets it
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Ready(_) => Some(EventKind::Ready),
            Self::GuildCreate(_) => Some(EventKind::GuildCreate),
            Self::PresenceUpdate(_) => Some(EventKind::PresenceUpdate),
            Self::Other { .. } => None,
        }
    }

    /// Wire name of this event
    pub fn name(&self) -> &str {
        match self {
            Self::Other { name, .. } => name,
            other => other.kind().map_or("", EventKind::as_str),
        }
    }
}
