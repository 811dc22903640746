//! Channel entity - belongs to exactly one guild, referenced by id

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value_objects::Id;

/// Channel entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Id,
    /// Back-reference to the owning guild (stamped by the cache)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 0 = text, 2 = voice, 4 = category
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Id>,
    /// Wire fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            name: None,
            kind: None,
            position: None,
            topic: None,
            last_message_id: None,
            extra: Map::new(),
        }
    }

    /// Check if this is a voice channel
    #[inline]
    pub fn is_voice(&self) -> bool {
        self.kind == Some(2)
    }

    /// Mention string used in message content
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}
