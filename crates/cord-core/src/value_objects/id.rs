//! Opaque entity identifier
//!
//! The gateway sends ids as JSON strings (snowflakes encoded as decimal text),
//! but older payloads and test fixtures may carry plain integers or non-numeric
//! tokens. `Id` accepts all of them and compares by its textual form.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier for guilds, channels, users and messages
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(String);

impl Id {
    /// Discord epoch: 2015-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1_420_070_400_000;

    /// Create an id from any string-like value
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual form
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id and return the inner string
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Check if the id is empty (uninitialized)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a non-empty id
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Creation time encoded in the id, when it is a snowflake
    ///
    /// Returns `None` for non-numeric ids.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.parse::<u64>().ok()?;
        let millis = i64::try_from(raw >> 22).ok()? + Self::EPOCH;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Error when parsing an `Id` from a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("id must not be empty")]
    Empty,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Id {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for Id {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::str::FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::parse(s)
    }
}

// Always serialized as a string so large snowflakes survive JavaScript clients
impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = Id;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer id")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(value.to_string()))
            }

            fn visit_str<E>(self, value: &str) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(value))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}
