//! Channel history query parameters

use serde::Serialize;

use cord_core::Id;

/// Cursor and limit filters for fetching channel history
///
/// At most one of `before`, `after` and `around` is honoured by the server;
/// unset fields are left off the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub around: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u8>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent before the given message
    pub fn before(mut self, id: impl Into<Id>) -> Self {
        self.before = Some(id.into());
        self
    }

    /// Messages sent after the given message
    pub fn after(mut self, id: impl Into<Id>) -> Self {
        self.after = Some(id.into());
        self
    }

    /// Messages surrounding the given message
    pub fn around(mut self, id: impl Into<Id>) -> Self {
        self.around = Some(id.into());
        self
    }

    /// Maximum number of messages (the server clamps this to 1..=100)
    pub fn limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when no filter is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
