//! Dispatch events
//!
//! Typed payloads for the dispatch events the cache interprets, and the tagged
//! union that routes every other event name through as opaque JSON.

mod dispatch;
mod payloads;

pub use dispatch::{DispatchEvent, EventKind};
pub use payloads::{
    GuildCreateEvent, PartialUser, PresenceUpdateEvent, ReadyEvent, UnavailableGuild,
};
