//! # cord-core
//!
//! Domain layer shared by the gateway client, the entity cache and the REST
//! collaborator: opaque identifiers, cached entities, and typed dispatch payloads.
//! This crate has no networking or runtime dependencies.

pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Activity, Channel, Guild, Member, Message, Presence, Status, User};
pub use events::{
    DispatchEvent, EventKind, GuildCreateEvent, PartialUser, PresenceUpdateEvent, ReadyEvent,
    UnavailableGuild,
};
pub use value_objects::{Id, IdParseError};
