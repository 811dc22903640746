//! Cached entities - the client-side reconstruction of server state

mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod user;

pub use channel::Channel;
pub use guild::Guild;
pub use member::Member;
pub use message::Message;
pub use presence::{Activity, Presence, Status};
pub use user::User;
