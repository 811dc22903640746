//! # cord-rest
//!
//! Stateless request wrappers around the HTTP API: gateway lookup,
//! credential exchange, messages, history, nicknames and typing.

mod client;
mod error;
mod query;

pub use client::RestClient;
pub use error::RestError;
pub use query::HistoryQuery;
