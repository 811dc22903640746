//! Integration test utilities for the gateway client
//!
//! Runs an in-process fake of the REST API and the WebSocket gateway that
//! the real `Client` connects to.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
