//! # cord-gateway
//!
//! Client side of the gateway protocol: the session state machine, the
//! heartbeat timer, the named-event bus and the socket connection, behind a
//! [`Client`] facade.
//!
//! ```no_run
//! use cord_gateway::Client;
//!
//! # async fn run() -> Result<(), cord_gateway::GatewayError> {
//! let client = Client::from_env()?;
//! client.on("MESSAGE_CREATE", |event| {
//!     println!("{}", event.data["content"]);
//! });
//! client.login().await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod client;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod protocol;
pub mod resolver;
pub mod session;

pub use bus::{EventBus, GatewayEvent, Subscription, DEBUG_EVENT};
pub use client::Client;
pub use error::GatewayError;
pub use heartbeat::HeartbeatController;
pub use resolver::{socket_url, GatewayUrlResolver, StaticResolver};
pub use session::{Session, SessionConfig, SessionState};
