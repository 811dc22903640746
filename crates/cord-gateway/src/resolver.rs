//! Gateway URL resolution
//!
//! A session needs the socket base URL before it can start. The REST client
//! looks it up with `GET /gateway`; tests and fixed deployments can use a
//! static URL instead.

use async_trait::async_trait;

use cord_rest::RestClient;

use crate::error::GatewayError;

/// Source of the gateway socket base URL
#[async_trait]
pub trait GatewayUrlResolver: Send + Sync {
    /// Base URL of the gateway, without query string
    async fn resolve(&self) -> Result<String, GatewayError>;
}

#[async_trait]
impl GatewayUrlResolver for RestClient {
    async fn resolve(&self) -> Result<String, GatewayError> {
        Ok(self.gateway_url().await?)
    }
}

/// Resolver that always returns the same URL
#[derive(Debug, Clone)]
pub struct StaticResolver {
    url: String,
}

impl StaticResolver {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GatewayUrlResolver for StaticResolver {
    async fn resolve(&self) -> Result<String, GatewayError> {
        Ok(self.url.clone())
    }
}

/// Socket URL for a resolved base: `<base>/?v=<version>&encoding=json`
pub fn socket_url(base: &str, version: u8) -> String {
    format!("{}/?v={version}&encoding=json", base.trim_end_matches('/'))
}
