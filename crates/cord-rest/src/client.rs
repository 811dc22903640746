//! HTTP API client
//!
//! Every call is a single request/response with no retry or rate limiting.
//! Token-authenticated calls send the raw token in the `Authorization` header.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use cord_common::ClientConfig;
use cord_core::Message;

use crate::error::RestError;
use crate::query::HistoryQuery;

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// REST client bound to one API base URL
#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    token: RwLock<Option<String>>,
}

impl RestClient {
    /// Create a client without a token
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, RestError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Create a client from configuration, adopting the token if one is set
    pub fn from_config(config: &ClientConfig) -> Result<Self, RestError> {
        let client = Self::new(
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        if let Some(token) = config.credentials.token() {
            client.set_token(token);
        }
        Ok(client)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Current token, if known
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    // === Bootstrap ===

    /// Exchange email and password for a token and keep it for later calls
    pub async fn login(&self, email: &str, password: &str) -> Result<String, RestError> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }));

        let LoginResponse { token } = self.execute(request).await?;
        self.set_token(token.clone());

        tracing::info!("Credential exchange succeeded");
        Ok(token)
    }

    /// Look up the gateway socket base URL
    pub async fn gateway_url(&self) -> Result<String, RestError> {
        let mut request = self.http.get(self.url("/gateway"));
        if let Some(token) = self.token() {
            request = request.header(AUTHORIZATION, token);
        }

        let GatewayResponse { url } = self.execute(request).await?;
        tracing::debug!(url = %url, "Gateway URL resolved");
        Ok(url)
    }

    // === Messages ===

    /// Post a message to a channel
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, RestError> {
        let request = self
            .authed(Method::POST, &format!("/channels/{channel_id}/messages"))?
            .json(&json!({ "content": content }));
        self.execute(request).await
    }

    /// Replace the content of a message
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message, RestError> {
        let request = self
            .authed(
                Method::PATCH,
                &format!("/channels/{channel_id}/messages/{message_id}"),
            )?
            .json(&json!({ "content": content }));
        self.execute(request).await
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), RestError> {
        let request = self.authed(
            Method::DELETE,
            &format!("/channels/{channel_id}/messages/{message_id}"),
        )?;
        self.send(request).await.map(drop)
    }

    /// Fetch channel history, newest first
    pub async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<Message>, RestError> {
        let mut request = self.authed(Method::GET, &format!("/channels/{channel_id}/messages"))?;
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(request).await
    }

    // === Guild members ===

    /// Set a member's nickname; `None` for `user_id` targets the current user
    ///
    /// An empty nickname resets it.
    pub async fn set_nickname(
        &self,
        guild_id: &str,
        user_id: Option<&str>,
        nick: &str,
    ) -> Result<(), RestError> {
        let path = match user_id {
            Some(user_id) => format!("/guilds/{guild_id}/members/{user_id}"),
            None => format!("/guilds/{guild_id}/members/@me/nick"),
        };
        let request = self
            .authed(Method::PATCH, &path)?
            .json(&json!({ "nick": nick }));
        self.send(request).await.map(drop)
    }

    /// Show the typing indicator in a channel
    pub async fn start_typing(&self, channel_id: &str) -> Result<(), RestError> {
        let request = self.authed(Method::POST, &format!("/channels/{channel_id}/typing"))?;
        self.send(request).await.map(drop)
    }

    // === Plumbing ===

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, RestError> {
        let token = self.token().ok_or(RestError::MissingToken)?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(AUTHORIZATION, token))
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: RequestBuilder) -> Result<String, RestError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, path = %path, "REST request failed");
            return Err(RestError::Status { status, body });
        }

        tracing::trace!(%status, path = %path, "REST request completed");
        Ok(body)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RestError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, RawQuery};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;

    fn message(id: &str, channel_id: &str, content: &str) -> Value {
        json!({
            "id": id,
            "channel_id": channel_id,
            "author": {"id": "u1", "username": "nelly"},
            "content": content,
            "timestamp": "2017-01-01T00:00:00+00:00"
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("tok")
    }

    async fn spawn_api() -> String {
        let app = Router::new()
            .route(
                "/api/gateway",
                get(|| async { Json(json!({"url": "wss://gateway.test"})) }),
            )
            .route(
                "/api/auth/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "pw" {
                        Ok(Json(json!({"token": "tok"})))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/api/channels/:channel/messages",
                post(
                    |headers: HeaderMap, Path(channel): Path<String>, Json(body): Json<Value>| async move {
                        if !authorized(&headers) {
                            return Err(StatusCode::UNAUTHORIZED);
                        }
                        let content = body["content"].as_str().unwrap_or_default().to_string();
                        Ok(Json(message("m1", &channel, &content)))
                    },
                )
                .get(|Path(channel): Path<String>, RawQuery(query): RawQuery| async move {
                    let tag = query.unwrap_or_default();
                    Json(json!([message("m2", &channel, &tag), message("m1", &channel, "")]))
                }),
            )
            .route(
                "/api/channels/:channel/messages/:message",
                patch(
                    |Path((channel, id)): Path<(String, String)>, Json(body): Json<Value>| async move {
                        let content = body["content"].as_str().unwrap_or_default().to_string();
                        Json(message(&id, &channel, &content))
                    },
                )
                .delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route(
                "/api/channels/:channel/typing",
                post(|| async { StatusCode::NO_CONTENT }),
            )
            .route(
                "/api/guilds/:guild/members/:user/nick",
                patch(|Path((_, user)): Path<(String, String)>| async move {
                    if user == "@me" {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }),
            )
            .route(
                "/api/guilds/:guild/members/:user",
                patch(|Path((_, user)): Path<(String, String)>| async move {
                    if user == "missing" {
                        StatusCode::NOT_FOUND
                    } else {
                        StatusCode::NO_CONTENT
                    }
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}/api")
    }

    async fn client() -> RestClient {
        let client = RestClient::new(spawn_api().await, Duration::from_secs(5)).unwrap();
        client.set_token("tok");
        client
    }

    #[tokio::test]
    async fn test_gateway_url() {
        let client = RestClient::new(spawn_api().await, Duration::from_secs(5)).unwrap();
        assert_eq!(client.gateway_url().await.unwrap(), "wss://gateway.test");
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let client = RestClient::new(spawn_api().await, Duration::from_secs(5)).unwrap();
        assert!(client.token().is_none());

        let token = client.login("a@b", "pw").await.unwrap();
        assert_eq!(token, "tok");
        assert_eq!(client.token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let client = RestClient::new(spawn_api().await, Duration::from_secs(5)).unwrap();
        let err = client.login("a@b", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(client.token().is_none());
    }

    #[tokio::test]
    async fn test_authed_call_without_token() {
        let client = RestClient::new(spawn_api().await, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.send_message("c1", "hi").await,
            Err(RestError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_send_and_edit_message() {
        let client = client().await;

        let sent = client.send_message("c1", "hello").await.unwrap();
        assert_eq!(sent.content, "hello");
        assert_eq!(sent.channel_id.as_str(), "c1");

        let edited = client.edit_message("c1", "m1", "bye").await.unwrap();
        assert_eq!(edited.id.as_str(), "m1");
        assert_eq!(edited.content, "bye");
    }

    #[tokio::test]
    async fn test_wrong_token_is_status_error() {
        let client = client().await;
        client.set_token("other");
        let err = client.send_message("c1", "hello").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_fetch_messages_passes_query() {
        let client = client().await;

        let messages = client
            .fetch_messages("c1", &HistoryQuery::new().before("m9").limit(2))
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("before=m9"));
        assert!(messages[0].content.contains("limit=2"));

        let unfiltered = client
            .fetch_messages("c1", &HistoryQuery::new())
            .await
            .unwrap();
        assert_eq!(unfiltered[0].content, "");
    }

    #[tokio::test]
    async fn test_empty_responses() {
        let client = client().await;
        client.delete_message("c1", "m1").await.unwrap();
        client.start_typing("c1").await.unwrap();
        client.set_nickname("g1", None, "me").await.unwrap();
        client.set_nickname("g1", Some("u2"), "them").await.unwrap();
    }

    #[tokio::test]
    async fn test_nickname_for_unknown_member() {
        let client = client().await;
        let err = client
            .set_nickname("g1", Some("missing"), "x")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_from_config_adopts_token() {
        let config = ClientConfig::with_token("tok").api_base("http://localhost/api/");
        let client = RestClient::from_config(&config).unwrap();
        assert_eq!(client.token().as_deref(), Some("tok"));
        assert_eq!(client.api_base(), "http://localhost/api");
    }
}
