//! Access-token provider for the board and repository hosts.
//!
//! Tokens come either from the environment (static) or from a connector
//! endpoint that hands out short-lived OAuth tokens. Connector tokens are
//! cached in a [`CredentialStore`] until their declared expiry.
//!
//! ## Refresh
//!
//! The store holds its cache behind an async mutex and keeps it locked for the
//! duration of a refresh, so concurrent callers wait for the single in-flight
//! fetch instead of each issuing their own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Header carrying the identity material on connector requests.
const CONNECTOR_TOKEN_HEADER: &str = "X-Connector-Token";

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Required identity input is missing. Retrying will not help.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The connector could not be reached or returned no usable token.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Identity presented to the connector endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorIdentity {
    /// Interactive identity token (developer session).
    Identity(String),
    /// Deployment renewal token.
    Renewal(String),
}

impl ConnectorIdentity {
    /// Pick an identity from the two environment forms; the interactive one wins.
    pub fn from_parts(identity: Option<String>, renewal: Option<String>) -> Option<Self> {
        identity
            .map(ConnectorIdentity::Identity)
            .or_else(|| renewal.map(ConnectorIdentity::Renewal))
    }

    fn header_value(&self) -> String {
        match self {
            ConnectorIdentity::Identity(token) => format!("identity {}", token),
            ConnectorIdentity::Renewal(token) => format!("renewal {}", token),
        }
    }
}

/// Settings returned by a connection fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub access_token: String,
    /// `None` means the token must not be cached.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Something that can produce fresh connection settings.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn fetch(&self) -> Result<ConnectionSettings, CredentialError>;
}

/// A token read once from the environment.
pub struct StaticToken(pub String);

#[async_trait]
impl ConnectionSource for StaticToken {
    async fn fetch(&self) -> Result<ConnectionSettings, CredentialError> {
        if self.0.is_empty() {
            return Err(CredentialError::Configuration(
                "Static token is empty".to_string(),
            ));
        }
        Ok(ConnectionSettings {
            access_token: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Fetches connection settings from the connector endpoint.
pub struct ConnectorClient {
    http: reqwest::Client,
    base_url: String,
    connector_name: String,
    identity: Option<ConnectorIdentity>,
}

impl ConnectorClient {
    /// `endpoint` is a bare hostname (served over HTTPS) or a full base URL.
    pub fn new(
        endpoint: impl Into<String>,
        connector_name: impl Into<String>,
        identity: Option<ConnectorIdentity>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: connector_base_url(&endpoint.into()),
            connector_name: connector_name.into(),
            identity,
        }
    }
}

fn connector_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

#[async_trait]
impl ConnectionSource for ConnectorClient {
    async fn fetch(&self) -> Result<ConnectionSettings, CredentialError> {
        let identity = self.identity.as_ref().ok_or_else(|| {
            CredentialError::Configuration(
                "Neither CONNECTOR_IDENTITY_TOKEN nor CONNECTOR_RENEWAL_TOKEN is set".to_string(),
            )
        })?;

        let url = format!("{}/api/v2/connection", self.base_url);
        tracing::debug!(connector = %self.connector_name, "Fetching connection settings");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("include_secrets", "true"),
                ("connector_names", self.connector_name.as_str()),
            ])
            .header("Accept", "application/json")
            .header(CONNECTOR_TOKEN_HEADER, identity.header_value())
            .send()
            .await
            .map_err(|e| CredentialError::Connection(format!("Connector request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Connection(format!(
                "Connector returned {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            CredentialError::Connection(format!("Failed to parse connector response: {}", e))
        })?;

        parse_connection_response(&self.connector_name, &body)
    }
}

/// Extract the token and expiry from a connector reply.
///
/// The token lives at `settings.access_token`, or under
/// `settings.oauth.credentials.access_token` for OAuth connections.
pub fn parse_connection_response(
    connector_name: &str,
    body: &Value,
) -> Result<ConnectionSettings, CredentialError> {
    let settings = body["items"]
        .as_array()
        .and_then(|items| items.first())
        .map(|item| &item["settings"])
        .ok_or_else(|| {
            CredentialError::Connection(format!("{} is not connected", connector_name))
        })?;

    let access_token = settings["access_token"]
        .as_str()
        .or_else(|| settings["oauth"]["credentials"]["access_token"].as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            CredentialError::Connection(format!("{} connection has no access token", connector_name))
        })?;

    let expires_at = settings["expires_at"]
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ConnectionSettings {
        access_token: access_token.to_string(),
        expires_at,
    })
}

/// Time source, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Caches one service's access token and refreshes it when expired.
pub struct CredentialStore {
    source: Arc<dyn ConnectionSource>,
    cached: Mutex<Option<CachedToken>>,
    clock: Clock,
}

impl CredentialStore {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self::with_clock(source, Arc::new(Utc::now))
    }

    pub fn with_clock(source: Arc<dyn ConnectionSource>, clock: Clock) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            clock,
        }
    }

    /// Build a store from configuration.
    pub fn from_config(config: &crate::config::TokenSourceConfig) -> Self {
        use crate::config::TokenSourceConfig;
        let source: Arc<dyn ConnectionSource> = match config {
            TokenSourceConfig::Static(token) => Arc::new(StaticToken(token.clone())),
            TokenSourceConfig::Connector {
                hostname,
                connector_name,
                identity,
            } => Arc::new(ConnectorClient::new(
                hostname.clone(),
                connector_name.clone(),
                identity.clone(),
            )),
        };
        Self::new(source)
    }

    /// Return the cached token while `now < expiry`, otherwise fetch a fresh one.
    pub async fn access_token(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;

        let now = (self.clock)();
        if let Some(token) = cached.as_ref() {
            if now < token.expires_at {
                return Ok(token.value.clone());
            }
            tracing::debug!(expired_at = %token.expires_at, "Cached access token expired");
        }

        let settings = self.source.fetch().await?;
        *cached = settings.expires_at.map(|expires_at| CachedToken {
            value: settings.access_token.clone(),
            expires_at,
        });

        Ok(settings.access_token)
    }
}
