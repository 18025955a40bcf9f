//! Configuration management for the CTO agent.
//!
//! Configuration is read from environment variables:
//! - `NOTION_DATABASE_ID` - Required. The kanban board (Notion database) to poll.
//! - `GITHUB_OWNER` / `GITHUB_REPO` - Required. Repository the agent works in.
//! - `GITHUB_BASE_BRANCH` - Optional. Branch PRs target. Defaults to `main`.
//! - `OPENROUTER_API_KEY` - Required. Key for the model backend.
//! - `DEFAULT_MODEL` - Optional. Defaults to `anthropic/claude-sonnet-4.5`.
//! - `MAX_AGENT_STEPS` - Optional. Tool-calling step budget per run. Defaults to `20`.
//! - `SCHEDULE_INTERVAL_SECS` - Optional. Re-run every N seconds instead of once.
//! - `NOTION_TOKEN` / `GITHUB_TOKEN` - Optional. Static tokens that bypass the connector.
//! - `CONNECTORS_HOSTNAME` - Optional. Host serving connector credentials.
//! - `CONNECTOR_IDENTITY_TOKEN` / `CONNECTOR_RENEWAL_TOKEN` - Identity for the connector.
//! - `NOTION_API_BASE` / `GITHUB_API_BASE` - Optional. Override the public API hosts.

use std::time::Duration;
use thiserror::Error;

use crate::credentials::ConnectorIdentity;

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_MAX_STEPS: usize = 20;
pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("No credentials for {service}: set {token_var} or CONNECTORS_HOSTNAME")]
    NoCredentialSource {
        service: String,
        token_var: String,
    },
}

/// Where a service's access token comes from.
#[derive(Debug, Clone)]
pub enum TokenSourceConfig {
    /// A fixed token from the environment.
    Static(String),
    /// Fetched from the connector endpoint and cached until it expires.
    Connector {
        hostname: String,
        connector_name: String,
        /// `None` is allowed here; the fetch fails with a configuration error.
        identity: Option<ConnectorIdentity>,
    },
}

/// Target repository coordinates.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kanban board (Notion database) identifier
    pub notion_database_id: String,

    /// Repository the agent branches from and opens PRs against
    pub repository: RepositoryConfig,

    /// OpenRouter API key
    pub api_key: String,

    /// Model identifier (OpenRouter format)
    pub default_model: String,

    /// Tool-calling step budget for one agent run
    pub max_steps: usize,

    /// When set, the binary re-runs the workflow on this interval
    pub schedule_interval: Option<Duration>,

    pub notion_token: TokenSourceConfig,
    pub github_token: TokenSourceConfig,

    pub notion_api_base: String,
    pub github_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when the board, repository or model key
    /// is not set, and `ConfigError::NoCredentialSource` when a service has neither
    /// a static token nor a connector host.
    pub fn from_env() -> Result<Self, ConfigError> {
        let notion_database_id = required("NOTION_DATABASE_ID")?;
        let owner = required("GITHUB_OWNER")?;
        let repo = required("GITHUB_REPO")?;
        let api_key = required("OPENROUTER_API_KEY")?;

        let base_branch = optional("GITHUB_BASE_BRANCH")
            .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());

        let default_model = optional("DEFAULT_MODEL")
            .unwrap_or_else(|| "anthropic/claude-sonnet-4.5".to_string());

        let max_steps = match optional("MAX_AGENT_STEPS") {
            Some(raw) => parse_positive("MAX_AGENT_STEPS", &raw)? as usize,
            None => DEFAULT_MAX_STEPS,
        };

        let schedule_interval = optional("SCHEDULE_INTERVAL_SECS")
            .map(|raw| parse_positive("SCHEDULE_INTERVAL_SECS", &raw).map(Duration::from_secs))
            .transpose()?;

        let hostname = optional("CONNECTORS_HOSTNAME");
        let identity = ConnectorIdentity::from_parts(
            optional("CONNECTOR_IDENTITY_TOKEN"),
            optional("CONNECTOR_RENEWAL_TOKEN"),
        );

        let notion_token = token_source("notion", "NOTION_TOKEN", hostname.as_deref(), &identity)?;
        let github_token = token_source("github", "GITHUB_TOKEN", hostname.as_deref(), &identity)?;

        Ok(Self {
            notion_database_id,
            repository: RepositoryConfig {
                owner,
                repo,
                base_branch,
            },
            api_key,
            default_model,
            max_steps,
            schedule_interval,
            notion_token,
            github_token,
            notion_api_base: optional("NOTION_API_BASE")
                .unwrap_or_else(|| NOTION_API_BASE.to_string()),
            github_api_base: optional("GITHUB_API_BASE")
                .unwrap_or_else(|| GITHUB_API_BASE.to_string()),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(
        notion_database_id: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            notion_database_id: notion_database_id.into(),
            repository: RepositoryConfig {
                owner: owner.into(),
                repo: repo.into(),
                base_branch: DEFAULT_BASE_BRANCH.to_string(),
            },
            api_key: String::new(),
            default_model: "anthropic/claude-sonnet-4.5".to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            schedule_interval: None,
            notion_token: TokenSourceConfig::Static(String::new()),
            github_token: TokenSourceConfig::Static(String::new()),
            notion_api_base: NOTION_API_BASE.to_string(),
            github_api_base: GITHUB_API_BASE.to_string(),
        }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    optional(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Empty values count as unset.
fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw
        .parse()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

fn token_source(
    connector_name: &str,
    token_var: &str,
    hostname: Option<&str>,
    identity: &Option<ConnectorIdentity>,
) -> Result<TokenSourceConfig, ConfigError> {
    if let Some(token) = optional(token_var) {
        return Ok(TokenSourceConfig::Static(token));
    }
    match hostname {
        Some(host) => Ok(TokenSourceConfig::Connector {
            hostname: host.to_string(),
            connector_name: connector_name.to_string(),
            identity: identity.clone(),
        }),
        None => Err(ConfigError::NoCredentialSource {
            service: connector_name.to_string(),
            token_var: token_var.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive_rejects_zero_and_garbage() {
        assert!(matches!(
            parse_positive("MAX_AGENT_STEPS", "0"),
            Err(ConfigError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_positive("MAX_AGENT_STEPS", "twenty"),
            Err(ConfigError::InvalidValue(_, _))
        ));
        assert_eq!(parse_positive("MAX_AGENT_STEPS", "20").ok(), Some(20));
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("db-1", "acme", "widgets");
        assert_eq!(config.repository.base_branch, "main");
        assert_eq!(config.max_steps, 20);
        assert!(config.schedule_interval.is_none());
    }

    #[test]
    fn test_token_source_without_host_or_token_fails() {
        let result = token_source("notion", "CTO_AGENT_TEST_UNSET_TOKEN", None, &None);
        assert!(matches!(
            result,
            Err(ConfigError::NoCredentialSource { .. })
        ));
    }

    #[test]
    fn test_token_source_prefers_connector_when_no_static_token() {
        let identity = Some(ConnectorIdentity::Renewal("r-1".to_string()));
        let result = token_source(
            "github",
            "CTO_AGENT_TEST_UNSET_TOKEN",
            Some("connectors.example.dev"),
            &identity,
        );
        match result {
            Ok(TokenSourceConfig::Connector {
                hostname,
                connector_name,
                identity,
            }) => {
                assert_eq!(hostname, "connectors.example.dev");
                assert_eq!(connector_name, "github");
                assert!(identity.is_some());
            }
            other => panic!("unexpected token source: {:?}", other),
        }
    }
}
