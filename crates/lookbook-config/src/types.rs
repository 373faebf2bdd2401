//! Configuration types.
//!
//! Every field is optional in the file; the accessor methods resolve the
//! defaults so callers never see a half-filled config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default MCP endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/mcp";

/// Default timeout for single-document requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for event-stream requests, in seconds.
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 300;

/// Default client name announced in `clientInfo`.
pub const DEFAULT_CLIENT_NAME: &str = "fashion-web";

/// Default client version announced in `clientInfo`.
pub const DEFAULT_CLIENT_VERSION: &str = "1.0.0";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookbookConfig {
    /// Remote server settings.
    #[serde(default)]
    pub server: ServerSection,
    /// Client identity settings.
    #[serde(default)]
    pub client: ClientSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// MCP endpoint URL.
    pub endpoint: Option<String>,
    /// Timeout for single-document requests.
    pub timeout_secs: Option<u64>,
    /// Timeout for event-stream requests.
    pub stream_timeout_secs: Option<u64>,
}

/// `[client]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl LookbookConfig {
    /// Create an empty config (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: LookbookConfig) {
        let server = other.server;
        if server.endpoint.is_some() {
            self.server.endpoint = server.endpoint;
        }
        if server.timeout_secs.is_some() {
            self.server.timeout_secs = server.timeout_secs;
        }
        if server.stream_timeout_secs.is_some() {
            self.server.stream_timeout_secs = server.stream_timeout_secs;
        }

        let client = other.client;
        if client.name.is_some() {
            self.client.name = client.name;
        }
        if client.version.is_some() {
            self.client.version = client.version;
        }
    }

    /// Override the endpoint (CLI flag or env var layer).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.server.endpoint = Some(endpoint.into());
        self
    }

    /// Resolved MCP endpoint.
    pub fn endpoint(&self) -> &str {
        self.server.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Resolved single-document request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Resolved event-stream request timeout.
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .stream_timeout_secs
                .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS),
        )
    }

    /// Resolved client name.
    pub fn client_name(&self) -> &str {
        self.client.name.as_deref().unwrap_or(DEFAULT_CLIENT_NAME)
    }

    /// Resolved client version.
    pub fn client_version(&self) -> &str {
        self.client
            .version
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_VERSION)
    }

    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.server.endpoint
            && endpoint.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "server.endpoint".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        for (field, value) in [
            ("server.timeout_secs", self.server.timeout_secs),
            ("server.stream_timeout_secs", self.server.stream_timeout_secs),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LookbookConfig::new();
        assert_eq!(config.endpoint(), "http://localhost:8000/mcp");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.stream_timeout(), Duration::from_secs(300));
        assert_eq!(config.client_name(), "fashion-web");
        assert_eq!(config.client_version(), "1.0.0");
    }

    #[test]
    fn test_parse_full() {
        let config = LookbookConfig::from_toml(
            r#"
            [server]
            endpoint = "https://recs.example.com/mcp"
            timeout_secs = 10
            stream_timeout_secs = 60

            [client]
            name = "lookbook-cli"
            version = "2.0.0"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint(), "https://recs.example.com/mcp");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.stream_timeout(), Duration::from_secs(60));
        assert_eq!(config.client_name(), "lookbook-cli");
        assert_eq!(config.client_version(), "2.0.0");
    }

    #[test]
    fn test_parse_empty() {
        let config = LookbookConfig::from_toml("").unwrap();
        assert_eq!(config, LookbookConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = LookbookConfig::from_toml("[server]\nendpont = \"x\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = LookbookConfig::from_toml("[server]\ntimeout_secs = 0\n");
        match result {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "server.timeout_secs"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_endpoint_rejected() {
        let result = LookbookConfig::from_toml("[server]\nendpoint = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_merge_is_field_wise() {
        let mut base = LookbookConfig::from_toml(
            "[server]\nendpoint = \"http://a/mcp\"\ntimeout_secs = 5\n[client]\nname = \"a\"\n",
        )
        .unwrap();
        let overlay = LookbookConfig::from_toml("[server]\ntimeout_secs = 9\n").unwrap();

        base.merge(overlay);

        assert_eq!(base.endpoint(), "http://a/mcp");
        assert_eq!(base.timeout(), Duration::from_secs(9));
        assert_eq!(base.client_name(), "a");
    }

    #[test]
    fn test_with_endpoint_overrides() {
        let config = LookbookConfig::from_toml("[server]\nendpoint = \"http://a/mcp\"\n")
            .unwrap()
            .with_endpoint("http://b/mcp");
        assert_eq!(config.endpoint(), "http://b/mcp");
    }
}
