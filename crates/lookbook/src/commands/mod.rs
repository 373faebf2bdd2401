//! CLI command handlers.

pub mod handshake;
pub mod recommend;

use anyhow::Result;
use lookbook_config::LookbookConfig;
use lookbook_mcp::McpClient;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration, CLI overrides applied.
    pub config: LookbookConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Build a client for the configured endpoint.
    pub fn client(&self) -> Result<McpClient> {
        let client = McpClient::builder()
            .endpoint(self.config.endpoint())
            .timeout(self.config.timeout())
            .stream_timeout(self.config.stream_timeout())
            .client_info(self.config.client_name(), self.config.client_version())
            .build()?;
        Ok(client)
    }
}
