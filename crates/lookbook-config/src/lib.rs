//! Configuration system for the Lookbook recommendation client.
//!
//! Provides TOML-based configuration with:
//! - `[server]`: the MCP endpoint and request timeouts
//! - `[client]`: the identity announced during the initialize handshake
//! - Config file layering (XDG user config + project-local overrides)
//!
//! Every field has a default, so an empty or missing config file yields a
//! client that talks to `http://localhost:8000/mcp`.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
