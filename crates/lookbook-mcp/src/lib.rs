//! MCP driver for the fashion recommendation tool.
//!
//! This crate turns a photo into a ranked list of fashion items by talking
//! to a remote MCP server over the streamable-HTTP transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RecommendationDriver                                       │
//! │  - Idle → Negotiating → Invoking → Interpreting → Ready     │
//! │  - Owns the view state (image, results, error)              │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - initialize → mcp-session-id                              │
//! │  - tools/call fashion_recommendation_tool                   │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  interpreter                                                │
//! │  - application/json → one document                          │
//! │  - text/event-stream → last list-bearing fragment wins      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use lookbook_mcp::{McpClient, RecommendationDriver, UploadedImage};
//!
//! # async fn example() -> lookbook_mcp::Result<()> {
//! let client = McpClient::builder()
//!     .endpoint("http://localhost:8000/mcp")
//!     .build()?;
//!
//! let mut driver = RecommendationDriver::new(client);
//! driver.select_image(UploadedImage::from_path("outfit.jpg").await?);
//!
//! for item in driver.submit().await? {
//!     println!("{} {}", item.display_title(), item.display_price());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Wire protocol
//!
//! Both requests are JSON-RPC 2.0 POSTs to the same endpoint, each with
//! `Accept: application/json, text/event-stream`:
//!
//! 1. `initialize`: the reply's `mcp-session-id` header opens the session
//! 2. `tools/call`: carries `mcp-session-id` and the base64 image

pub mod client;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod interpreter;
pub mod protocol;
pub mod recommendation;
pub mod session;

// Re-export main types
pub use client::{ClientBuilder, DEFAULT_ENDPOINT, McpClient};
pub use driver::{DriverState, RecommendationDriver, ViewState};
pub use encoder::UploadedImage;
pub use error::{McpError, Result};
pub use interpreter::{ResponseMode, extract_document, interpret, interpret_document, interpret_stream};
pub use protocol::{ACCEPT_BOTH, ClientInfo, RECOMMENDATION_TOOL, SESSION_HEADER, ServerInfo};
pub use recommendation::RecommendationItem;
pub use session::Session;
