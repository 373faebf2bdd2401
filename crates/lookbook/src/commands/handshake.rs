//! Handshake command - open a session without calling the tool.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the handshake command.
#[derive(Args, Debug)]
pub struct HandshakeArgs {}

/// Handshake result for JSON output.
#[derive(Debug, Serialize)]
struct HandshakeOutput<'a> {
    endpoint: &'a str,
    session_id: &'a str,
    protocol_version: Option<&'a str>,
    server_name: Option<&'a str>,
    server_version: Option<&'a str>,
}

/// Run the handshake command.
pub async fn run(_args: HandshakeArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let session = client.negotiate().await?;

    if ctx.json_output {
        let output = HandshakeOutput {
            endpoint: client.endpoint().as_str(),
            session_id: session.id(),
            protocol_version: session.protocol_version(),
            server_name: session.server_info().map(|s| s.name.as_str()),
            server_version: session.server_info().map(|s| s.version.as_str()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !ctx.verbose {
        println!("{}", session.id());
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("MCP Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Endpoint:"), client.endpoint());
    println!("  {} {}", dim.apply_to("Session:"), session.id());
    if let Some(version) = session.protocol_version() {
        println!("  {} {}", dim.apply_to("Protocol:"), version);
    }
    if let Some(server) = session.server_info() {
        println!(
            "  {} {} {}",
            dim.apply_to("Server:"),
            server.name,
            server.version
        );
    }
    println!();

    Ok(())
}
