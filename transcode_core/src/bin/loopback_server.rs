//! Standalone loopback transcode server
//!
//! Run with: cargo run --bin loopback_server [port]
//!
//! Accepts uploads on ws://0.0.0.0:<port>/ws, replies with a "queued" status
//! and sends the uploaded video straight back. Point the client at it with
//! TRANSCODE_ENDPOINT=ws://127.0.0.1:<port>/ws.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use transcode_core::loopback::{LOOPBACK_PORT, LoopbackOptions, start_loopback_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let port = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u16>().context("Port must be a number")?,
        None => LOOPBACK_PORT,
    };
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    println!("Loopback transcode server on ws://{}/ws", addr);
    println!("Uploads are acknowledged and echoed back unchanged.");

    start_loopback_server(addr, LoopbackOptions::default())
        .await
        .context("Loopback server failed")
}
