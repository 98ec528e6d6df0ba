//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p arena_server -- [--port 8080] [--addr 0.0.0.0:8080]
//!                                [--tick-hz 60] [--movement instant|interpolated]
//!                                [--config arena.json]
//!
//! The server listens for client connections, runs a fixed timestep combat
//! simulation, and broadcasts snapshots to connected clients.

use std::env;

use anyhow::{bail, Context};
use arena_server::GameServer;
use arena_shared::config::{ArenaConfig, MovementModel};
use tracing::info;

fn parse_args() -> anyhow::Result<ArenaConfig> {
    let args: Vec<String> = env::args().collect();

    // A config file provides the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = &args[i + 1];
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {path}"))?;
            ArenaConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))?
        }
        _ => ArenaConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-port" if i + 1 < args.len() => {
                let port: u16 = args[i + 1].parse().context("parse --port")?;
                cfg.server_addr = format!("0.0.0.0:{port}");
                i += 2;
            }
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().context("parse --tick-hz")?;
                i += 2;
            }
            "--movement" if i + 1 < args.len() => {
                cfg.movement = match args[i + 1].as_str() {
                    "instant" => MovementModel::Instant,
                    "interpolated" => MovementModel::Interpolated,
                    other => bail!("unknown movement model {other:?}"),
                };
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        addr = %cfg.server_addr,
        tick_hz = cfg.tick_hz,
        movement = ?cfg.movement,
        width = cfg.bounds.width,
        height = cfg.bounds.height,
        "Starting server"
    );

    let server = GameServer::bind(cfg).await.context("create server")?;
    let local = server.local_addr()?;
    info!(%local, "Game server listening");

    server.run().await
}
