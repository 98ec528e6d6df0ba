//! Standalone headless client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--server 127.0.0.1:8080]
//!
//! The client connects to the server, logs received snapshots, and sends
//! move commands typed on stdin.
//!
//! Console commands:
//!   move <x> <y>                 - Move to absolute world coordinates
//!   follow <id>                  - Pick the character `walk` nudges
//!   walk <left|right|up|down>    - Nudge the followed character
//!   list                         - Show characters in the last snapshot
//!   status                       - Show client status
//!   quit                         - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use arena_client::client::{ClientState, GameClient};
use arena_shared::config::ArenaConfig;
use tokio::sync::mpsc;
use tracing::info;

/// Snapshots between progress log lines (one second at the default rate).
const LOG_EVERY: u64 = 60;

fn parse_args() -> ArenaConfig {
    let mut cfg = ArenaConfig {
        server_addr: "127.0.0.1:8080".to_string(),
        ..Default::default()
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" | "-server" | "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    info!(server = %cfg.server_addr, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'move <x> <y>', 'list', 'status' or 'quit'.");
    println!();

    loop {
        // Process console commands.
        while let Ok(line) = console_rx.try_recv() {
            match client.exec_console(&line).await {
                Ok(output) => {
                    for line in output {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    println!("Error: {:#}", e);
                }
            }
        }

        if client.recv_snapshot(Duration::from_millis(20)).await? {
            let received = client.snapshots_received();
            if received % LOG_EVERY == 1 {
                if let Some(snap) = client.latest() {
                    info!(received, characters = snap.len(), "Snapshot");
                }
            }
        }

        if client.state == ClientState::Disconnected {
            println!("Disconnected from server.");
            break;
        }
    }

    Ok(())
}
