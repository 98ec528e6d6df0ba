//! Client implementation.
//!
//! The client maintains:
//! - One TCP stream to the server (commands out, snapshots in)
//! - Snapshot history for interpolation
//! - Optionally a followed character for keyboard-style movement

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use arena_shared::{
    character::CharacterId,
    config::ArenaConfig,
    math::{Position, WorldBounds},
    net::{decode_snapshot, ClientCommand, FrameReader, FrameWriter, WorldSnapshot},
};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};
use tracing::{debug, info, warn};

use crate::{
    input::{build_command, InputState},
    interp::SnapshotBuffer,
};

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    /// The server closed the stream or it failed.
    Disconnected,
}

/// High-level game client.
pub struct GameClient {
    pub state: ClientState,
    pub snaps: SnapshotBuffer,
    /// Character nudged by `walk` commands. The protocol does not tell a
    /// client which character is its own, so the user picks one.
    pub follow: Option<CharacterId>,

    bounds: WorldBounds,
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    server: SocketAddr,
    received: u64,
}

impl GameClient {
    /// Connects to a server.
    pub async fn connect(cfg: &ArenaConfig) -> anyhow::Result<Self> {
        info!(server = %cfg.server_addr, "Connecting to server");
        let stream = TcpStream::connect(cfg.server_addr.as_str())
            .await
            .context("tcp connect")?;
        stream.set_nodelay(true).context("set nodelay")?;
        let server = stream.peer_addr().context("peer addr")?;
        let (read_half, write_half) = stream.into_split();

        info!(%server, "Connected to server");
        Ok(Self {
            state: ClientState::Connected,
            snaps: SnapshotBuffer::new(32),
            follow: None,
            bounds: cfg.bounds,
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            server,
            received: 0,
        })
    }

    pub async fn send(&mut self, cmd: &ClientCommand) -> anyhow::Result<()> {
        self.writer.send(cmd).await
    }

    pub async fn send_move(&mut self, target: Position) -> anyhow::Result<()> {
        self.send(&ClientCommand::move_to(target)).await
    }

    /// Sends whatever move `input` implies. Returns the command sent.
    pub async fn apply_input(&mut self, input: InputState) -> anyhow::Result<Option<ClientCommand>> {
        let current = self
            .follow
            .as_deref()
            .and_then(|id| self.snaps.last_snapshot()?.get(id))
            .map(|view| view.position);
        let Some(cmd) = build_command(input, current, self.bounds) else {
            return Ok(None);
        };
        self.send(&cmd).await?;
        Ok(Some(cmd))
    }

    /// Waits up to `timeout` for the next snapshot and buffers it.
    ///
    /// Returns whether one arrived. End of stream or a read error marks the
    /// client disconnected; an undecodable line is skipped.
    pub async fn recv_snapshot(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        let line = match tokio::time::timeout(timeout, self.reader.next_line()).await {
            Err(_) => return Ok(false),
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                info!("Server closed the connection");
                self.state = ClientState::Disconnected;
                return Ok(false);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Connection error");
                self.state = ClientState::Disconnected;
                return Ok(false);
            }
        };

        match decode_snapshot(&line) {
            Ok(snap) => {
                self.snaps.push(snap);
                self.received += 1;
                Ok(true)
            }
            Err(e) => {
                debug!(error = %e, "Skipping undecodable frame");
                Ok(false)
            }
        }
    }

    /// Receives snapshots until one satisfies `pred` or `timeout` elapses.
    pub async fn wait_for<F>(&mut self, timeout: Duration, pred: F) -> anyhow::Result<Option<WorldSnapshot>>
    where
        F: Fn(&WorldSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline || self.state == ClientState::Disconnected {
                return Ok(None);
            }
            if self.recv_snapshot(deadline - now).await? {
                if let Some(snap) = self.snaps.last_snapshot().filter(|s| pred(*s)) {
                    return Ok(Some(snap.clone()));
                }
            }
        }
    }

    pub fn latest(&self) -> Option<&WorldSnapshot> {
        self.snaps.last_snapshot()
    }

    /// Total snapshots received since connecting.
    pub fn snapshots_received(&self) -> u64 {
        self.received
    }

    /// Executes a console command.
    pub async fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match tokens[0] {
            "move" => {
                let (Some(x), Some(y)) = (tokens.get(1), tokens.get(2)) else {
                    return Ok(vec!["Usage: move <x> <y>".to_string()]);
                };
                let target = Position::new(
                    x.parse().context("parse x")?,
                    y.parse().context("parse y")?,
                );
                let cmd = build_command(
                    InputState {
                        click: Some(target),
                        ..Default::default()
                    },
                    None,
                    self.bounds,
                );
                if let Some(cmd) = cmd {
                    self.send(&cmd).await?;
                }
                Ok(vec![format!("Moving to ({}, {})", target.x, target.y)])
            }
            "follow" => match tokens.get(1) {
                Some(id) => {
                    self.follow = Some(id.to_string());
                    Ok(vec![format!("Following {id}")])
                }
                None => Ok(vec!["Usage: follow <character-id>".to_string()]),
            },
            "walk" => {
                let mut input = InputState::default();
                match tokens.get(1).copied() {
                    Some("left") => input.left = true,
                    Some("right") => input.right = true,
                    Some("up") => input.up = true,
                    Some("down") => input.down = true,
                    _ => return Ok(vec!["Usage: walk <left|right|up|down>".to_string()]),
                }
                match self.apply_input(input).await? {
                    Some(_) => Ok(Vec::new()),
                    None => Ok(vec!["Nothing to walk: use 'follow <id>' first".to_string()]),
                }
            }
            "status" => {
                let mut out = Vec::new();
                out.push(format!("State: {:?}", self.state));
                out.push(format!("Server: {}", self.server));
                out.push(format!("Snapshots received: {}", self.received));
                if let Some(id) = &self.follow {
                    out.push(format!("Following: {id}"));
                }
                Ok(out)
            }
            "list" => {
                let Some(snap) = self.snaps.last_snapshot() else {
                    return Ok(vec!["No snapshot yet".to_string()]);
                };
                Ok(snap
                    .characters
                    .values()
                    .map(|c| {
                        format!(
                            "{} {:?} ({:.1}, {:.1}) {}/{}",
                            c.id, c.class, c.position.x, c.position.y, c.health, c.max_health
                        )
                    })
                    .collect())
            }
            "quit" | "exit" => {
                std::process::exit(0);
            }
            other => Ok(vec![format!("Unknown command: {other}")]),
        }
    }

    /// Returns the server's address.
    pub fn server_peer(&self) -> SocketAddr {
        self.server
    }
}
