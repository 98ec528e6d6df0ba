//! Server implementation.
//!
//! An authoritative arena server:
//! - one task accepting TCP connections,
//! - one task per connected client (see `session`),
//! - one fixed-timestep simulation task (see `simulation`).
//!
//! The world is the only state shared between them.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use arena_shared::{config::ArenaConfig, config::MovementModel, world::World};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{registry::SessionRegistry, session, simulation::Simulation};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Shared handles given to every session and to the simulation loop.
#[derive(Clone)]
pub struct ArenaHandle {
    pub world: Arc<World>,
    pub sessions: Arc<SessionRegistry>,
    pub movement: MovementModel,
    pub outbound_queue: usize,
}

impl ArenaHandle {
    pub fn new(cfg: &ArenaConfig) -> Self {
        Self::with_world(cfg, World::new(cfg.bounds))
    }

    pub fn with_world(cfg: &ArenaConfig, world: World) -> Self {
        Self {
            world: Arc::new(world),
            sessions: Arc::new(SessionRegistry::new()),
            movement: cfg.movement,
            outbound_queue: cfg.outbound_queue,
        }
    }
}

/// Game server.
pub struct GameServer {
    pub cfg: ArenaConfig,
    arena: ArenaHandle,
    listener: TcpListener,
}

impl GameServer {
    /// Validates `cfg` and binds the listen socket. Failing here is fatal to
    /// the process.
    pub async fn bind(cfg: ArenaConfig) -> anyhow::Result<Self> {
        let arena = ArenaHandle::new(&cfg);
        Self::bind_with(cfg, arena).await
    }

    pub async fn bind_with(cfg: ArenaConfig, arena: ArenaHandle) -> anyhow::Result<Self> {
        cfg.validate().context("invalid configuration")?;
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self {
            cfg,
            arena,
            listener,
        })
    }

    /// Returns the local address (after binding).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn arena(&self) -> &ArenaHandle {
        &self.arena
    }

    /// A simulation loop over this server's world, not yet started.
    pub fn simulation(&self) -> Simulation {
        Simulation::new(self.arena.clone(), self.cfg.tick_interval())
    }

    /// Accepts one connection and hands it to its own session task.
    pub async fn accept_one(&self) -> anyhow::Result<JoinHandle<()>> {
        let (stream, peer) = self.listener.accept().await.context("tcp accept")?;
        Ok(self.spawn_session(stream, peer))
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) -> JoinHandle<()> {
        let arena = self.arena.clone();
        tokio::spawn(async move {
            match session::serve(stream, peer, arena).await {
                Ok(()) => debug!(%peer, "Connection closed"),
                Err(e) => {
                    let reason = format!("{e:#}");
                    info!(%peer, error = %reason, "Connection ended with error");
                }
            }
        })
    }

    /// Starts the simulation and accepts clients until the simulation fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut simulation = tokio::spawn(self.simulation().run());
        loop {
            tokio::select! {
                accepted = self.accept_one() => {
                    if let Err(e) = accepted {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
                res = &mut simulation => {
                    return res.context("simulation task")?;
                }
            }
        }
    }

    /// Spawns [`GameServer::run`] in the background.
    pub fn spawn(self) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(self.run())
    }
}

/// Helper for tests: bind to an ephemeral port.
pub async fn bind_ephemeral(tick_hz: u32) -> anyhow::Result<(GameServer, ArenaConfig)> {
    let cfg = ArenaConfig {
        server_addr: format!("{}:{}", IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        tick_hz,
        ..Default::default()
    };
    bind_ephemeral_with(cfg).await
}

/// Like [`bind_ephemeral`], keeping the rest of `cfg`.
pub async fn bind_ephemeral_with(mut cfg: ArenaConfig) -> anyhow::Result<(GameServer, ArenaConfig)> {
    cfg.server_addr = format!("{}:{}", IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let mut server = GameServer::bind(cfg).await?;
    server.cfg.server_addr = server.local_addr()?.to_string();
    let cfg = server.cfg.clone();
    Ok((server, cfg))
}
