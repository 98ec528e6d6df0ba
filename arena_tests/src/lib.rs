//! Helpers shared by the arena integration tests.

use std::time::Duration;

use arena_server::{server::bind_ephemeral_with, ArenaHandle};
use arena_shared::config::ArenaConfig;
use tokio::task::JoinHandle;

/// Upper bound for anything a test waits on over the network.
pub const WAIT: Duration = Duration::from_secs(3);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// A server running on an ephemeral localhost port.
pub struct TestServer {
    pub cfg: ArenaConfig,
    pub arena: ArenaHandle,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(cfg: ArenaConfig) -> anyhow::Result<Self> {
        let (server, cfg) = bind_ephemeral_with(cfg).await?;
        let arena = server.arena().clone();
        let handle = server.spawn();
        Ok(Self { cfg, arena, handle })
    }

    pub async fn start_default() -> anyhow::Result<Self> {
        Self::start(ArenaConfig::default()).await
    }

    pub fn addr(&self) -> &str {
        &self.cfg.server_addr
    }

    /// Polls until the world holds `n` characters.
    pub async fn wait_for_population(&self, n: usize) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if self.arena.world.len() == n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
