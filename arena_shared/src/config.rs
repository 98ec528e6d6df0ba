//! Configuration system.
//!
//! Loads arena configuration from JSON strings (file IO left to the binaries).

use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::math::WorldBounds;

/// How move commands are applied to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementModel {
    /// Commands place the character at the (clamped) target immediately.
    #[default]
    Instant,
    /// Commands set a destination; the simulation loop walks characters
    /// toward it at class speed each tick.
    Interpolated,
}

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Server listen address (server) or address to dial (client).
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Fixed simulation tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    #[serde(default)]
    pub bounds: WorldBounds,
    #[serde(default)]
    pub movement: MovementModel,
    /// Frames buffered per session before broadcasts to it are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_hz() -> u32 {
    60
}

fn default_outbound_queue() -> usize {
    16
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            tick_hz: default_tick_hz(),
            bounds: WorldBounds::default(),
            movement: MovementModel::default(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl ArenaConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let WorldBounds { width, height } = self.bounds;
        if !(width.is_finite() && width >= 0.0 && height.is_finite() && height >= 0.0) {
            bail!("bounds must be finite and non-negative, got {width} x {height}");
        }
        if self.tick_hz == 0 {
            bail!("tick_hz must be at least 1");
        }
        Ok(())
    }

    /// Duration of one simulation tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}
