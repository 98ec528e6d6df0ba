//! Fixed-timestep simulation loop.
//!
//! Each tick advances interpolated movement (when enabled), resolves combat,
//! and broadcasts one full snapshot to every live session. The loop runs in
//! its own task and only meets the sessions through the world and registry
//! locks.

use std::time::Duration;

use anyhow::Context;
use arena_shared::{config::MovementModel, net::encode_line, world::CombatReport};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{registry::BroadcastReport, server::ArenaHandle};

/// Seconds between heartbeat log lines.
const HEARTBEAT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub combat: CombatReport,
    pub broadcast: BroadcastReport,
}

pub struct Simulation {
    arena: ArenaHandle,
    tick_interval: Duration,
    tick: u64,
    state: LoopState,
}

impl Simulation {
    pub fn new(arena: ArenaHandle, tick_interval: Duration) -> Self {
        Self {
            arena,
            tick_interval,
            tick: 0,
            state: LoopState::Stopped,
        }
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Executes one fixed simulation step.
    pub fn step(&mut self) -> anyhow::Result<TickReport> {
        let world = &self.arena.world;
        if self.arena.movement == MovementModel::Interpolated {
            world.advance_movement(self.tick_interval);
        }
        let combat = world.resolve_combat();
        let frame = encode_line(&world.snapshot()).context("encode snapshot")?;
        let broadcast = self.arena.sessions.broadcast(&frame);

        self.tick += 1;
        Ok(TickReport {
            tick: self.tick,
            combat,
            broadcast,
        })
    }

    /// Runs forever at the configured rate.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.state = LoopState::Running;
        let hz = tick_rate(self.tick_interval);
        info!(tick_hz = hz, "Simulation running");

        let heartbeat_every = heartbeat_ticks(self.tick_interval);
        let mut next_tick = Instant::now();

        loop {
            let report = self.step()?;
            if report.combat.kills > 0 || report.broadcast.dropped > 0 {
                debug!(
                    tick = report.tick,
                    hits = report.combat.hits,
                    kills = report.combat.kills,
                    dropped = report.broadcast.dropped,
                    "Tick"
                );
            }
            if report.tick % heartbeat_every == 0 {
                info!(
                    tick = report.tick,
                    characters = self.arena.world.len(),
                    sessions = self.arena.sessions.len(),
                    "Simulation heartbeat"
                );
            }

            next_tick += self.tick_interval;
            let now = Instant::now();
            if next_tick < now {
                debug!(tick = report.tick, behind = ?(now - next_tick), "Tick overran, skipping ahead");
                next_tick = now;
            }
            tokio::time::sleep_until(next_tick).await;
        }
    }
}

/// Ticks per second, rounded. A zero interval saturates to `u64::MAX`.
fn tick_rate(interval: Duration) -> u64 {
    (1.0 / interval.as_secs_f64()).round() as u64
}

/// Ticks between heartbeat lines; never zero.
fn heartbeat_ticks(interval: Duration) -> u64 {
    tick_rate(interval).saturating_mul(HEARTBEAT_SECS).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arena_shared::{
        character::{Character, CharacterClass},
        config::ArenaConfig,
        math::Position,
        net::decode_snapshot,
    };
    use tokio::sync::mpsc;

    #[test]
    fn step_resolves_combat_and_broadcasts_snapshot() {
        let arena = ArenaHandle::new(&ArenaConfig::default());
        let a = Arc::new(Character::new("a", CharacterClass::Warrior, Position::new(0.0, 0.0)));
        let b = Arc::new(Character::new("b", CharacterClass::Mage, Position::new(40.0, 0.0)));
        arena.world.add_character(Arc::clone(&a));
        arena.world.add_character(Arc::clone(&b));

        let (tx, mut rx) = mpsc::channel(4);
        arena.sessions.register("a".into(), tx);

        let mut sim = Simulation::new(arena, Duration::from_millis(16));
        assert_eq!(sim.state(), LoopState::Stopped);
        let report = sim.step().unwrap();

        assert_eq!(report.tick, 1);
        assert_eq!(report.combat.hits, 2);
        assert_eq!(report.broadcast.delivered, 1);

        let frame = rx.try_recv().unwrap();
        let snap = decode_snapshot(std::str::from_utf8(&frame).unwrap()).unwrap();
        assert_eq!(snap.get("a").unwrap().health, 110.0);
        assert_eq!(snap.get("b").unwrap().health, 70.0);
    }

    #[test]
    fn heartbeat_interval_saturates_for_extreme_rates() {
        assert_eq!(heartbeat_ticks(Duration::ZERO), u64::MAX);
        assert_eq!(heartbeat_ticks(Duration::from_secs(1)), HEARTBEAT_SECS);
        assert_eq!(heartbeat_ticks(Duration::from_secs(3600)), 1);
    }

    #[test]
    fn interpolated_movement_advances_each_tick() {
        let arena = ArenaHandle::new(&ArenaConfig {
            movement: MovementModel::Interpolated,
            ..Default::default()
        });
        let c = Arc::new(Character::new("c", CharacterClass::Warrior, Position::ORIGIN));
        arena.world.add_character(Arc::clone(&c));
        c.set_move_target(Position::new(100.0, 0.0));

        let mut sim = Simulation::new(arena, Duration::from_millis(500));
        sim.step().unwrap();
        sim.step().unwrap();
        assert!((c.position().x - 3.0).abs() < 1e-9);
    }
}
