//! World store.
//!
//! Characters live in an indexed arena: a slot vector, an id -> slot index
//! and a free list. The roster lock guards membership only; every
//! character's own mutex guards its state. Iteration follows slot order, so
//! a combat pass over a given roster history is reproducible.
//!
//! Lock order is roster -> character -> rng. No code path holds two
//! character locks at once.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Mutex, RwLock};
use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use crate::{
    character::{Character, CharacterClass, CharacterId, HitOutcome},
    math::{Position, WorldBounds},
    net::WorldSnapshot,
};

#[derive(Default)]
struct Roster {
    slots: Vec<Option<Arc<Character>>>,
    index: HashMap<CharacterId, usize>,
    free: Vec<usize>,
}

impl Roster {
    fn insert(&mut self, character: Arc<Character>) {
        if let Some(&slot) = self.index.get(character.id()) {
            self.slots[slot] = Some(character);
            return;
        }
        let id = character.id().to_string();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(character);
                slot
            }
            None => {
                self.slots.push(Some(character));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
    }

    fn remove(&mut self, id: &str) -> Option<Arc<Character>> {
        let slot = self.index.remove(id)?;
        self.free.push(slot);
        self.slots[slot].take()
    }

    fn get(&self, id: &str) -> Option<&Arc<Character>> {
        self.index
            .get(id)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<Character>> {
        self.slots.iter().flatten()
    }
}

/// Outcome of one combat pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Attacks that landed, lethal ones included.
    pub hits: usize,
    pub kills: usize,
}

/// The single arena owned by a server.
pub struct World {
    bounds: WorldBounds,
    roster: RwLock<Roster>,
    rng: Mutex<StdRng>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldBounds::default())
    }
}

impl World {
    pub fn new(bounds: WorldBounds) -> Self {
        Self::with_rng(bounds, StdRng::from_entropy())
    }

    /// World whose spawn positions are reproducible.
    pub fn with_seed(bounds: WorldBounds, seed: u64) -> Self {
        Self::with_rng(bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bounds: WorldBounds, rng: StdRng) -> Self {
        Self {
            bounds,
            roster: RwLock::new(Roster::default()),
            rng: Mutex::new(rng),
        }
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Registers a character. An existing entry with the same id is replaced.
    pub fn add_character(&self, character: Arc<Character>) {
        self.roster.write().insert(character);
    }

    /// Creates a character of `class` at a random spawn point and registers it.
    pub fn spawn_character(&self, id: impl Into<CharacterId>, class: CharacterClass) -> Arc<Character> {
        let character = Arc::new(Character::with_bounds(
            id,
            class,
            self.random_spawn_position(),
            self.bounds,
        ));
        self.add_character(Arc::clone(&character));
        character
    }

    pub fn remove_character(&self, id: &str) -> Option<Arc<Character>> {
        self.roster.write().remove(id)
    }

    pub fn get_character(&self, id: &str) -> Option<Arc<Character>> {
        self.roster.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.roster.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every character's observable state.
    ///
    /// Each entry is read under its own lock, so entries are individually
    /// consistent but not taken at one common instant.
    pub fn snapshot(&self) -> WorldSnapshot {
        let roster = self.roster.read();
        let characters = roster
            .iter()
            .map(|c| (c.id().to_string(), c.view()))
            .collect();
        WorldSnapshot { characters }
    }

    pub fn random_spawn_position(&self) -> Position {
        self.bounds.random_position(&mut *self.rng.lock())
    }

    /// Every registered character attacks every other one in range.
    ///
    /// Pairs are visited attacker-major in slot order. A lethal hit respawns
    /// the target immediately, so later attackers in the same pass see its
    /// new position and full health. Cost is quadratic in population.
    pub fn resolve_combat(&self) -> CombatReport {
        let roster = self.roster.read();
        let now = Instant::now();
        let mut report = CombatReport::default();

        for attacker in roster.iter() {
            let stats = attacker.stats();
            let origin = attacker.position();
            let mut landed = false;

            for target in roster.iter() {
                if Arc::ptr_eq(attacker, target) {
                    continue;
                }
                let outcome = target.receive_attack(
                    origin,
                    stats.attack_range,
                    stats.attack_power,
                    || self.random_spawn_position(),
                );
                match outcome {
                    HitOutcome::OutOfRange => {}
                    HitOutcome::Hit => {
                        report.hits += 1;
                        landed = true;
                    }
                    HitOutcome::Killed => {
                        report.hits += 1;
                        report.kills += 1;
                        landed = true;
                        debug!(
                            attacker = %attacker.id(),
                            target = %target.id(),
                            "Character killed and respawned"
                        );
                    }
                }
            }

            if landed {
                attacker.record_attack(now);
            }
        }
        report
    }

    /// Walks characters toward their move targets.
    pub fn advance_movement(&self, elapsed: Duration) {
        for character in self.roster.read().iter() {
            character.advance(elapsed);
        }
    }
}
