//! Character entities.
//!
//! A `Character` is shared between the session that owns it and the
//! simulation loop. Identity and class are fixed at construction; position,
//! health and movement state live behind a single mutex so that a combat pass
//! reading position never observes a half-applied move or respawn.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    math::{Position, WorldBounds},
    net::CharacterView,
};

/// Stable character identity (a UUID string on the server).
pub type CharacterId = String;

/// Remaining distance under which interpolated movement stops.
pub const MOVE_EPSILON: f64 = 0.1;

/// Fixed stat template for a class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Archetype {
    pub max_health: f64,
    pub attack_power: f64,
    /// Units per second.
    pub movement_speed: f64,
    pub attack_range: f64,
}

/// Playable classes. Encoded on the wire as `0` (Warrior) and `1` (Mage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CharacterClass {
    Warrior,
    Mage,
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 2] = [CharacterClass::Warrior, CharacterClass::Mage];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub const fn archetype(self) -> Archetype {
        match self {
            CharacterClass::Warrior => Archetype {
                max_health: 150.0,
                attack_power: 30.0,
                movement_speed: 3.0,
                attack_range: 50.0,
            },
            CharacterClass::Mage => Archetype {
                max_health: 100.0,
                attack_power: 40.0,
                movement_speed: 2.5,
                attack_range: 200.0,
            },
        }
    }
}

impl From<CharacterClass> for u8 {
    fn from(class: CharacterClass) -> Self {
        match class {
            CharacterClass::Warrior => 0,
            CharacterClass::Mage => 1,
        }
    }
}

impl TryFrom<u8> for CharacterClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CharacterClass::Warrior),
            1 => Ok(CharacterClass::Mage),
            other => Err(format!("unknown character class {other}")),
        }
    }
}

/// Result of one attacker/target pairing in a combat pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    OutOfRange,
    Hit,
    /// The hit was lethal and the target has already respawned.
    Killed,
}

#[derive(Debug)]
struct CharacterState {
    position: Position,
    health: f64,
    last_attack: Option<Instant>,
    move_target: Option<Position>,
}

/// A player character.
#[derive(Debug)]
pub struct Character {
    id: CharacterId,
    class: CharacterClass,
    stats: Archetype,
    bounds: WorldBounds,
    state: Mutex<CharacterState>,
}

impl Character {
    /// Creates a character at full health. `id` must already be unique.
    pub fn new(id: impl Into<CharacterId>, class: CharacterClass, spawn: Position) -> Self {
        Self::with_bounds(id, class, spawn, WorldBounds::default())
    }

    pub fn with_bounds(
        id: impl Into<CharacterId>,
        class: CharacterClass,
        spawn: Position,
        bounds: WorldBounds,
    ) -> Self {
        let stats = class.archetype();
        Self {
            id: id.into(),
            class,
            stats,
            bounds,
            state: Mutex::new(CharacterState {
                position: bounds.clamp(spawn),
                health: stats.max_health,
                last_attack: None,
                move_target: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> CharacterClass {
        self.class
    }

    pub fn stats(&self) -> Archetype {
        self.stats
    }

    pub fn max_health(&self) -> f64 {
        self.stats.max_health
    }

    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    pub fn health(&self) -> f64 {
        self.state.lock().health
    }

    pub fn last_attack(&self) -> Option<Instant> {
        self.state.lock().last_attack
    }

    /// Instantly places the character, clamped to the arena.
    pub fn set_position(&self, pos: Position) {
        let pos = self.bounds.clamp(pos);
        self.state.lock().position = pos;
        trace!(character_id = %self.id, x = pos.x, y = pos.y, "Position set");
    }

    /// Applies damage. Returns `true` only for the hit that takes health
    /// from above zero to zero.
    pub fn take_damage(&self, amount: f64) -> bool {
        let mut state = self.state.lock();
        self.apply_damage(&mut state, amount)
    }

    /// Range check, damage and respawn as one transition under this
    /// character's lock. `respawn_at` is only called on a kill.
    pub fn receive_attack(
        &self,
        from: Position,
        range: f64,
        damage: f64,
        respawn_at: impl FnOnce() -> Position,
    ) -> HitOutcome {
        let mut state = self.state.lock();
        if from.distance(state.position) > range {
            return HitOutcome::OutOfRange;
        }
        if !self.apply_damage(&mut state, damage) {
            return HitOutcome::Hit;
        }
        self.restore(&mut state, respawn_at());
        HitOutcome::Killed
    }

    fn apply_damage(&self, state: &mut CharacterState, amount: f64) -> bool {
        if state.health <= 0.0 {
            return false;
        }
        state.health = (state.health - amount).clamp(0.0, self.stats.max_health);
        state.health == 0.0
    }

    /// Restores full health at `pos` and forgets any pending move target.
    pub fn respawn(&self, pos: Position) {
        let mut state = self.state.lock();
        self.restore(&mut state, pos);
    }

    fn restore(&self, state: &mut CharacterState, pos: Position) {
        state.position = self.bounds.clamp(pos);
        state.health = self.stats.max_health;
        state.move_target = None;
    }

    pub fn record_attack(&self, at: Instant) {
        self.state.lock().last_attack = Some(at);
    }

    /// Moves toward `target` at class speed for `elapsed`, without
    /// overshooting. A no-op once within `MOVE_EPSILON`.
    pub fn update_position(&self, target: Position, elapsed: Duration) {
        let target = self.bounds.clamp(target);
        let mut state = self.state.lock();
        self.approach(&mut state, target, elapsed);
    }

    /// Sets the destination used by [`Character::advance`].
    pub fn set_move_target(&self, target: Position) {
        self.state.lock().move_target = Some(self.bounds.clamp(target));
    }

    pub fn move_target(&self) -> Option<Position> {
        self.state.lock().move_target
    }

    /// Advances toward the stored move target, clearing it on arrival.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        let Some(target) = state.move_target else {
            return;
        };
        if self.approach(&mut state, target, elapsed) {
            state.move_target = None;
        }
    }

    /// Returns whether the character ended within `MOVE_EPSILON` of `target`.
    fn approach(&self, state: &mut CharacterState, target: Position, elapsed: Duration) -> bool {
        if state.position.distance(target) < MOVE_EPSILON {
            return true;
        }
        let max_step = self.stats.movement_speed * elapsed.as_secs_f64();
        state.position = self.bounds.clamp(state.position.step_toward(target, max_step));
        state.position.distance(target) < MOVE_EPSILON
    }

    /// Copies observable state under one lock acquisition.
    pub fn view(&self) -> CharacterView {
        let state = self.state.lock();
        CharacterView {
            id: self.id.clone(),
            class: self.class,
            position: state.position,
            health: state.health,
            max_health: self.stats.max_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_character_has_archetype_stats() {
        let w = Character::new("w", CharacterClass::Warrior, Position::new(10.0, 10.0));
        assert_eq!(w.health(), 150.0);
        assert_eq!(w.stats().attack_power, 30.0);
        assert_eq!(w.stats().attack_range, 50.0);

        let m = Character::new("m", CharacterClass::Mage, Position::new(10.0, 10.0));
        assert_eq!(m.health(), 100.0);
        assert_eq!(m.stats().movement_speed, 2.5);
        assert_eq!(m.stats().attack_range, 200.0);
    }

    #[test]
    fn set_position_clamps() {
        let c = Character::new("c", CharacterClass::Warrior, Position::ORIGIN);
        c.set_position(Position::new(900.0, 700.0));
        assert_eq!(c.position(), Position::new(800.0, 600.0));
        c.set_position(Position::new(-3.0, 42.0));
        assert_eq!(c.position(), Position::new(0.0, 42.0));
    }

    #[test]
    fn take_damage_floors_at_zero_and_reports_death_once() {
        let c = Character::new("c", CharacterClass::Mage, Position::ORIGIN);
        assert!(!c.take_damage(40.0));
        assert_eq!(c.health(), 60.0);
        assert!(c.take_damage(500.0));
        assert_eq!(c.health(), 0.0);
        assert!(!c.take_damage(10.0));
        assert_eq!(c.health(), 0.0);
    }

    #[test]
    fn respawn_restores_full_health_in_bounds() {
        let c = Character::new("c", CharacterClass::Warrior, Position::ORIGIN);
        c.set_move_target(Position::new(100.0, 100.0));
        assert!(c.take_damage(150.0));
        c.respawn(Position::new(1000.0, 20.0));
        assert_eq!(c.health(), 150.0);
        assert_eq!(c.position(), Position::new(800.0, 20.0));
        assert_eq!(c.move_target(), None);
    }

    #[test]
    fn receive_attack_respawns_on_kill() {
        let c = Character::new("c", CharacterClass::Mage, Position::new(10.0, 0.0));
        let far = Position::new(500.0, 0.0);

        let out = c.receive_attack(far, 50.0, 40.0, || unreachable!());
        assert_eq!(out, HitOutcome::OutOfRange);
        assert_eq!(c.health(), 100.0);

        let out = c.receive_attack(Position::ORIGIN, 50.0, 40.0, || unreachable!());
        assert_eq!(out, HitOutcome::Hit);
        assert_eq!(c.health(), 60.0);

        let out = c.receive_attack(Position::ORIGIN, 50.0, 80.0, || Position::new(300.0, 200.0));
        assert_eq!(out, HitOutcome::Killed);
        assert_eq!(c.health(), 100.0);
        assert_eq!(c.position(), Position::new(300.0, 200.0));
    }

    #[test]
    fn update_position_is_speed_limited() {
        let c = Character::new("c", CharacterClass::Warrior, Position::ORIGIN);
        c.update_position(Position::new(100.0, 0.0), Duration::from_secs(2));
        assert!((c.position().x - 6.0).abs() < 1e-9);

        c.update_position(Position::new(7.0, 0.0), Duration::from_secs(10));
        assert_eq!(c.position(), Position::new(7.0, 0.0));
    }

    #[test]
    fn update_position_ignores_targets_within_epsilon() {
        let c = Character::new("c", CharacterClass::Mage, Position::new(5.0, 5.0));
        c.update_position(Position::new(5.05, 5.0), Duration::from_secs(1));
        assert_eq!(c.position(), Position::new(5.0, 5.0));
    }

    #[test]
    fn advance_clears_target_on_arrival() {
        let c = Character::new("c", CharacterClass::Mage, Position::ORIGIN);
        c.set_move_target(Position::new(5.0, 0.0));
        c.advance(Duration::from_secs(1));
        assert!((c.position().x - 2.5).abs() < 1e-9);
        assert!(c.move_target().is_some());
        c.advance(Duration::from_secs(1));
        assert_eq!(c.position(), Position::new(5.0, 0.0));
        assert_eq!(c.move_target(), None);
    }

    #[test]
    fn class_wire_encoding() {
        assert_eq!(serde_json::to_string(&CharacterClass::Warrior).unwrap(), "0");
        assert_eq!(serde_json::to_string(&CharacterClass::Mage).unwrap(), "1");
        assert!(serde_json::from_str::<CharacterClass>("2").is_err());
    }
}
