//! Interpolation.
//!
//! The server sends full snapshots at tick boundaries.
//! A front-end renders at its own rate and interpolates character positions.

use std::collections::VecDeque;

use arena_shared::{
    math::Position,
    net::{CharacterView, WorldSnapshot},
};

/// Buffered snapshot history for interpolation.
#[derive(Default)]
pub struct SnapshotBuffer {
    history: VecDeque<WorldSnapshot>,
    max: usize,
}

impl SnapshotBuffer {
    pub fn new(max: usize) -> Self {
        Self {
            history: VecDeque::new(),
            max: max.max(1),
        }
    }

    pub fn push(&mut self, snap: WorldSnapshot) {
        self.history.push_back(snap);
        while self.history.len() > self.max {
            self.history.pop_front();
        }
    }

    /// Returns the number of buffered snapshots.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if no snapshots are buffered.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Gets an interpolated position for a character given a fractional alpha.
    ///
    /// `alpha` should be in $[0,1]$ where 0 = older snapshot, 1 = newer.
    /// A character that respawned between the two snapshots (health went back
    /// up) snaps to its new position instead of sliding across the arena.
    pub fn interp_position(&self, id: &str, alpha: f64) -> Option<Position> {
        if self.history.len() < 2 {
            return None;
        }
        let a = self.history[self.history.len() - 2].get(id)?;
        let b = self.history[self.history.len() - 1].get(id)?;
        if b.health > a.health {
            return Some(b.position);
        }
        let t = alpha.clamp(0.0, 1.0);
        Some(Position::new(
            a.position.x + (b.position.x - a.position.x) * t,
            a.position.y + (b.position.y - a.position.y) * t,
        ))
    }

    pub fn last_snapshot(&self) -> Option<&WorldSnapshot> {
        self.history.back()
    }
}

/// Convenience: find a character in the newest snapshot.
pub fn find_character<'a>(buf: &'a SnapshotBuffer, id: &str) -> Option<&'a CharacterView> {
    buf.last_snapshot().and_then(|s| s.get(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::character::CharacterClass;

    fn snap(x: f64, health: f64) -> WorldSnapshot {
        let mut s = WorldSnapshot::default();
        s.characters.insert(
            "p".into(),
            CharacterView {
                id: "p".into(),
                class: CharacterClass::Warrior,
                position: Position::new(x, 0.0),
                health,
                max_health: 150.0,
            },
        );
        s
    }

    #[test]
    fn interpolates_between_last_two() {
        let mut buf = SnapshotBuffer::new(4);
        buf.push(snap(0.0, 150.0));
        buf.push(snap(10.0, 150.0));
        assert_eq!(buf.interp_position("p", 0.5), Some(Position::new(5.0, 0.0)));
        assert_eq!(buf.interp_position("missing", 0.5), None);
    }

    #[test]
    fn respawn_snaps_instead_of_sliding() {
        let mut buf = SnapshotBuffer::new(4);
        buf.push(snap(0.0, 10.0));
        buf.push(snap(700.0, 150.0));
        assert_eq!(buf.interp_position("p", 0.1), Some(Position::new(700.0, 0.0)));
    }

    #[test]
    fn history_is_bounded() {
        let mut buf = SnapshotBuffer::new(2);
        for i in 0..5 {
            buf.push(snap(f64::from(i), 150.0));
        }
        assert_eq!(buf.len(), 2);
        assert_eq!(find_character(&buf, "p").unwrap().position.x, 4.0);
    }
}
