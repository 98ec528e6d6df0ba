//! Input handling.
//!
//! A graphical front-end would sample the mouse and keyboard each frame.
//! This module only turns such samples into `move` commands: a click moves
//! to the clicked point, held direction keys nudge the current position.

use arena_shared::{
    math::{Position, WorldBounds},
    net::ClientCommand,
};

/// Units moved per frame while a direction key is held.
pub const KEYBOARD_STEP: f64 = 5.0;

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    /// World coordinates of a click this frame.
    pub click: Option<Position>,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl InputState {
    pub fn direction(self) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.left {
            dx -= 1.0;
        }
        if self.right {
            dx += 1.0;
        }
        if self.up {
            dy += 1.0;
        }
        if self.down {
            dy -= 1.0;
        }
        (dx, dy)
    }
}

/// Turns sampled input into a move command, if any.
///
/// A click wins over keys. Key movement needs the character's current
/// position; the result is clamped client-side as well.
pub fn build_command(
    input: InputState,
    current: Option<Position>,
    bounds: WorldBounds,
) -> Option<ClientCommand> {
    if let Some(target) = input.click {
        return Some(ClientCommand::move_to(target));
    }
    let (dx, dy) = input.direction();
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let from = current?;
    let target = Position::new(from.x + dx * KEYBOARD_STEP, from.y + dy * KEYBOARD_STEP);
    Some(ClientCommand::move_to(bounds.clamp(target)))
}
