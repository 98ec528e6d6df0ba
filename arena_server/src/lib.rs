//! `arena_server`
//!
//! Server-side systems:
//! - Accept loop with one session task per connection
//! - Fixed timestep combat loop
//! - Receives move commands
//! - Broadcasts full-state snapshots
//!
//! Networking model:
//! - TCP only, newline-delimited JSON in both directions

pub mod registry;
pub mod server;
pub mod session;
pub mod simulation;

pub use server::{ArenaHandle, GameServer};
