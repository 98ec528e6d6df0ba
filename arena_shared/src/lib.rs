//! `arena_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - The server is authoritative; clients only send intents.
//! - Two-level locking: one lock for world membership, one per character.
//! - Wire messages are plain serde types so the protocol stays readable.
//! - No `unsafe`.

pub mod character;
pub mod config;
pub mod math;
pub mod net;
pub mod world;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::character::*;
    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::world::*;
}
