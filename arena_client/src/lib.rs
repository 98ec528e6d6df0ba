//! `arena_client`
//!
//! Client-side systems:
//! - Connection management (one TCP stream)
//! - Input sampling turned into move commands
//! - Snapshot buffering and interpolation for a front-end
//!
//! Rendering is left to whatever front-end embeds this crate.

pub mod client;
pub mod input;
pub mod interp;

pub use client::GameClient;
