//! Core modules for Edict's decision store.
//!
//! This is the foundation of Edict's runtime: the event codec and journal,
//! the replayed indexes, and the shared primitives every subsystem builds
//! on.

pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod indexes;
pub mod journal;
pub mod output;
pub mod store;
pub mod time;
