//! Subsystem plugins built on the core decision store.

pub mod capture;
pub mod classifier;
pub mod conflict;
pub mod context;
pub mod memory;
