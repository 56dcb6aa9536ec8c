//! Test utilities and helpers for Polaris
//!
//! Fixtures build migrated in-memory databases and deterministic identifiers;
//! assertions inspect per-store table contents.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
