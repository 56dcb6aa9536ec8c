//! Storage layer for the Polaris state machine
//!
//! Provides SQL-based persistence shared by every component.

pub mod database;
pub mod migrations;

pub use database::PolarisDatabase;
pub use migrations::{migrate, CURRENT_POLARIS_SCHEMA_VERSION};
