//! Shared test utilities for Silver Fox integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and a database file
//! - Builders for vehicles and dealership configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
