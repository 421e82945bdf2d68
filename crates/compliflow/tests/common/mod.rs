//! Shared test utilities for compliflow integration tests.
//!
//! - `TestHarness` for isolated uploads in a temp directory
//! - Fixture helpers for configs and input documents

pub mod harness;

pub use harness::*;
