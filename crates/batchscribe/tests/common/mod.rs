//! Shared test utilities for batchscribe integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against a local store and a simulated service
//! - Builder patterns for creating pipeline configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
