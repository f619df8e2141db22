//! Shared test utilities for hookstate integration tests.
//!
//! This module provides:
//! - `FakeStripe`, an in-memory webhook endpoint API that records every call
//! - `TestHarness` for isolated runs with temp manifest and state files
//! - Builders for declarations and manifests

pub mod builders;
pub mod fake_api;
pub mod harness;

pub use builders::*;
pub use fake_api::{Call, FakeStripe, Op};
pub use harness::TestHarness;
