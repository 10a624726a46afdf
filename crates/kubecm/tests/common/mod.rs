//! Shared test utilities for kubecm integration tests.
//!
//! This module provides:
//! - `TestHarness` with an isolated state home and local registry sources
//! - Builders for registry repositories and kubeconfigs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{CopyFetcher, FakeProviders, TestHarness};
