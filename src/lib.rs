//! Conformance harness
//!
//! Resolves hierarchical test manifests into an ordered list of pages and
//! runs them one at a time through an execution frame, reporting
//! pass/fail/timeout per page.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod manifest;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{Event, Harness, HarnessOptions, Reporter};
pub use manifest::{Resolution, Resolver, SuiteOptions, TestPage, Version};
