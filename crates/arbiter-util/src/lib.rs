//! Shared utilities for Arbiter.
//!
//! This crate provides cross-cutting concerns used by the other Arbiter
//! crates: the CLI-facing error type, filesystem helpers, and terminal
//! status output.

pub mod errors;
pub mod fs;
pub mod progress;
