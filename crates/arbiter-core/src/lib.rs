//! Core data types for Arbiter.
//!
//! This crate defines the values the resolver reasons about: semantic
//! versions, selected versions with opaque metadata, requirements and their
//! suitability results, per-version dependency lists, and the TOML registry
//! format used to describe an offline set of projects.
//!
//! This crate is intentionally free of resolution logic and network I/O.

pub mod dependency;
pub mod error;
pub mod registry;
pub mod requirement;
pub mod selected;
pub mod version;
