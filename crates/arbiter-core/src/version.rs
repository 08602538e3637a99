//! Semantic version parsing and precedence ordering.
//!
//! Parsing is delegated to the `semver` crate. Ordering, equality and hashing
//! follow SemVer precedence:
//! - `major.minor.patch` compare numerically
//! - a version with prerelease identifiers sorts before the same version
//!   without them
//! - prerelease identifiers compare left to right; numeric identifiers compare
//!   as numbers and sort before alphanumeric ones; a shorter prefix sorts first
//! - build metadata never participates

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

/// An immutable, parsed semantic version.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    inner: semver::Version,
}

impl SemanticVersion {
    /// A release version with no prerelease or build identifiers.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            inner: semver::Version::new(major, minor, patch),
        }
    }

    /// Parse `MAJOR.MINOR.PATCH[-prerelease][+build]`.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        semver::Version::parse(text)
            .map(|inner| Self { inner })
            .map_err(|e| ModelError::MalformedVersion {
                input: text.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn major(&self) -> u64 {
        self.inner.major
    }

    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// Dot-separated prerelease identifiers, in order. Empty for releases.
    pub fn prerelease_identifiers(&self) -> Vec<&str> {
        split_identifiers(self.inner.pre.as_str())
    }

    /// Dot-separated build metadata identifiers, in order.
    pub fn build_metadata_identifiers(&self) -> Vec<&str> {
        split_identifiers(self.inner.build.as_str())
    }

    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }
}

fn split_identifiers(s: &str) -> Vec<&str> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split('.').collect()
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = &self.inner;
        let b = &other.inner;
        a.major
            .cmp(&b.major)
            .then(a.minor.cmp(&b.minor))
            .then(a.patch.cmp(&b.patch))
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.major.hash(state);
        self.inner.minor.hash(state);
        self.inner.patch.hash(state);
        self.inner.pre.hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl FromStr for SemanticVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
