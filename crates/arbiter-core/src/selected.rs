//! Concrete versions a project can be resolved to.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::version::SemanticVersion;

trait MetadataValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn cmp_value(&self, other: &dyn MetadataValue) -> Ordering;
}

impl<T: Any + fmt::Debug + Ord + Send + Sync> MetadataValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn cmp_value(&self, other: &dyn MetadataValue) -> Ordering {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self.cmp(other),
            None => TypeId::of::<T>().cmp(&other.as_any().type_id()),
        }
    }
}

/// Opaque, caller-defined data attached to a version (a VCS ref, a commit
/// hash, a source URL...).
///
/// Comparison uses the wrapped type's own `Ord`. Values of different types
/// never compare equal.
#[derive(Clone)]
pub struct Metadata(Arc<dyn MetadataValue>);

impl Metadata {
    pub fn new<T: Any + fmt::Debug + Ord + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl From<String> for Metadata {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Metadata {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.downcast_ref::<String>() {
            Some(s) => f.write_str(s),
            None => write!(f, "{:?}", self.0),
        }
    }
}

impl Ord for Metadata {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_value(&*other.0)
    }
}

impl PartialOrd for Metadata {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Metadata {}

/// A semantic version plus optional metadata.
///
/// Ordered by version first; metadata only breaks ties between equal
/// versions, so `1.0.0 (main)` and `1.0.0 (release)` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectedVersion {
    version: SemanticVersion,
    metadata: Option<Metadata>,
}

impl SelectedVersion {
    pub fn new(version: SemanticVersion, metadata: Option<Metadata>) -> Self {
        Self { version, metadata }
    }

    pub fn with_metadata(version: SemanticVersion, metadata: impl Into<Metadata>) -> Self {
        Self::new(version, Some(metadata.into()))
    }

    pub fn version(&self) -> &SemanticVersion {
        &self.version
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}

impl From<SemanticVersion> for SelectedVersion {
    fn from(version: SemanticVersion) -> Self {
        Self::new(version, None)
    }
}

impl fmt::Display for SelectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metadata {
            Some(meta) => write!(f, "{} ({meta})", self.version),
            None => write!(f, "{}", self.version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn version_is_primary_key() {
        let old = SelectedVersion::with_metadata(v("1.0.0"), "zzz");
        let new = SelectedVersion::with_metadata(v("2.0.0"), "aaa");
        assert!(old < new);
    }

    #[test]
    fn metadata_breaks_ties() {
        let main = SelectedVersion::with_metadata(v("1.0.0"), "main");
        let release = SelectedVersion::with_metadata(v("1.0.0"), "release");
        assert_ne!(main, release);
        assert!(main < release);
        assert!(SelectedVersion::from(v("1.0.0")) < main);
    }

    #[test]
    fn equal_metadata_is_equal() {
        let a = SelectedVersion::with_metadata(v("1.0.0+x"), "main");
        let b = SelectedVersion::with_metadata(v("1.0.0+y"), "main");
        assert_eq!(a, b);
    }

    #[test]
    fn metadata_of_different_types_differs() {
        let text = Metadata::from("7");
        let number = Metadata::new(7u32);
        assert_ne!(text, number);
        assert_eq!(number.downcast_ref::<u32>(), Some(&7));
        assert!(text.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn display() {
        assert_eq!(SelectedVersion::from(v("1.2.3")).to_string(), "1.2.3");
        assert_eq!(
            SelectedVersion::with_metadata(v("1.2.3"), "feature-x").to_string(),
            "1.2.3 (feature-x)"
        );
    }
}
