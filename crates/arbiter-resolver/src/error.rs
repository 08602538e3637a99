//! Errors that end a resolution.

use miette::Diagnostic;
use thiserror::Error;

use crate::conflict::{Conflict, ConflictKind};

/// Boxed error returned by a caller-supplied callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A resolution that could not produce a graph.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A provider callback failed. Never retried and never backtracked over.
    #[error("callback failed for {}: {source}", target(.project, .version.as_deref()))]
    CallbackFailed {
        project: String,
        version: Option<String>,
        #[source]
        source: CallbackError,
    },

    /// Backtracking exhausted every choice point.
    #[error("unsatisfiable requirements: {conflict}")]
    #[diagnostic(help("relax one of the requirements listed above"))]
    Unsatisfiable { conflict: Box<Conflict> },

    /// The last conflict was two dependents pinning different versions.
    #[error("conflicting pins on `{project}`: {first} and {second} are both the best possible choice")]
    DivergentPins {
        project: String,
        first: String,
        second: String,
    },

    /// The iteration bound was exceeded.
    #[error("resolution did not terminate within {iterations} iterations")]
    #[diagnostic(help("raise `max-iterations` or look for requirement cycles"))]
    ResolutionDidNotTerminate { iterations: usize },

    /// The provider asked for the resolution to stop.
    #[error("resolution was cancelled")]
    Cancelled,
}

fn target(project: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("`{project}` {version}"),
        None => format!("`{project}`"),
    }
}

impl ResolveError {
    pub(crate) fn callback(
        project: impl ToString,
        version: Option<String>,
        source: impl Into<CallbackError>,
    ) -> Self {
        ResolveError::CallbackFailed {
            project: project.to_string(),
            version,
            source: source.into(),
        }
    }
}

impl From<Conflict> for ResolveError {
    fn from(conflict: Conflict) -> Self {
        match conflict.kind {
            ConflictKind::DivergentPins { first, second } => ResolveError::DivergentPins {
                project: conflict.project,
                first,
                second,
            },
            _ => ResolveError::Unsatisfiable {
                conflict: Box::new(conflict),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(kind: ConflictKind) -> Conflict {
        Conflict {
            project: "a".to_string(),
            attempted: None,
            requirement: "==1.0.0, ==2.0.0".to_string(),
            chain: Vec::new(),
            kind,
        }
    }

    #[test]
    fn callback_error_keeps_source_verbatim() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "registry offline");
        let err = ResolveError::callback("a", Some("1.0.0".to_string()), io);
        assert_eq!(err.to_string(), "callback failed for `a` 1.0.0: registry offline");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "registry offline");
    }

    #[test]
    fn conflict_becomes_unsatisfiable() {
        let err = ResolveError::from(conflict(ConflictKind::NoSuitableVersion));
        assert!(matches!(err, ResolveError::Unsatisfiable { ref conflict } if conflict.project == "a"));
    }

    #[test]
    fn divergent_conflict_becomes_divergent_pins() {
        let err = ResolveError::from(conflict(ConflictKind::DivergentPins {
            first: "2.0.0".to_string(),
            second: "1.0.0".to_string(),
        }));
        assert!(matches!(err, ResolveError::DivergentPins { ref project, .. } if project == "a"));
    }
}
