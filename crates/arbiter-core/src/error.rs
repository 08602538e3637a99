//! Errors produced while constructing model values.

use miette::Diagnostic;
use thiserror::Error;

/// A value could not be constructed from its input.
///
/// These are returned by the offending constructor; no partial value is ever
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ModelError {
    /// Text that does not follow `MAJOR.MINOR.PATCH[-prerelease][+build]`.
    #[error("malformed version `{input}`: {reason}")]
    #[diagnostic(help("versions look like 1.2.3, 1.2.3-beta.1 or 1.2.3+build.5"))]
    MalformedVersion { input: String, reason: String },

    /// Requirement text that does not follow the requirement syntax.
    #[error("malformed requirement `{input}`: {reason}")]
    #[diagnostic(help("use *, >=V, ~>V, ^V, ==V, V or @ref, joined with `,`"))]
    MalformedRequirement { input: String, reason: String },

    /// The same project appeared twice in a strictly-built dependency list.
    #[error("project `{project}` is listed more than once")]
    DuplicateProject { project: String },
}
