use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for Arbiter front-end operations.
///
/// Library crates carry their own precise error enums; this type is what the
/// CLI and registry loading report to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ArbiterError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed registry file.
    #[error("Registry error: {message}")]
    #[diagnostic(help("Check the registry file for syntax errors"))]
    Registry { message: String },

    /// Dependency resolution failed (conflicts, callback failures, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ArbiterResult<T> = miette::Result<T>;
