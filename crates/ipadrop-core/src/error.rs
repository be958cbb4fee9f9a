//! # Error Hierarchy
//!
//! Validation errors for the domain-primitive newtypes, built with
//! `thiserror`. Each variant carries the rejected input so that a client
//! error message can name exactly what was wrong.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slug has the wrong length or contains characters outside `[a-z0-9]`.
    #[error("invalid slug \"{value}\": {reason}")]
    InvalidSlug {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Uploaded filename does not carry the `.ipa` extension.
    #[error("only .ipa files are allowed (got \"{0}\")")]
    InvalidExtension(String),
}
