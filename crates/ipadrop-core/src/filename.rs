//! # Upload Filenames
//!
//! The client-declared name of an uploaded archive. It is untrusted: it
//! never names a path on disk and is only echoed back in the
//! `Content-Disposition` header of a download.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Required extension for uploaded archives, compared ASCII case-insensitively.
pub const IPA_EXTENSION: &str = ".ipa";

/// Name used when the multipart part carries an empty filename.
pub const FALLBACK_FILENAME: &str = "app.ipa";

/// A declared filename that ends in `.ipa`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpaFilename(String);

impl IpaFilename {
    /// Validate a declared filename. An empty name becomes [`FALLBACK_FILENAME`].
    pub fn parse(declared: &str) -> Result<Self, ValidationError> {
        let name = if declared.is_empty() {
            FALLBACK_FILENAME
        } else {
            declared
        };
        let has_extension = name.len() >= IPA_EXTENSION.len()
            && name
                .get(name.len() - IPA_EXTENSION.len()..)
                .is_some_and(|ext| ext.eq_ignore_ascii_case(IPA_EXTENSION));
        if !has_extension {
            return Err(ValidationError::InvalidExtension(declared.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// The filename exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filename with quotes, backslashes, and control characters removed,
    /// safe to embed in a quoted `Content-Disposition` parameter.
    pub fn header_safe(&self) -> String {
        header_safe(&self.0)
    }
}

/// Strip characters that would break out of a quoted header parameter.
pub fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

impl fmt::Display for IpaFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IpaFilename {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IpaFilename> for String {
    fn from(name: IpaFilename) -> Self {
        name.0
    }
}
