//! # Application Metadata
//!
//! The three identifying fields recovered from an archive's `Info.plist`,
//! and the outcome type that records whether defaults had to stand in.
//!
//! Extraction is best-effort. A corrupt archive or a missing key never
//! fails an upload; the field falls back to its default and the caller
//! logs the [`MetadataOutcome::DefaultsApplied`] reason.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bundle identifier recorded when none could be extracted.
pub const DEFAULT_BUNDLE_ID: &str = "unknown";

/// Marketing version recorded when none could be extracted.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Build number recorded when none could be extracted.
pub const DEFAULT_BUILD: &str = "0";

/// Identifying metadata for a stored application archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    /// `CFBundleIdentifier`.
    pub bundle_id: String,
    /// `CFBundleShortVersionString`.
    pub version: String,
    /// `CFBundleVersion`.
    pub build: String,
}

impl AppMetadata {
    /// Metadata made entirely of defaults.
    pub fn defaults() -> Self {
        Self {
            bundle_id: DEFAULT_BUNDLE_ID.to_string(),
            version: DEFAULT_VERSION.to_string(),
            build: DEFAULT_BUILD.to_string(),
        }
    }
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Raw fields read from a property list. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    /// `CFBundleIdentifier`, if present and a string.
    pub bundle_id: Option<String>,
    /// `CFBundleShortVersionString`, if present and a string.
    pub version: Option<String>,
    /// `CFBundleVersion`, if present and a string.
    pub build: Option<String>,
}

impl ExtractedFields {
    /// Names of the property-list keys that were not found.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bundle_id.is_none() {
            missing.push("CFBundleIdentifier");
        }
        if self.version.is_none() {
            missing.push("CFBundleShortVersionString");
        }
        if self.build.is_none() {
            missing.push("CFBundleVersion");
        }
        missing
    }
}

/// Result of a metadata extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Every field was read from the archive.
    Extracted(AppMetadata),
    /// At least one field is a default.
    DefaultsApplied {
        /// The merged metadata (extracted values where available).
        metadata: AppMetadata,
        /// Why defaults were needed.
        reason: String,
    },
}

impl MetadataOutcome {
    /// Merge extracted fields with defaults.
    pub fn from_fields(fields: ExtractedFields) -> Self {
        let missing = fields.missing_keys();
        let metadata = AppMetadata {
            bundle_id: fields
                .bundle_id
                .unwrap_or_else(|| DEFAULT_BUNDLE_ID.to_string()),
            version: fields.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            build: fields.build.unwrap_or_else(|| DEFAULT_BUILD.to_string()),
        };
        if missing.is_empty() {
            Self::Extracted(metadata)
        } else {
            Self::DefaultsApplied {
                metadata,
                reason: format!("missing {}", missing.join(", ")),
            }
        }
    }

    /// All-default metadata after a failed extraction.
    pub fn from_failure(reason: impl fmt::Display) -> Self {
        Self::DefaultsApplied {
            metadata: AppMetadata::defaults(),
            reason: reason.to_string(),
        }
    }

    /// The metadata to record, whichever way it was obtained.
    pub fn metadata(&self) -> &AppMetadata {
        match self {
            Self::Extracted(metadata) | Self::DefaultsApplied { metadata, .. } => metadata,
        }
    }

    /// Consume the outcome, keeping only the metadata.
    pub fn into_metadata(self) -> AppMetadata {
        match self {
            Self::Extracted(metadata) | Self::DefaultsApplied { metadata, .. } => metadata,
        }
    }

    /// Whether any default was substituted.
    pub fn defaults_applied(&self) -> bool {
        matches!(self, Self::DefaultsApplied { .. })
    }

    /// The reason defaults were substituted, if they were.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Extracted(_) => None,
            Self::DefaultsApplied { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_fields() -> ExtractedFields {
        ExtractedFields {
            bundle_id: Some("com.example.app".to_string()),
            version: Some("1.4.2".to_string()),
            build: Some("88".to_string()),
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let d = AppMetadata::defaults();
        assert_eq!(d.bundle_id, "unknown");
        assert_eq!(d.version, "0.0.0");
        assert_eq!(d.build, "0");
        assert_eq!(AppMetadata::default(), d);
    }

    #[test]
    fn complete_fields_are_extracted() {
        let outcome = MetadataOutcome::from_fields(full_fields());
        assert!(!outcome.defaults_applied());
        assert!(outcome.reason().is_none());
        assert_eq!(outcome.metadata().bundle_id, "com.example.app");
        assert_eq!(outcome.metadata().version, "1.4.2");
        assert_eq!(outcome.metadata().build, "88");
    }

    #[test]
    fn missing_field_gets_default_and_reason() {
        let fields = ExtractedFields {
            build: None,
            ..full_fields()
        };
        let outcome = MetadataOutcome::from_fields(fields);
        assert!(outcome.defaults_applied());
        assert_eq!(outcome.reason(), Some("missing CFBundleVersion"));
        let metadata = outcome.into_metadata();
        assert_eq!(metadata.bundle_id, "com.example.app");
        assert_eq!(metadata.build, DEFAULT_BUILD);
    }

    #[test]
    fn empty_fields_list_every_missing_key() {
        let outcome = MetadataOutcome::from_fields(ExtractedFields::default());
        assert_eq!(outcome.metadata(), &AppMetadata::defaults());
        assert_eq!(
            outcome.reason(),
            Some("missing CFBundleIdentifier, CFBundleShortVersionString, CFBundleVersion")
        );
    }

    #[test]
    fn failure_yields_all_defaults() {
        let outcome = MetadataOutcome::from_failure("not a zip archive");
        assert!(outcome.defaults_applied());
        assert_eq!(outcome.reason(), Some("not a zip archive"));
        assert_eq!(outcome.into_metadata(), AppMetadata::defaults());
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let json = serde_json::to_value(AppMetadata::defaults()).unwrap();
        assert_eq!(json["bundleId"], "unknown");
        assert_eq!(json["version"], "0.0.0");
        assert_eq!(json["build"], "0");
    }
}
