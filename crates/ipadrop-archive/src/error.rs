//! Archive inspection errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why metadata could not be read from an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a readable ZIP container.
    #[error("not a valid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// No `Payload/<Name>.app/Info.plist` entry exists.
    #[error("no application Info.plist found under Payload/")]
    InfoPlistNotFound,

    /// The `Info.plist` entry is larger than the accepted limit.
    #[error("Info.plist is {size} bytes, larger than the {limit} byte limit")]
    InfoPlistTooLarge { size: u64, limit: u64 },

    /// Reading the `Info.plist` entry failed.
    #[error("failed to read {entry}: {source}")]
    Read {
        entry: String,
        source: std::io::Error,
    },

    /// The `Info.plist` entry is not a valid property list.
    #[error("malformed Info.plist: {0}")]
    Plist(#[from] plist::Error),

    /// The property list root is not a dictionary.
    #[error("Info.plist root is not a dictionary")]
    NotADictionary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display_includes_sizes() {
        let err = ArchiveError::InfoPlistTooLarge {
            size: 9_000_000,
            limit: 4_194_304,
        };
        let msg = err.to_string();
        assert!(msg.contains("9000000"));
        assert!(msg.contains("4194304"));
    }

    #[test]
    fn open_error_names_path() {
        let err = ArchiveError::Open {
            path: PathBuf::from("/tmp/missing.ipa"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/tmp/missing.ipa"));
    }
}
