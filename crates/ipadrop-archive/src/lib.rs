//! # ipadrop-archive: Application Archive Inspection
//!
//! An `.ipa` is a ZIP container whose application bundle lives at
//! `Payload/<Name>.app/`. The bundle's `Info.plist` (XML or binary property
//! list) carries the identifying keys:
//!
//! | Key                           | Meaning           |
//! |-------------------------------|-------------------|
//! | `CFBundleIdentifier`          | bundle identifier |
//! | `CFBundleShortVersionString`  | marketing version |
//! | `CFBundleVersion`             | build number      |
//!
//! [`read_fields`] reports failures as [`ArchiveError`]. [`inspect`] folds
//! any failure into a [`MetadataOutcome`] with defaults so callers on the
//! upload path never have to handle an error.
//!
//! All functions do blocking file I/O; async callers should run them on
//! the blocking thread pool.

pub mod error;
pub mod ipa;

pub use error::ArchiveError;
pub use ipa::{inspect, read_fields, MAX_INFO_PLIST_BYTES};
