#![deny(missing_docs)]

//! # ipadrop-core: Foundational Types for ipadrop
//!
//! Types shared by every other crate in the workspace. No internal crate
//! dependencies, only `serde`, `thiserror`, and `rand`.
//!
//! ## Design Principles
//!
//! 1. **[`Slug`] is a validated newtype.** A slug taken from a URL path is
//!    parsed through [`Slug::parse`] before it reaches any lookup, so the
//!    registry never sees a string outside the slug alphabet.
//!
//! 2. **Slug generation sits behind [`SlugSource`].** The registry owns
//!    uniqueness; the generator only draws random strings.
//!
//! 3. **Metadata extraction never fails the caller.** [`MetadataOutcome`]
//!    carries either fully extracted fields or the defaults that replaced
//!    missing ones, together with the reason.

pub mod error;
pub mod filename;
pub mod metadata;
pub mod slug;

pub use error::ValidationError;
pub use filename::{header_safe, IpaFilename, FALLBACK_FILENAME, IPA_EXTENSION};
pub use metadata::{
    AppMetadata, ExtractedFields, MetadataOutcome, DEFAULT_BUILD, DEFAULT_BUNDLE_ID,
    DEFAULT_VERSION,
};
pub use slug::{RandomSlugs, Slug, SlugSource, SLUG_ALPHABET, SLUG_LEN};
