//! # Slugs
//!
//! Short public identifiers bound to one stored artifact.
//!
//! A slug is exactly [`SLUG_LEN`] characters, each drawn uniformly from
//! [`SLUG_ALPHABET`] using the thread-local CSPRNG (ChaCha, seeded from the
//! OS). With 36^8 possible values a collision is rare but possible, so the
//! generator makes no uniqueness promise: the link registry checks and
//! redraws.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Characters a slug may contain.
pub const SLUG_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of every slug.
pub const SLUG_LEN: usize = 8;

/// A validated slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Draw a fresh slug from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh slug from the given cryptographically secure RNG.
    pub fn generate_with<R: Rng + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let value = (0..SLUG_LEN)
            .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
            .collect();
        Self(value)
    }

    /// Parse an untrusted string (e.g. a URL path segment) into a slug.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.len() != SLUG_LEN {
            return Err(ValidationError::InvalidSlug {
                value: value.to_string(),
                reason: "must be exactly 8 characters",
            });
        }
        if !value.bytes().all(|b| SLUG_ALPHABET.contains(&b)) {
            return Err(ValidationError::InvalidSlug {
                value: value.to_string(),
                reason: "must contain only lowercase letters and digits",
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Borrow the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Slug {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// A source of candidate slugs.
///
/// The registry draws from a `SlugSource` and redraws on collision.
pub trait SlugSource: Send + Sync + fmt::Debug {
    /// Produce the next candidate slug.
    fn next_slug(&self) -> Slug;
}

/// The production slug source: independent draws from the thread CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSlugs;

impl SlugSource for RandomSlugs {
    fn next_slug(&self) -> Slug {
        Slug::generate()
    }
}
