//! Core identifier types shared across the research system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amazon Standard Identification Number for a listed item.
///
/// Stored as an owned string; lookups key every cache namespace and provider
/// call by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asin(String);

impl Asin {
    /// Create an ASIN from any string-like value. Whitespace is trimmed and
    /// the identifier is normalized to upper case.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_ascii_uppercase())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier has the canonical ten character shape.
    pub fn is_canonical(&self) -> bool {
        self.0.len() == 10 && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Asin {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for Asin {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Marketplace selector forwarded to the external provider on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marketplace {
    /// Provider-side marketplace identifier.
    pub id: String,
    /// Two-letter country code, informational only.
    pub country: String,
}

impl Marketplace {
    /// The US marketplace, the default for every lookup.
    pub fn us() -> Self {
        Self {
            id: "ATVPDKIKX0DER".to_string(),
            country: "US".to_string(),
        }
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::us()
    }
}
