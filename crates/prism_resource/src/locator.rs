//! Resource locators.

use std::fmt;

/// Names a resource, and decides whether requests for the same name share a
/// single resource.
///
/// A shared locator has a location and a signature. Two shared locators with
/// the same location but different signatures name different resources. A
/// non-shared locator is never looked up; every resource created with one is
/// a new instance, although the location is still used for loading.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator {
    location: String,
    signature: u32,
}

impl Locator {
    /// Signature of non-shared locators.
    pub const NON_SHARED_SIGNATURE: u32 = u32::MAX;
    /// Signature of shared locators created without an explicit signature.
    pub const DEFAULT_SIGNATURE: u32 = u32::MAX - 1;

    /// Creates a shared locator for the given location.
    pub fn new(location: impl Into<String>) -> Self {
        Self::with_signature(location, Self::DEFAULT_SIGNATURE)
    }

    /// Creates a shared locator for the given location and signature.
    ///
    /// # Panics
    /// If the signature is [`Self::NON_SHARED_SIGNATURE`].
    pub fn with_signature(location: impl Into<String>, signature: u32) -> Self {
        assert_ne!(
            signature,
            Self::NON_SHARED_SIGNATURE,
            "Shared locator cannot use the non-shared signature"
        );
        Self {
            location: location.into(),
            signature,
        }
    }

    /// Creates an anonymous non-shared locator.
    pub fn non_shared() -> Self {
        Self::non_shared_at("")
    }

    /// Creates a non-shared locator for the given location.
    pub fn non_shared_at(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            signature: Self::NON_SHARED_SIGNATURE,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn is_shared(&self) -> bool {
        self.signature != Self::NON_SHARED_SIGNATURE
    }

    /// Whether the locator has a non-empty location.
    pub fn has_location(&self) -> bool {
        !self.location.is_empty()
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::non_shared()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signature {
            Self::NON_SHARED_SIGNATURE => write!(f, "{} (non-shared)", self.location),
            Self::DEFAULT_SIGNATURE => write!(f, "{}", self.location),
            signature => write!(f, "{} ({signature:#010x})", self.location),
        }
    }
}
