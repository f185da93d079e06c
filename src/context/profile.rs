//! Browsing profiles.

use crate::identifiers::ProfileId;

// ============================================================================
// Profile
// ============================================================================

/// A browsing profile that windows belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: ProfileId,
    name: String,
    off_the_record: bool,
}

// ============================================================================
// Profile - Constructors
// ============================================================================

impl Profile {
    /// Creates a regular profile.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProfileId::generate(),
            name: name.into(),
            off_the_record: false,
        }
    }

    /// Creates an off-the-record profile.
    #[must_use]
    pub fn off_the_record(name: impl Into<String>) -> Self {
        Self {
            off_the_record: true,
            ..Self::new(name)
        }
    }
}

// ============================================================================
// Profile - Accessors
// ============================================================================

impl Profile {
    /// Returns the profile ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ProfileId {
        self.id
    }

    /// Returns the display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for an off-the-record profile.
    #[inline]
    #[must_use]
    pub fn is_off_the_record(&self) -> bool {
        self.off_the_record
    }
}

// ============================================================================
// Tests
// ============================================================================
