//! Host configuration options.
//!
//! Typed settings shared by every tab of one [`BrowserContext`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use render_host::HostOptions;
//!
//! let options = HostOptions::new()
//!     .with_before_unload_timeout(Duration::from_millis(500))
//!     .with_web_safe_scheme("data")
//!     .with_max_navigation_entries(25);
//! ```
//!
//! [`BrowserContext`]: crate::BrowserContext

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default wait for a before-unload answer.
pub const DEFAULT_BEFORE_UNLOAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default wait for an unload answer.
pub const DEFAULT_UNLOAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default history length per tab.
pub const DEFAULT_MAX_NAVIGATION_ENTRIES: usize = 50;

/// Default title length kept per history entry.
pub const DEFAULT_MAX_TITLE_CHARS: usize = 4096;

// ============================================================================
// HostOptions
// ============================================================================

/// Settings for render view hosts and their tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
    /// Time a renderer gets to answer a before-unload request before it is
    /// reported unresponsive.
    pub before_unload_timeout: Duration,

    /// Time a renderer gets to answer an unload request before it is
    /// reported unresponsive.
    pub unload_timeout: Duration,

    /// Schemes any renderer may request without a grant.
    pub web_safe_schemes: Vec<String>,

    /// Committed history entries kept per tab.
    pub max_navigation_entries: usize,

    /// Characters kept of a page title.
    pub max_title_chars: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl HostOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            before_unload_timeout: DEFAULT_BEFORE_UNLOAD_TIMEOUT,
            unload_timeout: DEFAULT_UNLOAD_TIMEOUT,
            web_safe_schemes: Vec::new(),
            max_navigation_entries: DEFAULT_MAX_NAVIGATION_ENTRIES,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl HostOptions {
    /// Sets the before-unload hang timeout.
    #[inline]
    #[must_use]
    pub fn with_before_unload_timeout(mut self, timeout: Duration) -> Self {
        self.before_unload_timeout = timeout;
        self
    }

    /// Sets the unload hang timeout.
    #[inline]
    #[must_use]
    pub fn with_unload_timeout(mut self, timeout: Duration) -> Self {
        self.unload_timeout = timeout;
        self
    }

    /// Adds a web-safe scheme.
    #[inline]
    #[must_use]
    pub fn with_web_safe_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.web_safe_schemes.push(scheme.into());
        self
    }

    /// Adds several web-safe schemes.
    #[inline]
    #[must_use]
    pub fn with_web_safe_schemes(
        mut self,
        schemes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.web_safe_schemes
            .extend(schemes.into_iter().map(Into::into));
        self
    }

    /// Sets the history length per tab.
    #[inline]
    #[must_use]
    pub fn with_max_navigation_entries(mut self, max: usize) -> Self {
        self.max_navigation_entries = max;
        self
    }

    /// Sets the kept title length.
    #[inline]
    #[must_use]
    pub fn with_max_title_chars(mut self, max: usize) -> Self {
        self.max_title_chars = max;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl HostOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on a zero timeout, a zero history length or
    /// a malformed scheme.
    pub fn validate(&self) -> Result<()> {
        if self.before_unload_timeout.is_zero() || self.unload_timeout.is_zero() {
            return Err(Error::config("Unload timeouts must be greater than zero"));
        }

        if self.max_navigation_entries == 0 {
            return Err(Error::config("max_navigation_entries must be at least 1"));
        }

        for scheme in &self.web_safe_schemes {
            let valid = scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !valid {
                return Err(Error::config(format!("Invalid web-safe scheme: {scheme:?}")));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_default() {
        let options = HostOptions::new();
        assert_eq!(options.before_unload_timeout, Duration::from_millis(1000));
        assert_eq!(options.unload_timeout, Duration::from_millis(1000));
        assert!(options.web_safe_schemes.is_empty());
        assert_eq!(options.max_navigation_entries, 50);
        assert_eq!(options, HostOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = HostOptions::new()
            .with_before_unload_timeout(Duration::from_millis(10))
            .with_unload_timeout(Duration::from_millis(20))
            .with_web_safe_schemes(["data", "blob"])
            .with_max_title_chars(16);

        assert_eq!(options.before_unload_timeout, Duration::from_millis(10));
        assert_eq!(options.unload_timeout, Duration::from_millis(20));
        assert_eq!(options.web_safe_schemes, vec!["data", "blob"]);
        assert_eq!(options.max_title_chars, 16);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let options = HostOptions::new().with_unload_timeout(Duration::ZERO);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_zero_history() {
        let options = HostOptions::new().with_max_navigation_entries(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_bad_scheme() {
        assert!(HostOptions::new().with_web_safe_scheme("").validate().is_err());
        assert!(HostOptions::new().with_web_safe_scheme("1http").validate().is_err());
        assert!(HostOptions::new().with_web_safe_scheme("chrome-extension").validate().is_ok());
    }
}
