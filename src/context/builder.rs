//! Builder pattern for context configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use render_host::{BrowserContext, HostOptions, InProcessLauncher, Profile};
//!
//! let context = BrowserContext::builder()
//!     .launcher(Arc::new(InProcessLauncher::new()))
//!     .options(HostOptions::new().with_web_safe_scheme("data"))
//!     .profile(Profile::new("default"))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::transport::ProcessLauncher;

use super::core::BrowserContext;
use super::options::HostOptions;
use super::profile::Profile;

// ============================================================================
// BrowserContextBuilder
// ============================================================================

/// Builder for a [`BrowserContext`].
///
/// Use [`BrowserContext::builder()`] to create one.
#[derive(Clone, Default)]
pub struct BrowserContextBuilder {
    launcher: Option<Arc<dyn ProcessLauncher>>,
    options: HostOptions,
    profiles: Vec<Profile>,
}

impl fmt::Debug for BrowserContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserContextBuilder")
            .field("has_launcher", &self.launcher.is_some())
            .field("options", &self.options)
            .field("profiles", &self.profiles)
            .finish()
    }
}

// ============================================================================
// BrowserContextBuilder - Implementation
// ============================================================================

impl BrowserContextBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how renderer processes are started.
    #[inline]
    #[must_use]
    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Sets the host options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a profile up front.
    #[inline]
    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Builds the context with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no launcher is set, the options are
    /// invalid, or a profile is registered twice.
    pub fn build(self) -> Result<BrowserContext> {
        let launcher = self.launcher.ok_or_else(|| {
            Error::config(
                "A process launcher is required. Use .launcher() to set it.\n\
                 Example: BrowserContext::builder().launcher(Arc::new(InProcessLauncher::new()))",
            )
        })?;

        self.options.validate()?;

        for (i, profile) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.id() == profile.id()) {
                return Err(Error::config(format!(
                    "Profile {} registered twice",
                    profile.id()
                )));
            }
        }

        Ok(BrowserContext::new(launcher, self.options, self.profiles))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    use crate::transport::InProcessLauncher;

    #[test]
    fn test_build_fails_without_launcher() {
        let err = BrowserContextBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("launcher"));
    }

    #[test]
    fn test_build_validates_options() {
        let err = BrowserContextBuilder::new()
            .launcher(Arc::new(InProcessLauncher::new()))
            .options(HostOptions::new().with_unload_timeout(Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_profile() {
        let profile = Profile::new("default");
        let err = BrowserContextBuilder::new()
            .launcher(Arc::new(InProcessLauncher::new()))
            .profile(profile.clone())
            .profile(profile)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_build_registers_profiles() {
        let profile = Profile::new("default");
        let context = BrowserContextBuilder::new()
            .launcher(Arc::new(InProcessLauncher::new()))
            .profile(profile.clone())
            .build()
            .expect("build");

        assert_eq!(context.profile(profile.id()), Some(&profile));
    }
}
