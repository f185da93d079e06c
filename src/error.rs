//! Error types for render-host.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use render_host::{Result, Error};
//!
//! fn example(context: &mut BrowserContext, tab_id: TabId) -> Result<()> {
//!     let tab = context.tab_mut(tab_id)?;
//!     tab.navigate("https://example.com/", PageTransition::Typed)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Process loss | [`Error::ProcessLaunchFailed`], [`Error::ChannelClosed`], [`Error::RendererNotLive`] |
//! | Protocol violation | [`Error::BadMessage`] |
//! | Lookup | [`Error::HostNotFound`], [`Error::TabNotFound`], [`Error::BrowserNotFound`], [`Error::NoInterstitial`] |
//! | Contract violation | [`Error::ContractViolation`] |
//! | External | [`Error::Url`], [`Error::Json`] |
//!
//! Security violations are deliberately absent: an untrusted URL reported by a
//! renderer is neutralised to `about:blank`, never surfaced as an error.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{BrowserId, GlobalRoutingId, ProcessId, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when context configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Process Errors
    // ========================================================================
    /// Renderer process could not be initialized.
    #[error("Failed to launch renderer {process_id}: {message}")]
    ProcessLaunchFailed {
        /// Process that failed to start.
        process_id: ProcessId,
        /// Description of the launch failure.
        message: String,
    },

    /// The channel to a renderer process is severed.
    #[error("Channel to {process_id} closed")]
    ChannelClosed {
        /// Process whose channel is gone.
        process_id: ProcessId,
    },

    /// An operation needed a live renderer view but there is none.
    #[error("Renderer for view {route} is not live")]
    RendererNotLive {
        /// View that has no live renderer.
        route: GlobalRoutingId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A renderer sent a message that has a handler but cannot be decoded.
    ///
    /// Fatal to the sending renderer process only.
    #[error("Bad message {method} from {process_id}: {message}")]
    BadMessage {
        /// Offending process.
        process_id: ProcessId,
        /// Method of the malformed message.
        method: String,
        /// Decoder error.
        message: String,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No view with this address belongs to the receiver.
    #[error("View not found: {route}")]
    HostNotFound {
        /// The missing view address.
        route: GlobalRoutingId,
    },

    /// Tab not found.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// Browser window not found.
    #[error("Browser not found: {browser_id}")]
    BrowserNotFound {
        /// The missing browser ID.
        browser_id: BrowserId,
    },

    /// The tab is not showing an interstitial page.
    #[error("No interstitial showing in {tab_id}")]
    NoInterstitial {
        /// The tab that was asked.
        tab_id: TabId,
    },

    // ========================================================================
    // Contract Errors
    // ========================================================================
    /// A caller broke an invariant of this crate.
    ///
    /// Indicates a bug in the calling code, never a runtime condition to retry.
    #[error("Contract violation: {message}")]
    ContractViolation {
        /// Which invariant was broken.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(process_id: ProcessId, message: impl Into<String>) -> Self {
        Self::ProcessLaunchFailed {
            process_id,
            message: message.into(),
        }
    }

    /// Creates a channel closed error.
    #[inline]
    pub fn channel_closed(process_id: ProcessId) -> Self {
        Self::ChannelClosed { process_id }
    }

    /// Creates a renderer not live error.
    #[inline]
    pub fn renderer_not_live(route: GlobalRoutingId) -> Self {
        Self::RendererNotLive { route }
    }

    /// Creates a bad message error.
    #[inline]
    pub fn bad_message(
        process_id: ProcessId,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BadMessage {
            process_id,
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a host not found error.
    #[inline]
    pub fn host_not_found(route: GlobalRoutingId) -> Self {
        Self::HostNotFound { route }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a browser not found error.
    #[inline]
    pub fn browser_not_found(browser_id: BrowserId) -> Self {
        Self::BrowserNotFound { browser_id }
    }

    /// Creates a no interstitial error.
    #[inline]
    pub fn no_interstitial(tab_id: TabId) -> Self {
        Self::NoInterstitial { tab_id }
    }

    /// Creates a contract violation error.
    #[inline]
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error reports a broken caller invariant.
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }

    /// Returns `true` if this error means the renderer is gone.
    #[inline]
    #[must_use]
    pub fn is_renderer_gone(&self) -> bool {
        matches!(
            self,
            Self::ChannelClosed { .. } | Self::RendererNotLive { .. } | Self::BadMessage { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// A renderer that failed to launch or disappeared can be brought back
    /// by a fresh navigation.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProcessLaunchFailed { .. }
                | Self::ChannelClosed { .. }
                | Self::RendererNotLive { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::RoutingId;

    #[test]
    fn test_error_display() {
        let err = Error::config("hang timeout must be non-zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: hang timeout must be non-zero"
        );
    }

    #[test]
    fn test_bad_message_display() {
        let err = Error::bad_message(ProcessId::from_raw(4), "frame.navigate", "missing url");
        assert_eq!(
            err.to_string(),
            "Bad message frame.navigate from process-4: missing url"
        );
    }

    #[test]
    fn test_is_contract_violation() {
        assert!(Error::contract("double proceed").is_contract_violation());
        assert!(!Error::config("x").is_contract_violation());
    }

    #[test]
    fn test_is_renderer_gone() {
        let route = GlobalRoutingId::new(ProcessId::from_raw(1), RoutingId::from_raw(1));
        assert!(Error::channel_closed(ProcessId::from_raw(1)).is_renderer_gone());
        assert!(Error::renderer_not_live(route).is_renderer_gone());
        assert!(!Error::host_not_found(route).is_renderer_gone());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::process_launch_failed(ProcessId::from_raw(2), "spawn").is_recoverable());
        assert!(!Error::contract("x").is_recoverable());
    }

    #[test]
    fn test_from_url_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
