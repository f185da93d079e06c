//! Application context and configuration.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BrowserContext`] | Owns tabs, windows, registries and the event queues |
//! | [`BrowserContextBuilder`] | Validating builder for the context |
//! | [`HostOptions`] | Timeouts, limits and web-safe schemes |
//! | [`Profile`] | Browsing profile that windows belong to |

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod core;
mod options;
mod profile;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BrowserContextBuilder;
pub use core::BrowserContext;
pub use options::{
    DEFAULT_BEFORE_UNLOAD_TIMEOUT, DEFAULT_MAX_NAVIGATION_ENTRIES, DEFAULT_MAX_TITLE_CHARS,
    DEFAULT_UNLOAD_TIMEOUT, HostOptions,
};
pub use profile::Profile;
