//! Render Host - browser-process lifecycle of renderer views.
//!
//! This library owns the mapping between tabs and the renderer processes that
//! execute their pages, and hands a tab from one renderer process to another
//! when a navigation crosses a site boundary.
//!
//! # Architecture
//!
//! Two sequences cooperate:
//!
//! - **UI sequence**: the [`BrowserContext`] and everything it owns (tabs,
//!   host managers, hosts, interstitials, the window registry)
//! - **Dispatch sequence**: the [`ResourceDispatcher`], which owns in-flight
//!   network requests and is only reached through posted
//!   [`GatewayCommand`]s
//!
//! Key design principles:
//!
//! - Ownership points down (tab → manager → hosts); hosts report back through
//!   a borrowed delegate
//! - Inbound renderer messages are decoded once into a closed union
//! - Every URL a renderer reports is checked against its grants
//! - Registries are injected, never global
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use render_host::{BrowserContext, BrowserType, InProcessLauncher, Profile, Result};
//!
//! fn main() -> Result<()> {
//!     let profile = Profile::new("default");
//!     let mut context = BrowserContext::builder()
//!         .launcher(Arc::new(InProcessLauncher::new()))
//!         .profile(profile.clone())
//!         .build()?;
//!
//!     let browser = context.create_browser(profile.id(), BrowserType::Normal)?;
//!     let tab_id = context.create_tab(browser.id())?;
//!
//!     if let Some(tab) = context.tab_mut(tab_id) {
//!         tab.load_url("https://example.com/")?;
//!     }
//!
//!     // Route renderer and gateway traffic
//!     context.pump();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Hosts, host manager, interstitials, tabs, windows |
//! | [`context`] | Application context and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Renderer message types |
//! | [`security`] | Per-process URL and bindings grants |
//! | [`transport`] | Renderer channels, processes, dispatch gateway |

// ============================================================================
// Modules
// ============================================================================

/// Hosts, host manager, interstitials, tabs and windows.
pub mod browser;

/// Application context and configuration.
///
/// Use [`BrowserContext::builder()`] to create a context.
pub mod context;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Renderer message types.
pub mod protocol;

/// Per-process security policy.
pub mod security;

/// Renderer transport and resource dispatch gateway.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    Browser, BrowserList, BrowserListObserver, BrowserType, BrowsingInstance, CloseState,
    HtmlInterstitial, InterstitialPage, InterstitialPageDelegate, InterstitialRegistry,
    ManagerState, NavigationController, NavigationEntry, RenderViewHost, RenderViewHostManager,
    SiteInstance, TabEvent, WebContents,
};

// Context types
pub use context::{BrowserContext, BrowserContextBuilder, HostOptions, Profile};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{
    BrowserId, CrossSiteRequestId, GlobalRoutingId, ObserverId, PageId, ProcessId, ProfileId,
    RoutingId, SiteInstanceId, TabId,
};

// Security types
pub use security::{BindingsPolicy, SecurityPolicy};

// Transport types
pub use transport::{
    GatewayCommand, GatewayNotification, InProcessLauncher, ProcessLauncher, ResourceDispatcher,
};
