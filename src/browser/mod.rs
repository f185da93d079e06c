//! Browser-process side of tabs, views and windows.
//!
//! Ownership always points down: a [`WebContents`] owns its
//! [`RenderViewHostManager`], which owns the [`RenderViewHost`]s. Hosts report
//! back through a borrowed [`RenderViewHostDelegate`], never a stored
//! reference.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SiteInstance`] | Site grouping that decides which process hosts a page |
//! | [`RenderViewHost`] | Proxy for one renderer view |
//! | [`RenderViewHostManager`] | Per-tab current/pending/interstitial hosts |
//! | [`InterstitialPage`] | Transient overlay blocking the page's requests |
//! | [`NavigationController`] | Per-tab history |
//! | [`WebContents`] | A tab |
//! | [`Browser`] | A top-level window and its tab strip |
//! | [`BrowserList`] | Registry of windows |
//!
//! # Example
//!
//! ```ignore
//! let browser = context.create_browser(profile.id(), BrowserType::Normal)?;
//! let tab_id = context.create_tab(browser.id())?;
//!
//! let tab = context.tab_mut(tab_id).expect("tab");
//! tab.load_url("https://example.com/")?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Host-to-tab callbacks.
pub mod delegate;

/// Interstitial pages.
pub mod interstitial;

/// Window registry.
pub mod list;

/// Per-tab host manager.
pub mod manager;

/// Navigation history.
pub mod navigation;

/// Renderer view proxies.
pub mod render_view_host;

/// Shared host services.
pub mod services;

/// Site grouping.
pub mod site_instance;

/// Tabs.
pub mod tab;

/// Top-level windows.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use delegate::{FrameCommit, HostEvent, HostEventQueue, RenderViewHostDelegate};
pub use interstitial::{
    HtmlInterstitial, InterstitialAction, InterstitialPage, InterstitialPageDelegate,
    InterstitialRegistry, InterstitialState, InterstitialSummary,
};
pub use list::{BrowserList, BrowserListObserver};
pub use manager::{CommitOutcome, HandoffProgress, HostRole, ManagerState, RenderViewHostManager};
pub use navigation::{CommitDetails, CommitParams, NavigationController, NavigationEntry};
pub use render_view_host::{
    FindOptions, HangMonitor, ModalDialogSignal, RenderViewHost, RendererState, UnloadReason,
    UnloadState,
};
pub use services::HostServices;
pub use site_instance::{BrowsingInstance, SiteInstance, is_same_site, site_for_url};
pub use tab::{CloseState, TabEvent, WebContents};
pub use window::{Browser, BrowserType};
