//! Tabs and their embedder-facing surface.
//!
//! A [`WebContents`] owns one tab's navigation history, its
//! [`RenderViewHostManager`](crate::browser::RenderViewHostManager) and, while
//! one is shown, its [`InterstitialPage`](crate::browser::InterstitialPage).
//! Renderer callbacks are queued by the hosts and applied once the host borrow
//! ends; results surface as [`TabEvent`]s.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | WebContents struct, events and accessors |
//! | `navigation` | URL loading, history, commits |
//! | `events` | Inbound routing and host callbacks |
//! | `interstitial` | Showing and deciding interstitials |
//! | `lifecycle` | Close protocol, process loss, hang checks |
//! | `script` | Find, script, dialogs, visibility |
//!
//! # Example
//!
//! ```ignore
//! let route = tab.load_url("https://example.com/")?;
//!
//! // Renderer traffic for the tab
//! tab.on_inbound(route, &message)?;
//!
//! for event in tab.drain_events() {
//!     println!("{event:?}");
//! }
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod events;
mod interstitial;
mod lifecycle;
mod navigation;
mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{CloseState, TabEvent, WebContents};
