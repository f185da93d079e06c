//! Core WebContents struct and accessors.

use std::collections::VecDeque;
use std::fmt;

use url::Url;

use crate::identifiers::{GlobalRoutingId, PageId, TabId};
use crate::protocol::{ContextMenuParams, FileChooserParams, FindReplyParams, JavaScriptDialogParams};

use crate::browser::delegate::HostEventQueue;
use crate::browser::interstitial::{InterstitialPage, InterstitialRegistry};
use crate::browser::manager::{ManagerState, RenderViewHostManager};
use crate::browser::navigation::{CommitDetails, NavigationController};
use crate::browser::render_view_host::RenderViewHost;
use crate::browser::services::HostServices;
use crate::browser::site_instance::SiteInstance;

// ============================================================================
// Types
// ============================================================================

/// Notification from a tab to its embedder.
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    /// A main-frame navigation committed.
    NavigationCommitted {
        /// Committed URL.
        url: Url,
        /// History bookkeeping.
        details: CommitDetails,
    },
    /// A navigation was abandoned before it committed.
    NavigationCancelled,
    /// The title of a page changed.
    TitleChanged {
        /// Page the title belongs to.
        page_id: PageId,
        /// New title.
        title: String,
    },
    /// The page started loading.
    LoadingStarted,
    /// The page stopped loading.
    LoadingStopped,
    /// The visible renderer went away.
    Crashed,
    /// The renderer missed an acknowledgment deadline.
    Unresponsive {
        /// The missed acknowledgment was for an unload handler.
        during_unload: bool,
    },
    /// A late acknowledgment arrived.
    Responsive,
    /// The page agreed to close; the tab may be destroyed.
    CloseApproved,
    /// The page refused to close.
    CloseCancelled,
    /// The page asked to close its window.
    CloseRequested,
    /// The page opened an alert, confirm or prompt.
    JavaScriptDialog(JavaScriptDialogParams),
    /// The before-unload handler wants confirmation.
    BeforeUnloadDialog {
        /// Handler-supplied text.
        message: String,
    },
    /// The page opened a modal window.
    ModalDialog {
        /// Validated modal URL.
        url: Url,
    },
    /// The page opened a file chooser.
    FileChooser(FileChooserParams),
    /// The user opened a context menu.
    ContextMenu(ContextMenuParams),
    /// The user started dragging content.
    DragStarted {
        /// Validated URL.
        url: Url,
    },
    /// A page script answered through the DOM automation hook.
    DomOperationResponse {
        /// Payload.
        json: String,
    },
    /// Result of a find request.
    FindReply(FindReplyParams),
    /// An interstitial now covers the tab.
    InterstitialShown {
        /// URL the interstitial stands in for.
        url: Url,
    },
    /// The interstitial is gone.
    InterstitialHidden,
}

/// Progress of closing a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    /// Not closing.
    Open,
    /// Waiting for the before-unload answer.
    AwaitingBeforeUnload,
    /// Waiting for the unload handler.
    AwaitingUnload,
    /// The page let go; only destruction remains.
    Closed,
}

// ============================================================================
// WebContents
// ============================================================================

/// One tab: its hosts, history and interstitial.
///
/// Hosts report through an internal event queue that is processed after
/// every operation, so no host ever holds a reference to its tab.
pub struct WebContents {
    pub(crate) tab_id: TabId,
    pub(crate) services: HostServices,
    pub(crate) registry: InterstitialRegistry,
    pub(crate) manager: RenderViewHostManager,
    pub(crate) controller: NavigationController,
    pub(crate) interstitial: Option<InterstitialPage>,
    pub(crate) host_events: HostEventQueue,
    pub(crate) events: VecDeque<TabEvent>,
    pub(crate) close_state: CloseState,
    pub(crate) is_loading: bool,
    pub(crate) is_hidden: bool,
    pub(crate) destroyed: bool,
}

impl fmt::Debug for WebContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebContents")
            .field("tab_id", &self.tab_id)
            .field("manager", &self.manager)
            .field("close_state", &self.close_state)
            .field("is_loading", &self.is_loading)
            .finish_non_exhaustive()
    }
}

impl WebContents {
    /// Creates a tab whose first page uses `site_instance`.
    ///
    /// No renderer exists until the first navigation.
    #[must_use]
    pub fn new(
        tab_id: TabId,
        site_instance: SiteInstance,
        services: HostServices,
        registry: InterstitialRegistry,
    ) -> Self {
        let controller = NavigationController::new(
            services.options.max_navigation_entries,
            services.options.max_title_chars,
        );
        let manager = RenderViewHostManager::new(site_instance, services.clone());

        Self {
            tab_id,
            services,
            registry,
            manager,
            controller,
            interstitial: None,
            host_events: HostEventQueue::new(),
            events: VecDeque::new(),
            close_state: CloseState::Open,
            is_loading: false,
            is_hidden: false,
            destroyed: false,
        }
    }
}

// ============================================================================
// WebContents - Accessors
// ============================================================================

impl WebContents {
    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns the history.
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    /// Returns the host manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &RenderViewHostManager {
        &self.manager
    }

    /// Returns the manager state.
    #[inline]
    #[must_use]
    pub fn manager_state(&self) -> ManagerState {
        self.manager.state()
    }

    /// Returns the visible host.
    #[inline]
    #[must_use]
    pub fn current_host(&self) -> &RenderViewHost {
        self.manager.current_host()
    }

    /// Returns the interstitial, if one is attached.
    #[inline]
    #[must_use]
    pub fn interstitial(&self) -> Option<&InterstitialPage> {
        self.interstitial.as_ref()
    }

    /// Returns the URL of the active entry.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.controller.active_entry().map(|e| &e.url)
    }

    /// Returns the title to display.
    #[must_use]
    pub fn title(&self) -> &str {
        self.controller
            .active_entry()
            .map_or("", |e| e.title_for_display())
    }

    /// Returns the close progress.
    #[inline]
    #[must_use]
    pub fn close_state(&self) -> CloseState {
        self.close_state
    }

    /// Returns `true` while the page loads.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns `true` while hidden.
    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    /// Returns `true` once destroyed.
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns `true` if `route` is one of this tab's hosts.
    #[must_use]
    pub fn owns_route(&self, route: GlobalRoutingId) -> bool {
        self.manager.role_of(route).is_some()
            || self.interstitial.as_ref().and_then(InterstitialPage::route) == Some(route)
    }

    /// Removes and returns every pending notification.
    pub fn drain_events(&mut self) -> Vec<TabEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn emit(&mut self, event: TabEvent) {
        self.events.push_back(event);
    }
}

// ============================================================================
// Tests
// ============================================================================
