//! Outbound messages from the browser to a renderer view.
//!
//! Messages follow the `module.methodName` format and are adjacently tagged
//! (`method` + `params`) on the wire.
//!
//! # Message Groups
//!
//! | Group | Messages |
//! |-------|----------|
//! | lifecycle | `view.create`, `view.allowBindings`, `view.close`, `view.wasHidden`, `view.wasRestored` |
//! | navigation | `view.navigate`, `view.stop` |
//! | unload | `view.shouldClose`, `view.closePage`, `view.closePageForTab` |
//! | dialogs | `dialog.javaScriptClosed`, `dialog.modalClosed`, `dialog.fileChooserClosed` |
//! | content | `find.start`, `find.stop`, `script.executeInFrame` |
//! | debugger | `debugger.attach`, `debugger.detach` |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::identifiers::{CrossSiteRequestId, PageId, ProcessId};
use crate::security::BindingsPolicy;

// ============================================================================
// ViewMsg
// ============================================================================

/// A message the browser sends to one renderer view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ViewMsg {
    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Creates the renderer-side view.
    #[serde(rename = "view.create")]
    CreateView,

    /// Announces the privileged bindings the view may expose.
    #[serde(rename = "view.allowBindings")]
    AllowBindings {
        /// Granted bindings.
        bindings: BindingsPolicy,
    },

    /// Destroys the renderer-side view.
    #[serde(rename = "view.close")]
    Close,

    /// The view was hidden.
    #[serde(rename = "view.wasHidden")]
    WasHidden,

    /// The view was shown again.
    #[serde(rename = "view.wasRestored")]
    WasRestored,

    // ========================================================================
    // Navigation
    // ========================================================================
    /// Loads a URL in the main frame.
    #[serde(rename = "view.navigate")]
    Navigate(NavigateParams),

    /// Stops loading.
    #[serde(rename = "view.stop")]
    Stop,

    // ========================================================================
    // Unload
    // ========================================================================
    /// Runs the page's before-unload handler.
    ///
    /// Answered by `view.shouldCloseAck`.
    #[serde(rename = "view.shouldClose")]
    ShouldClose,

    /// Runs the page's unload handler for a cross-site transition.
    ///
    /// Answered by `view.closePageAck`, echoing the handoff identifiers.
    #[serde(rename = "view.closePage")]
    ClosePage {
        /// Process of the view taking over.
        #[serde(rename = "newProcessId")]
        new_process_id: ProcessId,
        /// Request waiting for the unload to finish.
        #[serde(rename = "newRequestId")]
        new_request_id: CrossSiteRequestId,
    },

    /// Runs the page's unload handler because the tab is closing.
    #[serde(rename = "view.closePageForTab")]
    ClosePageForTabClose,

    // ========================================================================
    // Dialogs
    // ========================================================================
    /// A JavaScript dialog was dismissed.
    #[serde(rename = "dialog.javaScriptClosed")]
    JavaScriptDialogClosed {
        /// Whether the user accepted.
        success: bool,
        /// Text entered into a prompt.
        prompt: String,
    },

    /// A modal window was closed.
    #[serde(rename = "dialog.modalClosed")]
    ModalClosed,

    /// A file chooser was dismissed.
    #[serde(rename = "dialog.fileChooserClosed")]
    FileChooserClosed {
        /// Selected files, empty on cancel.
        paths: Vec<PathBuf>,
    },

    // ========================================================================
    // Content
    // ========================================================================
    /// Searches the page for text.
    #[serde(rename = "find.start")]
    Find {
        /// Correlates `find.reply` messages.
        #[serde(rename = "requestId")]
        request_id: u32,
        /// Text to search for.
        text: String,
        /// Search direction.
        forward: bool,
        /// Case sensitivity.
        #[serde(rename = "matchCase")]
        match_case: bool,
        /// Continue from the previous match.
        #[serde(rename = "findNext")]
        find_next: bool,
    },

    /// Ends the find session.
    #[serde(rename = "find.stop")]
    StopFinding {
        /// Clear the current selection too.
        #[serde(rename = "clearSelection")]
        clear_selection: bool,
    },

    /// Runs script in a frame addressed by XPath.
    #[serde(rename = "script.executeInFrame")]
    ExecuteScript {
        /// Frame XPath, empty for the main frame.
        #[serde(rename = "frameXpath")]
        frame_xpath: String,
        /// Script source.
        script: String,
    },

    // ========================================================================
    // Debugger
    // ========================================================================
    /// Attaches the debugger.
    #[serde(rename = "debugger.attach")]
    DebugAttach,

    /// Detaches the debugger.
    #[serde(rename = "debugger.detach")]
    DebugDetach,
}

impl ViewMsg {
    /// Returns `true` if the renderer must acknowledge this message.
    ///
    /// The hang monitor runs while such an acknowledgment is outstanding.
    #[inline]
    #[must_use]
    pub fn expects_ack(&self) -> bool {
        matches!(
            self,
            Self::ShouldClose | Self::ClosePage { .. } | Self::ClosePageForTabClose
        )
    }
}

// ============================================================================
// NavigateParams
// ============================================================================

/// Parameters of a main-frame navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateParams {
    /// Page ID of the history entry being revisited, `None` for a new entry.
    #[serde(rename = "pageId", skip_serializing_if = "Option::is_none")]
    pub page_id: Option<PageId>,

    /// Destination.
    pub url: Url,

    /// Referring page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<Url>,

    /// How the navigation was initiated.
    pub transition: PageTransition,

    /// Reload instead of a fresh load.
    #[serde(default)]
    pub reload: bool,
}

impl NavigateParams {
    /// Creates parameters for a new-entry navigation.
    #[inline]
    #[must_use]
    pub fn new(url: Url, transition: PageTransition) -> Self {
        Self {
            page_id: None,
            url,
            referrer: None,
            transition,
            reload: false,
        }
    }

    /// Sets the referrer.
    #[inline]
    #[must_use]
    pub fn with_referrer(mut self, referrer: Url) -> Self {
        self.referrer = Some(referrer);
        self
    }
}

// ============================================================================
// PageTransition
// ============================================================================

/// How a navigation was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageTransition {
    /// Followed a link.
    #[default]
    Link,
    /// Typed into the location bar.
    Typed,
    /// Chosen from a bookmark or suggestion.
    AutoBookmark,
    /// Subframe loaded automatically.
    AutoSubframe,
    /// Subframe navigated by the user.
    ManualSubframe,
    /// Generated from location-bar input that was not a URL.
    Generated,
    /// Start page.
    StartPage,
    /// Form submission.
    FormSubmit,
    /// Reload.
    Reload,
}

impl PageTransition {
    /// Returns `true` for subframe transitions.
    #[inline]
    #[must_use]
    pub fn is_subframe(&self) -> bool {
        matches!(self, Self::AutoSubframe | Self::ManualSubframe)
    }
}

// ============================================================================
// Tests
// ============================================================================
