//! Inbound messages from a renderer view to the browser.
//!
//! Raw messages arrive as [`InboundMessage`] and are decoded exactly once,
//! at the channel boundary, into the closed [`ViewHostMsg`] union. Every
//! handler downstream matches on that union exhaustively.
//!
//! # Decoding rules
//!
//! | Input | Result |
//! |-------|--------|
//! | known method, valid params | `Ok(variant)` |
//! | known method, malformed params | `Err(Error::BadMessage)` |
//! | unknown method | `Ok(ViewHostMsg::Unknown)` |
//!
//! URLs are carried as raw strings: they come from an untrusted process and
//! are validated against the security policy before use.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CrossSiteRequestId, PageId, ProcessId, RoutingId};

use super::PageTransition;

// ============================================================================
// InboundMessage
// ============================================================================

/// A raw message from a renderer view.
///
/// # Format
///
/// ```json
/// {
///   "routingId": 4,
///   "method": "frame.navigate",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// View that sent the message.
    #[serde(rename = "routingId")]
    pub routing_id: RoutingId,

    /// Message name in `module.methodName` format.
    pub method: String,

    /// Message-specific data.
    #[serde(default)]
    pub params: Value,
}

impl InboundMessage {
    /// Creates a raw message.
    #[inline]
    #[must_use]
    pub fn new(routing_id: RoutingId, method: impl Into<String>, params: Value) -> Self {
        Self {
            routing_id,
            method: method.into(),
            params,
        }
    }

    /// Decodes the message into its typed form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadMessage`] if the method is known but its params
    /// do not decode.
    pub fn parse(&self, process_id: ProcessId) -> Result<ViewHostMsg> {
        let msg = match self.method.as_str() {
            "view.ready" => ViewHostMsg::RenderViewReady,
            "view.gone" => ViewHostMsg::RenderViewGone,
            "frame.navigate" => ViewHostMsg::FrameNavigate(self.params(process_id)?),
            "view.updateTitle" => {
                let p: UpdateTitleParams = self.params(process_id)?;
                ViewHostMsg::UpdateTitle {
                    page_id: p.page_id,
                    title: p.title,
                }
            }
            "view.didStartLoading" => ViewHostMsg::DidStartLoading,
            "view.didStopLoading" => ViewHostMsg::DidStopLoading,
            "dialog.runJavaScript" => ViewHostMsg::RunJavaScriptMessage(self.params(process_id)?),
            "dialog.runBeforeUnload" => {
                let p: MessageParams = self.params(process_id)?;
                ViewHostMsg::RunBeforeUnloadConfirm { message: p.message }
            }
            "dialog.runModal" => {
                let p: UrlParams = self.params(process_id)?;
                ViewHostMsg::RunModal { url: p.url }
            }
            "dialog.runFileChooser" => ViewHostMsg::RunFileChooser(self.params(process_id)?),
            "view.contextMenu" => ViewHostMsg::ShowContextMenu(self.params(process_id)?),
            "view.startDragging" => {
                let p: UrlParams = self.params(process_id)?;
                ViewHostMsg::StartDragging { url: p.url }
            }
            "view.shouldCloseAck" => {
                let p: ShouldCloseAckParams = self.params(process_id)?;
                ViewHostMsg::ShouldCloseAck { proceed: p.proceed }
            }
            "view.closePageAck" => ViewHostMsg::ClosePageAck(self.params(process_id)?),
            "view.unloadListenerChanged" => {
                let p: UnloadListenerParams = self.params(process_id)?;
                ViewHostMsg::UnloadListenerChanged {
                    has_listener: p.has_listener,
                }
            }
            "view.close" => ViewHostMsg::Close,
            "dom.operationResponse" => {
                let p: DomOperationParams = self.params(process_id)?;
                ViewHostMsg::DomOperationResponse { json: p.json }
            }
            "find.reply" => ViewHostMsg::FindReply(self.params(process_id)?),
            _ => ViewHostMsg::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        };
        Ok(msg)
    }

    /// Decodes params into `T`, mapping failure to a bad-message error.
    fn params<T: DeserializeOwned>(&self, process_id: ProcessId) -> Result<T> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| Error::bad_message(process_id, self.method.as_str(), e.to_string()))
    }
}

// ============================================================================
// ViewHostMsg
// ============================================================================

/// Decoded message from a renderer view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewHostMsg {
    /// The renderer finished creating the view.
    RenderViewReady,

    /// The renderer reports the view crashed.
    RenderViewGone,

    /// A frame committed a navigation.
    FrameNavigate(FrameNavigateParams),

    /// The page title changed.
    UpdateTitle {
        /// Page the title belongs to.
        page_id: PageId,
        /// New title.
        title: String,
    },

    /// The page started loading.
    DidStartLoading,

    /// The page stopped loading.
    DidStopLoading,

    /// The page opened an alert, confirm or prompt.
    RunJavaScriptMessage(JavaScriptDialogParams),

    /// The before-unload handler wants the user to confirm leaving.
    RunBeforeUnloadConfirm {
        /// Handler-supplied text.
        message: String,
    },

    /// The page opened a modal window.
    RunModal {
        /// Unvalidated URL of the modal.
        url: String,
    },

    /// The page opened a file chooser.
    RunFileChooser(FileChooserParams),

    /// The user opened a context menu.
    ShowContextMenu(ContextMenuParams),

    /// The user started dragging content.
    StartDragging {
        /// Unvalidated URL being dragged.
        url: String,
    },

    /// Answer to `view.shouldClose`.
    ShouldCloseAck {
        /// `true` if the page agreed to be left.
        proceed: bool,
    },

    /// Answer to `view.closePage` or `view.closePageForTab`.
    ClosePageAck(ClosePageAckParams),

    /// The page added or removed its last unload listener.
    UnloadListenerChanged {
        /// Whether an unload listener is registered.
        has_listener: bool,
    },

    /// The page asked to close its window.
    Close,

    /// A page script answered through the DOM automation hook.
    DomOperationResponse {
        /// Payload, usually a JSON string.
        json: String,
    },

    /// Result of a find request.
    FindReply(FindReplyParams),

    /// Any message without a handler.
    Unknown {
        /// Message method.
        method: String,
        /// Message params.
        params: Value,
    },
}

impl ViewHostMsg {
    /// Returns `true` if this message acknowledges an unload request.
    #[inline]
    #[must_use]
    pub fn is_unload_ack(&self) -> bool {
        matches!(self, Self::ShouldCloseAck { .. } | Self::ClosePageAck(_))
    }
}

// ============================================================================
// Param Types
// ============================================================================

/// Parameters of `frame.navigate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNavigateParams {
    /// Page ID assigned by the renderer.
    #[serde(rename = "pageId")]
    pub page_id: PageId,

    /// Unvalidated committed URL.
    pub url: String,

    /// Unvalidated referrer.
    #[serde(default)]
    pub referrer: Option<String>,

    /// How the navigation was initiated.
    #[serde(default)]
    pub transition: PageTransition,

    /// `false` for subframe commits.
    #[serde(rename = "isMainFrame", default = "default_true")]
    pub is_main_frame: bool,

    /// HTTP status of the committed response.
    #[serde(rename = "httpStatus", default = "default_http_status")]
    pub http_status: u16,
}

/// Parameters of `dialog.runJavaScript`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JavaScriptDialogParams {
    /// Dialog kind.
    pub kind: JavaScriptDialogKind,
    /// Dialog text.
    pub message: String,
    /// Initial prompt text.
    #[serde(rename = "defaultPrompt", default)]
    pub default_prompt: String,
}

/// Kind of a JavaScript dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaScriptDialogKind {
    /// `alert()`.
    Alert,
    /// `confirm()`.
    Confirm,
    /// `prompt()`.
    Prompt,
}

/// Parameters of `dialog.runFileChooser`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChooserParams {
    /// Allow selecting several files.
    #[serde(default)]
    pub multiple: bool,
    /// Suggested starting path.
    #[serde(rename = "defaultPath", default)]
    pub default_path: Option<PathBuf>,
}

/// Parameters of `view.contextMenu`.
///
/// Every URL is unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMenuParams {
    /// Link under the cursor.
    #[serde(rename = "linkUrl", default)]
    pub link_url: String,
    /// Image or media source under the cursor.
    #[serde(rename = "srcUrl", default)]
    pub src_url: String,
    /// URL of the top-level page.
    #[serde(rename = "pageUrl", default)]
    pub page_url: String,
    /// URL of the frame.
    #[serde(rename = "frameUrl", default)]
    pub frame_url: String,
    /// Selected text.
    #[serde(rename = "selectionText", default)]
    pub selection_text: String,
}

/// Parameters of `view.closePageAck`.
///
/// The handoff identifiers are echoed back for cross-site closes and absent
/// for tab closes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosePageAckParams {
    /// Process of the view taking over.
    #[serde(rename = "newProcessId", default)]
    pub new_process_id: Option<ProcessId>,
    /// Request waiting for the unload.
    #[serde(rename = "newRequestId", default)]
    pub new_request_id: Option<CrossSiteRequestId>,
}

/// Parameters of `find.reply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindReplyParams {
    /// Request this reply answers.
    #[serde(rename = "requestId")]
    pub request_id: u32,
    /// Total matches found so far.
    #[serde(rename = "numberOfMatches")]
    pub number_of_matches: u32,
    /// Ordinal of the highlighted match.
    #[serde(rename = "activeMatchOrdinal", default)]
    pub active_match_ordinal: u32,
    /// No more replies follow.
    #[serde(rename = "finalUpdate", default)]
    pub final_update: bool,
}

#[derive(Deserialize)]
struct UpdateTitleParams {
    #[serde(rename = "pageId")]
    page_id: PageId,
    title: String,
}

#[derive(Deserialize)]
struct MessageParams {
    message: String,
}

#[derive(Deserialize)]
struct UrlParams {
    url: String,
}

#[derive(Deserialize)]
struct ShouldCloseAckParams {
    proceed: bool,
}

#[derive(Deserialize)]
struct UnloadListenerParams {
    #[serde(rename = "hasListener")]
    has_listener: bool,
}

#[derive(Deserialize)]
struct DomOperationParams {
    json: String,
}

fn default_true() -> bool {
    true
}

fn default_http_status() -> u16 {
    200
}

// ============================================================================
// Tests
// ============================================================================
