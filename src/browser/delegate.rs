//! Host-to-tab callbacks.
//!
//! A [`RenderViewHost`](super::RenderViewHost) never holds a reference to the
//! tab that owns it. Every operation that can produce a notification takes
//! the delegate as an explicit `&mut dyn RenderViewHostDelegate` borrow for
//! the duration of the call.
//!
//! [`HostEventQueue`] is a delegate that records every callback. Tabs use it
//! to collect what a host reported and act on it once the host borrow ends.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use url::Url;

use crate::identifiers::{GlobalRoutingId, PageId};
use crate::protocol::{
    ContextMenuParams, FileChooserParams, FindReplyParams, JavaScriptDialogParams, PageTransition,
};

// ============================================================================
// FrameCommit
// ============================================================================

/// A navigation commit reported by a renderer, after URL validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommit {
    /// Renderer-assigned page ID.
    pub page_id: PageId,
    /// Committed URL, `about:blank` if the renderer had no right to it.
    pub url: Url,
    /// Referrer, neutralised the same way.
    pub referrer: Option<Url>,
    /// How the navigation was initiated.
    pub transition: PageTransition,
    /// `false` for subframe commits.
    pub is_main_frame: bool,
    /// HTTP status of the response.
    pub http_status: u16,
}

// ============================================================================
// RenderViewHostDelegate
// ============================================================================

/// Receiver of render view host notifications.
///
/// Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait RenderViewHostDelegate {
    /// A renderer-side view now exists.
    fn render_view_created(&mut self, route: GlobalRoutingId) {}

    /// The renderer finished setting the view up.
    fn render_view_ready(&mut self, route: GlobalRoutingId) {}

    /// The renderer backing a live view went away.
    fn render_view_gone(&mut self, route: GlobalRoutingId) {}

    /// A frame committed a navigation.
    fn did_navigate(&mut self, route: GlobalRoutingId, commit: &FrameCommit) {}

    /// The page title changed.
    fn update_title(&mut self, route: GlobalRoutingId, page_id: PageId, title: &str) {}

    /// The page started loading.
    fn did_start_loading(&mut self, route: GlobalRoutingId) {}

    /// The page stopped loading.
    fn did_stop_loading(&mut self, route: GlobalRoutingId) {}

    /// The before-unload handler answered.
    fn should_close_page(&mut self, route: GlobalRoutingId, proceed: bool) {}

    /// The unload handler for a tab close finished; the tab may be
    /// destroyed.
    fn close_contents(&mut self, route: GlobalRoutingId) {}

    /// The page asked to close its window.
    fn close_requested(&mut self, route: GlobalRoutingId) {}

    /// The page opened a JavaScript dialog.
    fn run_javascript_message(&mut self, route: GlobalRoutingId, params: &JavaScriptDialogParams) {}

    /// The before-unload handler wants the user to confirm leaving.
    fn run_before_unload_confirm(&mut self, route: GlobalRoutingId, message: &str) {}

    /// The page opened a modal window.
    fn run_modal(&mut self, route: GlobalRoutingId, url: &Url) {}

    /// The page opened a file chooser.
    fn run_file_chooser(&mut self, route: GlobalRoutingId, params: &FileChooserParams) {}

    /// The user opened a context menu. URLs are already validated.
    fn show_context_menu(&mut self, route: GlobalRoutingId, params: &ContextMenuParams) {}

    /// The user started dragging content.
    fn start_dragging(&mut self, route: GlobalRoutingId, url: &Url) {}

    /// The renderer missed an acknowledgment deadline.
    fn renderer_unresponsive(&mut self, route: GlobalRoutingId, during_unload: bool) {}

    /// A renderer reported unresponsive answered after all.
    fn renderer_responsive(&mut self, route: GlobalRoutingId) {}

    /// A page script answered through the DOM automation hook.
    fn dom_operation_response(&mut self, route: GlobalRoutingId, json: &str) {}

    /// A find request produced results.
    fn find_reply(&mut self, route: GlobalRoutingId, reply: &FindReplyParams) {}
}

// ============================================================================
// HostEvent
// ============================================================================

/// Owned form of one delegate callback.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// See [`RenderViewHostDelegate::render_view_created`].
    RenderViewCreated,
    /// See [`RenderViewHostDelegate::render_view_ready`].
    RenderViewReady,
    /// See [`RenderViewHostDelegate::render_view_gone`].
    RenderViewGone,
    /// See [`RenderViewHostDelegate::did_navigate`].
    DidNavigate(FrameCommit),
    /// See [`RenderViewHostDelegate::update_title`].
    UpdateTitle {
        /// Page the title belongs to.
        page_id: PageId,
        /// New title.
        title: String,
    },
    /// See [`RenderViewHostDelegate::did_start_loading`].
    DidStartLoading,
    /// See [`RenderViewHostDelegate::did_stop_loading`].
    DidStopLoading,
    /// See [`RenderViewHostDelegate::should_close_page`].
    ShouldClosePage {
        /// Handler answer.
        proceed: bool,
    },
    /// See [`RenderViewHostDelegate::close_contents`].
    CloseContents,
    /// See [`RenderViewHostDelegate::close_requested`].
    CloseRequested,
    /// See [`RenderViewHostDelegate::run_javascript_message`].
    RunJavaScriptMessage(JavaScriptDialogParams),
    /// See [`RenderViewHostDelegate::run_before_unload_confirm`].
    RunBeforeUnloadConfirm {
        /// Handler-supplied text.
        message: String,
    },
    /// See [`RenderViewHostDelegate::run_modal`].
    RunModal {
        /// Validated modal URL.
        url: Url,
    },
    /// See [`RenderViewHostDelegate::run_file_chooser`].
    RunFileChooser(FileChooserParams),
    /// See [`RenderViewHostDelegate::show_context_menu`].
    ShowContextMenu(ContextMenuParams),
    /// See [`RenderViewHostDelegate::start_dragging`].
    StartDragging {
        /// Validated URL.
        url: Url,
    },
    /// See [`RenderViewHostDelegate::renderer_unresponsive`].
    RendererUnresponsive {
        /// An unload acknowledgment was outstanding.
        during_unload: bool,
    },
    /// See [`RenderViewHostDelegate::renderer_responsive`].
    RendererResponsive,
    /// See [`RenderViewHostDelegate::dom_operation_response`].
    DomOperationResponse {
        /// Payload.
        json: String,
    },
    /// See [`RenderViewHostDelegate::find_reply`].
    FindReply(FindReplyParams),
}

// ============================================================================
// HostEventQueue
// ============================================================================

/// Delegate that queues every callback in arrival order.
#[derive(Debug, Default)]
pub struct HostEventQueue {
    events: VecDeque<(GlobalRoutingId, HostEvent)>,
}

impl HostEventQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the oldest event.
    #[inline]
    pub fn pop(&mut self) -> Option<(GlobalRoutingId, HostEvent)> {
        self.events.pop_front()
    }

    /// Removes and returns every event.
    pub fn take(&mut self) -> Vec<(GlobalRoutingId, HostEvent)> {
        self.events.drain(..).collect()
    }

    /// Returns the queued events without the routes.
    #[must_use]
    pub fn kinds(&self) -> Vec<&HostEvent> {
        self.events.iter().map(|(_, event)| event).collect()
    }

    /// Returns the number of queued events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, route: GlobalRoutingId, event: HostEvent) {
        self.events.push_back((route, event));
    }
}

impl RenderViewHostDelegate for HostEventQueue {
    fn render_view_created(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::RenderViewCreated);
    }

    fn render_view_ready(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::RenderViewReady);
    }

    fn render_view_gone(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::RenderViewGone);
    }

    fn did_navigate(&mut self, route: GlobalRoutingId, commit: &FrameCommit) {
        self.push(route, HostEvent::DidNavigate(commit.clone()));
    }

    fn update_title(&mut self, route: GlobalRoutingId, page_id: PageId, title: &str) {
        self.push(
            route,
            HostEvent::UpdateTitle {
                page_id,
                title: title.to_string(),
            },
        );
    }

    fn did_start_loading(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::DidStartLoading);
    }

    fn did_stop_loading(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::DidStopLoading);
    }

    fn should_close_page(&mut self, route: GlobalRoutingId, proceed: bool) {
        self.push(route, HostEvent::ShouldClosePage { proceed });
    }

    fn close_contents(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::CloseContents);
    }

    fn close_requested(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::CloseRequested);
    }

    fn run_javascript_message(&mut self, route: GlobalRoutingId, params: &JavaScriptDialogParams) {
        self.push(route, HostEvent::RunJavaScriptMessage(params.clone()));
    }

    fn run_before_unload_confirm(&mut self, route: GlobalRoutingId, message: &str) {
        self.push(
            route,
            HostEvent::RunBeforeUnloadConfirm {
                message: message.to_string(),
            },
        );
    }

    fn run_modal(&mut self, route: GlobalRoutingId, url: &Url) {
        self.push(route, HostEvent::RunModal { url: url.clone() });
    }

    fn run_file_chooser(&mut self, route: GlobalRoutingId, params: &FileChooserParams) {
        self.push(route, HostEvent::RunFileChooser(params.clone()));
    }

    fn show_context_menu(&mut self, route: GlobalRoutingId, params: &ContextMenuParams) {
        self.push(route, HostEvent::ShowContextMenu(params.clone()));
    }

    fn start_dragging(&mut self, route: GlobalRoutingId, url: &Url) {
        self.push(route, HostEvent::StartDragging { url: url.clone() });
    }

    fn renderer_unresponsive(&mut self, route: GlobalRoutingId, during_unload: bool) {
        self.push(route, HostEvent::RendererUnresponsive { during_unload });
    }

    fn renderer_responsive(&mut self, route: GlobalRoutingId) {
        self.push(route, HostEvent::RendererResponsive);
    }

    fn dom_operation_response(&mut self, route: GlobalRoutingId, json: &str) {
        self.push(
            route,
            HostEvent::DomOperationResponse {
                json: json.to_string(),
            },
        );
    }

    fn find_reply(&mut self, route: GlobalRoutingId, reply: &FindReplyParams) {
        self.push(route, HostEvent::FindReply(reply.clone()));
    }
}

// ============================================================================
// Tests
// ============================================================================
