//! Browser-side proxy for one renderer view.
//!
//! A [`RenderViewHost`] turns high-level intent (navigate, find, run script,
//! close) into [`ViewMsg`]s for its renderer, and decodes what the renderer
//! sends back into [`RenderViewHostDelegate`] callbacks.
//!
//! # Renderer State
//!
//! ```text
//!                create_render_view()
//! NotCreated ─────────────────────────► Live(Idle) ◄──────────────┐
//!                                         │    │                  │ ack
//!                  fire_page_before_unload│    │close_page*       │
//!                                         ▼    ▼                  │
//!                     Live(AwaitingBeforeUnload / AwaitingClosePage)
//!
//! any state ──renderer_process_gone()──► Gone ──create_render_view()──► Live
//! ```
//!
//! Waiting for an unload acknowledgment is part of the live state, so a view
//! that is not live can never be waiting for one.
//!
//! # Navigation Gate
//!
//! While suspended, one navigation may be buffered. Buffering a second one
//! is a caller bug: the manager discards a pending host before it starts
//! another navigation.
//!
//! # Hang Monitor
//!
//! Messages that expect an acknowledgment start a deadline.
//! [`RenderViewHost::check_responsiveness`] reports a missed deadline once;
//! a late acknowledgment reports the renderer responsive again. Open
//! dialogs pause the deadline.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{CrossSiteRequestId, GlobalRoutingId, ProcessId, RoutingId};
use crate::protocol::{
    ClosePageAckParams, ContextMenuParams, FrameNavigateParams, InboundMessage, NavigateParams,
    PageTransition, ViewHostMsg, ViewMsg,
};
use crate::security::{BindingsPolicy, blank_url};
use crate::transport::{GatewayCommand, RenderProcessHost};

use super::delegate::{FrameCommit, RenderViewHostDelegate};
use super::navigation::NavigationEntry;
use super::services::HostServices;
use super::site_instance::SiteInstance;

// ============================================================================
// State Types
// ============================================================================

/// Why an unload handler is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadReason {
    /// A cross-site navigation is replacing the page.
    CrossSite {
        /// Process of the view taking over.
        new_process_id: ProcessId,
        /// Request held until the unload finishes.
        new_request_id: CrossSiteRequestId,
    },
    /// The tab is closing.
    TabClose,
}

/// Unload handshake of a live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadState {
    /// Nothing outstanding.
    Idle,
    /// `view.shouldClose` sent, answer pending.
    AwaitingBeforeUnload,
    /// `view.closePage*` sent, answer pending.
    AwaitingClosePage(UnloadReason),
}

/// Life of the renderer-side view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// `create_render_view` has not succeeded yet.
    NotCreated,
    /// The renderer holds the view.
    Live(UnloadState),
    /// The renderer went away.
    Gone,
}

#[derive(Debug)]
enum NavigationGate {
    Open,
    Suspended { buffered: Option<NavigateParams> },
}

// ============================================================================
// HangMonitor
// ============================================================================

/// Deadline for an outstanding acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct HangMonitor {
    deadline: Option<Instant>,
    reported: bool,
    starts: u32,
}

impl HangMonitor {
    /// Starts (or restarts) the deadline.
    pub fn start(&mut self, now: Instant, timeout: Duration) {
        self.deadline = Some(now + timeout);
        self.reported = false;
        self.starts += 1;
    }

    /// Stops the deadline.
    ///
    /// Returns `true` if the renderer had been reported unresponsive.
    pub fn stop(&mut self) -> bool {
        self.deadline = None;
        mem::take(&mut self.reported)
    }

    /// Returns `true` the first time the deadline is found expired.
    pub fn check(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.reported && now >= deadline => {
                self.reported = true;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while a deadline is set.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` after an expiry was reported and before the ack.
    #[inline]
    #[must_use]
    pub fn has_reported(&self) -> bool {
        self.reported
    }

    /// Returns how many times the deadline was started.
    #[inline]
    #[must_use]
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

// ============================================================================
// ModalDialogSignal
// ============================================================================

/// Shared "a blocking dialog is showing" flag.
///
/// Cheap to clone; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ModalDialogSignal(Arc<AtomicBool>);

impl ModalDialogSignal {
    /// Returns `true` while at least one dialog is open.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}

// ============================================================================
// FindOptions
// ============================================================================

/// Options of a find request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Search forward.
    pub forward: bool,
    /// Case-sensitive.
    pub match_case: bool,
    /// Continue from the previous match.
    pub find_next: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            forward: true,
            match_case: false,
            find_next: false,
        }
    }
}

// ============================================================================
// RenderViewHost
// ============================================================================

/// Proxy for one renderer view.
///
/// Owned by a [`RenderViewHostManager`](super::RenderViewHostManager) or an
/// [`InterstitialPage`](super::InterstitialPage). Dropping the host shuts it
/// down.
pub struct RenderViewHost {
    route: GlobalRoutingId,
    site_instance: SiteInstance,
    process: RenderProcessHost,
    services: HostServices,
    state: RendererState,
    gate: NavigationGate,
    hang: HangMonitor,
    modal_dialog_count: u32,
    modal_dialog_signal: ModalDialogSignal,
    has_unload_listener: bool,
    debugger_attached: bool,
    bindings: BindingsPolicy,
    next_find_request_id: u32,
    shut_down: bool,
}

impl fmt::Debug for RenderViewHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderViewHost")
            .field("route", &self.route)
            .field("site_instance", &self.site_instance.id())
            .field("state", &self.state)
            .field("suspended", &self.are_navigations_suspended())
            .field("modal_dialog_count", &self.modal_dialog_count)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RenderViewHost - Constructor
// ============================================================================

impl RenderViewHost {
    /// Creates a host for `site_instance` on that instance's process.
    ///
    /// The process is not launched until [`create_render_view`](Self::create_render_view).
    #[must_use]
    pub fn new(site_instance: SiteInstance, services: HostServices) -> Self {
        let process = services
            .processes
            .process_for_site_instance(site_instance.id());
        let routing_id = RoutingId::next();
        process.add_route(routing_id);

        let route = GlobalRoutingId::new(process.id(), routing_id);
        debug!(route = %route, site_instance = %site_instance.id(), "Render view host created");

        Self {
            route,
            site_instance,
            process,
            services,
            state: RendererState::NotCreated,
            gate: NavigationGate::Open,
            hang: HangMonitor::default(),
            modal_dialog_count: 0,
            modal_dialog_signal: ModalDialogSignal::default(),
            has_unload_listener: false,
            debugger_attached: false,
            bindings: BindingsPolicy::NONE,
            next_find_request_id: 0,
            shut_down: false,
        }
    }
}

// ============================================================================
// RenderViewHost - Accessors
// ============================================================================

impl RenderViewHost {
    /// Returns `(process_id, routing_id)`.
    #[inline]
    #[must_use]
    pub fn route(&self) -> GlobalRoutingId {
        self.route
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.route.process_id
    }

    /// Returns the routing ID.
    #[inline]
    #[must_use]
    pub fn routing_id(&self) -> RoutingId {
        self.route.routing_id
    }

    /// Returns the site instance, fixed for the host's lifetime.
    #[inline]
    #[must_use]
    pub fn site_instance(&self) -> &SiteInstance {
        &self.site_instance
    }

    /// Returns the backing process.
    #[inline]
    #[must_use]
    pub fn process(&self) -> &RenderProcessHost {
        &self.process
    }

    /// Returns the renderer state.
    #[inline]
    #[must_use]
    pub fn renderer_state(&self) -> RendererState {
        self.state
    }

    /// Returns `true` once the view was created and until it goes away.
    #[inline]
    #[must_use]
    pub fn renderer_initialized(&self) -> bool {
        matches!(self.state, RendererState::Live(_))
    }

    /// Returns `true` if the view exists and its process is reachable.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.shut_down && self.renderer_initialized() && self.process.is_live()
    }

    /// Returns `true` while navigations are buffered instead of sent.
    #[inline]
    #[must_use]
    pub fn are_navigations_suspended(&self) -> bool {
        matches!(self.gate, NavigationGate::Suspended { .. })
    }

    /// Returns `true` if a navigation is buffered.
    #[inline]
    #[must_use]
    pub fn has_buffered_navigation(&self) -> bool {
        matches!(self.gate, NavigationGate::Suspended { buffered: Some(_) })
    }

    /// Returns `true` while a before-unload or unload answer is pending.
    #[inline]
    #[must_use]
    pub fn is_waiting_for_unload_ack(&self) -> bool {
        matches!(
            self.state,
            RendererState::Live(UnloadState::AwaitingBeforeUnload | UnloadState::AwaitingClosePage(_))
        )
    }

    /// Returns `true` if the page registered an unload listener.
    #[inline]
    #[must_use]
    pub fn has_unload_listener(&self) -> bool {
        self.has_unload_listener
    }

    /// Returns `true` while a debugger is attached.
    #[inline]
    #[must_use]
    pub fn debugger_attached(&self) -> bool {
        self.debugger_attached
    }

    /// Returns the number of open dialogs.
    #[inline]
    #[must_use]
    pub fn modal_dialog_count(&self) -> u32 {
        self.modal_dialog_count
    }

    /// Returns the shared dialog flag.
    #[inline]
    #[must_use]
    pub fn modal_dialog_signal(&self) -> ModalDialogSignal {
        self.modal_dialog_signal.clone()
    }

    /// Returns the bindings the view is allowed.
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> BindingsPolicy {
        self.bindings
    }

    /// Returns the hang monitor.
    #[inline]
    #[must_use]
    pub fn hang_monitor(&self) -> &HangMonitor {
        &self.hang
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) ran.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

// ============================================================================
// RenderViewHost - Lifecycle
// ============================================================================

impl RenderViewHost {
    /// Creates the renderer-side view.
    ///
    /// Does nothing if the view is already live. Otherwise launches the
    /// process if needed, sends the setup messages and tells the delegate
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessLaunchFailed`] if the process cannot start, or
    /// [`Error::ChannelClosed`] if it dies during setup.
    pub fn create_render_view(&mut self, delegate: &mut dyn RenderViewHostDelegate) -> Result<()> {
        if self.shut_down {
            return Err(Error::renderer_not_live(self.route));
        }
        if self.is_live() {
            return Ok(());
        }

        self.process.init()?;
        self.send(ViewMsg::CreateView)?;

        if !self.bindings.is_empty() {
            self.services
                .policy
                .grant_bindings(self.process_id(), self.bindings);
            self.send(ViewMsg::AllowBindings {
                bindings: self.bindings,
            })?;
        }

        self.state = RendererState::Live(UnloadState::Idle);
        debug!(route = %self.route, "Render view created");
        delegate.render_view_created(self.route);
        Ok(())
    }

    /// Records that the renderer went away.
    ///
    /// Resets navigation suspension, dialogs and the hang monitor, and tells
    /// the delegate if the view was live.
    pub fn renderer_process_gone(&mut self, delegate: &mut dyn RenderViewHostDelegate) {
        let was_live = self.renderer_initialized();

        self.state = RendererState::Gone;
        self.gate = NavigationGate::Open;
        self.hang.stop();
        self.modal_dialog_count = 0;
        self.modal_dialog_signal.set(false);
        self.has_unload_listener = false;
        self.debugger_attached = false;

        if was_live {
            debug!(route = %self.route, "Render view gone");
            delegate.render_view_gone(self.route);
        }
    }

    /// Destroys the renderer-side view and releases the route.
    ///
    /// Idempotent. The process shuts down with its last view.
    pub fn shutdown(&mut self) {
        if mem::replace(&mut self.shut_down, true) {
            return;
        }

        if self.renderer_initialized() && self.process.is_live() {
            let _ = self.process.send(self.route.routing_id, ViewMsg::Close);
        }

        self.state = RendererState::Gone;
        self.gate = NavigationGate::Open;
        self.hang.stop();
        self.modal_dialog_signal.set(false);
        self.services.processes.release(self.route);
        debug!(route = %self.route, "Render view host shut down");
    }

    /// Grants privileged bindings to the view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] once the view was created.
    pub fn allow_bindings(&mut self, bindings: BindingsPolicy) -> Result<()> {
        if self.state != RendererState::NotCreated {
            error!(route = %self.route, "Bindings must be allowed before the view is created");
            return Err(Error::contract(format!(
                "bindings changed after view {} was created",
                self.route
            )));
        }
        self.bindings = self.bindings | bindings;
        Ok(())
    }
}

// ============================================================================
// RenderViewHost - Navigation
// ============================================================================

impl RenderViewHost {
    /// Navigates to a history entry.
    ///
    /// # Errors
    ///
    /// See [`navigate`](Self::navigate).
    pub fn navigate_to_entry(&mut self, entry: &NavigationEntry, is_reload: bool) -> Result<()> {
        let params = NavigateParams {
            page_id: entry.page_id,
            url: entry.url.clone(),
            referrer: entry.referrer.clone(),
            transition: if is_reload {
                PageTransition::Reload
            } else {
                entry.transition
            },
            reload: is_reload,
        };
        self.navigate(params)
    }

    /// Navigates to a URL as a link click.
    ///
    /// # Errors
    ///
    /// See [`navigate`](Self::navigate).
    pub fn navigate_to_url(&mut self, url: Url) -> Result<()> {
        self.navigate(NavigateParams::new(url, PageTransition::Link))
    }

    /// Grants the destination to the process, then sends or buffers the
    /// navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if a navigation is already
    /// buffered, or a channel error if sending fails.
    pub fn navigate(&mut self, params: NavigateParams) -> Result<()> {
        self.services
            .policy
            .grant_request_url(self.process_id(), &params.url);

        let NavigationGate::Suspended { buffered } = &mut self.gate else {
            trace!(route = %self.route, url = %params.url, "Navigation sent");
            return self.send(ViewMsg::Navigate(params));
        };

        if let Some(existing) = buffered.as_ref() {
            error!(
                route = %self.route,
                buffered = %existing.url,
                requested = %params.url,
                "Second navigation while suspended"
            );
            return Err(Error::contract(format!(
                "view {} already holds a suspended navigation",
                self.route
            )));
        }

        trace!(route = %self.route, url = %params.url, "Navigation buffered");
        *buffered = Some(params);
        Ok(())
    }

    /// Suspends or resumes navigations.
    ///
    /// Resuming sends the buffered navigation, if any.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the buffered navigation cannot be sent.
    pub fn set_navigations_suspended(&mut self, suspend: bool) -> Result<()> {
        if suspend {
            if matches!(self.gate, NavigationGate::Open) {
                self.gate = NavigationGate::Suspended { buffered: None };
            }
            return Ok(());
        }

        match mem::replace(&mut self.gate, NavigationGate::Open) {
            NavigationGate::Suspended {
                buffered: Some(params),
            } => {
                debug!(route = %self.route, url = %params.url, "Flushing suspended navigation");
                self.send(ViewMsg::Navigate(params))
            }
            NavigationGate::Suspended { buffered: None } | NavigationGate::Open => Ok(()),
        }
    }

    /// Stops loading.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn stop(&self) -> Result<()> {
        self.send(ViewMsg::Stop)
    }
}

// ============================================================================
// RenderViewHost - Unload
// ============================================================================

impl RenderViewHost {
    /// Asks the page whether it may be left.
    ///
    /// A view that is not live answers "proceed" at once. Calls while an
    /// unload answer is pending do nothing.
    pub fn fire_page_before_unload(&mut self, delegate: &mut dyn RenderViewHostDelegate) {
        if !self.is_live() {
            debug!(route = %self.route, "Before-unload on a view that is not live");
            delegate.should_close_page(self.route, true);
            return;
        }

        if self.is_waiting_for_unload_ack() {
            trace!(route = %self.route, "Before-unload already pending");
            return;
        }

        if let Err(e) = self.send(ViewMsg::ShouldClose) {
            warn!(route = %self.route, error = %e, "Before-unload not delivered");
            delegate.should_close_page(self.route, true);
            return;
        }

        self.state = RendererState::Live(UnloadState::AwaitingBeforeUnload);
        self.hang
            .start(Instant::now(), self.services.options.before_unload_timeout);
    }

    /// Runs the unload handler for a cross-site transition.
    ///
    /// If the view is not live there is no handler to wait for, and the
    /// gateway is told at once that the held response may proceed.
    pub fn close_page(&mut self, new_process_id: ProcessId, new_request_id: CrossSiteRequestId) {
        let reason = UnloadReason::CrossSite {
            new_process_id,
            new_request_id,
        };

        if self.is_live()
            && self
                .send(ViewMsg::ClosePage {
                    new_process_id,
                    new_request_id,
                })
                .is_ok()
        {
            self.begin_close(reason);
            return;
        }

        debug!(route = %self.route, request_id = %new_request_id, "Unload skipped, view not live");
        self.services.gateway.post(GatewayCommand::ClosePageAck {
            new_process_id,
            new_request_id,
        });
    }

    /// Runs the unload handler because the tab is closing.
    ///
    /// A view that is not live lets the tab close at once.
    pub fn close_page_for_tab_close(&mut self, delegate: &mut dyn RenderViewHostDelegate) {
        if self.is_live() && self.send(ViewMsg::ClosePageForTabClose).is_ok() {
            self.begin_close(UnloadReason::TabClose);
            return;
        }

        debug!(route = %self.route, "Tab-close unload skipped, view not live");
        delegate.close_contents(self.route);
    }

    fn begin_close(&mut self, reason: UnloadReason) {
        self.state = RendererState::Live(UnloadState::AwaitingClosePage(reason));
        self.hang
            .start(Instant::now(), self.services.options.unload_timeout);
    }

    /// Reports a missed acknowledgment deadline, once per expiry.
    ///
    /// Returns `true` if the delegate was told.
    pub fn check_responsiveness(
        &mut self,
        now: Instant,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> bool {
        if !self.hang.check(now) {
            return false;
        }
        let during_unload = self.is_waiting_for_unload_ack();
        warn!(route = %self.route, during_unload, "Renderer unresponsive");
        delegate.renderer_unresponsive(self.route, during_unload);
        true
    }

    fn ack_timeout(&self) -> Option<Duration> {
        match self.state {
            RendererState::Live(UnloadState::AwaitingBeforeUnload) => {
                Some(self.services.options.before_unload_timeout)
            }
            RendererState::Live(UnloadState::AwaitingClosePage(_)) => {
                Some(self.services.options.unload_timeout)
            }
            _ => None,
        }
    }

    fn stop_hang_monitor(&mut self, delegate: &mut dyn RenderViewHostDelegate) {
        if self.hang.stop() {
            debug!(route = %self.route, "Renderer responsive again");
            delegate.renderer_responsive(self.route);
        }
    }
}

// ============================================================================
// RenderViewHost - Dialogs
// ============================================================================

impl RenderViewHost {
    /// Replies to a JavaScript or before-unload dialog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if no dialog is open.
    pub fn javascript_dialog_closed(&mut self, success: bool, prompt: impl Into<String>) -> Result<()> {
        self.dialog_closed(ViewMsg::JavaScriptDialogClosed {
            success,
            prompt: prompt.into(),
        })
    }

    /// Replies to a modal window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if no dialog is open.
    pub fn modal_closed(&mut self) -> Result<()> {
        self.dialog_closed(ViewMsg::ModalClosed)
    }

    /// Replies to a file chooser, granting the chosen files first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if no dialog is open.
    pub fn file_chooser_closed(&mut self, paths: Vec<PathBuf>) -> Result<()> {
        for path in &paths {
            match Url::from_file_path(path) {
                Ok(url) => self.services.policy.grant_request_url(self.process_id(), &url),
                Err(()) => {
                    warn!(route = %self.route, path = %path.display(), "Chosen path is not absolute");
                }
            }
        }
        self.dialog_closed(ViewMsg::FileChooserClosed { paths })
    }

    fn dialog_opened(&mut self, delegate: &mut dyn RenderViewHostDelegate) {
        self.modal_dialog_count += 1;
        self.modal_dialog_signal.set(true);
        self.stop_hang_monitor(delegate);
    }

    fn dialog_closed(&mut self, reply: ViewMsg) -> Result<()> {
        if self.modal_dialog_count == 0 {
            if !self.renderer_initialized() {
                debug!(route = %self.route, "Dialog reply after the view went away");
                return Ok(());
            }
            error!(route = %self.route, "Dialog reply without an open dialog");
            return Err(Error::contract(format!(
                "view {} has no open dialog",
                self.route
            )));
        }

        self.modal_dialog_count -= 1;
        if self.modal_dialog_count == 0 {
            self.modal_dialog_signal.set(false);
            if let Some(timeout) = self.ack_timeout() {
                self.hang.start(Instant::now(), timeout);
            }
        }

        self.send(reply)
    }
}

// ============================================================================
// RenderViewHost - Content
// ============================================================================

impl RenderViewHost {
    /// Starts or continues a find session.
    ///
    /// Returns the request ID that `find.reply` messages will carry.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn start_finding(&mut self, text: &str, options: FindOptions) -> Result<u32> {
        self.next_find_request_id = self.next_find_request_id.wrapping_add(1);
        let request_id = self.next_find_request_id;
        self.send(ViewMsg::Find {
            request_id,
            text: text.to_string(),
            forward: options.forward,
            match_case: options.match_case,
            find_next: options.find_next,
        })?;
        Ok(request_id)
    }

    /// Ends the find session.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn stop_finding(&self, clear_selection: bool) -> Result<()> {
        self.send(ViewMsg::StopFinding { clear_selection })
    }

    /// Runs script in a frame; an empty XPath means the main frame.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn execute_javascript_in_frame(&self, frame_xpath: &str, script: &str) -> Result<()> {
        self.send(ViewMsg::ExecuteScript {
            frame_xpath: frame_xpath.to_string(),
            script: script.to_string(),
        })
    }

    /// Attaches or detaches the debugger.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn set_debugger_attached(&mut self, attached: bool) -> Result<()> {
        if self.debugger_attached == attached {
            return Ok(());
        }
        self.send(if attached {
            ViewMsg::DebugAttach
        } else {
            ViewMsg::DebugDetach
        })?;
        self.debugger_attached = attached;
        Ok(())
    }

    /// Tells the view it is no longer visible.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn was_hidden(&self) -> Result<()> {
        self.send(ViewMsg::WasHidden)
    }

    /// Tells the view it is visible again.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the view is unreachable.
    pub fn was_restored(&self) -> Result<()> {
        self.send(ViewMsg::WasRestored)
    }
}

// ============================================================================
// RenderViewHost - Inbound
// ============================================================================

impl RenderViewHost {
    /// Decodes and handles a raw message from the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadMessage`] if the message does not decode; the
    /// process is killed.
    pub fn on_inbound(
        &mut self,
        message: &InboundMessage,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> Result<()> {
        match message.parse(self.process_id()) {
            Ok(msg) => {
                self.on_message_received(msg, delegate);
                Ok(())
            }
            Err(e) => {
                self.process.received_bad_message(&message.method);
                Err(e)
            }
        }
    }

    /// Handles a decoded message from the renderer.
    pub fn on_message_received(
        &mut self,
        message: ViewHostMsg,
        delegate: &mut dyn RenderViewHostDelegate,
    ) {
        let route = self.route;

        match message {
            ViewHostMsg::RenderViewReady => delegate.render_view_ready(route),
            ViewHostMsg::RenderViewGone => self.renderer_process_gone(delegate),
            ViewHostMsg::FrameNavigate(params) => {
                let commit = self.validate_commit(params);
                delegate.did_navigate(route, &commit);
            }
            ViewHostMsg::UpdateTitle { page_id, title } => {
                delegate.update_title(route, page_id, &title);
            }
            ViewHostMsg::DidStartLoading => delegate.did_start_loading(route),
            ViewHostMsg::DidStopLoading => delegate.did_stop_loading(route),
            ViewHostMsg::RunJavaScriptMessage(params) => {
                self.dialog_opened(delegate);
                delegate.run_javascript_message(route, &params);
            }
            ViewHostMsg::RunBeforeUnloadConfirm { message } => {
                self.dialog_opened(delegate);
                delegate.run_before_unload_confirm(route, &message);
            }
            ViewHostMsg::RunModal { url } => {
                let url = self.filter_url(&url);
                self.dialog_opened(delegate);
                delegate.run_modal(route, &url);
            }
            ViewHostMsg::RunFileChooser(params) => {
                self.dialog_opened(delegate);
                delegate.run_file_chooser(route, &params);
            }
            ViewHostMsg::ShowContextMenu(params) => {
                let params = self.validate_context_menu(params);
                delegate.show_context_menu(route, &params);
            }
            ViewHostMsg::StartDragging { url } => {
                let url = self.filter_url(&url);
                delegate.start_dragging(route, &url);
            }
            ViewHostMsg::ShouldCloseAck { proceed } => self.on_should_close_ack(proceed, delegate),
            ViewHostMsg::ClosePageAck(params) => self.on_close_page_ack(params, delegate),
            ViewHostMsg::UnloadListenerChanged { has_listener } => {
                self.has_unload_listener = has_listener;
            }
            ViewHostMsg::Close => delegate.close_requested(route),
            ViewHostMsg::DomOperationResponse { json } => {
                delegate.dom_operation_response(route, &json);
            }
            ViewHostMsg::FindReply(reply) => delegate.find_reply(route, &reply),
            ViewHostMsg::Unknown { method, .. } => {
                trace!(route = %route, method = %method, "Unhandled view message");
            }
        }
    }

    fn on_should_close_ack(&mut self, proceed: bool, delegate: &mut dyn RenderViewHostDelegate) {
        if self.state != RendererState::Live(UnloadState::AwaitingBeforeUnload) {
            warn!(route = %self.route, "Unsolicited before-unload ack");
            return;
        }

        self.state = RendererState::Live(UnloadState::Idle);
        self.stop_hang_monitor(delegate);
        debug!(route = %self.route, proceed, "Before-unload answered");
        delegate.should_close_page(self.route, proceed);
    }

    fn on_close_page_ack(
        &mut self,
        params: ClosePageAckParams,
        delegate: &mut dyn RenderViewHostDelegate,
    ) {
        let RendererState::Live(UnloadState::AwaitingClosePage(reason)) = self.state else {
            warn!(route = %self.route, "Unsolicited close-page ack");
            return;
        };

        self.state = RendererState::Live(UnloadState::Idle);
        self.stop_hang_monitor(delegate);

        match reason {
            UnloadReason::CrossSite {
                new_process_id,
                new_request_id,
            } => {
                if params.new_request_id.is_some_and(|id| id != new_request_id)
                    || params.new_process_id.is_some_and(|id| id != new_process_id)
                {
                    warn!(route = %self.route, request_id = %new_request_id, "Close-page ack echoes other identifiers");
                }
                debug!(route = %self.route, request_id = %new_request_id, "Unload finished");
                self.services.gateway.post(GatewayCommand::ClosePageAck {
                    new_process_id,
                    new_request_id,
                });
            }
            UnloadReason::TabClose => {
                debug!(route = %self.route, "Unload for tab close finished");
                delegate.close_contents(self.route);
            }
        }
    }
}

// ============================================================================
// RenderViewHost - URL Validation
// ============================================================================

impl RenderViewHost {
    /// Returns the URL if this process may request it, `about:blank`
    /// otherwise.
    #[must_use]
    pub fn filter_url(&self, raw: &str) -> Url {
        match Url::parse(raw) {
            Ok(url) if self.services.policy.can_request_url(self.process_id(), &url) => url,
            Ok(url) => {
                warn!(route = %self.route, url = %url, "Renderer reported a URL it may not request");
                blank_url()
            }
            Err(e) => {
                warn!(route = %self.route, error = %e, "Renderer reported an unparseable URL");
                blank_url()
            }
        }
    }

    fn filter_optional(&self, raw: &str) -> String {
        if raw.is_empty() {
            String::new()
        } else {
            self.filter_url(raw).into()
        }
    }

    fn validate_commit(&self, params: FrameNavigateParams) -> FrameCommit {
        FrameCommit {
            page_id: params.page_id,
            url: self.filter_url(&params.url),
            referrer: params.referrer.as_deref().map(|r| self.filter_url(r)),
            transition: params.transition,
            is_main_frame: params.is_main_frame,
            http_status: params.http_status,
        }
    }

    fn validate_context_menu(&self, params: ContextMenuParams) -> ContextMenuParams {
        ContextMenuParams {
            link_url: self.filter_optional(&params.link_url),
            src_url: self.filter_optional(&params.src_url),
            page_url: self.filter_optional(&params.page_url),
            frame_url: self.filter_optional(&params.frame_url),
            selection_text: params.selection_text,
        }
    }
}

// ============================================================================
// RenderViewHost - Messaging
// ============================================================================

impl RenderViewHost {
    fn send(&self, message: ViewMsg) -> Result<()> {
        if self.shut_down {
            return Err(Error::renderer_not_live(self.route));
        }
        self.process.send(self.route.routing_id, message)
    }
}

impl Drop for RenderViewHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
