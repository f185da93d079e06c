//! Inbound message routing and host event handling.

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CrossSiteRequestId, GlobalRoutingId};
use crate::protocol::InboundMessage;

use crate::browser::delegate::HostEvent;
use crate::browser::manager::HostRole;

use super::{CloseState, TabEvent, WebContents};

// ============================================================================
// WebContents - Inbound
// ============================================================================

impl WebContents {
    /// Delivers a renderer message to the host it is addressed to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostNotFound`] if the route is not one of this tab's
    /// hosts, or [`Error::BadMessage`] if the message does not decode.
    pub fn on_inbound(&mut self, route: GlobalRoutingId, message: &InboundMessage) -> Result<()> {
        let interstitial_host = self
            .interstitial
            .as_mut()
            .and_then(|page| page.host_mut())
            .filter(|host| host.route() == route);

        let result = if let Some(host) = interstitial_host {
            host.on_inbound(message, &mut self.host_events)
        } else if let Some(host) = self.manager.host_mut(route) {
            host.on_inbound(message, &mut self.host_events)
        } else {
            trace!(tab_id = %self.tab_id, route = %route, method = %message.method, "Message for a host this tab no longer has");
            return Err(Error::host_not_found(route));
        };

        self.process_host_events();
        result
    }

    /// The gateway holds the pending host's response until the current page
    /// unloads.
    pub fn on_cross_site_response(
        &mut self,
        pending_route: GlobalRoutingId,
        new_request_id: CrossSiteRequestId,
    ) {
        self.manager
            .on_cross_site_response(pending_route, new_request_id);
        self.process_host_events();
    }
}

// ============================================================================
// WebContents - Host Events
// ============================================================================

impl WebContents {
    /// Handles everything the hosts reported, including events raised while
    /// handling.
    pub(crate) fn process_host_events(&mut self) {
        while let Some((route, event)) = self.host_events.pop() {
            let interstitial_route = self.interstitial.as_ref().and_then(|page| page.route());
            if interstitial_route == Some(route) {
                self.on_interstitial_event(event);
                continue;
            }

            match self.manager.role_of(route) {
                Some(role) => self.on_host_event(route, role, event),
                None => {
                    trace!(tab_id = %self.tab_id, route = %route, ?event, "Event from a discarded host");
                }
            }
        }
    }

    fn on_host_event(&mut self, route: GlobalRoutingId, role: HostRole, event: HostEvent) {
        let is_current = role == HostRole::Current;

        match event {
            HostEvent::RenderViewCreated | HostEvent::RenderViewReady => {
                trace!(tab_id = %self.tab_id, route = %route, ?role, "Render view up");
            }
            HostEvent::RenderViewGone => self.on_render_view_gone(route),
            HostEvent::DidNavigate(commit) => self.did_navigate(route, commit),
            HostEvent::UpdateTitle { page_id, title } if is_current => {
                let site_instance_id = self.manager.current_host().site_instance().id();
                if self.controller.set_title(page_id, site_instance_id, &title) {
                    let title = title
                        .chars()
                        .take(self.services.options.max_title_chars)
                        .collect();
                    self.emit(TabEvent::TitleChanged { page_id, title });
                }
            }
            HostEvent::DidStartLoading if is_current => {
                self.is_loading = true;
                self.emit(TabEvent::LoadingStarted);
            }
            HostEvent::DidStopLoading if is_current => {
                self.is_loading = false;
                self.emit(TabEvent::LoadingStopped);
            }
            HostEvent::ShouldClosePage { proceed } if is_current => {
                self.on_should_close_page(proceed);
            }
            HostEvent::CloseContents if is_current => {
                if self.close_state == CloseState::AwaitingUnload {
                    self.close_state = CloseState::Closed;
                    debug!(tab_id = %self.tab_id, "Page unloaded, tab may close");
                    self.emit(TabEvent::CloseApproved);
                }
            }
            HostEvent::CloseRequested if is_current => self.emit(TabEvent::CloseRequested),
            HostEvent::RunJavaScriptMessage(params) => self.emit(TabEvent::JavaScriptDialog(params)),
            HostEvent::RunBeforeUnloadConfirm { message } => {
                self.emit(TabEvent::BeforeUnloadDialog { message });
            }
            HostEvent::RunModal { url } => self.emit(TabEvent::ModalDialog { url }),
            HostEvent::RunFileChooser(params) => self.emit(TabEvent::FileChooser(params)),
            HostEvent::ShowContextMenu(params) if is_current => {
                self.emit(TabEvent::ContextMenu(params));
            }
            HostEvent::StartDragging { url } if is_current => {
                self.emit(TabEvent::DragStarted { url });
            }
            HostEvent::RendererUnresponsive { during_unload } => {
                self.on_renderer_unresponsive(during_unload);
            }
            HostEvent::RendererResponsive => self.emit(TabEvent::Responsive),
            HostEvent::DomOperationResponse { json } => {
                self.emit(TabEvent::DomOperationResponse { json });
            }
            HostEvent::FindReply(reply) if is_current => self.emit(TabEvent::FindReply(reply)),
            other => {
                trace!(tab_id = %self.tab_id, route = %route, ?role, event = ?other, "Event from a non-visible host ignored");
            }
        }
    }

    fn on_should_close_page(&mut self, proceed: bool) {
        if self.close_state == CloseState::AwaitingBeforeUnload {
            if proceed {
                self.close_state = CloseState::AwaitingUnload;
                self.manager
                    .current_host_mut()
                    .close_page_for_tab_close(&mut self.host_events);
            } else {
                debug!(tab_id = %self.tab_id, "Page refused to close");
                self.close_state = CloseState::Open;
                self.emit(TabEvent::CloseCancelled);
            }
            return;
        }

        match self.manager.should_close_page(proceed) {
            Ok(true) if !proceed => {
                self.controller.discard_pending();
                self.emit(TabEvent::NavigationCancelled);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(tab_id = %self.tab_id, error = %e, "Releasing the pending navigation failed");
                self.manager.cancel_pending();
                self.controller.discard_pending();
                self.emit(TabEvent::NavigationCancelled);
            }
        }
    }

    fn on_render_view_gone(&mut self, route: GlobalRoutingId) {
        match self.manager.renderer_gone(route) {
            Some(HostRole::Current) => {
                self.is_loading = false;
                if let Some(page) = self.interstitial.as_mut() {
                    page.on_original_host_gone();
                }
                if self.close_state == CloseState::AwaitingBeforeUnload
                    || self.close_state == CloseState::AwaitingUnload
                {
                    self.close_state = CloseState::Closed;
                    self.emit(TabEvent::CloseApproved);
                }
                warn!(tab_id = %self.tab_id, route = %route, "Tab renderer gone");
                self.emit(TabEvent::Crashed);
            }
            Some(role) => {
                debug!(tab_id = %self.tab_id, route = %route, ?role, "Background renderer gone");
            }
            None => {}
        }
    }

    /// A missed deadline is reported, never acted on: the close or handoff
    /// still waits for the late ack or for the renderer to go away.
    fn on_renderer_unresponsive(&mut self, during_unload: bool) {
        if during_unload {
            warn!(tab_id = %self.tab_id, close_state = ?self.close_state, "Unload handler unresponsive");
        }
        self.emit(TabEvent::Unresponsive { during_unload });
    }

    fn on_interstitial_event(&mut self, event: HostEvent) {
        let Some(page) = self.interstitial.as_mut() else {
            return;
        };

        match event {
            HostEvent::DomOperationResponse { json } => {
                if let Err(e) = page.on_command(&json, &mut self.manager, &mut self.controller) {
                    warn!(tab_id = %self.tab_id, error = %e, "Interstitial command failed");
                }
            }
            HostEvent::RenderViewGone => {
                page.on_own_renderer_gone(&mut self.manager, &mut self.controller);
            }
            other => {
                trace!(tab_id = %self.tab_id, event = ?other, "Interstitial event");
            }
        }
        self.release_hidden_interstitial();
    }

    /// Drops the interstitial once it hid itself.
    pub(crate) fn release_hidden_interstitial(&mut self) {
        if self.interstitial.as_ref().is_some_and(|page| page.is_hidden()) {
            self.interstitial = None;
            self.emit(TabEvent::InterstitialHidden);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::browser::manager::ManagerState;
    use crate::browser::tab::{CloseState, TabEvent};
    use crate::error::Error;
    use crate::identifiers::{CrossSiteRequestId, GlobalRoutingId, ProcessId, RoutingId};
    use crate::protocol::{InboundMessage, ViewMsg};
    use crate::testing::TabHarness;
    use crate::transport::GatewayCommand;

    #[test]
    fn test_unknown_route_rejected() {
        let mut t = TabHarness::new();
        let route = GlobalRoutingId::new(ProcessId::next(), RoutingId::next());
        let message = InboundMessage::new(route.routing_id, "view.ready", json!({}));

        let err = t.tab.on_inbound(route, &message).expect_err("foreign route");
        assert!(matches!(err, Error::HostNotFound { .. }));
    }

    #[test]
    fn test_title_and_loading_events() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.renderer_says(a, "view.didStartLoading", json!({}));
        t.commit(a, 1, "https://a.example/");
        t.renderer_says(a, "view.updateTitle", json!({ "pageId": 1, "title": "Hello" }));
        t.renderer_says(a, "view.didStopLoading", json!({}));

        let events = t.tab.drain_events();
        assert_eq!(events.first(), Some(&TabEvent::LoadingStarted));
        assert!(events.contains(&TabEvent::TitleChanged {
            page_id: crate::identifiers::PageId::new(1),
            title: "Hello".to_string()
        }));
        assert_eq!(events.last(), Some(&TabEvent::LoadingStopped));
        assert_eq!(t.tab.title(), "Hello");
        assert!(!t.tab.is_loading());
    }

    #[test]
    fn test_handoff_through_tab() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        let b = t.tab.load_url("https://b.example/").expect("b");
        let _ = t.harness.gateway_commands();

        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": true }));
        assert_eq!(
            t.harness.gateway_commands(),
            vec![GatewayCommand::CrossSitePending { old: a, pending: b }]
        );

        let request = CrossSiteRequestId::next();
        t.tab.on_cross_site_response(b, request);
        assert!(t.sent(a).contains(&ViewMsg::ClosePage {
            new_process_id: b.process_id,
            new_request_id: request
        }));

        t.renderer_says(a, "view.closePageAck", json!({}));
        assert_eq!(
            t.harness.gateway_commands(),
            vec![GatewayCommand::ClosePageAck {
                new_process_id: b.process_id,
                new_request_id: request
            }]
        );

        t.commit(b, 1, "https://b.example/");
        assert_eq!(t.tab.current_host().route(), b);
    }

    #[test]
    fn test_pending_crash_cancels_handoff() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        let b = t.tab.load_url("https://b.example/").expect("b");

        t.renderer_says(b, "view.gone", json!({}));

        assert_eq!(t.tab.manager_state(), ManagerState::Normal);
        assert_eq!(t.tab.current_host().route(), a);
        assert!(!t.tab.drain_events().contains(&TabEvent::Crashed));
    }

    #[test]
    fn test_current_crash_reported() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");

        t.renderer_says(a, "view.gone", json!({}));

        assert!(t.tab.drain_events().contains(&TabEvent::Crashed));
        assert!(!t.tab.current_host().is_live());
    }

    #[test]
    fn test_dialog_events_forwarded() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.renderer_says(a, "dialog.runJavaScript", json!({ "kind": "alert", "message": "hi" }));

        assert!(matches!(
            t.tab.drain_events().last(),
            Some(TabEvent::JavaScriptDialog(p)) if p.message == "hi"
        ));
        assert_eq!(t.tab.current_host().modal_dialog_count(), 1);
    }

    #[test]
    fn test_hung_before_unload_waits_for_late_ack() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        let b = t.tab.load_url("https://b.example/").expect("b");
        let _ = t.harness.gateway_commands();

        let later = std::time::Instant::now() + std::time::Duration::from_secs(5);
        assert!(t.tab.check_responsiveness(later));
        assert!(!t.tab.check_responsiveness(later));

        assert!(t
            .tab
            .drain_events()
            .contains(&TabEvent::Unresponsive { during_unload: true }));
        assert!(t.harness.gateway_commands().is_empty());
        assert_eq!(t.tab.manager_state(), ManagerState::PendingCrossSite);

        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": true }));

        assert!(t.tab.drain_events().contains(&TabEvent::Responsive));
        assert_eq!(
            t.harness.gateway_commands(),
            vec![GatewayCommand::CrossSitePending { old: a, pending: b }]
        );
    }

    #[test]
    fn test_close_state_untouched_by_navigation_acks() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        t.tab.load_url("https://b.example/").expect("b");
        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": true }));

        assert_eq!(t.tab.close_state(), CloseState::Open);
    }
}
