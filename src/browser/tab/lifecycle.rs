//! Closing, process loss and responsiveness.

use std::time::Instant;

use tracing::{debug, info};

use crate::identifiers::ProcessId;

use super::{CloseState, TabEvent, WebContents};

// ============================================================================
// WebContents - Close
// ============================================================================

impl WebContents {
    /// Starts closing the tab.
    ///
    /// The page's before-unload handler runs first, then its unload
    /// handler; [`TabEvent::CloseApproved`] or [`TabEvent::CloseCancelled`]
    /// reports the outcome. An undecided interstitial is dismissed and a
    /// pending cross-site navigation abandoned. Calls while already closing
    /// do nothing.
    pub fn close(&mut self) {
        if self.destroyed || self.close_state != CloseState::Open {
            return;
        }

        if let Some(page) = self.interstitial.as_mut() {
            page.dismiss(&mut self.manager, &mut self.controller);
        }
        self.release_hidden_interstitial();

        self.manager.cancel_pending();
        self.controller.discard_pending();

        debug!(tab_id = %self.tab_id, "Closing tab");
        self.close_state = CloseState::AwaitingBeforeUnload;
        self.manager
            .current_host_mut()
            .fire_page_before_unload(&mut self.host_events);
        self.process_host_events();
    }

    /// Tears the tab down at once, without running page handlers.
    ///
    /// Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        if let Some(page) = self.interstitial.as_mut() {
            page.dismiss(&mut self.manager, &mut self.controller);
        }
        self.interstitial = None;
        self.manager.shutdown();
        self.host_events.take();
        self.close_state = CloseState::Closed;
        self.destroyed = true;
        info!(tab_id = %self.tab_id, "Tab destroyed");
    }
}

// ============================================================================
// WebContents - Process Loss
// ============================================================================

impl WebContents {
    /// Marks every host of this tab backed by `process_id` as gone.
    pub fn on_process_gone(&mut self, process_id: ProcessId) {
        if self.destroyed {
            return;
        }

        let current = self.manager.current_host().route();
        let pending = self.manager.pending_host().map(|h| h.route());

        for route in [Some(current), pending].into_iter().flatten() {
            if route.process_id != process_id {
                continue;
            }
            if let Some(host) = self.manager.host_mut(route) {
                host.renderer_process_gone(&mut self.host_events);
            }
        }

        if let Some(host) = self
            .interstitial
            .as_mut()
            .and_then(|page| page.host_mut())
            .filter(|host| host.process_id() == process_id)
        {
            host.renderer_process_gone(&mut self.host_events);
        }

        self.process_host_events();
    }

    /// Reports missed acknowledgment deadlines.
    ///
    /// Returns `true` if a host was reported unresponsive.
    pub fn check_responsiveness(&mut self, now: Instant) -> bool {
        if self.destroyed {
            return false;
        }
        let reported = self
            .manager
            .check_responsiveness(now, &mut self.host_events);
        self.process_host_events();
        reported
    }
}

impl Drop for WebContents {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;

    use crate::browser::interstitial::HtmlInterstitial;
    use crate::browser::tab::{CloseState, TabEvent};
    use crate::protocol::ViewMsg;
    use crate::testing::TabHarness;
    use crate::transport::GatewayCommand;

    #[test]
    fn test_close_runs_both_handlers() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        let _ = t.sent(a);

        t.tab.close();
        assert_eq!(t.tab.close_state(), CloseState::AwaitingBeforeUnload);
        assert_eq!(t.sent(a), vec![ViewMsg::ShouldClose]);

        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": true }));
        assert_eq!(t.tab.close_state(), CloseState::AwaitingUnload);
        assert_eq!(t.sent(a), vec![ViewMsg::ClosePageForTabClose]);

        t.renderer_says(a, "view.closePageAck", json!({}));
        assert_eq!(t.tab.close_state(), CloseState::Closed);
        assert!(t.tab.drain_events().contains(&TabEvent::CloseApproved));
    }

    #[test]
    fn test_close_refused() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");

        t.tab.close();
        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": false }));

        assert_eq!(t.tab.close_state(), CloseState::Open);
        assert!(t.tab.drain_events().contains(&TabEvent::CloseCancelled));
        assert!(t.tab.load_url("https://a.example/next").is_ok());
    }

    #[test]
    fn test_close_without_renderer_is_immediate() {
        let mut t = TabHarness::new();
        t.tab.close();

        assert_eq!(t.tab.close_state(), CloseState::Closed);
        assert!(t.tab.drain_events().contains(&TabEvent::CloseApproved));
    }

    #[test]
    fn test_navigation_rejected_while_closing() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        t.tab.close();

        let err = t.tab.load_url("https://a.example/x").expect_err("closing");
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_close_dismisses_interstitial() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        t.tab
            .show_interstitial(
                "https://evil.example/".parse().expect("url"),
                false,
                Box::new(HtmlInterstitial::new("stop")),
            )
            .expect("show");
        let _ = t.harness.gateway_commands();

        t.tab.close();

        assert!(t.tab.interstitial().is_none());
        assert_eq!(t.harness.gateway_commands(), vec![GatewayCommand::Cancel { route: a }]);
        assert!(t.registry.is_empty());
    }

    #[test]
    fn test_hung_close_keeps_waiting() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");
        t.tab.close();

        let later = Instant::now() + Duration::from_secs(5);
        assert!(t.tab.check_responsiveness(later));

        assert_eq!(t.tab.close_state(), CloseState::AwaitingBeforeUnload);
        let events = t.tab.drain_events();
        assert!(events.contains(&TabEvent::Unresponsive { during_unload: true }));
        assert!(!events.contains(&TabEvent::CloseApproved));

        t.renderer_says(a, "view.shouldCloseAck", json!({ "proceed": true }));
        assert_eq!(t.tab.close_state(), CloseState::AwaitingUnload);
    }

    #[test]
    fn test_process_gone_marks_tab_crashed() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");

        t.tab.on_process_gone(a.process_id);

        assert!(t.tab.drain_events().contains(&TabEvent::Crashed));
        assert!(!t.tab.current_host().renderer_initialized());
    }

    #[test]
    fn test_destroy_releases_processes() {
        let mut t = TabHarness::new();
        let a = t.tab.load_url("https://a.example/").expect("a");
        t.commit(a, 1, "https://a.example/");

        t.tab.destroy();
        t.tab.destroy();

        assert!(t.tab.is_destroyed());
        assert!(t.harness.services.processes.get(a.process_id).is_none());
    }
}
