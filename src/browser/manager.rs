//! Per-tab render view host state machine.
//!
//! The manager decides, for every navigation, whether the current host can
//! carry it or a new host must be created for another site, and sequences
//! the handoff between the two.
//!
//! # States
//!
//! | State | Hosts |
//! |-------|-------|
//! | `Normal` | current |
//! | `PendingCrossSite` | current + one suspended pending host |
//! | `ShowingInterstitial` | interstitial shown over the parked current host |
//! | `LeavingInterstitial` | interstitial decided, hidden on the next commit |
//!
//! # Cross-site handoff
//!
//! ```text
//! navigate(b)             pending created, suspended, navigation buffered
//!   │                     current: view.shouldClose
//!   ▼
//! should_close_page(true) gateway: CrossSitePending{old, pending}
//!   │                     pending: navigation flushed
//!   ▼
//! on_cross_site_response  current: view.closePage
//!   │                     (ack → gateway: ClosePageAck, response released)
//!   ▼
//! did_navigate(pending)   old host shut down, pending becomes current
//!                         gateway: CrossSiteCleared
//! ```
//!
//! A refused before-unload or a new navigation cancels the pending host;
//! the current host stays current.
//!
//! # Interstitials
//!
//! A pending host parked under an interstitial has its requests blocked and
//! its commits refused until the user decides. Proceeding releases it;
//! not proceeding over a new navigation cancels it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::mem;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::identifiers::{CrossSiteRequestId, GlobalRoutingId};
use crate::transport::{BlockedRequests, GatewayCommand};

use super::delegate::RenderViewHostDelegate;
use super::navigation::NavigationEntry;
use super::render_view_host::RenderViewHost;
use super::services::HostServices;
use super::site_instance::SiteInstance;

// ============================================================================
// Types
// ============================================================================

/// Observable state of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// One active host.
    Normal,
    /// A suspended pending host waits for the current page to let go.
    PendingCrossSite,
    /// An interstitial covers the current host.
    ShowingInterstitial,
    /// The interstitial was decided and hides on the next commit.
    LeavingInterstitial,
}

/// Progress of a cross-site handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffProgress {
    /// The current page's before-unload handler has not answered.
    AwaitingBeforeUnload,
    /// The pending navigation is in flight.
    AwaitingResponse,
    /// The response is held while the current page unloads.
    AwaitingUnload(CrossSiteRequestId),
}

/// Which host of a tab a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRole {
    /// The visible host.
    Current,
    /// The cross-site pending host.
    Pending,
    /// The interstitial's host.
    Interstitial,
}

/// Outcome of a main-frame commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The current host committed.
    Current,
    /// The pending host committed and is now current.
    Swapped {
        /// Route of the host that was replaced.
        old_route: GlobalRoutingId,
    },
    /// The route belongs to no host of this tab.
    Stale,
}

struct PendingHandoff {
    host: RenderViewHost,
    progress: HandoffProgress,
    /// Held while parked under an undecided interstitial.
    blocked: Option<BlockedRequests>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterstitialPhase {
    Showing,
    Leaving,
}

struct InterstitialSlot {
    route: GlobalRoutingId,
    phase: InterstitialPhase,
    pending: Option<PendingHandoff>,
}

enum Slot {
    Normal,
    PendingCrossSite(PendingHandoff),
    Interstitial(InterstitialSlot),
}

// ============================================================================
// RenderViewHostManager
// ============================================================================

/// Owner of one tab's render view hosts.
pub struct RenderViewHostManager {
    current: RenderViewHost,
    slot: Slot,
    services: HostServices,
}

impl fmt::Debug for RenderViewHostManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderViewHostManager")
            .field("state", &self.state())
            .field("current", &self.current.route())
            .field("pending", &self.pending_host().map(RenderViewHost::route))
            .field("interstitial", &self.interstitial_route())
            .finish()
    }
}

// ============================================================================
// RenderViewHostManager - Constructor
// ============================================================================

impl RenderViewHostManager {
    /// Creates a manager whose current host uses `site_instance`.
    ///
    /// The renderer is created on the first navigation.
    #[must_use]
    pub fn new(site_instance: SiteInstance, services: HostServices) -> Self {
        let current = RenderViewHost::new(site_instance, services.clone());
        Self {
            current,
            slot: Slot::Normal,
            services,
        }
    }
}

// ============================================================================
// RenderViewHostManager - Accessors
// ============================================================================

impl RenderViewHostManager {
    /// Returns the state.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        match &self.slot {
            Slot::Normal => ManagerState::Normal,
            Slot::PendingCrossSite(_) => ManagerState::PendingCrossSite,
            Slot::Interstitial(slot) => match slot.phase {
                InterstitialPhase::Showing => ManagerState::ShowingInterstitial,
                InterstitialPhase::Leaving => ManagerState::LeavingInterstitial,
            },
        }
    }

    /// Returns the current host.
    #[inline]
    #[must_use]
    pub fn current_host(&self) -> &RenderViewHost {
        &self.current
    }

    /// Returns the current host mutably.
    #[inline]
    pub fn current_host_mut(&mut self) -> &mut RenderViewHost {
        &mut self.current
    }

    /// Returns the pending host.
    #[must_use]
    pub fn pending_host(&self) -> Option<&RenderViewHost> {
        self.pending().map(|p| &p.host)
    }

    /// Returns the progress of the pending handoff.
    #[must_use]
    pub fn pending_progress(&self) -> Option<HandoffProgress> {
        self.pending().map(|p| p.progress)
    }

    /// Returns the route of the shown interstitial.
    #[must_use]
    pub fn interstitial_route(&self) -> Option<GlobalRoutingId> {
        match &self.slot {
            Slot::Interstitial(slot) => Some(slot.route),
            Slot::Normal | Slot::PendingCrossSite(_) => None,
        }
    }

    /// Returns `true` while an interstitial is shown.
    #[inline]
    #[must_use]
    pub fn is_showing_interstitial(&self) -> bool {
        matches!(self.slot, Slot::Interstitial(_))
    }

    /// Returns the role of `route` in this tab.
    #[must_use]
    pub fn role_of(&self, route: GlobalRoutingId) -> Option<HostRole> {
        if self.current.route() == route {
            Some(HostRole::Current)
        } else if self.pending_host().is_some_and(|h| h.route() == route) {
            Some(HostRole::Pending)
        } else if self.interstitial_route() == Some(route) {
            Some(HostRole::Interstitial)
        } else {
            None
        }
    }

    /// Returns the current or pending host with this route.
    pub fn host_mut(&mut self, route: GlobalRoutingId) -> Option<&mut RenderViewHost> {
        if self.current.route() == route {
            return Some(&mut self.current);
        }
        self.pending_mut()
            .map(|p| &mut p.host)
            .filter(|host| host.route() == route)
    }

    fn pending(&self) -> Option<&PendingHandoff> {
        match &self.slot {
            Slot::PendingCrossSite(pending) => Some(pending),
            Slot::Interstitial(slot) => slot.pending.as_ref(),
            Slot::Normal => None,
        }
    }

    fn pending_mut(&mut self) -> Option<&mut PendingHandoff> {
        match &mut self.slot {
            Slot::PendingCrossSite(pending) => Some(pending),
            Slot::Interstitial(slot) => slot.pending.as_mut(),
            Slot::Normal => None,
        }
    }

    fn take_pending(&mut self) -> Option<PendingHandoff> {
        match &mut self.slot {
            Slot::Interstitial(slot) => slot.pending.take(),
            Slot::PendingCrossSite(_) => match mem::replace(&mut self.slot, Slot::Normal) {
                Slot::PendingCrossSite(pending) => Some(pending),
                other => {
                    self.slot = other;
                    None
                }
            },
            Slot::Normal => None,
        }
    }

    fn set_pending(&mut self, pending: PendingHandoff) {
        match &mut self.slot {
            Slot::Interstitial(slot) => slot.pending = Some(pending),
            Slot::Normal | Slot::PendingCrossSite(_) => {
                self.slot = Slot::PendingCrossSite(pending);
            }
        }
    }
}

// ============================================================================
// RenderViewHostManager - Navigation
// ============================================================================

impl RenderViewHostManager {
    /// Routes a navigation to the host that should carry it.
    ///
    /// Same-site navigations go to the current host. Cross-site ones create
    /// a suspended pending host and ask the current page's before-unload
    /// handler first. Any earlier pending host is cancelled.
    ///
    /// Returns the route of the host carrying the navigation.
    ///
    /// # Errors
    ///
    /// Returns the error of creating the renderer or sending the navigation.
    pub fn navigate(
        &mut self,
        entry: &NavigationEntry,
        is_reload: bool,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> Result<GlobalRoutingId> {
        self.cancel_pending();

        let current_site = self.current.site_instance();
        let swap = match &entry.site_instance {
            Some(target) => target != current_site,
            None => current_site.requires_swap_for(&entry.url),
        };

        if !swap {
            self.current.site_instance().set_site(&entry.url);
            self.current.create_render_view(delegate)?;
            self.current.navigate_to_entry(entry, is_reload)?;
            trace!(route = %self.current.route(), url = %entry.url, "Same-site navigation");
            return Ok(self.current.route());
        }

        let target = entry
            .site_instance
            .clone()
            .unwrap_or_else(|| current_site.related_site_instance(&entry.url));
        let mut host = RenderViewHost::new(target, self.services.clone());

        if !self.current.is_live() {
            // Nothing can run an unload handler; swap straight away.
            host.create_render_view(delegate)?;
            host.navigate_to_entry(entry, is_reload)?;
            let old_route = self.current.route();
            self.current.shutdown();
            self.current = host;
            info!(old = %old_route, new = %self.current.route(), "Swapped to new site without unload");
            return Ok(self.current.route());
        }

        host.create_render_view(delegate)?;
        host.set_navigations_suspended(true)?;
        host.navigate_to_entry(entry, is_reload)?;

        let route = host.route();
        info!(
            current = %self.current.route(),
            pending = %route,
            url = %entry.url,
            "Cross-site navigation pending"
        );

        self.set_pending(PendingHandoff {
            host,
            progress: HandoffProgress::AwaitingBeforeUnload,
            blocked: None,
        });
        self.current.fire_page_before_unload(delegate);
        Ok(route)
    }

    /// Handles the current page's before-unload answer.
    ///
    /// On approval the gateway learns about the handoff and the pending
    /// navigation is released; on refusal the pending host is cancelled.
    ///
    /// Returns `true` if a pending handoff consumed the answer.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the pending navigation cannot be sent.
    pub fn should_close_page(&mut self, proceed: bool) -> Result<bool> {
        let old = self.current.route();
        let gateway = self.services.gateway.clone();
        let Some(pending) = self.pending_mut() else {
            trace!(route = %old, proceed, "Before-unload answer without a pending handoff");
            return Ok(false);
        };

        if pending.progress != HandoffProgress::AwaitingBeforeUnload {
            trace!(route = %old, "Before-unload answer after the handoff moved on");
            return Ok(false);
        }

        if !proceed {
            debug!(route = %old, "Before-unload refused, cancelling pending host");
            self.cancel_pending();
            return Ok(true);
        }

        let pending_route = pending.host.route();
        pending.progress = HandoffProgress::AwaitingResponse;
        gateway.post(GatewayCommand::CrossSitePending {
            old,
            pending: pending_route,
        });
        pending.host.set_navigations_suspended(false)?;
        debug!(old = %old, pending = %pending_route, "Cross-site navigation released");
        Ok(true)
    }

    /// Starts the current page's unload once the pending response is held.
    ///
    /// Notifications for a pending host that no longer exists are ignored.
    pub fn on_cross_site_response(
        &mut self,
        pending_route: GlobalRoutingId,
        new_request_id: CrossSiteRequestId,
    ) {
        let Some(pending) = self
            .pending_mut()
            .filter(|p| p.host.route() == pending_route)
        else {
            warn!(pending = %pending_route, request_id = %new_request_id, "Cross-site response for a stale host");
            return;
        };

        if pending.progress != HandoffProgress::AwaitingResponse {
            warn!(pending = %pending_route, progress = ?pending.progress, "Unexpected cross-site response");
            return;
        }

        pending.progress = HandoffProgress::AwaitingUnload(new_request_id);
        self.current
            .close_page(pending_route.process_id, new_request_id);
    }

    /// Handles a main-frame commit.
    ///
    /// A commit by the pending host shuts the old host down and swaps the
    /// pending host in. A commit by the current host cancels any pending
    /// host. A pending host still blocked by an interstitial is refused.
    pub fn did_navigate(&mut self, route: GlobalRoutingId) -> CommitOutcome {
        if route == self.current.route() {
            if self.pending().is_some() {
                debug!(route = %route, "Current page committed, cancelling pending host");
                self.cancel_pending();
            }
            return CommitOutcome::Current;
        }

        if !self.pending_host().is_some_and(|h| h.route() == route) {
            warn!(route = %route, "Commit from a host this tab does not own");
            return CommitOutcome::Stale;
        }

        if self.pending().is_some_and(|p| p.blocked.is_some()) {
            warn!(route = %route, "Pending host committed before the interstitial was decided");
            return CommitOutcome::Stale;
        }

        let Some(PendingHandoff { mut host, .. }) = self.take_pending() else {
            return CommitOutcome::Stale;
        };

        if let Err(e) = host.set_navigations_suspended(false) {
            warn!(route = %route, error = %e, "Flushing navigation on swap failed");
        }

        let old_route = self.current.route();
        self.current.shutdown();
        self.current = host;
        self.services
            .gateway
            .post(GatewayCommand::CrossSiteCleared { pending: route });

        info!(old = %old_route, new = %route, "Swapped to pending host");
        CommitOutcome::Swapped { old_route }
    }

    /// Destroys the pending host, if any, and cancels its requests.
    pub fn cancel_pending(&mut self) {
        let Some(PendingHandoff {
            mut host,
            progress,
            blocked,
        }) = self.take_pending()
        else {
            return;
        };

        let route = host.route();
        match blocked {
            Some(blocked) => blocked.cancel(),
            None => {
                self.services.gateway.post(GatewayCommand::Cancel { route });
            }
        }
        self.services
            .gateway
            .post(GatewayCommand::CrossSiteCleared { pending: route });
        host.shutdown();
        debug!(pending = %route, ?progress, "Pending host cancelled");
    }

    /// Handles a renderer of this tab going away.
    ///
    /// Losing the current renderer abandons any pending handoff; losing
    /// the pending renderer cancels it.
    ///
    /// Returns the role the route had.
    pub fn renderer_gone(&mut self, route: GlobalRoutingId) -> Option<HostRole> {
        let role = self.role_of(route)?;
        match role {
            HostRole::Current => {
                if self.pending().is_some() {
                    warn!(route = %route, "Current renderer gone, abandoning handoff");
                    self.cancel_pending();
                }
            }
            HostRole::Pending => {
                warn!(route = %route, "Pending renderer gone");
                self.cancel_pending();
            }
            HostRole::Interstitial => {}
        }
        Some(role)
    }
}

// ============================================================================
// RenderViewHostManager - Interstitial
// ============================================================================

impl RenderViewHostManager {
    /// Blocks the pending host's requests, if there is a pending host.
    ///
    /// Called before an interstitial is shown; the block lasts until the
    /// interstitial is decided or the pending host goes away.
    pub fn block_pending(&mut self) {
        let gateway = self.services.gateway.clone();
        if let Some(pending) = self.pending_mut()
            && pending.blocked.is_none()
        {
            debug!(pending = %pending.host.route(), "Blocking pending host");
            pending.blocked = Some(BlockedRequests::block(gateway, pending.host.route()));
        }
    }

    /// Releases requests held by [`block_pending`](Self::block_pending).
    pub fn release_pending(&mut self) {
        if let Some(blocked) = self.pending_mut().and_then(|p| p.blocked.take()) {
            blocked.resume();
        }
    }

    /// Shows an interstitial over the current host.
    ///
    /// A pending handoff stays parked with the interstitial.
    pub fn show_interstitial(&mut self, route: GlobalRoutingId) {
        let pending = match mem::replace(&mut self.slot, Slot::Normal) {
            Slot::Normal => None,
            Slot::PendingCrossSite(pending) => Some(pending),
            Slot::Interstitial(previous) => {
                warn!(previous = %previous.route, next = %route, "Interstitial replaced while showing");
                previous.pending
            }
        };

        self.slot = Slot::Interstitial(InterstitialSlot {
            route,
            phase: InterstitialPhase::Showing,
            pending,
        });
        debug!(current = %self.current.route(), interstitial = %route, "Interstitial shown");
    }

    /// Marks the interstitial as decided; it hides on the next commit.
    ///
    /// A parked pending host is released and may commit.
    pub fn interstitial_leaving(&mut self) {
        if let Slot::Interstitial(slot) = &mut self.slot {
            slot.phase = InterstitialPhase::Leaving;
        }
        self.release_pending();
    }

    /// Removes the interstitial and restores the parked state.
    pub fn hide_interstitial(&mut self) {
        self.release_pending();
        let Slot::Interstitial(slot) = mem::replace(&mut self.slot, Slot::Normal) else {
            return;
        };
        if let Some(pending) = slot.pending {
            self.slot = Slot::PendingCrossSite(pending);
        }
        debug!(current = %self.current.route(), interstitial = %slot.route, "Interstitial hidden");
    }
}

// ============================================================================
// RenderViewHostManager - Lifecycle
// ============================================================================

impl RenderViewHostManager {
    /// Reports missed acknowledgment deadlines of the current and pending
    /// hosts.
    pub fn check_responsiveness(
        &mut self,
        now: Instant,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> bool {
        let mut reported = self.current.check_responsiveness(now, delegate);
        if let Some(pending) = self.pending_mut() {
            reported |= pending.host.check_responsiveness(now, delegate);
        }
        reported
    }

    /// Shuts down every host.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
        self.current.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::browser::delegate::{HostEvent, HostEventQueue};
    use crate::protocol::{PageTransition, ViewMsg};
    use crate::testing::{Harness, inbound, url};

    fn entry(s: &str) -> NavigationEntry {
        NavigationEntry::new(url(s), PageTransition::Typed)
    }

    fn manager(harness: &Harness) -> RenderViewHostManager {
        let site = harness.browsing.create_site_instance();
        RenderViewHostManager::new(site, harness.services.clone())
    }

    /// Navigates a fresh manager to `start` and drains side effects.
    fn started(harness: &mut Harness, start: &str) -> (RenderViewHostManager, HostEventQueue) {
        let mut events = HostEventQueue::new();
        let mut m = manager(harness);
        m.navigate(&entry(start), false, &mut events).expect("navigate");
        let _ = harness.sent(m.current_host().process_id());
        let _ = harness.gateway_commands();
        let _ = events.take();
        (m, events)
    }

    fn ack_before_unload(m: &mut RenderViewHostManager, events: &mut HostEventQueue, proceed: bool) {
        let routing_id = m.current_host().routing_id();
        let ack = inbound(routing_id, "view.shouldCloseAck", json!({ "proceed": proceed }));
        m.current_host_mut().on_inbound(&ack, events).expect("ack");
        let (_, event) = events.pop().expect("should-close event");
        assert_eq!(event, HostEvent::ShouldClosePage { proceed });
        m.should_close_page(proceed).expect("should close");
    }

    #[test]
    fn test_fresh_tab_binds_site_and_navigates() {
        let mut harness = Harness::new();
        let mut events = HostEventQueue::new();
        let mut m = manager(&harness);

        let route = m.navigate(&entry("https://a.example/"), false, &mut events).expect("navigate");

        assert_eq!(route, m.current_host().route());
        assert_eq!(m.state(), ManagerState::Normal);
        assert_eq!(m.current_host().site_instance().site(), Some("https://a.example"));
        let sent = harness.sent(route.process_id);
        assert_eq!(sent[0], ViewMsg::CreateView);
        assert!(matches!(&sent[1], ViewMsg::Navigate(p) if p.url.as_str() == "https://a.example/"));
        assert!(harness.gateway_commands().is_empty());
    }

    #[test]
    fn test_same_site_reuses_current_host() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let before = m.current_host().route();

        let route = m
            .navigate(&entry("https://www.a.example/other"), false, &mut events)
            .expect("navigate");

        assert_eq!(route, before);
        assert_eq!(m.state(), ManagerState::Normal);
    }

    #[test]
    fn test_cross_site_creates_suspended_pending() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let current = m.current_host().route();

        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        assert_ne!(pending, current);
        assert_eq!(m.state(), ManagerState::PendingCrossSite);
        assert_eq!(m.pending_progress(), Some(HandoffProgress::AwaitingBeforeUnload));
        let host = m.pending_host().expect("pending host");
        assert!(host.are_navigations_suspended());
        assert!(host.has_buffered_navigation());

        assert_eq!(harness.sent(pending.process_id), vec![ViewMsg::CreateView]);
        assert_eq!(harness.sent(current.process_id), vec![ViewMsg::ShouldClose]);
        assert!(!m.current_host().are_navigations_suspended());
    }

    #[test]
    fn test_full_cross_site_handoff_order() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let old = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");
        let _ = harness.sent(pending.process_id);

        ack_before_unload(&mut m, &mut events, true);
        assert_eq!(
            harness.gateway_commands(),
            vec![GatewayCommand::CrossSitePending { old, pending }]
        );
        let flushed = harness.sent(pending.process_id);
        assert!(matches!(&flushed[..], [ViewMsg::Navigate(p)] if p.url.as_str() == "https://b.example/"));

        let request = CrossSiteRequestId::next();
        m.on_cross_site_response(pending, request);
        assert_eq!(m.pending_progress(), Some(HandoffProgress::AwaitingUnload(request)));
        assert_eq!(
            harness.sent(old.process_id),
            vec![
                ViewMsg::ShouldClose,
                ViewMsg::ClosePage {
                    new_process_id: pending.process_id,
                    new_request_id: request
                }
            ]
        );

        let close_ack = inbound(
            old.routing_id,
            "view.closePageAck",
            json!({"newProcessId": pending.process_id.as_u32(), "newRequestId": request.as_u64()}),
        );
        m.current_host_mut().on_inbound(&close_ack, &mut events).expect("ack");
        assert_eq!(
            harness.gateway_commands(),
            vec![GatewayCommand::ClosePageAck {
                new_process_id: pending.process_id,
                new_request_id: request
            }]
        );
        assert_eq!(m.current_host().route(), old);

        let outcome = m.did_navigate(pending);
        assert_eq!(outcome, CommitOutcome::Swapped { old_route: old });
        assert_eq!(m.current_host().route(), pending);
        assert_eq!(m.state(), ManagerState::Normal);
        assert!(harness.services.processes.get(old.process_id).is_none());
        assert_eq!(harness.sent(old.process_id), vec![ViewMsg::Close]);
        assert_eq!(
            harness.gateway_commands(),
            vec![GatewayCommand::CrossSiteCleared { pending }]
        );
    }

    #[test]
    fn test_cross_site_cancelled_by_same_site_navigation() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let original = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        let route = m.navigate(&entry("https://a.example/again"), false, &mut events).expect("navigate");

        assert_eq!(route, original);
        assert_eq!(m.state(), ManagerState::Normal);
        assert!(m.pending_host().is_none());
        assert!(!m.current_host().are_navigations_suspended());
        assert!(harness.services.processes.get(pending.process_id).is_none());
        assert_eq!(
            harness.gateway_commands(),
            vec![
                GatewayCommand::Cancel { route: pending },
                GatewayCommand::CrossSiteCleared { pending }
            ]
        );
    }

    #[test]
    fn test_second_cross_site_replaces_pending() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let first = m.navigate(&entry("https://b.example/"), false, &mut events).expect("b");
        let second = m.navigate(&entry("https://c.example/"), false, &mut events).expect("c");

        assert_ne!(first, second);
        assert_eq!(m.pending_host().map(RenderViewHost::route), Some(second));
        assert!(m.role_of(first).is_none());
        assert_eq!(m.current_host().hang_monitor().starts(), 1);
    }

    #[test]
    fn test_before_unload_refusal_cancels() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let original = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        ack_before_unload(&mut m, &mut events, false);

        assert_eq!(m.state(), ManagerState::Normal);
        assert_eq!(m.current_host().route(), original);
        assert!(m.role_of(pending).is_none());
    }

    #[test]
    fn test_stale_cross_site_response_ignored() {
        let mut harness = Harness::new();
        let (mut m, _events) = started(&mut harness, "https://a.example/");
        let current = m.current_host().route();

        m.on_cross_site_response(current, CrossSiteRequestId::next());

        assert!(harness.sent(current.process_id).is_empty());
    }

    #[test]
    fn test_current_commit_cancels_pending() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let current = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        assert_eq!(m.did_navigate(current), CommitOutcome::Current);
        assert!(m.role_of(pending).is_none());
        assert_eq!(m.did_navigate(pending), CommitOutcome::Stale);
    }

    #[test]
    fn test_current_renderer_gone_abandons_handoff() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let current = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        m.current_host_mut().renderer_process_gone(&mut events);
        assert_eq!(m.renderer_gone(current), Some(HostRole::Current));

        assert_eq!(m.state(), ManagerState::Normal);
        assert!(m.role_of(pending).is_none());
        assert!(!m.current_host().is_waiting_for_unload_ack());
    }

    #[test]
    fn test_dead_current_swaps_immediately() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let old = m.current_host().route();
        m.current_host_mut().renderer_process_gone(&mut events);

        let route = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");

        assert_eq!(m.current_host().route(), route);
        assert_ne!(route, old);
        assert_eq!(m.state(), ManagerState::Normal);
        let sent = harness.sent(route.process_id);
        assert!(matches!(&sent[..], [ViewMsg::CreateView, ViewMsg::Navigate(_)]));
    }

    #[test]
    fn test_interstitial_parks_pending() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");
        let interstitial = GlobalRoutingId::new(
            crate::identifiers::ProcessId::next(),
            crate::identifiers::RoutingId::next(),
        );

        m.show_interstitial(interstitial);
        assert_eq!(m.state(), ManagerState::ShowingInterstitial);
        assert_eq!(m.role_of(interstitial), Some(HostRole::Interstitial));
        assert_eq!(m.role_of(pending), Some(HostRole::Pending));

        m.interstitial_leaving();
        assert_eq!(m.state(), ManagerState::LeavingInterstitial);

        m.hide_interstitial();
        assert_eq!(m.state(), ManagerState::PendingCrossSite);
        assert!(m.interstitial_route().is_none());
    }

    fn interstitial_route() -> GlobalRoutingId {
        GlobalRoutingId::new(
            crate::identifiers::ProcessId::next(),
            crate::identifiers::RoutingId::next(),
        )
    }

    #[test]
    fn test_blocked_pending_cannot_commit_until_released() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let old = m.current_host().route();
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");
        ack_before_unload(&mut m, &mut events, true);
        let _ = harness.gateway_commands();

        m.block_pending();
        m.block_pending();
        m.show_interstitial(interstitial_route());
        assert_eq!(harness.gateway_commands(), vec![GatewayCommand::Block { route: pending }]);

        assert_eq!(m.did_navigate(pending), CommitOutcome::Stale);
        assert_eq!(m.current_host().route(), old);
        assert_eq!(m.role_of(pending), Some(HostRole::Pending));

        m.interstitial_leaving();
        assert_eq!(harness.gateway_commands(), vec![GatewayCommand::Resume { route: pending }]);
        assert_eq!(m.did_navigate(pending), CommitOutcome::Swapped { old_route: old });
        assert_eq!(m.current_host().route(), pending);
    }

    #[test]
    fn test_cancelling_blocked_pending_settles_its_block() {
        let mut harness = Harness::new();
        let (mut m, mut events) = started(&mut harness, "https://a.example/");
        let pending = m.navigate(&entry("https://b.example/"), false, &mut events).expect("navigate");
        ack_before_unload(&mut m, &mut events, true);
        m.block_pending();
        m.show_interstitial(interstitial_route());
        let _ = harness.gateway_commands();

        m.cancel_pending();
        assert_eq!(
            harness.gateway_commands(),
            vec![
                GatewayCommand::Cancel { route: pending },
                GatewayCommand::CrossSiteCleared { pending }
            ]
        );

        m.hide_interstitial();
        assert_eq!(m.state(), ManagerState::Normal);
        assert!(harness.gateway_commands().is_empty());
    }
}
