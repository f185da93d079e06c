//! Application context owning every registry and tab.
//!
//! The [`BrowserContext`] is the UI sequence: it owns the tabs, the window
//! registry and the interstitial registry, and it is the only consumer of the
//! process-event queue and the gateway notification queue.
//!
//! ```text
//!   ProcessEvent ──┐                      ┌── GatewayNotification
//!                  ▼                      ▼
//!            ┌────────────────────────────────┐   GatewayCommand
//!            │         BrowserContext         │ ─────────────────► dispatcher
//!            │  tabs · BrowserList · registry │
//!            └────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};

use crate::browser::{
    Browser, BrowserList, BrowserType, BrowsingInstance, CloseState, HostServices,
    InterstitialRegistry, WebContents,
};
use crate::error::{Error, Result};
use crate::identifiers::{BrowserId, GlobalRoutingId, ProcessId, ProfileId, TabId};
use crate::security::SecurityPolicy;
use crate::transport::{
    GatewayNotification, GatewayReceiver, NotificationReceiver, ProcessEvent, ProcessEventReceiver,
    ProcessLauncher, ProcessTable, ResourceDispatcher, gateway_channel, notification_channel,
    process_event_queue,
};

use super::builder::BrowserContextBuilder;
use super::options::HostOptions;
use super::profile::Profile;

// ============================================================================
// BrowserContext
// ============================================================================

/// Owner of all tabs, windows and shared services of one browser process.
pub struct BrowserContext {
    services: HostServices,
    registry: InterstitialRegistry,
    browsers: BrowserList,
    profiles: FxHashMap<ProfileId, Profile>,
    tabs: FxHashMap<TabId, WebContents>,
    events_rx: ProcessEventReceiver,
    notifications_rx: NotificationReceiver,
    dispatcher: Option<(ResourceDispatcher, GatewayReceiver)>,
    shut_down: bool,
}

// ============================================================================
// BrowserContext - Display
// ============================================================================

impl fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserContext")
            .field("tab_count", &self.tabs.len())
            .field("browser_count", &self.browsers.len())
            .field("process_count", &self.services.processes.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BrowserContext - Constructor
// ============================================================================

impl BrowserContext {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BrowserContextBuilder {
        BrowserContextBuilder::new()
    }

    pub(crate) fn new(
        launcher: Arc<dyn ProcessLauncher>,
        options: HostOptions,
        profiles: Vec<Profile>,
    ) -> Self {
        let policy = SecurityPolicy::new(options.web_safe_schemes.iter().cloned());
        let (events_tx, events_rx) = process_event_queue();
        let (gateway, commands_rx) = gateway_channel();
        let (notifier, notifications_rx) = notification_channel();
        let processes = ProcessTable::new(launcher, policy.clone(), events_tx);

        info!(profile_count = profiles.len(), "Browser context initialized");

        Self {
            services: HostServices {
                processes,
                policy,
                gateway,
                options: Arc::new(options),
            },
            registry: InterstitialRegistry::new(),
            browsers: BrowserList::new(),
            profiles: profiles.into_iter().map(|p| (p.id(), p)).collect(),
            tabs: FxHashMap::default(),
            events_rx,
            notifications_rx,
            dispatcher: Some((ResourceDispatcher::new(notifier), commands_rx)),
            shut_down: false,
        }
    }
}

// ============================================================================
// BrowserContext - Accessors
// ============================================================================

impl BrowserContext {
    /// Returns the window registry.
    #[inline]
    #[must_use]
    pub fn browser_list(&self) -> &BrowserList {
        &self.browsers
    }

    /// Returns the registry of shown interstitials.
    #[inline]
    #[must_use]
    pub fn interstitials(&self) -> &InterstitialRegistry {
        &self.registry
    }

    /// Returns the renderer process table.
    #[inline]
    #[must_use]
    pub fn processes(&self) -> &ProcessTable {
        &self.services.processes
    }

    /// Returns the security policy table.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.services.policy
    }

    /// Returns the host options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &HostOptions {
        &self.services.options
    }

    /// Hands out the dispatch sequence.
    ///
    /// The embedder runs it, typically with
    /// [`ResourceDispatcher::run`], on its own task. Returns `None` after the
    /// first call.
    pub fn take_dispatcher(&mut self) -> Option<(ResourceDispatcher, GatewayReceiver)> {
        self.dispatcher.take()
    }

    /// Returns a registered profile.
    #[must_use]
    pub fn profile(&self, profile_id: ProfileId) -> Option<&Profile> {
        self.profiles.get(&profile_id)
    }

    /// Registers a profile.
    pub fn add_profile(&mut self, profile: Profile) -> ProfileId {
        let id = profile.id();
        self.profiles.insert(id, profile);
        id
    }

    /// Returns a tab.
    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<&WebContents> {
        self.tabs.get(&tab_id)
    }

    /// Returns a tab for driving it.
    pub fn tab_mut(&mut self, tab_id: TabId) -> Option<&mut WebContents> {
        self.tabs.get_mut(&tab_id)
    }

    /// Returns the number of open tabs.
    #[inline]
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Finds the tab owning a view.
    #[must_use]
    pub fn tab_for_route(&self, route: GlobalRoutingId) -> Option<TabId> {
        self.tabs
            .values()
            .find(|tab| tab.owns_route(route))
            .map(WebContents::tab_id)
    }
}

// ============================================================================
// BrowserContext - Windows & Tabs
// ============================================================================

impl BrowserContext {
    /// Opens a window for a registered profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the profile is unknown.
    pub fn create_browser(&mut self, profile_id: ProfileId, browser_type: BrowserType) -> Result<Browser> {
        if !self.profiles.contains_key(&profile_id) {
            return Err(Error::config(format!("Unknown profile {profile_id}")));
        }
        let browser = Browser::new(profile_id, browser_type);
        self.browsers.add_browser(browser.clone())?;
        Ok(browser)
    }

    /// Closes a window, destroying its tabs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BrowserNotFound`] if the window is not registered.
    pub fn close_browser(&mut self, browser_id: BrowserId) -> Result<()> {
        let browser = self.browsers.remove_browser(browser_id)?;
        for tab_id in browser.tabs() {
            browser.remove_tab(tab_id);
            if let Some(mut tab) = self.tabs.remove(&tab_id) {
                tab.destroy();
            }
        }
        Ok(())
    }

    /// Opens a tab at the end of a window's strip.
    ///
    /// The tab starts in a browsing instance of its own and has no renderer
    /// until its first navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BrowserNotFound`] if the window is not registered.
    pub fn create_tab(&mut self, browser_id: BrowserId) -> Result<TabId> {
        let browser = self
            .browsers
            .find_browser_with_id(browser_id)
            .ok_or_else(|| Error::browser_not_found(browser_id))?;

        let tab_id = TabId::next();
        let site_instance = BrowsingInstance::new().create_site_instance();
        let tab = WebContents::new(
            tab_id,
            site_instance,
            self.services.clone(),
            self.registry.clone(),
        );

        browser.add_tab(tab_id)?;
        self.tabs.insert(tab_id, tab);
        debug!(tab_id = %tab_id, browser_id = %browser_id, "Tab created");
        Ok(tab_id)
    }

    /// Destroys a tab without running its page handlers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab does not exist.
    pub fn destroy_tab(&mut self, tab_id: TabId) -> Result<()> {
        let mut tab = self
            .tabs
            .remove(&tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        tab.destroy();

        if let Some(browser) = self.browsers.browser_for_tab(tab_id) {
            browser.remove_tab(tab_id);
        }
        Ok(())
    }

    /// Destroys every tab whose close protocol finished.
    ///
    /// Returns the destroyed tabs.
    pub fn reap_closed_tabs(&mut self) -> Vec<TabId> {
        let closed: Vec<TabId> = self
            .tabs
            .values()
            .filter(|tab| tab.close_state() == CloseState::Closed)
            .map(WebContents::tab_id)
            .collect();

        for tab_id in &closed {
            let _ = self.destroy_tab(*tab_id);
        }
        closed
    }
}

// ============================================================================
// BrowserContext - Event Routing
// ============================================================================

impl BrowserContext {
    /// Handles everything queued by renderers and the dispatch sequence.
    ///
    /// Returns the number of items handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Ok(event) = self.events_rx.try_recv() {
                self.handle_process_event(event);
            } else if let Ok(notification) = self.notifications_rx.try_recv() {
                self.handle_notification(notification);
            } else {
                break;
            }
            handled += 1;
        }
        handled
    }

    /// Routes one process event to the tab owning its view.
    pub fn handle_process_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Message {
                process_id,
                message,
            } => {
                let route = GlobalRoutingId::new(process_id, message.routing_id);
                let Some(tab) = self.tabs.values_mut().find(|tab| tab.owns_route(route)) else {
                    trace!(route = %route, method = %message.method, "Message for an unknown view dropped");
                    return;
                };

                match tab.on_inbound(route, &message) {
                    Ok(()) => {}
                    Err(Error::BadMessage { .. }) => self.on_process_gone(process_id),
                    Err(e) => debug!(route = %route, error = %e, "Inbound message not handled"),
                }
            }

            ProcessEvent::Exited { process_id } => {
                if let Some(process) = self.services.processes.get(process_id) {
                    process.mark_exited();
                }
                self.on_process_gone(process_id);
            }
        }
    }

    /// Routes one gateway notification.
    pub fn handle_notification(&mut self, notification: GatewayNotification) {
        match notification {
            GatewayNotification::CrossSiteResponseReady {
                pending_route,
                new_request_id,
            } => {
                match self.tabs.values_mut().find(|tab| tab.owns_route(pending_route)) {
                    Some(tab) => tab.on_cross_site_response(pending_route, new_request_id),
                    None => {
                        warn!(route = %pending_route, request_id = %new_request_id, "Cross-site response for an unknown view");
                    }
                }
            }
        }
    }

    /// Tells every tab a renderer process is gone.
    pub fn on_process_gone(&mut self, process_id: ProcessId) {
        debug!(process_id = %process_id, "Propagating process loss");
        for tab in self.tabs.values_mut() {
            tab.on_process_gone(process_id);
        }
    }

    /// Reports missed acknowledgment deadlines in every tab.
    ///
    /// Returns the number of tabs that reported a hang.
    pub fn check_responsiveness(&mut self, now: Instant) -> usize {
        self.tabs
            .values_mut()
            .map(|tab| tab.check_responsiveness(now))
            .filter(|reported| *reported)
            .count()
    }
}

// ============================================================================
// BrowserContext - Lifecycle
// ============================================================================

impl BrowserContext {
    /// Destroys every tab and shuts every process down.
    ///
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        info!(tab_count = self.tabs.len(), "Shutting down browser context");
        for (_, mut tab) in self.tabs.drain() {
            tab.destroy();
        }
        self.services.processes.shutdown_all();
    }
}

impl Drop for BrowserContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    use crate::browser::TabEvent;
    use crate::identifiers::CrossSiteRequestId;
    use crate::protocol::{InboundMessage, ViewMsg};
    use crate::testing::{init_tracing, url};
    use crate::transport::{InProcessLauncher, RendererEndpoint, RequestStatus};

    struct Fixture {
        context: BrowserContext,
        launcher: InProcessLauncher,
        browser: Browser,
        tab_id: TabId,
    }

    fn fixture() -> Fixture {
        init_tracing();
        let launcher = InProcessLauncher::new();
        let profile = Profile::new("default");
        let mut context = BrowserContext::builder()
            .launcher(Arc::new(launcher.clone()))
            .profile(profile.clone())
            .build()
            .expect("context");
        let browser = context
            .create_browser(profile.id(), BrowserType::Normal)
            .expect("browser");
        let tab_id = context.create_tab(browser.id()).expect("tab");

        Fixture {
            context,
            launcher,
            browser,
            tab_id,
        }
    }

    impl Fixture {
        fn tab(&mut self) -> &mut WebContents {
            self.context.tab_mut(self.tab_id).expect("tab")
        }

        fn endpoint(&self, route: GlobalRoutingId) -> RendererEndpoint {
            self.launcher.take_endpoint(route.process_id).expect("endpoint")
        }
    }

    fn post(endpoint: &RendererEndpoint, route: GlobalRoutingId, method: &str, params: serde_json::Value) {
        endpoint
            .post(InboundMessage::new(route.routing_id, method, params))
            .expect("post");
    }

    #[test]
    fn test_create_browser_for_unknown_profile() {
        let mut f = fixture();
        let err = f
            .context
            .create_browser(ProfileId::generate(), BrowserType::Normal)
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_tab_joins_browser_strip() {
        let f = fixture();
        assert_eq!(f.browser.tabs(), vec![f.tab_id]);
        assert_eq!(f.browser.active_tab(), Some(f.tab_id));
        assert_eq!(f.context.browser_list().all_tabs(), vec![(f.browser.id(), f.tab_id)]);
    }

    #[test]
    fn test_inbound_routed_to_owning_tab() {
        let mut f = fixture();
        let a = f.tab().load_url("https://a.example/").expect("load");
        let endpoint = f.endpoint(a);

        post(&endpoint, a, "frame.navigate", json!({ "pageId": 1, "url": "https://a.example/", "transition": "typed" }));
        assert_eq!(f.context.pump(), 1);

        assert_eq!(
            f.context.tab(f.tab_id).and_then(|t| t.url()).map(|u| u.as_str()),
            Some("https://a.example/")
        );
        assert_eq!(f.context.tab_for_route(a), Some(f.tab_id));
    }

    #[test]
    fn test_bad_message_kills_process() {
        let mut f = fixture();
        let a = f.tab().load_url("https://a.example/").expect("load");
        let endpoint = f.endpoint(a);

        post(&endpoint, a, "frame.navigate", json!({ "pageId": "not a number" }));
        f.context.pump();

        assert!(f.tab().drain_events().contains(&TabEvent::Crashed));
        assert!(!f.context.policy().is_registered(a.process_id));
    }

    #[test]
    fn test_process_exit_propagates() {
        let mut f = fixture();
        let a = f.tab().load_url("https://a.example/").expect("load");

        assert!(f.launcher.crash(a.process_id));
        f.context.pump();

        assert!(f.tab().drain_events().contains(&TabEvent::Crashed));
        assert!(!f.tab().current_host().renderer_initialized());
    }

    #[test]
    fn test_full_cross_site_handoff() {
        let mut f = fixture();
        let (mut dispatcher, mut commands) = f.context.take_dispatcher().expect("dispatcher");
        let mut settle = |dispatcher: &mut ResourceDispatcher| {
            while let Ok(command) = commands.try_recv() {
                dispatcher.apply(command);
            }
        };

        let a = f.tab().load_url("https://a.example/").expect("a");
        let a_end = f.endpoint(a);
        post(&a_end, a, "frame.navigate", json!({ "pageId": 1, "url": "https://a.example/", "transition": "typed" }));
        f.context.pump();

        let b = f.tab().load_url("https://b.example/").expect("b");
        let mut b_end = f.endpoint(b);
        assert!(b_end.drain().iter().all(|m| !matches!(m.message, ViewMsg::Navigate(_))));

        post(&a_end, a, "view.shouldCloseAck", json!({ "proceed": true }));
        f.context.pump();
        settle(&mut dispatcher);
        assert!(b_end.drain().iter().any(|m| matches!(m.message, ViewMsg::Navigate(_))));

        let request = CrossSiteRequestId::next();
        dispatcher.begin_request(request, b, url("https://b.example/"));
        dispatcher.response_started(request);
        assert_eq!(dispatcher.request_status(request), Some(RequestStatus::AwaitingUnload));

        f.context.pump();
        post(&a_end, a, "view.closePageAck", json!({}));
        f.context.pump();
        settle(&mut dispatcher);
        assert_eq!(dispatcher.request_status(request), Some(RequestStatus::Delivered));

        post(&b_end, b, "frame.navigate", json!({ "pageId": 1, "url": "https://b.example/", "transition": "typed" }));
        f.context.pump();
        settle(&mut dispatcher);

        assert_eq!(f.tab().current_host().route(), b);
        assert!(!dispatcher.has_pending_cross_site(b));
        assert!(f.context.processes().get(a.process_id).is_none());
    }

    #[test]
    fn test_closed_tabs_are_reaped() {
        let mut f = fixture();
        f.tab().close();

        assert_eq!(f.context.reap_closed_tabs(), vec![f.tab_id]);
        assert_eq!(f.context.tab_count(), 0);
        assert!(f.browser.tabs().is_empty());
    }

    #[test]
    fn test_hang_polling() {
        let mut f = fixture();
        let a = f.tab().load_url("https://a.example/").expect("a");
        let endpoint = f.endpoint(a);
        post(&endpoint, a, "frame.navigate", json!({ "pageId": 1, "url": "https://a.example/", "transition": "typed" }));
        f.context.pump();
        f.tab().close();

        let later = Instant::now() + Duration::from_secs(10);
        assert_eq!(f.context.check_responsiveness(later), 1);
        assert!(f.context.reap_closed_tabs().is_empty());

        post(&endpoint, a, "view.shouldCloseAck", json!({ "proceed": true }));
        f.context.pump();
        post(&endpoint, a, "view.closePageAck", json!({}));
        f.context.pump();
        assert_eq!(f.context.reap_closed_tabs(), vec![f.tab_id]);
    }

    #[test]
    fn test_close_browser_destroys_tabs() {
        let mut f = fixture();
        let second = f.context.create_tab(f.browser.id()).expect("second tab");

        f.context.close_browser(f.browser.id()).expect("close");

        assert!(f.context.tab(f.tab_id).is_none());
        assert!(f.context.tab(second).is_none());
        assert!(f.context.browser_list().is_empty());
    }

    #[test]
    fn test_dispatcher_handed_out_once() {
        let mut f = fixture();
        assert!(f.context.take_dispatcher().is_some());
        assert!(f.context.take_dispatcher().is_none());
    }
}
