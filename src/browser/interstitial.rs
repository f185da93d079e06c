//! Blocking pages shown in front of a tab.
//!
//! An [`InterstitialPage`] covers a tab with its own renderer while the
//! original page's network requests are held by the gateway, and resolves to
//! exactly one decision.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──show()──► Showing ──proceed()──────► Decided(Proceed) ──commit──► Hidden
//!                        │   └──dont_proceed()─► Hidden
//!                        └──navigation started─► Disabled ──commit / close──► Hidden
//! ```
//!
//! # Gateway actions
//!
//! | Decision | New navigation | Same page |
//! |----------|----------------|-----------|
//! | Proceed | Cancel | Resume |
//! | DontProceed | Resume | Cancel |
//! | Unrelated navigation | Cancel | Cancel |
//! | Original renderer gone | Cancel | Cancel |
//!
//! `Block` is posted before the interstitial's renderer is created. The
//! held requests are settled through a [`BlockedRequests`] ticket, so at
//! most one of `Resume`/`Cancel` is ever posted per interstitial.
//!
//! A cross-site pending host is blocked as well and cannot commit while
//! the interstitial is undecided. Not proceeding over a new navigation
//! cancels it; every other outcome releases it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{GlobalRoutingId, TabId};
use crate::transport::{BlockedAction, BlockedRequests};

use super::delegate::RenderViewHostDelegate;
use super::manager::RenderViewHostManager;
use super::navigation::{NavigationController, NavigationEntry};
use super::render_view_host::RenderViewHost;
use super::services::HostServices;
use super::site_instance::BrowsingInstance;

// ============================================================================
// Types
// ============================================================================

/// The user's answer to an interstitial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterstitialAction {
    /// Continue to the blocked content.
    Proceed,
    /// Go back to safety.
    DontProceed,
}

/// Lifecycle state of an [`InterstitialPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterstitialState {
    /// Not shown yet.
    Created,
    /// Shown and waiting for a decision.
    Showing,
    /// An unrelated navigation started; the next commit dismisses it.
    Disabled,
    /// Decided, waiting for the navigation to commit.
    Decided(InterstitialAction),
    /// Removed from the tab.
    Hidden,
}

/// Content and command handling of an interstitial.
pub trait InterstitialPageDelegate {
    /// Returns the page markup.
    fn html(&self) -> String;

    /// Maps a command posted by the page to a decision.
    ///
    /// The default understands `"proceed"` and `"takeMeBack"`, with or
    /// without JSON string quotes.
    fn command_received(&mut self, command: &str) -> Option<InterstitialAction> {
        match command.trim().trim_matches('"') {
            "proceed" => Some(InterstitialAction::Proceed),
            "takeMeBack" | "dontProceed" => Some(InterstitialAction::DontProceed),
            _ => None,
        }
    }

    /// Called once when the user proceeds.
    fn on_proceed(&mut self) {}

    /// Called once when the user does not proceed, explicitly or not.
    fn on_dont_proceed(&mut self) {}
}

/// Interstitial with static markup.
#[derive(Debug, Clone)]
pub struct HtmlInterstitial {
    html: String,
}

impl HtmlInterstitial {
    /// Creates a delegate serving `html`.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl InterstitialPageDelegate for HtmlInterstitial {
    fn html(&self) -> String {
        self.html.clone()
    }
}

// ============================================================================
// InterstitialRegistry
// ============================================================================

/// What the registry knows about a shown interstitial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterstitialSummary {
    /// Host whose requests are blocked.
    pub original_route: GlobalRoutingId,
    /// Host rendering the interstitial.
    pub interstitial_route: GlobalRoutingId,
    /// Shown for a new top-level navigation.
    pub new_navigation: bool,
    /// URL the interstitial stands in for.
    pub url: Url,
}

/// Interstitials currently shown, by tab.
///
/// Owned by the [`BrowserContext`](crate::BrowserContext) and injected into
/// every tab. Cheap to clone; clones share the map.
#[derive(Clone, Default)]
pub struct InterstitialRegistry {
    inner: Arc<Mutex<FxHashMap<TabId, InterstitialSummary>>>,
}

impl fmt::Debug for InterstitialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterstitialRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl InterstitialRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the interstitial of a tab.
    ///
    /// Returns `false` if the tab already shows one.
    pub fn insert(&self, tab_id: TabId, summary: InterstitialSummary) -> bool {
        let mut map = self.inner.lock();
        if map.contains_key(&tab_id) {
            return false;
        }
        map.insert(tab_id, summary);
        true
    }

    /// Forgets the interstitial of a tab.
    pub fn remove(&self, tab_id: TabId) -> Option<InterstitialSummary> {
        self.inner.lock().remove(&tab_id)
    }

    /// Returns the interstitial shown in a tab.
    #[must_use]
    pub fn get(&self, tab_id: TabId) -> Option<InterstitialSummary> {
        self.inner.lock().get(&tab_id).cloned()
    }

    /// Returns `true` if the tab shows an interstitial.
    #[must_use]
    pub fn contains(&self, tab_id: TabId) -> bool {
        self.inner.lock().contains_key(&tab_id)
    }

    /// Returns the number of shown interstitials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no interstitial is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ============================================================================
// InterstitialPage
// ============================================================================

/// A blocking page shown over one tab.
pub struct InterstitialPage {
    tab_id: TabId,
    url: Url,
    new_navigation: bool,
    state: InterstitialState,
    original_route: Option<GlobalRoutingId>,
    blocked: Option<BlockedRequests>,
    host: Option<RenderViewHost>,
    delegate: Box<dyn InterstitialPageDelegate>,
    services: HostServices,
    registry: InterstitialRegistry,
}

impl fmt::Debug for InterstitialPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterstitialPage")
            .field("tab_id", &self.tab_id)
            .field("url", &self.url.as_str())
            .field("new_navigation", &self.new_navigation)
            .field("state", &self.state)
            .field("original_route", &self.original_route)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// InterstitialPage - Constructor
// ============================================================================

impl InterstitialPage {
    /// Creates an interstitial for `url` in a tab.
    ///
    /// `new_navigation` is `true` when the interstitial stands in for a new
    /// top-level navigation rather than a load inside the current page.
    #[must_use]
    pub fn new(
        tab_id: TabId,
        url: Url,
        new_navigation: bool,
        delegate: Box<dyn InterstitialPageDelegate>,
        services: HostServices,
        registry: InterstitialRegistry,
    ) -> Self {
        Self {
            tab_id,
            url,
            new_navigation,
            state: InterstitialState::Created,
            original_route: None,
            blocked: None,
            host: None,
            delegate,
            services,
            registry,
        }
    }
}

// ============================================================================
// InterstitialPage - Accessors
// ============================================================================

impl InterstitialPage {
    /// Returns the tab.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns the URL the interstitial stands in for.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` if shown for a new navigation.
    #[inline]
    #[must_use]
    pub fn is_new_navigation(&self) -> bool {
        self.new_navigation
    }

    /// Returns the state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> InterstitialState {
        self.state
    }

    /// Returns the host whose requests are blocked.
    #[inline]
    #[must_use]
    pub fn original_route(&self) -> Option<GlobalRoutingId> {
        self.original_route
    }

    /// Returns the route of the interstitial's own host.
    #[must_use]
    pub fn route(&self) -> Option<GlobalRoutingId> {
        self.host.as_ref().map(RenderViewHost::route)
    }

    /// Returns the interstitial's own host.
    pub fn host_mut(&mut self) -> Option<&mut RenderViewHost> {
        self.host.as_mut()
    }

    /// Returns `true` while a decision is still possible.
    #[inline]
    #[must_use]
    pub fn awaits_decision(&self) -> bool {
        matches!(
            self.state,
            InterstitialState::Showing | InterstitialState::Disabled
        )
    }

    /// Returns `true` once removed from the tab.
    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.state == InterstitialState::Hidden
    }
}

// ============================================================================
// InterstitialPage - Show
// ============================================================================

impl InterstitialPage {
    /// Blocks the current page's requests and shows the interstitial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if shown twice or if the tab
    /// already shows an interstitial, or the error of creating the
    /// interstitial's renderer. On error nothing stays blocked.
    pub fn show(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> Result<()> {
        if self.state != InterstitialState::Created {
            error!(tab_id = %self.tab_id, state = ?self.state, "Interstitial shown twice");
            return Err(Error::contract(format!(
                "interstitial in {} was already shown",
                self.tab_id
            )));
        }

        let original = manager.current_host().route();
        let site_instance = BrowsingInstance::new().create_site_instance();
        let mut host = RenderViewHost::new(site_instance, self.services.clone());
        let summary = InterstitialSummary {
            original_route: original,
            interstitial_route: host.route(),
            new_navigation: self.new_navigation,
            url: self.url.clone(),
        };

        if !self.registry.insert(self.tab_id, summary) {
            error!(tab_id = %self.tab_id, "Tab already shows an interstitial");
            return Err(Error::contract(format!(
                "{} already shows an interstitial",
                self.tab_id
            )));
        }

        // Nothing may reach the covered page or a pending one before the
        // user decides.
        let blocked = BlockedRequests::block(self.services.gateway.clone(), original);
        manager.block_pending();

        if self.new_navigation {
            controller.set_transient_entry(NavigationEntry::transient(self.url.clone()));
        }

        if let Err(e) = self.load(&mut host, delegate) {
            warn!(tab_id = %self.tab_id, error = %e, "Interstitial renderer failed");
            blocked.resume();
            manager.release_pending();
            if self.new_navigation {
                controller.discard_transient();
            }
            self.registry.remove(self.tab_id);
            return Err(e);
        }

        manager.show_interstitial(host.route());
        info!(tab_id = %self.tab_id, original = %original, interstitial = %host.route(), url = %self.url, "Interstitial shown");

        self.original_route = Some(original);
        self.blocked = Some(blocked);
        self.host = Some(host);
        self.state = InterstitialState::Showing;
        Ok(())
    }

    fn load(
        &self,
        host: &mut RenderViewHost,
        delegate: &mut dyn RenderViewHostDelegate,
    ) -> Result<()> {
        let html = self.delegate.html();
        let data_url = Url::parse(&format!(
            "data:text/html;charset=utf-8,{}",
            urlencoding::encode(&html)
        ))?;
        host.create_render_view(delegate)?;
        host.navigate_to_url(data_url)
    }
}

// ============================================================================
// InterstitialPage - Decisions
// ============================================================================

impl InterstitialPage {
    /// Continues to the blocked content.
    ///
    /// A same-page interstitial hides at once; a new-navigation one hides
    /// when the navigation commits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] unless the interstitial is
    /// showing and undecided.
    pub fn proceed(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) -> Result<()> {
        if self.state != InterstitialState::Showing {
            return Err(self.decision_rejected(InterstitialAction::Proceed));
        }

        self.settle(if self.new_navigation {
            BlockedAction::Cancel
        } else {
            BlockedAction::Resume
        });
        self.state = InterstitialState::Decided(InterstitialAction::Proceed);
        debug!(tab_id = %self.tab_id, "Interstitial proceeded");
        self.delegate.on_proceed();

        if self.new_navigation {
            manager.interstitial_leaving();
        } else {
            self.hide(manager, controller);
        }
        Ok(())
    }

    /// Returns to the page the interstitial covered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] once a decision was made.
    pub fn dont_proceed(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) -> Result<()> {
        if !self.awaits_decision() {
            return Err(self.decision_rejected(InterstitialAction::DontProceed));
        }

        self.settle(if self.new_navigation {
            BlockedAction::Resume
        } else {
            BlockedAction::Cancel
        });

        if self.new_navigation {
            controller.discard_non_committed();
            manager.cancel_pending();
        }

        self.state = InterstitialState::Decided(InterstitialAction::DontProceed);
        debug!(tab_id = %self.tab_id, "Interstitial dismissed");
        self.delegate.on_dont_proceed();
        self.hide(manager, controller);
        Ok(())
    }

    /// Applies a command posted by the interstitial's page.
    ///
    /// Returns the decision taken, if the command mapped to one.
    ///
    /// # Errors
    ///
    /// See [`proceed`](Self::proceed) and [`dont_proceed`](Self::dont_proceed).
    pub fn on_command(
        &mut self,
        command: &str,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) -> Result<Option<InterstitialAction>> {
        let Some(action) = self.delegate.command_received(command) else {
            debug!(tab_id = %self.tab_id, command, "Interstitial command ignored");
            return Ok(None);
        };
        match action {
            InterstitialAction::Proceed => self.proceed(manager, controller)?,
            InterstitialAction::DontProceed => self.dont_proceed(manager, controller)?,
        }
        Ok(Some(action))
    }

    fn decision_rejected(&self, action: InterstitialAction) -> Error {
        error!(tab_id = %self.tab_id, ?action, state = ?self.state, "Interstitial decision rejected");
        Error::contract(format!(
            "interstitial in {} cannot take {action:?} while {:?}",
            self.tab_id, self.state
        ))
    }

    fn settle(&mut self, action: BlockedAction) {
        if let Some(blocked) = self.blocked.take() {
            blocked.settle(action);
        }
    }
}

// ============================================================================
// InterstitialPage - Tab Notifications
// ============================================================================

impl InterstitialPage {
    /// The tab started an unrelated navigation.
    ///
    /// The blocked requests are cancelled and the interstitial is disabled;
    /// it goes away with the next commit.
    pub fn on_navigation_started(&mut self) {
        if self.state != InterstitialState::Showing {
            return;
        }
        self.settle(BlockedAction::Cancel);
        self.state = InterstitialState::Disabled;
        debug!(tab_id = %self.tab_id, "Interstitial disabled by navigation");
    }

    /// A main-frame navigation of the tab committed.
    pub fn on_tab_navigation_committed(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) {
        self.dismiss(manager, controller);
    }

    /// The interstitial's own renderer went away.
    pub fn on_own_renderer_gone(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) {
        warn!(tab_id = %self.tab_id, "Interstitial renderer gone");
        self.dismiss(manager, controller);
    }

    /// The covered page's renderer went away.
    ///
    /// Undecided requests are cancelled; there is nothing to resume into.
    pub fn on_original_host_gone(&mut self) {
        if self.awaits_decision() && self.blocked.is_some() {
            warn!(tab_id = %self.tab_id, "Covered renderer gone, cancelling blocked requests");
            self.settle(BlockedAction::Cancel);
        }
    }

    /// Hides the interstitial, implicitly not proceeding if undecided.
    ///
    /// Used when the tab closes or another interstitial replaces this one.
    pub fn dismiss(
        &mut self,
        manager: &mut RenderViewHostManager,
        controller: &mut NavigationController,
    ) {
        if self.awaits_decision() {
            // Cannot fail while a decision is pending.
            let _ = self.dont_proceed(manager, controller);
            return;
        }
        self.hide(manager, controller);
    }

    fn hide(&mut self, manager: &mut RenderViewHostManager, controller: &mut NavigationController) {
        if self.state == InterstitialState::Hidden {
            return;
        }

        if let Some(mut host) = self.host.take() {
            host.shutdown();
        }
        if self.new_navigation {
            controller.discard_transient();
        }
        manager.hide_interstitial();
        self.registry.remove(self.tab_id);
        self.state = InterstitialState::Hidden;
        debug!(tab_id = %self.tab_id, "Interstitial hidden");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::browser::delegate::HostEventQueue;
    use crate::browser::manager::ManagerState;
    use crate::protocol::{PageTransition, ViewMsg};
    use crate::testing::{Harness, url};
    use crate::transport::GatewayCommand;

    struct Fixture {
        harness: Harness,
        manager: RenderViewHostManager,
        controller: NavigationController,
        events: HostEventQueue,
        registry: InterstitialRegistry,
        tab_id: TabId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut harness = Harness::new();
            let mut events = HostEventQueue::new();
            let mut manager =
                RenderViewHostManager::new(harness.browsing.create_site_instance(), harness.services.clone());
            let entry = NavigationEntry::new(url("https://a.example/"), PageTransition::Typed);
            manager.navigate(&entry, false, &mut events).expect("navigate");
            let _ = harness.gateway_commands();
            let _ = events.take();

            Self {
                harness,
                manager,
                controller: NavigationController::new(50, 4096),
                events,
                registry: InterstitialRegistry::new(),
                tab_id: TabId::next(),
            }
        }

        fn page(&self, new_navigation: bool) -> InterstitialPage {
            InterstitialPage::new(
                self.tab_id,
                url("https://evil.example/"),
                new_navigation,
                Box::new(HtmlInterstitial::new("<h1>Warning</h1>")),
                self.harness.services.clone(),
                self.registry.clone(),
            )
        }

        fn shown(&mut self, new_navigation: bool) -> InterstitialPage {
            let mut page = self.page(new_navigation);
            page.show(&mut self.manager, &mut self.controller, &mut self.events)
                .expect("show");
            page
        }

        fn original(&self) -> GlobalRoutingId {
            self.manager.current_host().route()
        }
    }

    #[test]
    fn test_show_blocks_first_and_loads_data_url() {
        let mut f = Fixture::new();
        let original = f.original();

        let page = f.shown(true);

        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Block { route: original }]);
        assert_eq!(page.state(), InterstitialState::Showing);
        assert_eq!(f.manager.state(), ManagerState::ShowingInterstitial);
        assert_eq!(f.manager.interstitial_route(), page.route());
        assert!(f.controller.transient_entry().is_some());

        let route = page.route().expect("interstitial host");
        let sent = f.harness.sent(route.process_id);
        assert!(matches!(
            &sent[..],
            [ViewMsg::CreateView, ViewMsg::Navigate(p)] if p.url.as_str().starts_with("data:text/html;charset=utf-8,%3Ch1%3EWarning")
        ));

        let summary = f.registry.get(f.tab_id).expect("registered");
        assert_eq!(summary.original_route, original);
        assert_eq!(summary.interstitial_route, route);
    }

    #[test]
    fn test_proceed_new_navigation_cancels_and_waits_for_commit() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(true);
        let _ = f.harness.gateway_commands();

        page.proceed(&mut f.manager, &mut f.controller).expect("proceed");

        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Cancel { route: original }]);
        assert_eq!(page.state(), InterstitialState::Decided(InterstitialAction::Proceed));
        assert_eq!(f.manager.state(), ManagerState::LeavingInterstitial);

        page.on_tab_navigation_committed(&mut f.manager, &mut f.controller);
        assert!(page.is_hidden());
        assert_eq!(f.manager.state(), ManagerState::Normal);
        assert!(f.registry.is_empty());
        assert!(f.harness.gateway_commands().is_empty());
    }

    #[test]
    fn test_proceed_same_page_resumes_and_hides() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(false);
        let route = page.route().expect("route");
        let _ = f.harness.gateway_commands();

        page.proceed(&mut f.manager, &mut f.controller).expect("proceed");

        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Resume { route: original }]);
        assert!(page.is_hidden());
        assert!(f.harness.services.processes.get(route.process_id).is_none());
    }

    #[test]
    fn test_dont_proceed_new_navigation_resumes_and_discards_entry() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(true);
        let _ = f.harness.gateway_commands();

        page.dont_proceed(&mut f.manager, &mut f.controller).expect("dont proceed");

        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Resume { route: original }]);
        assert!(f.controller.transient_entry().is_none());
        assert!(page.is_hidden());
        assert_eq!(f.manager.state(), ManagerState::Normal);
    }

    #[test]
    fn test_dont_proceed_same_page_cancels() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(false);
        let _ = f.harness.gateway_commands();

        page.dont_proceed(&mut f.manager, &mut f.controller).expect("dont proceed");

        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Cancel { route: original }]);
    }

    #[test]
    fn test_second_decision_is_rejected_without_gateway_action() {
        let mut f = Fixture::new();
        let mut page = f.shown(false);
        page.proceed(&mut f.manager, &mut f.controller).expect("proceed");
        let _ = f.harness.gateway_commands();

        let err = page
            .dont_proceed(&mut f.manager, &mut f.controller)
            .expect_err("second decision");
        assert!(err.is_contract_violation());
        let err = page.proceed(&mut f.manager, &mut f.controller).expect_err("again");
        assert!(err.is_contract_violation());
        assert!(f.harness.gateway_commands().is_empty());
    }

    #[test]
    fn test_navigation_disables_then_commit_dismisses() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(true);
        let _ = f.harness.gateway_commands();

        page.on_navigation_started();
        assert_eq!(page.state(), InterstitialState::Disabled);
        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Cancel { route: original }]);
        assert!(page.proceed(&mut f.manager, &mut f.controller).is_err());

        page.on_tab_navigation_committed(&mut f.manager, &mut f.controller);
        assert!(page.is_hidden());
        assert!(f.harness.gateway_commands().is_empty());
    }

    #[test]
    fn test_original_gone_cancels_once() {
        let mut f = Fixture::new();
        let original = f.original();
        let mut page = f.shown(false);
        let _ = f.harness.gateway_commands();

        page.on_original_host_gone();
        page.on_original_host_gone();
        assert_eq!(f.harness.gateway_commands(), vec![GatewayCommand::Cancel { route: original }]);

        page.proceed(&mut f.manager, &mut f.controller).expect("proceed");
        assert!(f.harness.gateway_commands().is_empty());
    }

    #[test]
    fn test_command_maps_to_decision() {
        let mut f = Fixture::new();
        let mut page = f.shown(false);

        let ignored = page
            .on_command("\"help\"", &mut f.manager, &mut f.controller)
            .expect("ignored");
        assert_eq!(ignored, None);

        let action = page
            .on_command("\"takeMeBack\"", &mut f.manager, &mut f.controller)
            .expect("command");
        assert_eq!(action, Some(InterstitialAction::DontProceed));
        assert!(page.is_hidden());
    }

    #[test]
    fn test_show_twice_rejected() {
        let mut f = Fixture::new();
        let mut page = f.shown(false);
        let err = page
            .show(&mut f.manager, &mut f.controller, &mut f.events)
            .expect_err("second show");
        assert!(err.is_contract_violation());

        let mut other = f.page(false);
        let _ = f.harness.gateway_commands();
        let err = other
            .show(&mut f.manager, &mut f.controller, &mut f.events)
            .expect_err("tab busy");
        assert!(err.is_contract_violation());
        assert!(f.harness.gateway_commands().is_empty());
        assert_eq!(other.state(), InterstitialState::Created);
    }

    #[test]
    fn test_launch_failure_unblocks() {
        let mut harness = Harness::failing();
        let mut events = HostEventQueue::new();
        let mut manager =
            RenderViewHostManager::new(harness.browsing.create_site_instance(), harness.services.clone());
        let mut controller = NavigationController::new(50, 4096);
        let registry = InterstitialRegistry::new();
        let original = manager.current_host().route();
        let mut page = InterstitialPage::new(
            TabId::next(),
            url("https://evil.example/"),
            true,
            Box::new(HtmlInterstitial::new("x")),
            harness.services.clone(),
            registry.clone(),
        );

        let err = page
            .show(&mut manager, &mut controller, &mut events)
            .expect_err("launch fails");

        assert!(matches!(err, Error::ProcessLaunchFailed { .. }));
        assert_eq!(
            harness.gateway_commands(),
            vec![
                GatewayCommand::Block { route: original },
                GatewayCommand::Resume { route: original }
            ]
        );
        assert!(controller.transient_entry().is_none());
        assert!(registry.is_empty());
        assert_eq!(page.state(), InterstitialState::Created);
    }
}
