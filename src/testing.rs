//! Shared test fixtures.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use url::Url;

use crate::browser::{BrowsingInstance, HostServices, InterstitialRegistry, SiteInstance, WebContents};
use crate::context::HostOptions;
use crate::error::{Error, Result};
use crate::identifiers::{GlobalRoutingId, ProcessId, RoutingId, TabId};
use crate::protocol::{InboundMessage, ViewMsg};
use crate::security::SecurityPolicy;
use crate::transport::{
    GatewayCommand, GatewayReceiver, InProcessLauncher, ProcessEventReceiver, ProcessLauncher,
    ProcessTable, RendererEndpoint, gateway_channel, process_event_queue,
};

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a URL known to be valid.
pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).expect("valid test url")
}

/// Builds a raw inbound message.
pub(crate) fn inbound(routing_id: RoutingId, method: &str, params: Value) -> InboundMessage {
    InboundMessage::new(routing_id, method, params)
}

/// Launcher that always refuses.
pub(crate) struct FailingLauncher;

impl ProcessLauncher for FailingLauncher {
    fn launch(&self, process_id: ProcessId, _endpoint: RendererEndpoint) -> Result<()> {
        Err(Error::process_launch_failed(process_id, "spawn refused"))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Host services wired to an in-process launcher and a captured gateway.
pub(crate) struct Harness {
    pub services: HostServices,
    pub launcher: InProcessLauncher,
    pub gateway_rx: GatewayReceiver,
    pub events_rx: ProcessEventReceiver,
    pub browsing: BrowsingInstance,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(HostOptions::new())
    }

    pub fn with_options(options: HostOptions) -> Self {
        let launcher = InProcessLauncher::new();
        Self::build(Arc::new(launcher.clone()), launcher, options)
    }

    pub fn failing() -> Self {
        Self::build(Arc::new(FailingLauncher), InProcessLauncher::new(), HostOptions::new())
    }

    fn build(
        process_launcher: Arc<dyn ProcessLauncher>,
        launcher: InProcessLauncher,
        options: HostOptions,
    ) -> Self {
        init_tracing();
        let policy = SecurityPolicy::new(options.web_safe_schemes.iter().cloned());
        let (events_tx, events_rx) = process_event_queue();
        let (gateway, gateway_rx) = gateway_channel();
        let processes = ProcessTable::new(process_launcher, policy.clone(), events_tx);

        Self {
            services: HostServices {
                processes,
                policy,
                gateway,
                options: Arc::new(options),
            },
            launcher,
            gateway_rx,
            events_rx,
            browsing: BrowsingInstance::new(),
        }
    }

    /// Site instance for `url` in the harness browsing instance.
    pub fn site(&self, s: &str) -> SiteInstance {
        self.browsing.site_instance_for_url(&url(s))
    }

    /// Drains every gateway command posted so far.
    pub fn gateway_commands(&mut self) -> Vec<GatewayCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.gateway_rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Drains every message sent to a process so far.
    pub fn sent(&self, process_id: ProcessId) -> Vec<ViewMsg> {
        self.launcher
            .drain(process_id)
            .into_iter()
            .map(|routed| routed.message)
            .collect()
    }
}

// ============================================================================
// TabHarness
// ============================================================================

/// A single tab on top of a [`Harness`].
pub(crate) struct TabHarness {
    pub tab: WebContents,
    pub registry: InterstitialRegistry,
    pub harness: Harness,
}

impl TabHarness {
    pub fn new() -> Self {
        let harness = Harness::new();
        let registry = InterstitialRegistry::new();
        let tab = WebContents::new(
            TabId::next(),
            harness.browsing.create_site_instance(),
            harness.services.clone(),
            registry.clone(),
        );
        Self {
            tab,
            registry,
            harness,
        }
    }

    /// Delivers a renderer message to the tab.
    pub fn renderer_says(&mut self, route: GlobalRoutingId, method: &str, params: Value) {
        let message = inbound(route.routing_id, method, params);
        self.tab
            .on_inbound(route, &message)
            .expect("inbound message accepted");
    }

    /// Reports a main-frame commit from `route`.
    pub fn commit(&mut self, route: GlobalRoutingId, page_id: i32, url: &str) {
        self.renderer_says(
            route,
            "frame.navigate",
            json!({ "pageId": page_id, "url": url, "transition": "link" }),
        );
    }

    /// Drains the messages sent to `route`'s view.
    pub fn sent(&self, route: GlobalRoutingId) -> Vec<ViewMsg> {
        self.harness
            .launcher
            .drain(route.process_id)
            .into_iter()
            .filter(|routed| routed.routing_id == route.routing_id)
            .map(|routed| routed.message)
            .collect()
    }
}
