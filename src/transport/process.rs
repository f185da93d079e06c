//! Renderer process hosts and launchers.
//!
//! A [`RenderProcessHost`] is the browser's handle on one renderer process.
//! It is created unlaunched, launched lazily by the first view that needs it
//! through a pluggable [`ProcessLauncher`], and may be relaunched after the
//! process exits.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──init()──► Running ──exit / kill / shutdown──► Exited
//!   ▲                                                    │
//!   └──────────────────── init() ◄───────────────────────┘
//! ```
//!
//! The process is registered with the [`SecurityPolicy`] while it runs and
//! unregistered, losing all grants, when it exits.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ProcessId, RoutingId, SiteInstanceId};
use crate::protocol::{RoutedMessage, ViewMsg};
use crate::security::SecurityPolicy;

use super::channel::{ProcessEventSender, RendererChannel, RendererEndpoint, renderer_channel};

// ============================================================================
// ProcessLauncher
// ============================================================================

/// Starts renderer processes.
///
/// The launcher receives the process end of a fresh channel and is
/// responsible for handing it to whatever executes the renderer.
pub trait ProcessLauncher: Send + Sync {
    /// Launches the renderer for `process_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessLaunchFailed`] if the process cannot start.
    fn launch(&self, process_id: ProcessId, endpoint: RendererEndpoint) -> Result<()>;
}

// ============================================================================
// InProcessLauncher
// ============================================================================

/// Launcher that parks endpoints in memory.
///
/// The embedder (or a test) takes the endpoint out and plays the renderer.
/// Cheap to clone; clones share the parked endpoints.
#[derive(Debug, Clone, Default)]
pub struct InProcessLauncher {
    endpoints: Arc<Mutex<FxHashMap<ProcessId, RendererEndpoint>>>,
}

impl InProcessLauncher {
    /// Creates an empty launcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the endpoint of a process.
    #[must_use]
    pub fn take_endpoint(&self, process_id: ProcessId) -> Option<RendererEndpoint> {
        self.endpoints.lock().remove(&process_id)
    }

    /// Returns every queued message for a process, oldest first.
    #[must_use]
    pub fn drain(&self, process_id: ProcessId) -> Vec<RoutedMessage> {
        self.endpoints
            .lock()
            .get_mut(&process_id)
            .map(RendererEndpoint::drain)
            .unwrap_or_default()
    }

    /// Simulates the process exiting.
    ///
    /// Returns `false` if no endpoint is parked for the process.
    pub fn crash(&self, process_id: ProcessId) -> bool {
        let endpoint = self.endpoints.lock().remove(&process_id);
        endpoint.is_some()
    }

    /// Returns the processes with a parked endpoint.
    #[must_use]
    pub fn launched(&self) -> Vec<ProcessId> {
        let mut ids: Vec<_> = self.endpoints.lock().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl ProcessLauncher for InProcessLauncher {
    fn launch(&self, process_id: ProcessId, endpoint: RendererEndpoint) -> Result<()> {
        self.endpoints.lock().insert(process_id, endpoint);
        Ok(())
    }
}

// ============================================================================
// RenderProcessHost
// ============================================================================

/// Run state of a renderer process.
enum ProcessState {
    /// Never launched.
    Idle,
    /// Launched; messages go down the channel.
    Running(RendererChannel),
    /// Exited, killed or shut down.
    Exited,
}

struct ProcessInner {
    id: ProcessId,
    site_instance_id: SiteInstanceId,
    launcher: Arc<dyn ProcessLauncher>,
    policy: SecurityPolicy,
    events_tx: ProcessEventSender,
    state: Mutex<ProcessState>,
    routes: Mutex<FxHashSet<RoutingId>>,
}

/// Browser-side handle on one renderer process.
///
/// Cheap to clone; all clones refer to the same process.
#[derive(Clone)]
pub struct RenderProcessHost {
    inner: Arc<ProcessInner>,
}

impl fmt::Debug for RenderProcessHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderProcessHost")
            .field("id", &self.inner.id)
            .field("site_instance_id", &self.inner.site_instance_id)
            .field("is_live", &self.is_live())
            .field("route_count", &self.route_count())
            .finish()
    }
}

// ============================================================================
// RenderProcessHost - Constructor
// ============================================================================

impl RenderProcessHost {
    /// Creates an unlaunched process host.
    pub(crate) fn new(
        site_instance_id: SiteInstanceId,
        launcher: Arc<dyn ProcessLauncher>,
        policy: SecurityPolicy,
        events_tx: ProcessEventSender,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                id: ProcessId::next(),
                site_instance_id,
                launcher,
                policy,
                events_tx,
                state: Mutex::new(ProcessState::Idle),
                routes: Mutex::new(FxHashSet::default()),
            }),
        }
    }
}

// ============================================================================
// RenderProcessHost - Accessors
// ============================================================================

impl RenderProcessHost {
    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.inner.id
    }

    /// Returns the site instance this process serves.
    #[inline]
    #[must_use]
    pub fn site_instance_id(&self) -> SiteInstanceId {
        self.inner.site_instance_id
    }

    /// Returns `true` if the process is running and reachable.
    #[must_use]
    pub fn is_live(&self) -> bool {
        match &*self.inner.state.lock() {
            ProcessState::Running(channel) => channel.is_connected(),
            ProcessState::Idle | ProcessState::Exited => false,
        }
    }

    /// Returns the number of views registered on this process.
    #[inline]
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.lock().len()
    }

    /// Returns `true` if the view is registered on this process.
    #[inline]
    #[must_use]
    pub fn has_route(&self, routing_id: RoutingId) -> bool {
        self.inner.routes.lock().contains(&routing_id)
    }
}

// ============================================================================
// RenderProcessHost - Lifecycle
// ============================================================================

impl RenderProcessHost {
    /// Launches the process if it is not already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessLaunchFailed`] if the launcher fails.
    pub fn init(&self) -> Result<()> {
        let mut state = self.inner.state.lock();

        if let ProcessState::Running(channel) = &*state
            && channel.is_connected()
        {
            return Ok(());
        }

        let process_id = self.inner.id;
        let (channel, endpoint) = renderer_channel(process_id, self.inner.events_tx.clone());

        self.inner.policy.add_process(process_id);

        if let Err(e) = self.inner.launcher.launch(process_id, endpoint) {
            self.inner.policy.remove_process(process_id);
            *state = ProcessState::Exited;
            warn!(process_id = %process_id, error = %e, "Renderer launch failed");
            return Err(match e {
                Error::ProcessLaunchFailed { .. } => e,
                other => Error::process_launch_failed(process_id, other.to_string()),
            });
        }

        *state = ProcessState::Running(channel);
        info!(process_id = %process_id, site_instance = %self.inner.site_instance_id, "Renderer process launched");
        Ok(())
    }

    /// Records that the process went away.
    ///
    /// Grants are dropped; routes stay registered so their views can be
    /// recreated on relaunch.
    pub fn mark_exited(&self) {
        let mut state = self.inner.state.lock();
        if let ProcessState::Running(channel) = &*state {
            channel.sever();
        }
        if !matches!(*state, ProcessState::Exited) {
            info!(process_id = %self.inner.id, "Renderer process exited");
        }
        *state = ProcessState::Exited;
        self.inner.policy.remove_process(self.inner.id);
    }

    /// Kills the process after it sent a malformed message.
    pub fn received_bad_message(&self, method: &str) {
        warn!(process_id = %self.inner.id, method, "Killing renderer after bad message");
        self.mark_exited();
    }

    /// Shuts the process down once no view uses it.
    pub(crate) fn shutdown(&self) {
        debug!(process_id = %self.inner.id, "Shutting down renderer process");
        self.mark_exited();
    }
}

// ============================================================================
// RenderProcessHost - Messaging
// ============================================================================

impl RenderProcessHost {
    /// Sends a message to one view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the process is not running.
    pub fn send(&self, routing_id: RoutingId, message: ViewMsg) -> Result<()> {
        let channel = match &*self.inner.state.lock() {
            ProcessState::Running(channel) => channel.clone(),
            ProcessState::Idle | ProcessState::Exited => {
                return Err(Error::channel_closed(self.inner.id));
            }
        };

        channel.send(RoutedMessage::new(routing_id, message))
    }

    /// Registers a view on this process.
    pub(crate) fn add_route(&self, routing_id: RoutingId) {
        self.inner.routes.lock().insert(routing_id);
    }

    /// Unregisters a view and returns how many remain.
    pub(crate) fn remove_route(&self, routing_id: RoutingId) -> usize {
        let mut routes = self.inner.routes.lock();
        routes.remove(&routing_id);
        routes.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::FailingLauncher;
    use crate::transport::channel::process_event_queue;

    fn host_with(launcher: Arc<dyn ProcessLauncher>) -> (RenderProcessHost, SecurityPolicy) {
        let policy = SecurityPolicy::default();
        let (events_tx, _events_rx) = process_event_queue();
        let host = RenderProcessHost::new(SiteInstanceId::next(), launcher, policy.clone(), events_tx);
        (host, policy)
    }

    #[test]
    fn test_init_launches_once() {
        let launcher = InProcessLauncher::new();
        let (host, policy) = host_with(Arc::new(launcher.clone()));

        assert!(!host.is_live());
        host.init().expect("init");
        host.init().expect("second init");

        assert!(host.is_live());
        assert!(policy.is_registered(host.id()));
        assert_eq!(launcher.launched(), vec![host.id()]);
    }

    #[test]
    fn test_launch_failure() {
        let (host, policy) = host_with(Arc::new(FailingLauncher));

        let err = host.init().unwrap_err();
        assert!(matches!(err, Error::ProcessLaunchFailed { .. }));
        assert!(!host.is_live());
        assert!(!policy.is_registered(host.id()));
    }

    #[test]
    fn test_send_reaches_endpoint() {
        let launcher = InProcessLauncher::new();
        let (host, _policy) = host_with(Arc::new(launcher.clone()));
        host.init().expect("init");

        host.send(RoutingId::from_raw(4), ViewMsg::Stop).expect("send");

        let messages = launcher.drain(host.id());
        assert_eq!(messages, vec![RoutedMessage::new(RoutingId::from_raw(4), ViewMsg::Stop)]);
    }

    #[test]
    fn test_send_before_launch_fails() {
        let (host, _policy) = host_with(Arc::new(InProcessLauncher::new()));
        assert!(host.send(RoutingId::from_raw(1), ViewMsg::Stop).is_err());
    }

    #[test]
    fn test_crash_and_relaunch() {
        let launcher = InProcessLauncher::new();
        let (host, policy) = host_with(Arc::new(launcher.clone()));
        host.init().expect("init");

        assert!(launcher.crash(host.id()));
        assert!(!host.is_live());

        host.mark_exited();
        assert!(!policy.is_registered(host.id()));

        host.init().expect("relaunch");
        assert!(host.is_live());
        assert!(policy.is_registered(host.id()));
    }

    #[test]
    fn test_bad_message_kills() {
        let launcher = InProcessLauncher::new();
        let (host, _policy) = host_with(Arc::new(launcher.clone()));
        host.init().expect("init");

        host.received_bad_message("frame.navigate");
        assert!(!host.is_live());
        assert!(host.send(RoutingId::from_raw(1), ViewMsg::Stop).is_err());
    }

    #[test]
    fn test_routes() {
        let (host, _policy) = host_with(Arc::new(InProcessLauncher::new()));
        host.add_route(RoutingId::from_raw(1));
        host.add_route(RoutingId::from_raw(2));

        assert!(host.has_route(RoutingId::from_raw(1)));
        assert_eq!(host.remove_route(RoutingId::from_raw(1)), 1);
        assert_eq!(host.remove_route(RoutingId::from_raw(2)), 0);
    }
}
