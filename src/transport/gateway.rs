//! Resource dispatch gateway.
//!
//! The gateway owns in-flight network request state on its own dispatch
//! sequence. The UI sequence never calls into it directly: every action is
//! posted as a [`GatewayCommand`] and takes effect some time after the post
//! returns. The gateway talks back through [`GatewayNotification`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   GatewayCommand    ┌────────────────────┐
//! │  UI sequence │ ──────────────────► │ ResourceDispatcher │ ◄── NetworkEvent
//! │  (tabs)      │ ◄────────────────── │ (dispatch task)    │
//! └──────────────┘ GatewayNotification └────────────────────┘
//! ```
//!
//! # Cross-site handoff
//!
//! 1. `CrossSitePending { old, pending }` marks the pending view's requests
//! 2. the first response for such a request is held and
//!    `CrossSiteResponseReady` is sent to the UI sequence
//! 3. the old page runs its unload handler
//! 4. `ClosePageAck { new_process_id, new_request_id }` releases the response
//!
//! [`BlockedRequests`] wraps `Block` in a ticket that must be settled with
//! exactly one `Resume` or `Cancel`.
//!
//! Records leave the request table when they are cancelled, or when they
//! are both delivered and completed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;

use crate::identifiers::{CrossSiteRequestId, GlobalRoutingId, ProcessId};

// ============================================================================
// GatewayCommand
// ============================================================================

/// Action posted from the UI sequence to the dispatch sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum GatewayCommand {
    /// Hold every request of a view; responses are not delivered.
    #[serde(rename = "gateway.block")]
    Block {
        /// Affected view.
        route: GlobalRoutingId,
    },

    /// Release the requests held by `Block`.
    #[serde(rename = "gateway.resume")]
    Resume {
        /// Affected view.
        route: GlobalRoutingId,
    },

    /// Cancel every unfinished request of a view.
    #[serde(rename = "gateway.cancel")]
    Cancel {
        /// Affected view.
        route: GlobalRoutingId,
    },

    /// The pending view's next response must wait for the old page's unload.
    #[serde(rename = "gateway.crossSitePending")]
    CrossSitePending {
        /// View being navigated away from.
        old: GlobalRoutingId,
        /// View taking over.
        pending: GlobalRoutingId,
    },

    /// The handoff for `pending` is over, committed or abandoned.
    #[serde(rename = "gateway.crossSiteCleared")]
    CrossSiteCleared {
        /// View that was pending.
        pending: GlobalRoutingId,
    },

    /// The old page finished unloading; the held response may proceed.
    #[serde(rename = "gateway.closePageAck")]
    ClosePageAck {
        /// Process of the view taking over.
        #[serde(rename = "newProcessId")]
        new_process_id: ProcessId,
        /// Held request.
        #[serde(rename = "newRequestId")]
        new_request_id: CrossSiteRequestId,
    },
}

// ============================================================================
// GatewayNotification
// ============================================================================

/// Callback from the dispatch sequence to the UI sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum GatewayNotification {
    /// A cross-site response is held until the old page unloads.
    #[serde(rename = "gateway.crossSiteResponseReady")]
    CrossSiteResponseReady {
        /// Pending view that issued the request.
        #[serde(rename = "pendingRoute")]
        pending_route: GlobalRoutingId,
        /// Held request.
        #[serde(rename = "newRequestId")]
        new_request_id: CrossSiteRequestId,
    },
}

impl GatewayNotification {
    /// Returns the process of the view taking over.
    #[inline]
    #[must_use]
    pub fn new_process_id(&self) -> ProcessId {
        match self {
            Self::CrossSiteResponseReady { pending_route, .. } => pending_route.process_id,
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Receiver of gateway commands, owned by the dispatch sequence.
pub type GatewayReceiver = mpsc::UnboundedReceiver<GatewayCommand>;

/// Sender of gateway notifications, owned by the dispatch sequence.
pub type GatewayNotifier = mpsc::UnboundedSender<GatewayNotification>;

/// Receiver of gateway notifications, owned by the UI sequence.
pub type NotificationReceiver = mpsc::UnboundedReceiver<GatewayNotification>;

/// Creates the command channel.
#[inline]
#[must_use]
pub fn gateway_channel() -> (GatewayHandle, GatewayReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (GatewayHandle { tx }, rx)
}

/// Creates the notification channel.
#[inline]
#[must_use]
pub fn notification_channel() -> (GatewayNotifier, NotificationReceiver) {
    mpsc::unbounded_channel()
}

/// UI-side handle for posting gateway commands.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    tx: mpsc::UnboundedSender<GatewayCommand>,
}

impl GatewayHandle {
    /// Posts a command to the dispatch sequence.
    ///
    /// Returns `false` if the dispatcher has stopped.
    pub fn post(&self, command: GatewayCommand) -> bool {
        trace!(?command, "Posting gateway command");
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!(command = ?e.0, "Gateway stopped, command dropped");
                false
            }
        }
    }
}

// ============================================================================
// BlockedRequests
// ============================================================================

/// Decision applied to blocked requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedAction {
    /// Let the requests continue.
    Resume,
    /// Cancel the requests.
    Cancel,
}

/// Ticket for the requests of a view held by `Block`.
///
/// Settling consumes the ticket, so at most one of `Resume`/`Cancel` is ever
/// posted. A ticket dropped unsettled posts `Cancel`.
pub struct BlockedRequests {
    route: GlobalRoutingId,
    gateway: GatewayHandle,
    settled: bool,
}

impl fmt::Debug for BlockedRequests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockedRequests")
            .field("route", &self.route)
            .field("settled", &self.settled)
            .finish()
    }
}

impl BlockedRequests {
    /// Posts `Block` for `route` and returns the ticket.
    #[must_use]
    pub fn block(gateway: GatewayHandle, route: GlobalRoutingId) -> Self {
        gateway.post(GatewayCommand::Block { route });
        Self {
            route,
            gateway,
            settled: false,
        }
    }

    /// Returns the blocked view.
    #[inline]
    #[must_use]
    pub fn route(&self) -> GlobalRoutingId {
        self.route
    }

    /// Posts `Resume`.
    pub fn resume(self) {
        self.settle(BlockedAction::Resume);
    }

    /// Posts `Cancel`.
    pub fn cancel(self) {
        self.settle(BlockedAction::Cancel);
    }

    /// Posts the command for `action`.
    pub fn settle(mut self, action: BlockedAction) {
        self.post(action);
    }

    fn post(&mut self, action: BlockedAction) {
        let route = self.route;
        let command = match action {
            BlockedAction::Resume => GatewayCommand::Resume { route },
            BlockedAction::Cancel => GatewayCommand::Cancel { route },
        };
        self.settled = true;
        self.gateway.post(command);
        debug!(route = %route, ?action, "Blocked requests settled");
    }
}

impl Drop for BlockedRequests {
    fn drop(&mut self) {
        if !self.settled {
            self.post(BlockedAction::Cancel);
        }
    }
}

// ============================================================================
// Network Events
// ============================================================================

/// Network activity observed on the dispatch sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A view issued a request.
    RequestStarted {
        /// Request ID assigned by the network side.
        request_id: CrossSiteRequestId,
        /// Issuing view.
        route: GlobalRoutingId,
        /// Requested URL.
        url: Url,
    },
    /// Response headers arrived.
    ResponseStarted {
        /// Request that got a response.
        request_id: CrossSiteRequestId,
    },
    /// The request finished.
    Completed {
        /// Finished request.
        request_id: CrossSiteRequestId,
    },
}

// ============================================================================
// RequestStatus
// ============================================================================

/// State of one request on the dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Waiting for a response.
    InFlight,
    /// Held by `Block`; `response_held` once its response arrived.
    Blocked {
        /// A response arrived while blocked.
        response_held: bool,
    },
    /// Response held until the old page unloads.
    AwaitingUnload,
    /// Response handed to the renderer.
    Delivered,
}

#[derive(Debug)]
struct RequestRecord {
    route: GlobalRoutingId,
    url: Url,
    status: RequestStatus,
    /// The network finished before the response was delivered.
    completed: bool,
}

// ============================================================================
// ResourceDispatcher
// ============================================================================

/// Dispatch-sequence owner of in-flight request state.
pub struct ResourceDispatcher {
    requests: FxHashMap<CrossSiteRequestId, RequestRecord>,
    blocked_routes: FxHashSet<GlobalRoutingId>,
    /// Pending view → old view.
    cross_site: FxHashMap<GlobalRoutingId, GlobalRoutingId>,
    notifier: GatewayNotifier,
}

impl fmt::Debug for ResourceDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDispatcher")
            .field("request_count", &self.requests.len())
            .field("blocked_routes", &self.blocked_routes)
            .field("cross_site", &self.cross_site)
            .finish()
    }
}

// ============================================================================
// ResourceDispatcher - Constructor
// ============================================================================

impl ResourceDispatcher {
    /// Creates a dispatcher that reports through `notifier`.
    #[must_use]
    pub fn new(notifier: GatewayNotifier) -> Self {
        Self {
            requests: FxHashMap::default(),
            blocked_routes: FxHashSet::default(),
            cross_site: FxHashMap::default(),
            notifier,
        }
    }
}

// ============================================================================
// ResourceDispatcher - Commands
// ============================================================================

impl ResourceDispatcher {
    /// Applies one gateway command.
    pub fn apply(&mut self, command: GatewayCommand) {
        trace!(?command, "Applying gateway command");

        match command {
            GatewayCommand::Block { route } => {
                self.blocked_routes.insert(route);
                for record in self.records_of(route) {
                    if record.status == RequestStatus::InFlight {
                        record.status = RequestStatus::Blocked {
                            response_held: false,
                        };
                    }
                }
            }

            GatewayCommand::Resume { route } => {
                if !self.blocked_routes.remove(&route) {
                    warn!(route = %route, "Resume for a view that is not blocked");
                }
                let mut held = Vec::new();
                for (id, record) in self.requests.iter_mut() {
                    if record.route != route {
                        continue;
                    }
                    match record.status {
                        RequestStatus::Blocked {
                            response_held: false,
                        } => record.status = RequestStatus::InFlight,
                        RequestStatus::Blocked {
                            response_held: true,
                        } => {
                            record.status = RequestStatus::InFlight;
                            held.push(*id);
                        }
                        _ => {}
                    }
                }
                for id in held {
                    self.response_started(id);
                }
            }

            GatewayCommand::Cancel { route } => {
                self.blocked_routes.remove(&route);
                let before = self.requests.len();
                self.requests.retain(|_, record| record.route != route);
                debug!(route = %route, count = before - self.requests.len(), "Cancelled requests");
            }

            GatewayCommand::CrossSitePending { old, pending } => {
                self.cross_site.insert(pending, old);
            }

            GatewayCommand::CrossSiteCleared { pending } => {
                self.cross_site.remove(&pending);
            }

            GatewayCommand::ClosePageAck {
                new_process_id,
                new_request_id,
            } => match self.requests.get(&new_request_id) {
                Some(record)
                    if record.route.process_id == new_process_id
                        && record.status == RequestStatus::AwaitingUnload =>
                {
                    debug!(request_id = %new_request_id, "Cross-site response released");
                    self.deliver(new_request_id);
                }
                _ => {
                    debug!(
                        request_id = %new_request_id,
                        process_id = %new_process_id,
                        "Close-page ack for unknown or stale request"
                    );
                }
            },
        }
    }

    fn records_of(&mut self, route: GlobalRoutingId) -> impl Iterator<Item = &mut RequestRecord> {
        self.requests.values_mut().filter(move |r| r.route == route)
    }

    fn deliver(&mut self, request_id: CrossSiteRequestId) {
        let Some(record) = self.requests.get_mut(&request_id) else {
            return;
        };
        if record.completed {
            self.requests.remove(&request_id);
        } else {
            record.status = RequestStatus::Delivered;
        }
    }
}

// ============================================================================
// ResourceDispatcher - Network Events
// ============================================================================

impl ResourceDispatcher {
    /// Applies one network event.
    pub fn on_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::RequestStarted {
                request_id,
                route,
                url,
            } => self.begin_request(request_id, route, url),
            NetworkEvent::ResponseStarted { request_id } => self.response_started(request_id),
            NetworkEvent::Completed { request_id } => {
                let Some(record) = self.requests.get_mut(&request_id) else {
                    return;
                };
                if record.status == RequestStatus::Delivered {
                    self.requests.remove(&request_id);
                } else {
                    // Still held; dropped once delivered.
                    record.completed = true;
                }
            }
        }
    }

    /// Records a new request.
    pub fn begin_request(&mut self, request_id: CrossSiteRequestId, route: GlobalRoutingId, url: Url) {
        let status = if self.blocked_routes.contains(&route) {
            RequestStatus::Blocked {
                response_held: false,
            }
        } else {
            RequestStatus::InFlight
        };
        trace!(request_id = %request_id, route = %route, url = %url, "Request started");
        self.requests.insert(
            request_id,
            RequestRecord {
                route,
                url,
                status,
                completed: false,
            },
        );
    }

    /// Handles response headers for a request.
    pub fn response_started(&mut self, request_id: CrossSiteRequestId) {
        let Some(record) = self.requests.get_mut(&request_id) else {
            return;
        };

        let status = record.status;
        match status {
            RequestStatus::Blocked { .. } => {
                record.status = RequestStatus::Blocked {
                    response_held: true,
                };
            }
            RequestStatus::InFlight if self.cross_site.contains_key(&record.route) => {
                record.status = RequestStatus::AwaitingUnload;
                let notification = GatewayNotification::CrossSiteResponseReady {
                    pending_route: record.route,
                    new_request_id: request_id,
                };
                debug!(request_id = %request_id, url = %record.url, "Holding cross-site response");
                let _ = self.notifier.send(notification);
            }
            RequestStatus::InFlight => self.deliver(request_id),
            RequestStatus::AwaitingUnload | RequestStatus::Delivered => {}
        }
    }

    /// Returns the status of a request.
    ///
    /// Cancelled and finished requests are no longer known.
    #[inline]
    #[must_use]
    pub fn request_status(&self, request_id: CrossSiteRequestId) -> Option<RequestStatus> {
        self.requests.get(&request_id).map(|r| r.status)
    }

    /// Returns the number of requests still tracked.
    #[inline]
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Returns `true` if requests of `route` are held by `Block`.
    #[inline]
    #[must_use]
    pub fn is_blocked(&self, route: GlobalRoutingId) -> bool {
        self.blocked_routes.contains(&route)
    }

    /// Returns `true` if `pending` is waiting on a cross-site handoff.
    #[inline]
    #[must_use]
    pub fn has_pending_cross_site(&self, pending: GlobalRoutingId) -> bool {
        self.cross_site.contains_key(&pending)
    }
}

// ============================================================================
// ResourceDispatcher - Event Loop
// ============================================================================

impl ResourceDispatcher {
    /// Runs the dispatch sequence until the command channel closes.
    ///
    /// Commands are drained before network events, so an action posted
    /// before a response arrives always takes effect first.
    pub async fn run(
        mut self,
        mut commands: GatewayReceiver,
        mut network: mpsc::UnboundedReceiver<NetworkEvent>,
    ) -> Self {
        debug!("Resource dispatcher started");
        let mut network_open = true;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    match command {
                        Some(command) => self.apply(command),
                        None => {
                            debug!("Gateway command channel closed");
                            break;
                        }
                    }
                }

                event = network.recv(), if network_open => {
                    match event {
                        Some(event) => self.on_network_event(event),
                        None => network_open = false,
                    }
                }
            }
        }

        debug!("Resource dispatcher terminated");
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::RoutingId;

    fn route() -> GlobalRoutingId {
        GlobalRoutingId::new(ProcessId::next(), RoutingId::next())
    }

    fn url() -> Url {
        Url::parse("https://b.example/").expect("url")
    }

    fn dispatcher() -> (ResourceDispatcher, NotificationReceiver) {
        let (notifier, rx) = notification_channel();
        (ResourceDispatcher::new(notifier), rx)
    }

    #[test]
    fn test_ticket_settles_once() {
        let (gateway, mut rx) = gateway_channel();
        let r = route();

        let ticket = BlockedRequests::block(gateway, r);
        ticket.resume();

        assert_eq!(rx.try_recv().ok(), Some(GatewayCommand::Block { route: r }));
        assert_eq!(rx.try_recv().ok(), Some(GatewayCommand::Resume { route: r }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsettled_ticket_cancels_on_drop() {
        let (gateway, mut rx) = gateway_channel();
        let r = route();

        drop(BlockedRequests::block(gateway, r));

        assert_eq!(rx.try_recv().ok(), Some(GatewayCommand::Block { route: r }));
        assert_eq!(rx.try_recv().ok(), Some(GatewayCommand::Cancel { route: r }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_block_holds_response_until_resume() {
        let (mut dispatcher, _rx) = dispatcher();
        let r = route();
        let id = CrossSiteRequestId::next();

        dispatcher.begin_request(id, r, url());
        dispatcher.apply(GatewayCommand::Block { route: r });
        dispatcher.response_started(id);
        assert_eq!(
            dispatcher.request_status(id),
            Some(RequestStatus::Blocked {
                response_held: true
            })
        );

        dispatcher.apply(GatewayCommand::Resume { route: r });
        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::Delivered));
        assert!(!dispatcher.is_blocked(r));
    }

    #[test]
    fn test_cancel_forgets_requests() {
        let (mut dispatcher, _rx) = dispatcher();
        let r = route();
        let other = route();
        let id = CrossSiteRequestId::next();
        let kept = CrossSiteRequestId::next();

        dispatcher.apply(GatewayCommand::Block { route: r });
        dispatcher.begin_request(id, r, url());
        dispatcher.begin_request(kept, other, url());
        dispatcher.apply(GatewayCommand::Cancel { route: r });

        assert_eq!(dispatcher.request_status(id), None);
        assert!(!dispatcher.is_blocked(r));
        dispatcher.response_started(id);
        assert_eq!(dispatcher.request_status(id), None);
        assert_eq!(dispatcher.request_count(), 1);
    }

    #[test]
    fn test_completed_requests_leave_the_table() {
        let (mut dispatcher, _rx) = dispatcher();
        let r = route();
        let id = CrossSiteRequestId::next();

        dispatcher.begin_request(id, r, url());
        dispatcher.response_started(id);
        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::Delivered));

        dispatcher.on_network_event(NetworkEvent::Completed { request_id: id });

        assert_eq!(dispatcher.request_status(id), None);
        assert_eq!(dispatcher.request_count(), 0);
    }

    #[test]
    fn test_held_request_completing_leaves_on_delivery() {
        let (mut dispatcher, _rx) = dispatcher();
        let r = route();
        let id = CrossSiteRequestId::next();

        dispatcher.apply(GatewayCommand::Block { route: r });
        dispatcher.begin_request(id, r, url());
        dispatcher.response_started(id);
        dispatcher.on_network_event(NetworkEvent::Completed { request_id: id });
        assert_eq!(
            dispatcher.request_status(id),
            Some(RequestStatus::Blocked {
                response_held: true
            })
        );

        dispatcher.apply(GatewayCommand::Resume { route: r });

        assert_eq!(dispatcher.request_status(id), None);
        assert_eq!(dispatcher.request_count(), 0);
    }

    #[test]
    fn test_cross_site_response_is_held_and_released() {
        let (mut dispatcher, mut rx) = dispatcher();
        let old = route();
        let pending = route();
        let id = CrossSiteRequestId::next();

        dispatcher.apply(GatewayCommand::CrossSitePending { old, pending });
        dispatcher.begin_request(id, pending, url());
        dispatcher.response_started(id);

        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::AwaitingUnload));
        assert_eq!(
            rx.try_recv().ok(),
            Some(GatewayNotification::CrossSiteResponseReady {
                pending_route: pending,
                new_request_id: id,
            })
        );

        dispatcher.apply(GatewayCommand::ClosePageAck {
            new_process_id: pending.process_id,
            new_request_id: id,
        });
        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::Delivered));
    }

    #[test]
    fn test_cleared_handoff_delivers_directly() {
        let (mut dispatcher, mut rx) = dispatcher();
        let old = route();
        let pending = route();
        let id = CrossSiteRequestId::next();

        dispatcher.apply(GatewayCommand::CrossSitePending { old, pending });
        dispatcher.apply(GatewayCommand::CrossSiteCleared { pending });
        dispatcher.begin_request(id, pending, url());
        dispatcher.response_started(id);

        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::Delivered));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_close_page_ack_ignored() {
        let (mut dispatcher, _rx) = dispatcher();
        dispatcher.apply(GatewayCommand::ClosePageAck {
            new_process_id: ProcessId::next(),
            new_request_id: CrossSiteRequestId::next(),
        });
    }

    #[tokio::test]
    async fn test_run_loop_applies_commands() {
        let (gateway, commands) = gateway_channel();
        let (network_tx, network_rx) = mpsc::unbounded_channel();
        let (dispatcher, mut notifications) = dispatcher();

        let old = route();
        let pending = route();
        let id = CrossSiteRequestId::next();

        let task = tokio::spawn(dispatcher.run(commands, network_rx));

        gateway.post(GatewayCommand::CrossSitePending { old, pending });
        network_tx
            .send(NetworkEvent::RequestStarted {
                request_id: id,
                route: pending,
                url: url(),
            })
            .expect("send");
        network_tx
            .send(NetworkEvent::ResponseStarted { request_id: id })
            .expect("send");

        let notification = notifications.recv().await.expect("notification");
        assert_eq!(notification.new_process_id(), pending.process_id);

        gateway.post(GatewayCommand::ClosePageAck {
            new_process_id: pending.process_id,
            new_request_id: id,
        });
        drop(gateway);

        let dispatcher = task.await.expect("join");
        assert_eq!(dispatcher.request_status(id), Some(RequestStatus::Delivered));
    }
}
