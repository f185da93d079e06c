//! Process table: one renderer process per site instance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ProcessTable                │
//! │  ┌────────────────────────────────────┐  │
//! │  │ SiteInstance 1 → process-1         │  │
//! │  │ SiteInstance 2 → process-2         │  │
//! │  │ SiteInstance 3 → process-3         │  │
//! │  └────────────────────────────────────┘  │
//! │  by process id → same hosts              │
//! └──────────────────────────────────────────┘
//! ```
//!
//! A process stays in the table while at least one view is registered on
//! it. Releasing the last view shuts the process down and removes it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifiers::{GlobalRoutingId, ProcessId, SiteInstanceId};
use crate::security::SecurityPolicy;

use super::channel::ProcessEventSender;
use super::process::{ProcessLauncher, RenderProcessHost};

// ============================================================================
// ProcessTable
// ============================================================================

#[derive(Default)]
struct Tables {
    by_site: FxHashMap<SiteInstanceId, RenderProcessHost>,
    by_id: FxHashMap<ProcessId, RenderProcessHost>,
}

/// Process-wide table of renderer processes.
///
/// Cheap to clone; all clones share the same table.
#[derive(Clone)]
pub struct ProcessTable {
    tables: Arc<RwLock<Tables>>,
    launcher: Arc<dyn ProcessLauncher>,
    policy: SecurityPolicy,
    events_tx: ProcessEventSender,
}

impl fmt::Debug for ProcessTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessTable")
            .field("process_count", &self.len())
            .finish()
    }
}

// ============================================================================
// ProcessTable - Constructor
// ============================================================================

impl ProcessTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        policy: SecurityPolicy,
        events_tx: ProcessEventSender,
    ) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            launcher,
            policy,
            events_tx,
        }
    }
}

// ============================================================================
// ProcessTable - Public API
// ============================================================================

impl ProcessTable {
    /// Returns the process for a site instance, creating it unlaunched.
    pub fn process_for_site_instance(&self, site_instance_id: SiteInstanceId) -> RenderProcessHost {
        if let Some(process) = self.tables.read().by_site.get(&site_instance_id) {
            return process.clone();
        }

        let mut tables = self.tables.write();
        if let Some(process) = tables.by_site.get(&site_instance_id) {
            return process.clone();
        }

        let process = RenderProcessHost::new(
            site_instance_id,
            Arc::clone(&self.launcher),
            self.policy.clone(),
            self.events_tx.clone(),
        );
        tables.by_site.insert(site_instance_id, process.clone());
        tables.by_id.insert(process.id(), process.clone());

        debug!(process_id = %process.id(), site_instance = %site_instance_id, "Process allocated");
        process
    }

    /// Returns the process with this ID.
    #[inline]
    #[must_use]
    pub fn get(&self, process_id: ProcessId) -> Option<RenderProcessHost> {
        self.tables.read().by_id.get(&process_id).cloned()
    }

    /// Returns the number of processes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().by_id.len()
    }

    /// Returns `true` if no process exists.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().by_id.is_empty()
    }

    /// Returns the IDs of every process, sorted.
    #[must_use]
    pub fn process_ids(&self) -> Vec<ProcessId> {
        let mut ids: Vec<_> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Returns the shared security policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }
}

// ============================================================================
// ProcessTable - Lifecycle
// ============================================================================

impl ProcessTable {
    /// Unregisters a view; shuts down and removes its process if it was the
    /// last one.
    pub fn release(&self, route: GlobalRoutingId) {
        let Some(process) = self.get(route.process_id) else {
            return;
        };

        if process.remove_route(route.routing_id) > 0 {
            return;
        }

        let removed = {
            let mut tables = self.tables.write();
            // A new view may have registered between the two locks.
            if process.route_count() > 0 {
                None
            } else {
                tables.by_site.remove(&process.site_instance_id());
                tables.by_id.remove(&process.id())
            }
        };

        if let Some(process) = removed {
            process.shutdown();
            debug!(process_id = %process.id(), "Process released");
        }
    }

    /// Shuts down every process.
    pub fn shutdown_all(&self) {
        let processes: Vec<_> = {
            let mut tables = self.tables.write();
            tables.by_site.clear();
            tables.by_id.drain().map(|(_, p)| p).collect()
        };

        for process in processes {
            process.shutdown();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
