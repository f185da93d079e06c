//! Shared collaborators handed to every host.

use std::sync::Arc;

use crate::context::HostOptions;
use crate::security::SecurityPolicy;
use crate::transport::{GatewayHandle, ProcessTable};

/// Process-wide services a render view host talks to.
///
/// Owned by the [`BrowserContext`](crate::BrowserContext) and cloned into
/// each tab. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HostServices {
    /// Renderer processes by site instance.
    pub processes: ProcessTable,
    /// Per-process URL and bindings grants.
    pub policy: SecurityPolicy,
    /// Command side of the resource dispatch gateway.
    pub gateway: GatewayHandle,
    /// Timeouts and limits.
    pub options: Arc<HostOptions>,
}
