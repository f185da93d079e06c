//! Renderer process transport and resource dispatch gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  RoutedMessage   ┌──────────────────┐
//! │ RenderProcessHost│ ───────────────► │ RendererEndpoint │
//! │ (browser side)   │                  │ (renderer side)  │
//! │                  │ ◄─────────────── │                  │
//! └──────────────────┘   ProcessEvent   └──────────────────┘
//!          ▲
//!          │ one per site instance
//!   ┌──────┴───────┐         GatewayCommand        ┌────────────────────┐
//!   │ ProcessTable │   tabs ──────────────────────►│ ResourceDispatcher │
//!   └──────────────┘        ◄──────────────────────└────────────────────┘
//!                            GatewayNotification
//! ```
//!
//! # Process Lifecycle
//!
//! 1. `ProcessTable::process_for_site_instance` - Allocate (unlaunched)
//! 2. `RenderProcessHost::init` - Launch through the `ProcessLauncher`
//! 3. `RenderProcessHost::send` - Deliver view messages
//! 4. `ProcessTable::release` - Shut down after the last view goes away
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Renderer channel pair and process events |
//! | `gateway` | Resource dispatch gateway |
//! | `pool` | Process table |
//! | `process` | Process hosts and launchers |

// ============================================================================
// Submodules
// ============================================================================

/// Renderer channel pair and process events.
pub mod channel;

/// Resource dispatch gateway.
pub mod gateway;

/// Process table.
pub mod pool;

/// Process hosts and launchers.
pub mod process;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{
    ProcessEvent, ProcessEventReceiver, ProcessEventSender, RendererChannel, RendererEndpoint,
    process_event_queue, renderer_channel,
};
pub use gateway::{
    BlockedAction, BlockedRequests, GatewayCommand, GatewayHandle, GatewayNotification,
    GatewayNotifier, GatewayReceiver, NetworkEvent, NotificationReceiver, RequestStatus,
    ResourceDispatcher, gateway_channel, notification_channel,
};
pub use pool::ProcessTable;
pub use process::{InProcessLauncher, ProcessLauncher, RenderProcessHost};
