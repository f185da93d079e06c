//! Renderer channel message types.
//!
//! This module defines the messages exchanged between the browser and the
//! views hosted in renderer processes.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `RoutedMessage` | Browser → Renderer | `ViewMsg` addressed to one view |
//! | `InboundMessage` | Renderer → Browser | Raw view message |
//! | `ViewHostMsg` | (decoded) | Closed union of inbound messages |
//!
//! # Message Naming
//!
//! Messages follow `module.methodName` format:
//!
//! - `view.navigate`
//! - `frame.navigate`
//! - `dialog.runJavaScript`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound messages and navigation params |
//! | `event` | Inbound messages and their decoder |
//! | `routed` | Outbound routing envelope |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound messages.
pub mod command;

/// Inbound messages.
pub mod event;

/// Outbound routing envelope.
pub mod routed;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{NavigateParams, PageTransition, ViewMsg};
pub use event::{
    ClosePageAckParams, ContextMenuParams, FileChooserParams, FindReplyParams,
    FrameNavigateParams, InboundMessage, JavaScriptDialogKind, JavaScriptDialogParams, ViewHostMsg,
};
pub use routed::RoutedMessage;
