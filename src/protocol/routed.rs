//! Routed outbound envelope.
//!
//! Every message sent down a renderer channel is addressed to one view by
//! its routing ID; the process is implied by the channel.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::RoutingId;

use super::ViewMsg;

// ============================================================================
// RoutedMessage
// ============================================================================

/// An outbound message addressed to one view.
///
/// # Format
///
/// ```json
/// {
///   "routingId": 4,
///   "method": "view.navigate",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedMessage {
    /// Destination view.
    #[serde(rename = "routingId")]
    pub routing_id: RoutingId,

    /// Message with method and params.
    #[serde(flatten)]
    pub message: ViewMsg,
}

impl RoutedMessage {
    /// Creates a routed message.
    #[inline]
    #[must_use]
    pub fn new(routing_id: RoutingId, message: ViewMsg) -> Self {
        Self {
            routing_id,
            message,
        }
    }

    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> String {
        serde_json::to_value(&self.message)
            .ok()
            .and_then(|v| v.get("method").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
