//! Renderer process channel.
//!
//! A channel connects the browser to one renderer process. The browser end
//! ([`RendererChannel`]) sends [`RoutedMessage`]s; the process end
//! ([`RendererEndpoint`]) receives them and posts [`InboundMessage`]s back
//! onto the shared process-event queue.
//!
//! # Severing
//!
//! The channel can be severed from either side at any time:
//!
//! - the browser severs it when it kills or releases the process
//! - dropping the endpoint models the process exiting, and posts
//!   [`ProcessEvent::Exited`]
//!
//! A send on a severed channel fails with [`Error::ChannelClosed`]; callers
//! treat that as "renderer gone", never as a message to retry.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ProcessId;
use crate::protocol::{InboundMessage, RoutedMessage};

// ============================================================================
// ProcessEvent
// ============================================================================

/// Something a renderer process reported to the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A view message arrived.
    Message {
        /// Sending process.
        process_id: ProcessId,
        /// Raw message.
        message: InboundMessage,
    },
    /// The process went away.
    Exited {
        /// Exited process.
        process_id: ProcessId,
    },
}

/// Sender half of the shared process-event queue.
pub type ProcessEventSender = mpsc::UnboundedSender<ProcessEvent>;

/// Receiver half of the shared process-event queue.
pub type ProcessEventReceiver = mpsc::UnboundedReceiver<ProcessEvent>;

/// Creates the shared process-event queue.
#[inline]
#[must_use]
pub fn process_event_queue() -> (ProcessEventSender, ProcessEventReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Channel Pair
// ============================================================================

/// Creates a connected channel pair for one process.
#[must_use]
pub fn renderer_channel(
    process_id: ProcessId,
    events_tx: ProcessEventSender,
) -> (RendererChannel, RendererEndpoint) {
    let (tx, rx) = mpsc::unbounded_channel();
    let severed = Arc::new(AtomicBool::new(false));

    let channel = RendererChannel {
        process_id,
        tx,
        severed: Arc::clone(&severed),
    };
    let endpoint = RendererEndpoint {
        process_id,
        rx,
        events_tx,
        severed,
    };

    (channel, endpoint)
}

// ============================================================================
// RendererChannel
// ============================================================================

/// Browser end of a renderer channel.
///
/// Cheap to clone; all clones share the severed state.
#[derive(Debug, Clone)]
pub struct RendererChannel {
    process_id: ProcessId,
    tx: mpsc::UnboundedSender<RoutedMessage>,
    severed: Arc<AtomicBool>,
}

impl RendererChannel {
    /// Returns the process this channel leads to.
    #[inline]
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Sends a message to the process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the channel is severed.
    pub fn send(&self, message: RoutedMessage) -> Result<()> {
        if self.severed.load(Ordering::Acquire) {
            return Err(Error::channel_closed(self.process_id));
        }

        trace!(process_id = %self.process_id, routing_id = %message.routing_id, "Sending view message");

        self.tx
            .send(message)
            .map_err(|_| Error::channel_closed(self.process_id))
    }

    /// Returns `true` if messages can still be delivered.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.severed.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Severs the channel from the browser side.
    pub fn sever(&self) {
        if !self.severed.swap(true, Ordering::AcqRel) {
            debug!(process_id = %self.process_id, "Renderer channel severed");
        }
    }
}

// ============================================================================
// RendererEndpoint
// ============================================================================

/// Process end of a renderer channel.
///
/// Dropping the endpoint reports the process as exited.
#[derive(Debug)]
pub struct RendererEndpoint {
    process_id: ProcessId,
    rx: mpsc::UnboundedReceiver<RoutedMessage>,
    events_tx: ProcessEventSender,
    severed: Arc<AtomicBool>,
}

impl RendererEndpoint {
    /// Returns the process this endpoint belongs to.
    #[inline]
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Receives the next message, waiting if none is queued.
    ///
    /// Returns `None` once the browser end is gone.
    pub async fn recv(&mut self) -> Option<RoutedMessage> {
        self.rx.recv().await
    }

    /// Returns the next queued message without waiting.
    #[inline]
    pub fn try_recv(&mut self) -> Option<RoutedMessage> {
        self.rx.try_recv().ok()
    }

    /// Returns every queued message.
    pub fn drain(&mut self) -> Vec<RoutedMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Posts a view message to the browser.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the browser severed the channel
    /// or stopped listening.
    pub fn post(&self, message: InboundMessage) -> Result<()> {
        if self.severed.load(Ordering::Acquire) {
            return Err(Error::channel_closed(self.process_id));
        }

        self.events_tx
            .send(ProcessEvent::Message {
                process_id: self.process_id,
                message,
            })
            .map_err(|_| Error::channel_closed(self.process_id))
    }

    /// Returns `true` if the browser severed the channel.
    #[inline]
    #[must_use]
    pub fn is_severed(&self) -> bool {
        self.severed.load(Ordering::Acquire)
    }
}

impl Drop for RendererEndpoint {
    fn drop(&mut self) {
        self.severed.store(true, Ordering::Release);
        let _ = self.events_tx.send(ProcessEvent::Exited {
            process_id: self.process_id,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
