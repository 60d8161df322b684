//! Event publisher for node event notifications
//!
//! Bridges node events to ZMQ notifications.

use std::sync::Arc;
use tracing::debug;

use crate::zmq::{BusStats, NotificationBus, NotificationEvent};

/// Event publisher that publishes node events to ZMQ
///
/// Called from the validation/relay pipeline; every method returns
/// immediately regardless of subscriber behavior.
#[derive(Clone, Default)]
pub struct EventPublisher {
    zmq_bus: Option<Arc<NotificationBus>>,
}

impl EventPublisher {
    /// Create an event publisher with notifications disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an event publisher with ZMQ support
    pub fn with_zmq(zmq_bus: Option<Arc<NotificationBus>>) -> Self {
        Self { zmq_bus }
    }

    pub fn is_enabled(&self) -> bool {
        self.zmq_bus.is_some()
    }

    /// Publish a block connected to the active chain
    ///
    /// Announces each transaction in the block, then the block itself.
    pub fn publish_new_block(&self, raw_block: &[u8], height: u64) {
        if let Some(ref bus) = self.zmq_bus {
            debug!(
                "Publishing NewBlock event at height {} ({} bytes)",
                height,
                raw_block.len()
            );
            bus.notify_block_connected(raw_block.to_vec());
        }
    }

    /// Publish a block accepted outside chain connection (block topics only)
    pub fn publish_block_accepted(&self, raw_block: &[u8]) {
        if let Some(ref bus) = self.zmq_bus {
            bus.notify(NotificationEvent::BlockAccepted(raw_block.to_vec()));
        }
    }

    /// Publish a transaction accepted to the mempool
    pub fn publish_new_transaction(&self, raw_tx: &[u8]) {
        if let Some(ref bus) = self.zmq_bus {
            debug!("Publishing NewTransaction event ({} bytes)", raw_tx.len());
            bus.notify(NotificationEvent::TransactionAccepted(raw_tx.to_vec()));
        }
    }

    /// Delivery statistics, if notifications are enabled
    pub fn stats(&self) -> Option<BusStats> {
        self.zmq_bus.as_ref().map(|bus| bus.stats())
    }
}
