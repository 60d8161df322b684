//! Node integration for the notification subsystem
//!
//! Wires configuration, endpoint binding, the notification bus, the event
//! publisher handed to the validation pipeline and the introspection RPC.

pub mod event_publisher;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;
use crate::node::event_publisher::EventPublisher;
use crate::rpc::ZmqRpc;
use crate::zmq::{EndpointManager, NotificationBus, NotificationContext};

/// Running notification subsystem
pub struct NotificationService {
    bus: Option<Arc<NotificationBus>>,
    event_publisher: EventPublisher,
    rpc: ZmqRpc,
}

impl NotificationService {
    /// Service with no publishers; introspection lists nothing
    pub fn disabled() -> Self {
        Self {
            bus: None,
            event_publisher: EventPublisher::new(),
            rpc: ZmqRpc::new(),
        }
    }

    /// Validate configuration, bind every endpoint and start the bus
    ///
    /// Configuration is strict: any invalid endpoint or failed bind aborts
    /// startup of the whole subsystem, releasing sockets already bound.
    pub fn start(config: &NotifyConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid notification configuration")?;

        if !config.zmq.is_enabled() {
            debug!("No ZMQ endpoints configured - ZMQ publisher not initialized");
            return Ok(Self::disabled());
        }

        let context = NotificationContext::new();
        let manager = EndpointManager::configure(&config.zmq, context)?;
        let bus = Arc::new(NotificationBus::start(manager, config.queue_capacity)?);
        let rpc = ZmqRpc::with_endpoints(bus.endpoints());
        info!("ZMQ publisher initialized");

        Ok(Self {
            event_publisher: EventPublisher::with_zmq(Some(Arc::clone(&bus))),
            bus: Some(bus),
            rpc,
        })
    }

    /// Publisher to hand to the validation/relay pipeline
    pub fn event_publisher(&self) -> EventPublisher {
        self.event_publisher.clone()
    }

    pub fn rpc(&self) -> &ZmqRpc {
        &self.rpc
    }

    pub fn bus(&self) -> Option<&Arc<NotificationBus>> {
        self.bus.as_ref()
    }

    /// Drain queued notifications and release every endpoint
    pub fn shutdown(&self) {
        if let Some(ref bus) = self.bus {
            bus.shutdown();
        }
    }
}

/// Start notifications, logging and continuing without them on failure
///
/// The node keeps running if the notification subsystem cannot start; the
/// failure is reported to the operator through the log.
pub fn init_notifications(config: &NotifyConfig) -> NotificationService {
    match NotificationService::start(config) {
        Ok(service) => service,
        Err(e) => {
            warn!("Failed to initialize ZMQ publisher: {:#}", e);
            NotificationService::disabled()
        }
    }
}
