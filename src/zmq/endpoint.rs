//! Endpoint bindings and introspection
//!
//! The [`EndpointManager`] binds configured topics to publisher sockets at
//! startup and is the only owner of the binding set. Bindings never change
//! after startup; a configuration change requires a restart.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::NotifyError;
use super::publisher::TopicPublisher;
use super::topic::Topic;
use super::transport::{NotificationContext, Transport};
use crate::config::ZmqConfig;

/// Lifecycle of a single (topic, endpoint) binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// No endpoint configured for the topic
    Unconfigured,
    /// Socket bound and accepting publishes
    Bound,
    /// Socket released at shutdown (terminal)
    Closed,
}

/// Introspection record, e.g. `{"type":"pubhashblock","address":"tcp://127.0.0.1:28332"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEndpoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
}

/// A topic bound to an endpoint
struct EndpointBinding {
    topic: Topic,
    address: String,
    state: BindingState,
    transport: Option<Arc<dyn Transport>>,
}

/// Owner of all endpoint bindings
pub struct EndpointManager {
    bindings: Vec<EndpointBinding>,
    // Declared after `bindings` so every socket is released before the context
    context: Option<NotificationContext>,
}

impl EndpointManager {
    /// Manager with no bindings
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
            context: None,
        }
    }

    /// Bind ZMQ publisher sockets for every configured topic
    ///
    /// Topics sharing an address share one socket. If any bind fails, sockets
    /// bound so far are released before the error is returned.
    pub fn configure(config: &ZmqConfig, context: NotificationContext) -> Result<Self> {
        let mut manager = Self::configure_with(config, |address, hwm| {
            let transport = context.bind_publisher(address, hwm)?;
            Ok(Arc::new(transport) as Arc<dyn Transport>)
        })?;
        manager.context = Some(context);
        Ok(manager)
    }

    /// Bind every configured topic using `bind` to create transports
    pub fn configure_with<F>(config: &ZmqConfig, mut bind: F) -> Result<Self>
    where
        F: FnMut(&str, i32) -> Result<Arc<dyn Transport>, NotifyError>,
    {
        config.validate().context("Invalid ZMQ configuration")?;

        let mut by_address: HashMap<&str, Arc<dyn Transport>> = HashMap::new();
        let mut bindings = Vec::new();

        for (topic, address) in config.bindings() {
            let transport = match by_address.get(address) {
                Some(transport) => {
                    debug!("ZMQ {} shares socket on {}", topic, address);
                    Arc::clone(transport)
                }
                None => {
                    let transport = bind(address, config.hwm_for(topic)).with_context(|| {
                        format!("Failed to bind ZMQ socket for {topic} to {address}")
                    })?;
                    by_address.insert(address, Arc::clone(&transport));
                    transport
                }
            };

            info!("ZMQ {} notifications bound to {}", topic, address);
            bindings.push(EndpointBinding {
                topic,
                address: address.to_string(),
                state: BindingState::Bound,
                transport: Some(transport),
            });
        }

        Ok(Self {
            bindings,
            context: None,
        })
    }

    /// Active bindings in topic declaration order
    pub fn list(&self) -> Vec<NotificationEndpoint> {
        self.bindings
            .iter()
            .filter(|b| b.state == BindingState::Bound)
            .map(|b| NotificationEndpoint {
                kind: b.topic.pub_type().to_string(),
                address: b.address.clone(),
            })
            .collect()
    }

    pub fn state(&self, topic: Topic) -> BindingState {
        self.bindings
            .iter()
            .find(|b| b.topic == topic)
            .map(|b| b.state)
            .unwrap_or(BindingState::Unconfigured)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Fresh publishers (sequence 0) for every bound topic
    pub fn publishers(&self) -> Vec<TopicPublisher> {
        self.bindings
            .iter()
            .filter_map(|b| {
                b.transport
                    .as_ref()
                    .map(|t| TopicPublisher::new(b.topic, Arc::clone(t)))
            })
            .collect()
    }

    /// Release every binding and then the context
    ///
    /// Publishers created from this manager must be dropped first for the
    /// sockets to actually close.
    pub fn shutdown(&mut self) {
        for binding in &mut self.bindings {
            if binding.state == BindingState::Bound {
                binding.transport = None;
                binding.state = BindingState::Closed;
                debug!("ZMQ {} binding on {} closed", binding.topic, binding.address);
            }
        }
        self.context = None;
    }
}
