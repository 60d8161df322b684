//! ZMQ notification RPC methods
//!
//! Implements `getzmqnotifications`, listing the active publisher endpoints.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::rpc::errors::{RpcError, RpcResult};
use crate::zmq::NotificationEndpoint;

/// ZMQ RPC methods
#[derive(Clone, Default)]
pub struct ZmqRpc {
    endpoints: Arc<Vec<NotificationEndpoint>>,
}

impl ZmqRpc {
    /// Handler for a node without notification publishers
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler listing the given endpoints (fixed at startup)
    pub fn with_endpoints(endpoints: &[NotificationEndpoint]) -> Self {
        Self {
            endpoints: Arc::new(endpoints.to_vec()),
        }
    }

    /// Dispatch a method handled by this module
    pub fn handle(&self, method: &str, params: &Value) -> RpcResult<Value> {
        match method {
            "getzmqnotifications" => self.get_zmq_notifications(params),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    /// `getzmqnotifications`
    ///
    /// Returns `[{"type": "pubhashblock", "address": "tcp://..."}, ...]` in
    /// topic declaration order, or `[]` when nothing is configured.
    pub fn get_zmq_notifications(&self, params: &Value) -> RpcResult<Value> {
        let has_params = match params {
            Value::Null => false,
            Value::Array(values) => !values.is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => true,
        };
        if has_params {
            return Err(RpcError::invalid_params(
                "getzmqnotifications takes no parameters",
            ));
        }

        debug!("RPC: getzmqnotifications");
        serde_json::to_value(self.endpoints.as_slice())
            .map_err(|e| RpcError::internal_error(format!("Failed to encode endpoints: {e}")))
    }
}
