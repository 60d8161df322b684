//! Publisher transport
//!
//! [`Transport`] is the send-on-topic primitive the publishers consume.
//! [`ZmqTransport`] implements it with a ZMQ PUB socket; topic filtering
//! is left to the subscriber's SUB socket.

use std::sync::Mutex;
use tracing::{debug, info};
use zmq::{Context as ZmqContext, Socket, PUB};

use super::encoder::Frame;
use super::error::NotifyError;

/// Default per-socket outbound high-water mark
pub const DEFAULT_HWM: i32 = 1000;

/// Outbound message sink shared by every topic bound to one endpoint
pub trait Transport: Send + Sync {
    /// Endpoint this transport is bound to
    fn address(&self) -> &str;

    /// Send one frame without blocking
    fn send(&self, frame: &Frame<'_>) -> Result<(), NotifyError>;
}

/// Process-wide ZMQ context
///
/// Create once at startup before binding any publisher and drop after
/// every socket is released. Cloning shares the underlying context.
#[derive(Clone)]
pub struct NotificationContext {
    inner: ZmqContext,
}

impl NotificationContext {
    pub fn new() -> Self {
        Self {
            inner: ZmqContext::new(),
        }
    }

    /// Create and bind a PUB socket
    pub fn bind_publisher(&self, address: &str, hwm: i32) -> Result<ZmqTransport, NotifyError> {
        let bind_error = |source| NotifyError::Bind {
            address: address.to_string(),
            source,
        };

        let socket = self.inner.socket(PUB).map_err(bind_error)?;
        socket.set_sndhwm(hwm).map_err(bind_error)?;
        // Never wait on unresponsive subscribers at close
        socket.set_linger(0).map_err(bind_error)?;
        socket.set_tcp_keepalive(1).map_err(bind_error)?;
        socket.bind(address).map_err(bind_error)?;

        info!("ZMQ publisher socket bound to {} (hwm {})", address, hwm);
        Ok(ZmqTransport {
            address: address.to_string(),
            socket: Mutex::new(socket),
        })
    }

    pub(crate) fn raw(&self) -> &ZmqContext {
        &self.inner
    }
}

impl Default for NotificationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// ZMQ PUB socket transport
///
/// The socket closes when the last publisher holding it is dropped.
pub struct ZmqTransport {
    address: String,
    socket: Mutex<Socket>,
}

impl Transport for ZmqTransport {
    fn address(&self) -> &str {
        &self.address
    }

    fn send(&self, frame: &Frame<'_>) -> Result<(), NotifyError> {
        let socket = self
            .socket
            .lock()
            .map_err(|_| NotifyError::TransportUnavailable {
                topic: frame.topic(),
                reason: "socket lock poisoned".to_string(),
            })?;
        socket
            .send_multipart(frame.parts(), zmq::DONTWAIT)
            .map_err(|e| NotifyError::TransportUnavailable {
                topic: frame.topic(),
                reason: e.to_string(),
            })
    }
}

impl Drop for ZmqTransport {
    fn drop(&mut self) {
        debug!("ZMQ publisher socket on {} closed", self.address);
    }
}
