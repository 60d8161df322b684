//! blvm-notify - ZMQ block and transaction notifications for blvm-node
//!
//! Announces accepted blocks and transactions to external consumers over
//! ZeroMQ PUB sockets, in hash and raw form, on the standard `hashblock`,
//! `hashtx`, `rawblock` and `rawtx` topics.
//!
//! ## Design Principles
//!
//! 1. **Never block validation**: node events are queued with `try_send` and
//!    published from a dedicated worker; a full queue drops the event.
//! 2. **Contiguous sequences**: each topic numbers its frames from zero and
//!    numbers are assigned only to frames that are actually built.
//! 3. **Static bindings**: endpoints are bound once at startup and listed
//!    unchanged by `getzmqnotifications` until shutdown.

pub mod config;
pub mod node;
pub mod rpc;
pub mod utils;
pub mod zmq;

// Re-export config module
pub use config::*;

pub use node::event_publisher::EventPublisher;
pub use node::{init_notifications, NotificationService};
pub use rpc::ZmqRpc;
pub use crate::zmq::{
    EndpointManager, NotificationBus, NotificationContext, NotificationEndpoint,
    NotificationEvent, NotifyError, Topic,
};
