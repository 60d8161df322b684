//! ZeroMQ notification publisher
//!
//! Announces accepted blocks and transactions to external subscribers using
//! the standard node notification interface.
//!
//! Supports the following notification types:
//! - `hashblock`: Block hash notifications
//! - `hashtx`: Transaction hash notifications
//! - `rawblock`: Raw block data notifications
//! - `rawtx`: Raw transaction data notifications
//!
//! Each message is `[topic][body][sequence]`, where the sequence is a
//! per-topic `u32` (little-endian) starting at zero. Delivery is best-effort
//! and ordered within a topic: events that cannot be queued are dropped
//! before they are numbered, and the socket drops messages beyond its
//! high-water mark rather than blocking.

pub mod bus;
pub mod encoder;
pub mod endpoint;
pub mod error;
pub mod hash;
pub mod publisher;
pub mod subscriber;
pub mod topic;
pub mod transport;
pub mod wire;

pub use bus::{BusStats, NotificationBus, NotificationEvent, TopicStats};
pub use encoder::{Frame, Notification};
pub use endpoint::{BindingState, EndpointManager, NotificationEndpoint};
pub use error::NotifyError;
pub use hash::{ChainHasher, Sha256dHasher};
pub use publisher::TopicPublisher;
pub use subscriber::{SequenceTracker, Subscriber};
pub use topic::Topic;
pub use transport::{NotificationContext, Transport, ZmqTransport};
