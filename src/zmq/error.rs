//! Notification publisher errors

use super::topic::Topic;

/// Errors raised by the notification subsystem
///
/// Publisher-side variants are logged and counted by the bus; they never
/// propagate into block or transaction acceptance.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Malformed or conflicting endpoint configuration (fatal at startup)
    #[error("Invalid ZMQ configuration for {topic}: {reason}")]
    Configuration { topic: String, reason: String },

    /// Publisher socket could not be bound (fatal at startup)
    #[error("Failed to bind ZMQ socket to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: zmq::Error,
    },

    /// Send failed; the notification is dropped for this topic only
    #[error("Transport unavailable for {topic}: {reason}")]
    TransportUnavailable { topic: Topic, reason: String },

    /// Subscriber observed a sequence number other than the next expected one
    #[error("Sequence gap on {topic}: expected {expected}, received {received}")]
    SequenceGap {
        topic: Topic,
        expected: u32,
        received: u32,
    },

    /// Frame or serialized block could not be parsed
    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl NotifyError {
    pub(crate) fn configuration(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error should abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Bind { .. })
    }
}
