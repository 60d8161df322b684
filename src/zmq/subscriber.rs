//! Subscriber-side helpers
//!
//! Used by the `zmq-sub` tool and by tests to consume notifications and
//! check sequence continuity.

use anyhow::{Context, Result};
use std::time::Duration;
use zmq::{Socket, SUB};

use super::encoder::Notification;
use super::error::NotifyError;
use super::topic::Topic;
use super::transport::NotificationContext;

/// Tracks per-topic sequence numbers and reports gaps
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    next: [Option<u32>; 4],
}

impl SequenceTracker {
    /// Accept whatever sequence each topic starts at (attach point)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every topic to start at `start`
    pub fn starting_at(start: u32) -> Self {
        Self {
            next: [Some(start); 4],
        }
    }

    /// Sequence expected next on `topic`, if known
    pub fn expected(&self, topic: Topic) -> Option<u32> {
        self.next[topic.index()]
    }

    /// Record a received notification
    ///
    /// On a gap the tracker resynchronizes to the received number so one
    /// lost message is reported once.
    pub fn observe(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        let slot = &mut self.next[notification.topic.index()];
        let received = notification.sequence;
        let expected = slot.replace(received.wrapping_add(1));

        match expected {
            Some(expected) if expected != received => Err(NotifyError::SequenceGap {
                topic: notification.topic,
                expected,
                received,
            }),
            _ => Ok(()),
        }
    }
}

/// ZMQ SUB socket receiving notification frames
pub struct Subscriber {
    socket: Socket,
}

impl Subscriber {
    /// Connect to `address` and subscribe to `topics`
    ///
    /// `timeout` bounds each [`Subscriber::receive`] call.
    pub fn connect(
        context: &NotificationContext,
        address: &str,
        topics: &[Topic],
        timeout: Duration,
    ) -> Result<Self> {
        let socket = context
            .raw()
            .socket(SUB)
            .context("Failed to create ZMQ SUB socket")?;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        socket.set_rcvtimeo(timeout_ms)?;
        socket.set_linger(0)?;
        socket
            .connect(address)
            .with_context(|| format!("Failed to connect ZMQ subscriber to {address}"))?;
        for topic in topics {
            socket.set_subscribe(topic.name().as_bytes())?;
        }
        Ok(Self { socket })
    }

    /// Wait for the next notification
    ///
    /// Returns `Ok(None)` when the receive timeout elapses.
    pub fn receive(&self) -> Result<Option<Notification>> {
        match self.socket.recv_multipart(0) {
            Ok(parts) => Ok(Some(Notification::from_parts(parts)?)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(e).context("Failed to receive ZMQ notification"),
        }
    }
}
