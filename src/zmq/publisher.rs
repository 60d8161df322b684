//! Per-topic publisher
//!
//! A [`TopicPublisher`] owns one topic's sequence counter and frames every
//! body it is handed before passing it to the shared endpoint transport.

use std::sync::Arc;
use tracing::debug;

use super::encoder;
use super::error::NotifyError;
use super::topic::Topic;
use super::transport::Transport;

/// Per-topic sequence counter
///
/// Starts at zero, advances by one per framed message and wraps at `u32::MAX`.
#[derive(Debug, Default)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Number the next framed message will carry
    pub fn current(&self) -> u32 {
        self.0
    }

    /// Claim the current number and move to the next one
    fn advance(&mut self) -> u32 {
        let claimed = self.0;
        self.0 = self.0.wrapping_add(1);
        claimed
    }
}

/// Publisher for a single topic
pub struct TopicPublisher {
    topic: Topic,
    transport: Arc<dyn Transport>,
    sequence: SequenceCounter,
}

impl TopicPublisher {
    pub fn new(topic: Topic, transport: Arc<dyn Transport>) -> Self {
        Self {
            topic,
            transport,
            sequence: SequenceCounter::new(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    /// Sequence number the next publish will use
    pub fn next_sequence(&self) -> u32 {
        self.sequence.current()
    }

    /// Frame and send `body`
    ///
    /// The sequence number is consumed before sending and is never reused,
    /// even when the send fails. Returns the number that was framed.
    pub fn publish(&mut self, body: &[u8]) -> Result<u32, NotifyError> {
        let sequence = self.sequence.advance();
        let frame = encoder::frame(self.topic, sequence, body);
        self.transport.send(&frame)?;
        debug!(
            "Published {} notification: seq={}, {} bytes",
            self.topic,
            sequence,
            body.len()
        );
        Ok(sequence)
    }

    #[cfg(test)]
    pub(crate) fn with_sequence(mut self, start: u32) -> Self {
        self.sequence = SequenceCounter(start);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zmq::encoder::Frame;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(Vec<Vec<u8>>, u32)>>,
        failing: AtomicBool,
    }

    impl Transport for MockTransport {
        fn address(&self) -> &str {
            "inproc://mock"
        }

        fn send(&self, frame: &Frame<'_>) -> Result<(), NotifyError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::TransportUnavailable {
                    topic: frame.topic(),
                    reason: "mock failure".to_string(),
                });
            }
            let parts = frame.parts().iter().map(|p| p.to_vec()).collect();
            self.sent.lock().unwrap().push((parts, frame.sequence()));
            Ok(())
        }
    }

    #[test]
    fn test_sequence_starts_at_zero_and_increments() {
        let transport = Arc::new(MockTransport::default());
        let mut publisher = TopicPublisher::new(Topic::HashTx, transport.clone());

        assert_eq!(publisher.next_sequence(), 0);
        for expected in 0..5u32 {
            assert_eq!(publisher.publish(&[0u8; 32]).unwrap(), expected);
        }
        assert_eq!(publisher.next_sequence(), 5);

        let sent = transport.sent.lock().unwrap();
        let sequences: Vec<u32> = sent.iter().map(|(_, seq)| *seq).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert_eq!(sent[3].0[0], b"hashtx".to_vec());
        assert_eq!(sent[3].0[2], 3u32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_failed_send_still_consumes_sequence() {
        let transport = Arc::new(MockTransport::default());
        let mut publisher = TopicPublisher::new(Topic::RawBlock, transport.clone());

        publisher.publish(b"a").unwrap();
        transport.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            publisher.publish(b"b"),
            Err(NotifyError::TransportUnavailable {
                topic: Topic::RawBlock,
                ..
            })
        ));
        transport.failing.store(false, Ordering::SeqCst);
        assert_eq!(publisher.publish(b"c").unwrap(), 2);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0[1], b"c".to_vec());
    }

    #[test]
    fn test_sequence_wraps() {
        let transport = Arc::new(MockTransport::default());
        let mut publisher =
            TopicPublisher::new(Topic::HashBlock, transport).with_sequence(u32::MAX);

        assert_eq!(publisher.publish(&[0u8; 32]).unwrap(), u32::MAX);
        assert_eq!(publisher.publish(&[0u8; 32]).unwrap(), 0);
    }
}
