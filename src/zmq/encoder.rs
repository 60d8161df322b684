//! Frame encoding
//!
//! Every notification goes out as a three-part message:
//! `[topic][body][sequence: u32 little-endian]`.

use super::error::NotifyError;
use super::topic::Topic;

/// Number of parts in a notification message
pub const FRAME_PARTS: usize = 3;

/// Size of the trailing sequence part
pub const SEQUENCE_SIZE: usize = 4;

/// Outgoing notification frame
///
/// Borrows the body so raw blocks are never copied between the bus and the socket.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    topic: Topic,
    body: &'a [u8],
    sequence: u32,
    sequence_le: [u8; SEQUENCE_SIZE],
}

impl<'a> Frame<'a> {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Message parts in send order
    pub fn parts(&self) -> [&[u8]; FRAME_PARTS] {
        [self.topic.name().as_bytes(), self.body, &self.sequence_le]
    }
}

/// Frame `body` for `topic` with sequence number `sequence`
pub fn frame(topic: Topic, sequence: u32, body: &[u8]) -> Frame<'_> {
    Frame {
        topic,
        body,
        sequence,
        sequence_le: sequence.to_le_bytes(),
    }
}

/// Notification as seen by a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic: Topic,
    pub body: Vec<u8>,
    pub sequence: u32,
}

impl Notification {
    /// Decode a received multipart message
    pub fn from_parts(mut parts: Vec<Vec<u8>>) -> Result<Self, NotifyError> {
        if parts.len() != FRAME_PARTS {
            return Err(NotifyError::Malformed(format!(
                "expected {FRAME_PARTS} message parts, got {}",
                parts.len()
            )));
        }

        let sequence_bytes: [u8; SEQUENCE_SIZE] =
            parts[2].as_slice().try_into().map_err(|_| {
                NotifyError::Malformed(format!(
                    "sequence part must be {SEQUENCE_SIZE} bytes, got {}",
                    parts[2].len()
                ))
            })?;

        let topic = Topic::from_bytes(&parts[0]).ok_or_else(|| {
            NotifyError::Malformed(format!(
                "unknown topic {:?}",
                String::from_utf8_lossy(&parts[0])
            ))
        })?;

        let body = std::mem::take(&mut parts[1]);
        Ok(Self {
            topic,
            body,
            sequence: u32::from_le_bytes(sequence_bytes),
        })
    }
}
