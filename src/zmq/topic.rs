//! Notification topics
//!
//! The topic set is closed: every stream the node can announce is listed
//! here, in the order used for introspection output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of node event a topic reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Block,
    Transaction,
}

/// Payload form carried by a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// 32-byte digest in display byte order
    Hash,
    /// Exact consensus serialization
    Raw,
}

/// Notification topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    HashBlock,
    HashTx,
    RawBlock,
    RawTx,
}

impl Topic {
    /// All topics in declaration order
    pub const ALL: [Topic; 4] = [Topic::HashBlock, Topic::HashTx, Topic::RawBlock, Topic::RawTx];

    /// Wire-visible topic name, also used as the subscription filter
    pub const fn name(self) -> &'static str {
        match self {
            Topic::HashBlock => "hashblock",
            Topic::HashTx => "hashtx",
            Topic::RawBlock => "rawblock",
            Topic::RawTx => "rawtx",
        }
    }

    /// Introspection type, e.g. `pubhashblock`
    pub const fn pub_type(self) -> &'static str {
        match self {
            Topic::HashBlock => "pubhashblock",
            Topic::HashTx => "pubhashtx",
            Topic::RawBlock => "pubrawblock",
            Topic::RawTx => "pubrawtx",
        }
    }

    pub const fn event(self) -> EventKind {
        match self {
            Topic::HashBlock | Topic::RawBlock => EventKind::Block,
            Topic::HashTx | Topic::RawTx => EventKind::Transaction,
        }
    }

    pub const fn payload(self) -> PayloadKind {
        match self {
            Topic::HashBlock | Topic::HashTx => PayloadKind::Hash,
            Topic::RawBlock | Topic::RawTx => PayloadKind::Raw,
        }
    }

    /// Position in [`Topic::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Topic::HashBlock => 0,
            Topic::HashTx => 1,
            Topic::RawBlock => 2,
            Topic::RawTx => 3,
        }
    }

    /// Look up a topic by its wire name
    pub fn from_name(name: &str) -> Option<Topic> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Look up a topic by its wire name given as bytes (subscriber side)
    pub fn from_bytes(name: &[u8]) -> Option<Topic> {
        Self::ALL.into_iter().find(|t| t.name().as_bytes() == name)
    }

    /// Topics fed by an event, hash form first
    pub const fn for_event(kind: EventKind) -> [Topic; 2] {
        match kind {
            EventKind::Block => [Topic::HashBlock, Topic::RawBlock],
            EventKind::Transaction => [Topic::HashTx, Topic::RawTx],
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
