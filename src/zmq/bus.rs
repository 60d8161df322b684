//! Notification bus
//!
//! Bridges the validation/relay pipeline to the topic publishers without
//! ever blocking it. `notify` only performs a `try_send` into a bounded
//! queue; a dedicated worker thread owns every [`TopicPublisher`], hashes
//! payloads and sends frames. When the queue is full the event is dropped
//! and counted, so a slow subscriber can never stall block or transaction
//! acceptance. Dropped events never reach the framing step, which keeps
//! every topic's sequence numbers contiguous.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::endpoint::{EndpointManager, NotificationEndpoint};
use super::hash::{to_display_order, ChainHasher, Sha256dHasher, BLOCK_HEADER_SIZE};
use super::publisher::TopicPublisher;
use super::topic::{EventKind, PayloadKind, Topic};
use super::wire;

/// Node event to announce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Serialized block that was just accepted
    BlockAccepted(Vec<u8>),
    /// Serialized transaction that was just accepted
    TransactionAccepted(Vec<u8>),
}

impl NotificationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BlockAccepted(_) => EventKind::Block,
            Self::TransactionAccepted(_) => EventKind::Transaction,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Self::BlockAccepted(raw) | Self::TransactionAccepted(raw) => raw,
        }
    }
}

enum QueuedEvent {
    Single(NotificationEvent),
    /// Block connected to the chain: announce its transactions, then the block
    BlockConnected(Vec<u8>),
}

#[derive(Default)]
struct TopicCounters {
    published: AtomicU64,
    send_failures: AtomicU64,
    next_sequence: AtomicU32,
}

#[derive(Default)]
struct BusCounters {
    enqueued: AtomicU64,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
    malformed: AtomicU64,
    topics: [TopicCounters; 4],
}

/// Per-topic delivery statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    pub topic: Topic,
    pub published: u64,
    pub send_failures: u64,
    pub next_sequence: u32,
}

/// Snapshot of bus statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusStats {
    /// Events accepted into the queue
    pub enqueued: u64,
    /// Events dropped because the queue was full
    pub dropped_full: u64,
    /// Events dropped because the bus was shut down
    pub dropped_closed: u64,
    /// Events that could not be parsed
    pub malformed: u64,
    /// Statistics for every topic, in declaration order
    pub topics: Vec<TopicStats>,
}

impl BusStats {
    pub fn topic(&self, topic: Topic) -> &TopicStats {
        &self.topics[topic.index()]
    }
}

/// Fan-out from node events to topic publishers
pub struct NotificationBus {
    sender: RwLock<Option<mpsc::Sender<QueuedEvent>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    endpoints: Vec<NotificationEndpoint>,
    counters: Arc<BusCounters>,
}

impl NotificationBus {
    /// Start the publisher worker with double-SHA256 hashing
    pub fn start(manager: EndpointManager, queue_capacity: usize) -> Result<Self> {
        Self::start_with_hasher(manager, queue_capacity, Arc::new(Sha256dHasher))
    }

    /// Start the publisher worker with a chain-specific hasher
    pub fn start_with_hasher(
        manager: EndpointManager,
        queue_capacity: usize,
        hasher: Arc<dyn ChainHasher>,
    ) -> Result<Self> {
        let endpoints = manager.list();
        let counters = Arc::new(BusCounters::default());
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(queue_capacity);

        let mut publishers: [Option<TopicPublisher>; 4] = Default::default();
        for publisher in manager.publishers() {
            let index = publisher.topic().index();
            publishers[index] = Some(publisher);
        }

        let worker = Worker {
            manager,
            publishers,
            hasher,
            counters: Arc::clone(&counters),
        };
        let handle = std::thread::Builder::new()
            .name("zmq-notify".to_string())
            .spawn(move || worker.run(receiver))
            .context("Failed to spawn ZMQ notification worker")?;

        info!(
            "ZMQ notification bus started ({} endpoints, queue capacity {})",
            endpoints.len(),
            queue_capacity
        );

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: std::sync::Mutex::new(Some(handle)),
            endpoints,
            counters,
        })
    }

    /// Queue an event for publishing
    ///
    /// Never blocks. Returns `false` if the event was dropped because the
    /// queue is full or the bus has been shut down.
    pub fn notify(&self, event: NotificationEvent) -> bool {
        self.enqueue(QueuedEvent::Single(event))
    }

    /// Queue a connected block: each of its transactions is announced in
    /// block order, followed by the block itself
    pub fn notify_block_connected(&self, raw_block: Vec<u8>) -> bool {
        self.enqueue(QueuedEvent::BlockConnected(raw_block))
    }

    fn enqueue(&self, event: QueuedEvent) -> bool {
        let Ok(guard) = self.sender.read() else {
            self.counters.dropped_closed.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let Some(sender) = guard.as_ref() else {
            self.counters.dropped_closed.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("ZMQ notification queue full, event dropped");
                self.counters.dropped_full.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("ZMQ notification worker stopped, event dropped");
                self.counters.dropped_closed.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Configured endpoints, fixed at startup
    pub fn endpoints(&self) -> &[NotificationEndpoint] {
        &self.endpoints
    }

    pub fn stats(&self) -> BusStats {
        let c = &self.counters;
        BusStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            dropped_full: c.dropped_full.load(Ordering::Relaxed),
            dropped_closed: c.dropped_closed.load(Ordering::Relaxed),
            malformed: c.malformed.load(Ordering::Relaxed),
            topics: Topic::ALL
                .into_iter()
                .map(|topic| {
                    let t = &c.topics[topic.index()];
                    TopicStats {
                        topic,
                        published: t.published.load(Ordering::Relaxed),
                        send_failures: t.send_failures.load(Ordering::Relaxed),
                        next_sequence: t.next_sequence.load(Ordering::Relaxed),
                    }
                })
                .collect(),
        }
    }

    /// Stop accepting events, drain the queue and close every binding
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.write() {
            sender.take();
        }
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("ZMQ notification worker panicked");
            }
            info!("ZMQ notification bus stopped");
        }
    }
}

impl Drop for NotificationBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    manager: EndpointManager,
    publishers: [Option<TopicPublisher>; 4],
    hasher: Arc<dyn ChainHasher>,
    counters: Arc<BusCounters>,
}

impl Worker {
    fn run(mut self, mut receiver: mpsc::Receiver<QueuedEvent>) {
        while let Some(event) = receiver.blocking_recv() {
            match event {
                QueuedEvent::Single(event) => self.dispatch(&event),
                QueuedEvent::BlockConnected(raw) => self.dispatch_block_connected(raw),
            }
        }

        // Sockets close once both the publishers and the bindings let go of them
        self.publishers = Default::default();
        self.manager.shutdown();
        debug!("ZMQ notification worker exited");
    }

    fn dispatch_block_connected(&mut self, raw: Vec<u8>) {
        if raw.len() >= BLOCK_HEADER_SIZE && self.wants(EventKind::Transaction) {
            match wire::split_block(&raw) {
                Ok(parts) => {
                    for tx in parts.transactions {
                        self.publish_event(EventKind::Transaction, tx);
                    }
                }
                Err(e) => {
                    warn!("Cannot split connected block into transactions: {}", e);
                    self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.dispatch(&NotificationEvent::BlockAccepted(raw));
    }

    fn dispatch(&mut self, event: &NotificationEvent) {
        let kind = event.kind();
        let payload = event.payload();
        if kind == EventKind::Block && payload.len() < BLOCK_HEADER_SIZE {
            warn!(
                "Block notification of {} bytes is shorter than a header, dropped",
                payload.len()
            );
            self.counters.malformed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.publish_event(kind, payload);
    }

    fn wants(&self, kind: EventKind) -> bool {
        Topic::for_event(kind)
            .iter()
            .any(|t| self.publishers[t.index()].is_some())
    }

    fn publish_event(&mut self, kind: EventKind, payload: &[u8]) {
        for topic in Topic::for_event(kind) {
            if self.publishers[topic.index()].is_none() {
                continue;
            }
            match topic.payload() {
                PayloadKind::Hash => {
                    let hash = match kind {
                        EventKind::Block => self.hasher.block_hash(&payload[..BLOCK_HEADER_SIZE]),
                        EventKind::Transaction => self.hasher.tx_hash(payload),
                    };
                    self.publish(topic, &to_display_order(hash));
                }
                PayloadKind::Raw => self.publish(topic, payload),
            }
        }
    }

    fn publish(&mut self, topic: Topic, body: &[u8]) {
        let Some(publisher) = self.publishers[topic.index()].as_mut() else {
            return;
        };
        let counters = &self.counters.topics[topic.index()];

        match publisher.publish(body) {
            Ok(_) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Failed to publish {} notification: {}", topic, e);
                counters.send_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        counters
            .next_sequence
            .store(publisher.next_sequence(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZmqConfig;
    use crate::zmq::encoder::Frame;
    use crate::zmq::error::NotifyError;
    use crate::zmq::hash::double_sha256;
    use crate::zmq::transport::Transport;
    use std::sync::Mutex;

    type Sent = Arc<Mutex<Vec<(Topic, Vec<u8>, u32)>>>;

    struct RecordingTransport {
        sent: Sent,
        /// Signals entry into `send`, then waits for permission to continue
        gate: Option<(std::sync::mpsc::Sender<()>, Mutex<std::sync::mpsc::Receiver<()>>)>,
    }

    impl Transport for RecordingTransport {
        fn address(&self) -> &str {
            "inproc://recording"
        }

        fn send(&self, frame: &Frame<'_>) -> Result<(), NotifyError> {
            if let Some((entered, release)) = &self.gate {
                let _ = entered.send(());
                let _ = release.lock().unwrap().recv();
            }
            self.sent
                .lock()
                .unwrap()
                .push((frame.topic(), frame.body().to_vec(), frame.sequence()));
            Ok(())
        }
    }

    fn recording_manager(config: &ZmqConfig) -> (EndpointManager, Sent) {
        let sent: Sent = Arc::default();
        let shared = Arc::clone(&sent);
        let manager = EndpointManager::configure_with(config, move |_, _| {
            Ok(Arc::new(RecordingTransport {
                sent: Arc::clone(&shared),
                gate: None,
            }) as Arc<dyn Transport>)
        })
        .unwrap();
        (manager, sent)
    }

    fn test_block(nonce: u8, txs: &[Vec<u8>]) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_HEADER_SIZE];
        block[76] = nonce;
        block.push(txs.len() as u8);
        for tx in txs {
            block.extend_from_slice(tx);
        }
        block
    }

    fn test_tx(tag: u8) -> Vec<u8> {
        let mut tx = vec![1, 0, 0, 0, 1];
        tx.extend_from_slice(&[0u8; 32]);
        tx.extend_from_slice(&[0xff; 4]);
        tx.extend_from_slice(&[1, tag]);
        tx.extend_from_slice(&[0xff; 4]);
        tx.push(0);
        tx.extend_from_slice(&[0u8; 4]);
        tx
    }

    fn display(data: &[u8]) -> Vec<u8> {
        to_display_order(double_sha256(data)).to_vec()
    }

    #[test]
    fn test_block_event_fans_out_to_block_topics() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 16).unwrap();
        let block = test_block(1, &[]);

        assert!(bus.notify(NotificationEvent::BlockAccepted(block.clone())));
        bus.shutdown();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (Topic::HashBlock, display(&block[..80]), 0));
        assert_eq!(sent[1], (Topic::RawBlock, block, 0));
    }

    #[test]
    fn test_transaction_event_fans_out_to_tx_topics() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 16).unwrap();
        let tx = test_tx(7);

        bus.notify(NotificationEvent::TransactionAccepted(tx.clone()));
        bus.shutdown();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (Topic::HashTx, display(&tx), 0));
        assert_eq!(sent[1], (Topic::RawTx, tx, 0));
    }

    #[test]
    fn test_block_connected_announces_transactions_first() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 16).unwrap();
        let txs = vec![test_tx(1), test_tx(2)];
        let block = test_block(9, &txs);

        bus.notify_block_connected(block.clone());
        bus.shutdown();

        let sent = sent.lock().unwrap();
        let order: Vec<(Topic, u32)> = sent.iter().map(|(t, _, s)| (*t, *s)).collect();
        assert_eq!(
            order,
            vec![
                (Topic::HashTx, 0),
                (Topic::RawTx, 0),
                (Topic::HashTx, 1),
                (Topic::RawTx, 1),
                (Topic::HashBlock, 0),
                (Topic::RawBlock, 0),
            ]
        );
        assert_eq!(sent[2].1, display(&txs[1]));
        assert_eq!(sent[3].1, txs[1]);
        assert_eq!(sent[5].1, block);
    }

    #[test]
    fn test_unparseable_block_still_announces_block() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 16).unwrap();
        let mut block = test_block(1, &[test_tx(1)]);
        block.truncate(block.len() - 2);

        bus.notify_block_connected(block);
        bus.shutdown();

        let topics: Vec<Topic> = sent.lock().unwrap().iter().map(|(t, _, _)| *t).collect();
        assert_eq!(topics, vec![Topic::HashBlock, Topic::RawBlock]);
        assert_eq!(bus.stats().malformed, 1);
    }

    #[test]
    fn test_short_block_is_dropped_without_consuming_sequence() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 16).unwrap();

        bus.notify(NotificationEvent::BlockAccepted(vec![0u8; 40]));
        bus.notify(NotificationEvent::BlockAccepted(test_block(2, &[])));
        bus.shutdown();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].2, 0);
        assert_eq!(bus.stats().malformed, 1);
    }

    #[test]
    fn test_only_configured_topics_publish() {
        let mut config = ZmqConfig::default();
        config.hashtx = Some("inproc://a".to_string());
        let (manager, sent) = recording_manager(&config);
        let bus = NotificationBus::start(manager, 16).unwrap();

        bus.notify(NotificationEvent::BlockAccepted(test_block(1, &[])));
        bus.notify(NotificationEvent::TransactionAccepted(test_tx(1)));
        bus.shutdown();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Topic::HashTx);

        let stats = bus.stats();
        assert_eq!(stats.topic(Topic::HashTx).published, 1);
        assert_eq!(stats.topic(Topic::HashBlock).published, 0);
    }

    #[test]
    fn test_transactions_do_not_perturb_block_sequences() {
        let (manager, _sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 64).unwrap();

        for nonce in 0..5 {
            bus.notify_block_connected(test_block(nonce, &[test_tx(nonce)]));
        }
        bus.notify(NotificationEvent::TransactionAccepted(test_tx(42)));
        bus.shutdown();

        let stats = bus.stats();
        assert_eq!(stats.topic(Topic::HashBlock).next_sequence, 5);
        assert_eq!(stats.topic(Topic::RawBlock).next_sequence, 5);
        assert_eq!(stats.topic(Topic::HashTx).next_sequence, 6);
        assert_eq!(stats.topic(Topic::RawTx).next_sequence, 6);
    }

    #[test]
    fn test_full_queue_drops_without_blocking_or_gaps() {
        let sent: Sent = Arc::default();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();

        let mut config = ZmqConfig::default();
        config.rawtx = Some("inproc://slow".to_string());
        let gate = Some((entered_tx, Mutex::new(release_rx)));
        let mut gate = Some(gate);
        let shared = Arc::clone(&sent);
        let manager = EndpointManager::configure_with(&config, move |_, _| {
            Ok(Arc::new(RecordingTransport {
                sent: Arc::clone(&shared),
                gate: gate.take().flatten(),
            }) as Arc<dyn Transport>)
        })
        .unwrap();
        let bus = NotificationBus::start(manager, 1).unwrap();

        // First event occupies the worker inside send
        assert!(bus.notify(NotificationEvent::TransactionAccepted(vec![1])));
        entered_rx.recv().unwrap();
        // Second fills the queue, third is dropped
        assert!(bus.notify(NotificationEvent::TransactionAccepted(vec![2])));
        assert!(!bus.notify(NotificationEvent::TransactionAccepted(vec![3])));

        for _ in 0..2 {
            release_tx.send(()).unwrap();
        }
        entered_rx.recv().unwrap();
        bus.shutdown();

        let sent = sent.lock().unwrap();
        let got: Vec<(Vec<u8>, u32)> = sent.iter().map(|(_, b, s)| (b.clone(), *s)).collect();
        assert_eq!(got, vec![(vec![1], 0), (vec![2], 1)]);

        let stats = bus.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped_full, 1);
    }

    #[test]
    fn test_zero_capacity_queue_holds_one_event() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 0).unwrap();

        assert!(bus.notify(NotificationEvent::TransactionAccepted(test_tx(1))));
        bus.shutdown();

        assert_eq!(bus.stats().enqueued, 1);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_notify_after_shutdown_is_dropped() {
        let (manager, sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 4).unwrap();
        bus.shutdown();
        bus.shutdown();

        assert!(!bus.notify(NotificationEvent::TransactionAccepted(test_tx(1))));
        assert_eq!(bus.stats().dropped_closed, 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_endpoints_snapshot() {
        let (manager, _sent) = recording_manager(&ZmqConfig::all_topics("inproc://a"));
        let bus = NotificationBus::start(manager, 4).unwrap();
        let kinds: Vec<&str> = bus.endpoints().iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["pubhashblock", "pubhashtx", "pubrawblock", "pubrawtx"]);
    }
}
