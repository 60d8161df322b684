//! ZMQ notification subscriber
//!
//! Connects to a node's notification endpoint and prints every received
//! notification, reporting sequence gaps per topic.

use anyhow::{Context, Result};
use blvm_notify::utils::logging::init_logging;
use blvm_notify::zmq::topic::PayloadKind;
use blvm_notify::zmq::{NotificationContext, SequenceTracker, Subscriber, Topic};
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "zmq-sub", about = "Print ZMQ block and transaction notifications")]
struct Args {
    /// Endpoint to connect to
    #[arg(long, default_value = "tcp://127.0.0.1:28332")]
    address: String,

    /// Topics to subscribe to (comma separated, default: all)
    #[arg(long, value_delimiter = ',')]
    topics: Vec<String>,

    /// Seconds to wait for a notification before giving up
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Exit after this many notifications
    #[arg(long)]
    count: Option<u64>,

    /// Print full raw payloads instead of their length
    #[arg(long)]
    full: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_topics(names: &[String]) -> Result<Vec<Topic>> {
    if names.is_empty() {
        return Ok(Topic::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            Topic::from_name(name.trim())
                .ok_or_else(|| anyhow::anyhow!("Unknown topic: {name}"))
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Some(if args.verbose { "debug" } else { "info" }));

    let topics = parse_topics(&args.topics)?;
    let context = NotificationContext::new();
    let subscriber = Subscriber::connect(
        &context,
        &args.address,
        &topics,
        Duration::from_secs(args.timeout),
    )
    .context("Failed to start subscriber")?;
    info!("Subscribed to {:?} on {}", topics, args.address);

    let mut tracker = SequenceTracker::new();
    let mut received = 0u64;
    while args.count.map_or(true, |n| received < n) {
        let Some(notification) = subscriber.receive()? else {
            warn!("No notification within {}s, exiting", args.timeout);
            break;
        };
        received += 1;

        if let Err(e) = tracker.observe(&notification) {
            warn!("{}", e);
        }

        let body = match notification.topic.payload() {
            PayloadKind::Hash => hex::encode(&notification.body),
            PayloadKind::Raw if args.full => hex::encode(&notification.body),
            PayloadKind::Raw => format!("{} bytes", notification.body.len()),
        };
        println!(
            "{} seq={} {}",
            notification.topic, notification.sequence, body
        );
    }
    Ok(())
}
