//! Configuration management for the notification publisher
//!
//! Handles configuration loading (TOML, JSON or `-zmqpub*` command-line
//! options) and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::zmq::error::NotifyError;
use crate::zmq::topic::Topic;
use crate::zmq::transport::DEFAULT_HWM;

/// Transport schemes libzmq accepts for PUB endpoints
const SUPPORTED_SCHEMES: [&str; 5] = ["tcp", "ipc", "inproc", "pgm", "epgm"];

/// Top-level notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// ZMQ endpoint configuration
    #[serde(default)]
    pub zmq: ZmqConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Capacity of the queue between the validation pipeline and the publisher worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_hwm() -> i32 {
    DEFAULT_HWM
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            zmq: ZmqConfig::default(),
            logging: LoggingConfig::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// ZMQ notification configuration
///
/// One optional endpoint per topic; topics without an endpoint are not published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZmqConfig {
    /// Endpoint for hashblock notifications (e.g., "tcp://127.0.0.1:28332")
    #[serde(default)]
    pub hashblock: Option<String>,
    /// Endpoint for hashtx notifications
    #[serde(default)]
    pub hashtx: Option<String>,
    /// Endpoint for rawblock notifications
    #[serde(default)]
    pub rawblock: Option<String>,
    /// Endpoint for rawtx notifications
    #[serde(default)]
    pub rawtx: Option<String>,
    /// Default outbound high-water mark for every publisher socket
    #[serde(default = "default_hwm")]
    pub hwm: i32,
    /// Per-topic high-water mark overrides, keyed by topic name
    #[serde(default)]
    pub topic_hwm: BTreeMap<String, i32>,
}

impl Default for ZmqConfig {
    fn default() -> Self {
        Self {
            hashblock: None,
            hashtx: None,
            rawblock: None,
            rawtx: None,
            hwm: DEFAULT_HWM,
            topic_hwm: BTreeMap::new(),
        }
    }
}

impl ZmqConfig {
    /// Bind every topic to the same endpoint
    pub fn all_topics(address: &str) -> Self {
        let mut config = Self::default();
        for topic in Topic::ALL {
            config.set_endpoint(topic, address);
        }
        config
    }

    /// Check if any ZMQ notifications are enabled
    pub fn is_enabled(&self) -> bool {
        Topic::ALL.into_iter().any(|t| self.endpoint(t).is_some())
    }

    pub fn endpoint(&self, topic: Topic) -> Option<&str> {
        match topic {
            Topic::HashBlock => self.hashblock.as_deref(),
            Topic::HashTx => self.hashtx.as_deref(),
            Topic::RawBlock => self.rawblock.as_deref(),
            Topic::RawTx => self.rawtx.as_deref(),
        }
    }

    pub fn set_endpoint(&mut self, topic: Topic, address: impl Into<String>) {
        let slot = match topic {
            Topic::HashBlock => &mut self.hashblock,
            Topic::HashTx => &mut self.hashtx,
            Topic::RawBlock => &mut self.rawblock,
            Topic::RawTx => &mut self.rawtx,
        };
        *slot = Some(address.into());
    }

    /// High-water mark for a topic's socket
    pub fn hwm_for(&self, topic: Topic) -> i32 {
        self.topic_hwm
            .get(topic.name())
            .copied()
            .unwrap_or(self.hwm)
    }

    /// Configured (topic, endpoint) pairs in topic declaration order
    pub fn bindings(&self) -> Vec<(Topic, &str)> {
        Topic::ALL
            .into_iter()
            .filter_map(|t| self.endpoint(t).map(|address| (t, address)))
            .collect()
    }

    /// Validate endpoints and high-water marks
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.hwm <= 0 {
            return Err(NotifyError::configuration(
                "hwm",
                format!("high-water mark must be positive, got {}", self.hwm),
            ));
        }

        for (name, hwm) in &self.topic_hwm {
            if Topic::from_name(name).is_none() {
                return Err(NotifyError::configuration(
                    name.as_str(),
                    "unknown notification topic",
                ));
            }
            if *hwm <= 0 {
                return Err(NotifyError::configuration(
                    name.as_str(),
                    format!("high-water mark must be positive, got {hwm}"),
                ));
            }
        }

        // Topics sharing an address share one socket, hence one high-water mark
        let mut socket_hwm: BTreeMap<&str, (Topic, i32)> = BTreeMap::new();
        for (topic, address) in self.bindings() {
            validate_address(topic, address)?;
            let hwm = self.hwm_for(topic);
            match socket_hwm.get(address) {
                Some(&(first, first_hwm)) if first_hwm != hwm => {
                    return Err(NotifyError::configuration(
                        topic.name(),
                        format!(
                            "high-water mark {hwm} conflicts with {first_hwm} set for {first} on shared endpoint {address:?}"
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    socket_hwm.insert(address, (topic, hwm));
                }
            }
        }
        Ok(())
    }

    /// Parse `-zmqpub<topic>=<address>` and `-zmqpub<topic>hwm=<n>` options
    ///
    /// Options that do not start with `-zmqpub` are ignored, so the full
    /// node argument list can be passed through. Double-dash forms are accepted.
    pub fn from_args<I, S>(args: I) -> Result<Self, NotifyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();

        for arg in args {
            let arg = arg.as_ref();
            let Some(option) = arg
                .strip_prefix("--zmqpub")
                .or_else(|| arg.strip_prefix("-zmqpub"))
            else {
                continue;
            };

            let (key, value) = option.split_once('=').ok_or_else(|| {
                NotifyError::configuration(option, format!("missing value in {arg}"))
            })?;

            if let Some(name) = key.strip_suffix("hwm") {
                let topic = Topic::from_name(name).ok_or_else(|| {
                    NotifyError::configuration(name, "unknown notification topic")
                })?;
                let hwm: i32 = value.parse().map_err(|_| {
                    NotifyError::configuration(name, format!("invalid high-water mark {value:?}"))
                })?;
                config.topic_hwm.insert(topic.name().to_string(), hwm);
            } else {
                let topic = Topic::from_name(key).ok_or_else(|| {
                    NotifyError::configuration(key, "unknown notification topic")
                })?;
                config.set_endpoint(topic, value);
            }
        }

        Ok(config)
    }
}

fn validate_address(topic: Topic, address: &str) -> Result<(), NotifyError> {
    if address.trim().is_empty() {
        return Err(NotifyError::configuration(topic.name(), "empty endpoint address"));
    }
    let (scheme, rest) = address.split_once("://").ok_or_else(|| {
        NotifyError::configuration(
            topic.name(),
            format!("endpoint {address:?} has no transport scheme"),
        )
    })?;
    if !SUPPORTED_SCHEMES.contains(&scheme) {
        return Err(NotifyError::configuration(
            topic.name(),
            format!("unsupported transport {scheme:?} in {address:?}"),
        ));
    }
    if rest.is_empty() {
        return Err(NotifyError::configuration(
            topic.name(),
            format!("endpoint {address:?} has no address part"),
        ));
    }
    Ok(())
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "blvm_notify=debug")
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    #[serde(default)]
    pub filter: Option<String>,

    /// Enable JSON logging format (for log aggregation systems)
    #[serde(default)]
    pub json_format: bool,
}

impl NotifyConfig {
    /// Load configuration from file (supports JSON and TOML)
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            let config: NotifyConfig = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
            Ok(config)
        } else {
            let config: NotifyConfig = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON config: {}", e))?;
            Ok(config)
        }
    }

    /// Save configuration to TOML file
    pub fn to_toml_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize TOML config: {}", e))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be at least 1");
        }
        self.zmq.validate()?;
        Ok(())
    }
}
