use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ingest::ConfigError;

/// Which decoded channels land in the rolling window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChannelSelection {
    /// Track one source channel.
    Single { channel: usize },
    /// Track source channels `0..count`.
    Multi { count: usize },
}

impl ChannelSelection {
    /// Number of window rows kept by the store.
    pub fn tracked_count(&self) -> usize {
        match *self {
            ChannelSelection::Single { .. } => 1,
            ChannelSelection::Multi { count } => count,
        }
    }
    /// Smallest `num_channels` a packet must carry to be written.
    pub fn required_source_channels(&self) -> usize {
        match *self {
            ChannelSelection::Single { channel } => channel + 1,
            ChannelSelection::Multi { count } => count,
        }
    }
    /// First source channel index of the tracked block.
    pub fn first_channel(&self) -> usize {
        match *self {
            ChannelSelection::Single { channel } => channel,
            ChannelSelection::Multi { .. } => 0,
        }
    }
    /// Source channel ids in window-row order.
    pub fn channel_ids(&self) -> Vec<usize> {
        let first = self.first_channel();
        (first..first + self.tracked_count()).collect()
    }
    /// Window row that holds `channel_id`, if it is tracked.
    pub fn slot_of(&self, channel_id: usize) -> Option<usize> {
        let first = self.first_channel();
        (channel_id >= first && channel_id < first + self.tracked_count())
            .then(|| channel_id - first)
    }
}

impl Default for ChannelSelection {
    fn default() -> Self {
        ChannelSelection::Multi { count: 64 }
    }
}

/// What to do with a packet carrying at least `window_capacity` samples per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizedPacketPolicy {
    /// Write only the newest `window_capacity` samples, at the positions a
    /// sample-by-sample write would have left them.
    #[default]
    KeepNewest,
    /// Drop the packet with [`crate::ingest::ShapeError::Oversized`].
    Reject,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    /// SUB topic prefix; empty subscribes to everything.
    pub topic: String,
    /// Samples retained per channel.
    pub window_capacity: usize,
    /// Raw samples are divided by this before storage.
    pub scale_factor: f32,
    pub channels: ChannelSelection,
    /// Pause taken by the ingestion loop when the transport has nothing queued.
    pub idle_pause_ms: u64,
    pub oversized_policy: OversizedPacketPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5555,
            topic: String::new(),
            window_capacity: 30_000,
            scale_factor: 2000.0,
            channels: ChannelSelection::default(),
            idle_pause_ms: 1,
            oversized_policy: OversizedPacketPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Settings of the single-channel monitor: channel 1 only.
    pub fn single_channel(channel: usize) -> Self {
        Self {
            channels: ChannelSelection::Single { channel },
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }

    pub fn idle_pause(&self) -> Duration {
        Duration::from_millis(self.idle_pause_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid(
                "window_capacity must be greater than zero".into(),
            ));
        }
        if !self.scale_factor.is_finite() || self.scale_factor == 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scale_factor must be finite and non-zero, got {}",
                self.scale_factor
            )));
        }
        if self.channels.tracked_count() == 0 {
            return Err(ConfigError::Invalid(
                "at least one channel must be tracked".into(),
            ));
        }
        if self
            .channels
            .first_channel()
            .checked_add(self.channels.tracked_count())
            .is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "channel selection {:?} is out of range",
                self.channels
            )));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        Ok(())
    }
}
