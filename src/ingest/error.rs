use thiserror::Error;

/// Payload could not be read as a `ContinuousData` buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed packet: {0}")]
    Malformed(String),
}

impl From<flatbuffers::InvalidFlatbuffer> for DecodeError {
    fn from(value: flatbuffers::InvalidFlatbuffer) -> Self {
        DecodeError::Malformed(value.to_string())
    }
}

/// Decoded packet whose sizes disagree with its contents or with the tracked channels.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("sample count mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("channel count mismatch: need at least {required} channels, packet has {actual}")]
    ChannelMismatch { required: usize, actual: usize },
    #[error("packet of {num_samples} samples does not fit a window of {capacity}")]
    Oversized { num_samples: usize, capacity: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("transport failed: {0}")]
    Fatal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error of the ingestion engine.
///
/// Only [`IngestError::Transport`] ever ends the ingestion loop; decode and shape
/// failures are counted and logged per packet.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
