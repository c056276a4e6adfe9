//! Rolling-window ingestion of multi-channel sample packets published over ZeroMQ.
//!
//! A single ingestion task receives `ContinuousData` FlatBuffers messages,
//! validates their shape and writes them into one circular window per tracked
//! channel. Consumers (plots, monitors) pull copies with
//! [`RingBufferStore::snapshot`] on their own cadence.
pub mod ingest;

pub use ingest::{
    spawn_zmq_engine, ChannelSelection, EngineConfig, EngineHandle, IngestEngine, IngestError,
    ManualSource, PacketSource, RingBufferStore, WindowSnapshot, ZmqSubscriber,
};
