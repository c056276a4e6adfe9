// src/ingest/mod.rs: 采集引擎
pub mod config;
pub mod engine;
pub mod error;
pub mod packet;
pub mod schema;
pub mod source;
pub mod stats;
pub mod store;
// 对外导出常用类型
pub use config::{ChannelSelection, EngineConfig, OversizedPacketPolicy};
pub use engine::{spawn_zmq_engine, EngineHandle, IngestEngine};
pub use error::{ConfigError, DecodeError, IngestError, ShapeError, TransportError};
pub use packet::{decode, encode_packet, validate, Packet, PacketMeta, ValidatedPacket};
pub use source::{ChannelSource, ManualSource, PacketSource, ZmqSubscriber};
pub use stats::{IngestStats, StatsSnapshot};
pub use store::{write_wrapped, RingBufferStore, WindowSnapshot};
