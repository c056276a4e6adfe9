use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ingest::packet::{decode, validate};
use crate::ingest::{
    ConfigError, EngineConfig, IngestError, IngestStats, PacketSource, RingBufferStore,
    StatsSnapshot, TransportError, WindowSnapshot, ZmqSubscriber,
};

const PROGRESS_EVERY_PACKETS: u64 = 1000;

/// Receive → decode → validate → write loop over one [`PacketSource`].
pub struct IngestEngine<S: PacketSource> {
    source: S,
    store: Arc<RingBufferStore>,
    stats: Arc<IngestStats>,
    idle_pause: Duration,
}

impl<S: PacketSource> IngestEngine<S> {
    pub fn new(config: &EngineConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            store: Arc::new(RingBufferStore::from_config(config)),
            stats: Arc::new(IngestStats::new()),
            idle_pause: config.idle_pause(),
        })
    }

    pub fn store(&self) -> Arc<RingBufferStore> {
        Arc::clone(&self.store)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Handles one raw payload and returns the new cursor. Failures are counted
    /// and logged here; the store is untouched by a rejected packet.
    pub fn process_payload(&self, raw: &[u8]) -> Result<usize, IngestError> {
        self.stats.record_received();
        let packet = decode(raw).map_err(|e| {
            self.stats.record_decode_error();
            log::warn!("Impossible to parse the packet received - skipping: {}", e);
            e
        })?;
        let written = validate(packet).and_then(|packet| {
            let cursor = self.store.write_packet(&packet)?;
            Ok((cursor, packet.num_samples()))
        });
        match written {
            Ok((cursor, num_samples)) => {
                let total = self.stats.record_written(num_samples);
                if total % PROGRESS_EVERY_PACKETS == 0 {
                    log::debug!("Wrote {} packets, cursor at {}", total, cursor);
                }
                Ok(cursor)
            }
            Err(e) => {
                self.stats.record_shape_error();
                log::warn!("Dropping packet: {}", e);
                Err(e.into())
            }
        }
    }

    /// Takes at most one message from the source. Returns whether one was
    /// available; only transport failures are errors.
    pub async fn pump_once(&mut self) -> Result<bool, TransportError> {
        match self.source.try_receive().await? {
            Some(raw) => {
                // per-packet failures are already counted and logged
                self.process_payload(&raw).ok();
                Ok(true)
            }
            None => {
                self.stats.record_empty_poll();
                Ok(false)
            }
        }
    }

    /// Runs until `cancel` fires or the transport fails, then releases the source.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<StatsSnapshot, IngestError> {
        // connect may wait for a publisher indefinitely; cancellation wins
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.source.connect() => Some(result),
        };
        match connected {
            None => {
                self.source.close().await;
                log::info!("Ingestion cancelled before the transport connected");
                return Ok(self.stats.snapshot());
            }
            Some(Err(e)) => {
                log::error!("Ingestion could not start: {}", e);
                return Err(e.into());
            }
            Some(Ok(())) => {}
        }
        log::info!(
            "Ingestion started: window of {} samples, {} channel(s)",
            self.store.capacity(),
            self.store.selection().tracked_count()
        );
        let outcome = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }
            match self.pump_once().await {
                Ok(true) => tokio::task::yield_now().await,
                Ok(false) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(self.idle_pause) => {}
                    }
                }
                Err(e) => {
                    log::error!("Transport failure, stopping ingestion: {}", e);
                    break Err(e);
                }
            }
        };
        self.source.close().await;
        let stats = self.stats.snapshot();
        log::info!(
            "Ingestion stopped: {} packets written, {} dropped",
            stats.packets_written,
            stats.dropped()
        );
        outcome.map(|_| stats).map_err(IngestError::from)
    }
}

impl<S: PacketSource + 'static> IngestEngine<S> {
    /// Moves the loop onto a tokio task. Must be called inside a runtime.
    pub fn spawn(self) -> EngineHandle {
        let cancel = CancellationToken::new();
        let store = self.store();
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(self.run(cancel.clone()));
        EngineHandle {
            store,
            stats,
            cancel,
            task,
        }
    }
}

/// Builds a ZeroMQ-fed engine from `config` and spawns it.
pub fn spawn_zmq_engine(config: &EngineConfig) -> Result<EngineHandle, IngestError> {
    let engine = IngestEngine::new(config, ZmqSubscriber::from_config(config))?;
    Ok(engine.spawn())
}

/// Handle on a running ingestion task; the read side of the window.
pub struct EngineHandle {
    store: Arc<RingBufferStore>,
    stats: Arc<IngestStats>,
    cancel: CancellationToken,
    task: JoinHandle<Result<StatsSnapshot, IngestError>>,
}

impl EngineHandle {
    pub fn store(&self) -> Arc<RingBufferStore> {
        Arc::clone(&self.store)
    }
    pub fn snapshot(&self) -> WindowSnapshot {
        self.store.snapshot()
    }
    pub fn get_snapshot(&self, channel_id: Option<usize>) -> Option<(Vec<f32>, usize)> {
        self.store.channel_snapshot(channel_id)
    }
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
    /// Stops polling, waits for the loop to release the transport and returns
    /// the final counters, or the transport error that ended the loop earlier.
    pub async fn shutdown(self) -> Result<StatsSnapshot, IngestError> {
        self.cancel.cancel();
        self.task.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::packet::{encode_packet, packet_from_rows, Packet, PacketMeta};
    use crate::ingest::{ChannelSelection, ManualSource, ShapeError};
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Source whose publisher never shows up.
    struct NeverConnects {
        closed: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl PacketSource for NeverConnects {
        async fn connect(&mut self) -> Result<(), TransportError> {
            std::future::pending().await
        }
        async fn try_receive(&mut self) -> Result<Option<Bytes>, TransportError> {
            Ok(None)
        }
        async fn close(&mut self) {
            self.closed
                .store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn config(count: usize, capacity: usize) -> EngineConfig {
        EngineConfig {
            channels: ChannelSelection::Multi { count },
            window_capacity: capacity,
            scale_factor: 1.0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = EngineConfig {
            window_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(IngestEngine::new(&bad, ManualSource::new(Vec::<Vec<u8>>::new())).is_err());
    }

    #[test]
    fn mismatched_packet_leaves_store_identical() {
        let engine =
            IngestEngine::new(&config(2, 16), ManualSource::new(Vec::<Vec<u8>>::new())).unwrap();
        engine
            .process_payload(&encode_packet(&packet_from_rows(&[vec![1.0; 3], vec![2.0; 3]])))
            .unwrap();
        let before = engine.store().snapshot();
        let bad = Packet {
            num_samples: 10,
            num_channels: 2,
            samples: vec![5.0; 15],
            meta: PacketMeta::default(),
        };
        let err = engine.process_payload(&encode_packet(&bad)).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Shape(ShapeError::SizeMismatch {
                expected: 20,
                actual: 15
            })
        ));
        assert_eq!(engine.store().snapshot(), before);
        let stats = engine.stats();
        assert_eq!(stats.packets_received, 2);
        assert_eq!(stats.packets_written, 1);
        assert_eq!(stats.shape_errors, 1);
    }

    #[test]
    fn malformed_payload_does_not_poison_later_packets() {
        let engine =
            IngestEngine::new(&config(1, 8), ManualSource::new(Vec::<Vec<u8>>::new())).unwrap();
        assert!(matches!(
            engine.process_payload(b"\x00\x01garbage"),
            Err(IngestError::Decode(_))
        ));
        let cursor = engine
            .process_payload(&encode_packet(&packet_from_rows(&[vec![3.0, 4.0]])))
            .unwrap();
        assert_eq!(cursor, 2);
        assert_eq!(engine.stats().decode_errors, 1);
        assert_eq!(engine.stats().packets_written, 1);
    }

    #[tokio::test]
    async fn pump_once_reports_empty_source() {
        let payload = encode_packet(&packet_from_rows(&[vec![1.0]]));
        let mut engine = IngestEngine::new(&config(1, 4), ManualSource::new(vec![payload])).unwrap();
        assert!(engine.pump_once().await.unwrap());
        assert!(!engine.pump_once().await.unwrap());
        assert_eq!(engine.stats().empty_polls, 1);
        assert_eq!(engine.store().cursor(), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_connect() {
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let source = NeverConnects {
            closed: Arc::clone(&closed),
        };
        let handle = IngestEngine::new(&config(1, 4), source).unwrap().spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        let stats = tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("shutdown waited on connect")
            .unwrap();
        assert_eq!(stats, StatsSnapshot::default());
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
