use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc::Receiver;
use futures::FutureExt;
use tokio::sync::mpsc;
use zeromq::{Socket, SocketEvent, SocketRecv, SubSocket};

use crate::ingest::{EngineConfig, TransportError};

/// Non-blocking packet transport.
///
/// `try_receive` must return `Ok(None)` straight away when nothing is queued;
/// an empty queue is the steady state, not an error.
#[async_trait]
pub trait PacketSource: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;
    /// Takes at most one queued message.
    async fn try_receive(&mut self) -> Result<Option<Bytes>, TransportError>;
    /// Releases the connection. Called once when the ingestion loop ends.
    async fn close(&mut self) {}
}

struct ZmqConnection {
    socket: SubSocket,
    events: Receiver<SocketEvent>,
}

/// ZeroMQ SUB socket connected to a publisher.
///
/// The socket does not reconnect: once the publisher goes away the next empty
/// poll reports [`TransportError::Fatal`].
pub struct ZmqSubscriber {
    endpoint: String,
    topic: String,
    connection: Option<ZmqConnection>,
}

impl ZmqSubscriber {
    /// `topic` is a prefix filter; pass `""` for every message.
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic: topic.into(),
            connection: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.endpoint(), config.topic.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[async_trait]
impl PacketSource for ZmqSubscriber {
    /// Waits until a publisher accepts the connection; zeromq retries refused
    /// connects on its own.
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connection.is_some() {
            return Ok(());
        }
        log::info!("Connecting ZMQ SUB socket to {}", self.endpoint);
        let mut socket = SubSocket::new();
        let events = socket.monitor();
        socket
            .connect(&self.endpoint)
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        socket
            .subscribe(&self.topic)
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.endpoint.clone(),
                reason: format!("subscribe failed: {e}"),
            })?;
        log::info!("ZMQ SUB socket connected, topic filter {:?}", self.topic);
        self.connection = Some(ZmqConnection { socket, events });
        Ok(())
    }

    async fn try_receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| TransportError::Fatal("ZMQ socket is not connected".into()))?;
        // Poll once; a pending receive means nothing is queued.
        if let Some(result) = connection.socket.recv().now_or_never() {
            let message = result.map_err(|e| TransportError::Fatal(e.to_string()))?;
            // Single-frame messages: one frame is one packet.
            return Ok(message.into_vec().into_iter().next());
        }
        // Queue drained; only now look at the peer state.
        while let Ok(event) = connection.events.try_next() {
            match event {
                Some(SocketEvent::Disconnected(_)) => {
                    return Err(TransportError::Fatal(format!(
                        "publisher at {} disconnected",
                        self.endpoint
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(TransportError::Fatal(format!(
                        "ZMQ socket to {} closed",
                        self.endpoint
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if self.connection.take().is_some() {
            log::info!("ZMQ SUB socket to {} released", self.endpoint);
        }
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Bytes>,
}

impl ManualSource {
    pub fn new<B: Into<Bytes>>(payloads: impl IntoIterator<Item = B>) -> Self {
        Self {
            queue: payloads.into_iter().map(Into::into).collect(),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl PacketSource for ManualSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
    async fn try_receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.queue.pop_front())
    }
}

/// In-process transport fed through a tokio channel. Dropping every sender
/// is treated as a lost connection.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ChannelSource {
    pub fn pair() -> (mpsc::UnboundedSender<Bytes>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl PacketSource for ChannelSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
    async fn try_receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.rx.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(TransportError::Fatal("channel source disconnected".into()))
            }
        }
    }
    async fn close(&mut self) {
        self.rx.close();
    }
}
