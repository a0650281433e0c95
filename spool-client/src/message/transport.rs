use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::message::PushError;
use shared::message::{EventType, FarmMessage};

/// Frames beyond this are assumed corrupt.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Transport abstraction for the push channel
///
/// Wire frame: 1 byte event type, 16 byte request id, 4 byte LE payload
/// length, payload bytes.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<FarmMessage, PushError>;
    async fn write_message(&self, msg: &FarmMessage) -> Result<(), PushError>;
    async fn close(&self) -> Result<(), PushError>;
}

/// TCP Transport Implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, PushError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PushError::Connection(e.to_string()))?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected stream (listener side, tests).
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<FarmMessage, PushError> {
        let mut reader = self.reader.lock().await;

        // Read event type (1 byte)
        let mut type_buf = [0u8; 1];
        reader
            .read_exact(&mut type_buf)
            .await
            .map_err(PushError::Io)?;

        let event_type = EventType::try_from(type_buf[0])
            .map_err(|_| PushError::InvalidMessage(format!("Unknown event type {}", type_buf[0])))?;

        // Read Request ID (16 bytes)
        let mut uuid_buf = [0u8; 16];
        reader
            .read_exact(&mut uuid_buf)
            .await
            .map_err(PushError::Io)?;
        let request_id = Uuid::from_bytes(uuid_buf);

        // Read payload length (4 bytes)
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .await
            .map_err(PushError::Io)?;

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_BYTES {
            return Err(PushError::InvalidMessage(format!(
                "Frame of {} bytes exceeds limit",
                len
            )));
        }

        // Read payload
        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(PushError::Io)?;

        Ok(FarmMessage {
            request_id,
            event_type,
            payload,
        })
    }

    async fn write_message(&self, msg: &FarmMessage) -> Result<(), PushError> {
        let mut writer = self.writer.lock().await;
        let mut data = Vec::with_capacity(21 + msg.payload.len());
        data.push(msg.event_type as u8);
        data.extend_from_slice(msg.request_id.as_bytes());
        data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&msg.payload);

        writer.write_all(&data).await.map_err(PushError::Io)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PushError> {
        // Dropping the Arc references will eventually close the stream
        Ok(())
    }
}

/// Memory Transport Implementation (for in-process communication)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for messages FROM the peer
    rx: Arc<Mutex<broadcast::Receiver<FarmMessage>>>,
    /// Sender for messages TO the peer
    tx: broadcast::Sender<FarmMessage>,
}

impl MemoryTransport {
    /// Create a memory transport over existing channels.
    ///
    /// # Arguments
    /// * `peer_tx` - The peer's broadcast sender (subscribed to for reads)
    /// * `own_tx` - The channel writes go out on
    pub fn new(
        peer_tx: &broadcast::Sender<FarmMessage>,
        own_tx: &broadcast::Sender<FarmMessage>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(peer_tx.subscribe())),
            tx: own_tx.clone(),
        }
    }

    /// Connected (client, server) endpoints over a fresh channel pair.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (server_tx, _) = broadcast::channel(64);
        let (client_tx, _) = broadcast::channel(64);
        let client = Self::new(&server_tx, &client_tx);
        let server = Self::new(&client_tx, &server_tx);
        (client, server)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<FarmMessage, PushError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| PushError::Connection(format!("Memory channel error: {}", e)))
    }

    async fn write_message(&self, msg: &FarmMessage) -> Result<(), PushError> {
        self.tx
            .send(msg.clone())
            .map_err(|e| PushError::Connection(format!("Failed to send to peer: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PushError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::QueueChangedPayload;
    use shared::models::PrinterDelta;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_frame_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let transport = TcpTransport::from_stream(stream);
            let msg = transport.read_message().await.unwrap();
            // echo it back
            transport.write_message(&msg).await.unwrap();
            msg
        });

        let client = TcpTransport::connect(&addr).await.unwrap();
        let sent = FarmMessage::printer_delta(&PrinterDelta {
            name: "alpha".to_string(),
            bed_temp: Some(48.5),
            ..Default::default()
        });
        client.write_message(&sent).await.unwrap();

        let echoed = client.read_message().await.unwrap();
        assert_eq!(echoed, sent);

        let server_saw = server.await.unwrap();
        assert_eq!(server_saw.request_id, sent.request_id);
    }

    #[tokio::test]
    async fn test_tcp_consecutive_frames_stay_aligned() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let transport = TcpTransport::from_stream(stream);
            for version in 1..=3u64 {
                transport
                    .write_message(&FarmMessage::queue_changed(&QueueChangedPayload { version }))
                    .await
                    .unwrap();
            }
        });

        let client = TcpTransport::connect(&addr).await.unwrap();
        for version in 1..=3u64 {
            let msg = client.read_message().await.unwrap();
            let payload: QueueChangedPayload = msg.parse_payload().unwrap();
            assert_eq!(payload.version, version);
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_pair_is_cross_wired() {
        let (client, server) = MemoryTransport::pair();

        server
            .write_message(&FarmMessage::heartbeat())
            .await
            .unwrap();
        let msg = client.read_message().await.unwrap();
        assert_eq!(msg.event_type, EventType::Heartbeat);

        client
            .write_message(&FarmMessage::queue_changed(&QueueChangedPayload {
                version: 9,
            }))
            .await
            .unwrap();
        let msg = server.read_message().await.unwrap();
        assert_eq!(msg.event_type, EventType::QueueChanged);
    }
}
