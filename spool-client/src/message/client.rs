//! Push session - connect, decode, fan out, reconnect
//!
//! ```text
//! TCP / memory transport
//!         │ frames
//!         ▼
//!   SessionTask ── decode_event ──► broadcast<PushEvent> ──► reconciler
//!         │
//!         ├─ heartbeat writer (own task, shares the transport)
//!         └─ on read failure: ChannelDown, capped-backoff redial,
//!            hello, ChannelUp
//! ```
//!
//! The session never touches the cache itself; everything flows through
//! the event channel so the reconciler stays the single merge point.

use crate::message::transport::{MemoryTransport, TcpTransport, Transport};
use crate::message::{PushConfig, PushError, PushEvent, decode_event};
use shared::message::{FarmMessage, HelloPayload, PROTOCOL_VERSION};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Decoded events buffered per subscriber before lagging kicks in.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How the session reaches the controller
#[derive(Debug, Clone)]
enum Endpoint {
    Tcp(String),
    Memory(MemoryTransport),
}

impl Endpoint {
    async fn connect(&self) -> Result<Arc<dyn Transport>, PushError> {
        match self {
            Endpoint::Tcp(addr) => Ok(Arc::new(TcpTransport::connect(addr).await?)),
            Endpoint::Memory(transport) => Ok(Arc::new(transport.clone())),
        }
    }

    /// Memory endpoints cannot be re-dialed; a lost one stays lost.
    fn reconnectable(&self) -> bool {
        matches!(self, Endpoint::Tcp(_))
    }
}

/// Client side of the push channel
#[derive(Debug)]
pub struct PushSession {
    config: PushConfig,
    event_tx: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PushSession {
    pub fn new(config: PushConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            event_tx,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Subscribe to decoded push events.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the underlying connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Connect over TCP and spawn the session task.
    pub async fn connect(&self, addr: &str, client_name: &str) -> Result<(), PushError> {
        self.spawn_session(Endpoint::Tcp(addr.to_string()), client_name)
            .await
    }

    /// Connect over an in-memory transport (tests, embedded controllers).
    pub async fn connect_memory(
        &self,
        transport: MemoryTransport,
        client_name: &str,
    ) -> Result<(), PushError> {
        self.spawn_session(Endpoint::Memory(transport), client_name)
            .await
    }

    /// Stop the session task and close the connection.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn spawn_session(&self, endpoint: Endpoint, client_name: &str) -> Result<(), PushError> {
        let transport = endpoint.connect().await?;
        send_hello(transport.as_ref(), client_name).await?;
        self.connected.store(true, Ordering::Relaxed);
        let _ = self.event_tx.send(PushEvent::ChannelUp);
        tracing::info!(client = %client_name, "Push channel connected");

        let task = SessionTask {
            endpoint,
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            connected: self.connected.clone(),
            shutdown: self.shutdown.clone(),
            client_name: client_name.to_string(),
        };
        tokio::spawn(task.run(transport));
        Ok(())
    }
}

async fn send_hello(transport: &dyn Transport, client_name: &str) -> Result<(), PushError> {
    let payload = HelloPayload {
        version: PROTOCOL_VERSION,
        client_name: Some(client_name.to_string()),
        client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };
    transport.write_message(&FarmMessage::hello(&payload)).await
}

struct SessionTask {
    endpoint: Endpoint,
    config: PushConfig,
    event_tx: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
    client_name: String,
}

impl SessionTask {
    async fn run(self, mut transport: Arc<dyn Transport>) {
        loop {
            let lost = self.pump(transport.clone()).await;
            self.connected.store(false, Ordering::Relaxed);
            if !lost {
                // shutdown requested
                break;
            }

            let _ = self.event_tx.send(PushEvent::ChannelDown);
            if !self.config.auto_reconnect || !self.endpoint.reconnectable() {
                tracing::warn!("Push channel lost, not reconnecting");
                break;
            }
            match self.reconnect().await {
                Some(fresh) => {
                    transport = fresh;
                    self.connected.store(true, Ordering::Relaxed);
                    let _ = self.event_tx.send(PushEvent::ChannelUp);
                }
                None => break,
            }
        }
        tracing::info!("Push session stopped");
    }

    /// Read frames until shutdown or transport failure.
    /// Returns true when the connection was lost.
    async fn pump(&self, transport: Arc<dyn Transport>) -> bool {
        // Heartbeats go out on their own task; the write half has its own
        // lock, so beats never tear a partially-read frame.
        let hb_cancel = self.shutdown.child_token();
        let hb_task = if self.config.heartbeat_interval.is_zero() {
            None
        } else {
            let transport = transport.clone();
            let period = self.config.heartbeat_interval;
            let cancel = hb_cancel.clone();
            Some(tokio::spawn(async move {
                let start = tokio::time::Instant::now() + period;
                let mut ticker = tokio::time::interval_at(start, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if let Err(e) = transport.write_message(&FarmMessage::heartbeat()).await {
                                tracing::debug!(error = %e, "Heartbeat write failed");
                                break;
                            }
                        }
                    }
                }
            }))
        };

        let lost = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = transport.close().await;
                    break false;
                }
                result = transport.read_message() => match result {
                    Ok(msg) => self.dispatch(msg),
                    Err(e) => {
                        tracing::warn!(error = %e, "Push channel read failed");
                        break true;
                    }
                },
            }
        };

        hb_cancel.cancel();
        if let Some(task) = hb_task {
            let _ = task.await;
        }
        lost
    }

    fn dispatch(&self, msg: FarmMessage) {
        match decode_event(&msg) {
            Ok(Some(event)) => {
                if self.event_tx.send(event).is_err() {
                    tracing::debug!("No subscribers for push event");
                }
            }
            Ok(None) => {} // heartbeat / hello ack
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event_type = %msg.event_type,
                    "Undecodable push event dropped"
                );
            }
        }
    }

    /// Redial with capped exponential backoff until connected, out of
    /// attempts, or shut down.
    async fn reconnect(&self) -> Option<Arc<dyn Transport>> {
        let mut delay = self.config.reconnect_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if self.config.max_reconnect_attempts != 0
                && attempt > self.config.max_reconnect_attempts
            {
                tracing::error!(
                    attempts = attempt - 1,
                    "Giving up on push channel reconnect"
                );
                return None;
            }

            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting push channel"
            );
            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.endpoint.connect().await {
                Ok(transport) => {
                    match send_hello(transport.as_ref(), &self.client_name).await {
                        Ok(()) => {
                            tracing::info!(attempt, "Push channel reconnected");
                            return Some(transport);
                        }
                        Err(e) => tracing::warn!(error = %e, "Hello failed after reconnect"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, attempt, "Reconnect attempt failed"),
            }

            delay = (delay * 2).min(self.config.max_reconnect_delay);
        }
    }
}
