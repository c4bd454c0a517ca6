//! Transport ownership and connection lifecycle.
//!
//! The [`SessionConnection`] is driven from a single task: the host awaits
//! [`SessionConnection::next_event`] and gets back lifecycle changes and
//! decoded server packets. Socket I/O runs in spawned reader/writer tasks that
//! only move bytes; each transport is tagged with a generation number so that
//! events from a transport that has since been replaced are discarded.

use crate::config::SessionConfig;
use log::{debug, error, info, warn};
use protocol::{ClientPacket, CodecError, ServerPacket, WireFormat};
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Sleep};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("server closed the connection")]
    ClosedByPeer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Capped, fixed-delay reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Marks the budget as spent so that the next close does not retry.
    pub fn suppress(&mut self) {
        self.attempts = self.max_attempts;
    }

    /// Consumes one attempt and returns the wait before it, or `None` once
    /// the budget is spent.
    pub fn next_retry(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    Message(ServerPacket),
    /// The transport is gone. `retry_in` is set when a reconnect is scheduled.
    Closed {
        reason: String,
        retry_in: Option<Duration>,
    },
}

#[derive(Debug)]
enum TransportEvent {
    Opened {
        generation: u64,
        outbound: mpsc::UnboundedSender<ClientPacket>,
    },
    Packet {
        generation: u64,
        packet: ServerPacket,
    },
    Closed {
        generation: u64,
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct TransportSettings {
    addr: String,
    format: WireFormat,
    one_way_delay: Duration,
}

pub struct SessionConnection {
    settings: TransportSettings,
    world_id: Option<String>,
    state: ConnectionState,
    policy: ReconnectPolicy,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<ClientPacket>>,
    transport: Option<JoinHandle<()>>,
    retry: Option<Pin<Box<Sleep>>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl SessionConnection {
    pub fn new(config: &SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            settings: TransportSettings {
                addr: config.server_addr.clone(),
                format: config.wire_format,
                one_way_delay: config.simulated_latency / 2,
            },
            world_id: config.world_id.clone(),
            state: ConnectionState::Idle,
            policy: ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay),
            generation: 0,
            outbound: None,
            transport: None,
            retry: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn world_id(&self) -> Option<&str> {
        self.world_id.as_deref()
    }

    /// Takes effect on the next open.
    pub fn set_world_id(&mut self, world_id: Option<String>) {
        self.world_id = world_id;
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.policy.attempts()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn is_retry_pending(&self) -> bool {
        self.retry.is_some()
    }

    /// Opens a transport unless one is already open or opening. An explicit
    /// connect restores the full reconnect budget.
    pub fn connect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            debug!("connect ignored: already {:?}", self.state);
            return;
        }

        self.policy.reset();
        self.retry = None;
        self.open_transport();
    }

    /// Closes the transport without scheduling a reconnect. Returns the close
    /// event when there was something to close.
    pub fn disconnect(&mut self) -> Option<ConnectionEvent> {
        self.policy.suppress();
        self.retry = None;

        if !matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            return None;
        }

        self.teardown();
        self.state = ConnectionState::Closed;
        info!("Disconnected from {}", self.settings.addr);

        Some(ConnectionEvent::Closed {
            reason: "disconnected by client".to_string(),
            retry_in: None,
        })
    }

    /// Queues `packet` for transmission. Returns `false` and drops the packet
    /// when the transport is not open.
    pub fn send(&self, packet: ClientPacket) -> bool {
        match (&self.state, &self.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound.send(packet).is_ok(),
            _ => {
                debug!("Dropping {} packet: connection not open", packet.tag());
                false
            }
        }
    }

    /// Waits for the next lifecycle change or server packet. Scheduled
    /// reconnects are started from here. Cancel safe.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    if let Some(event) = self.accept(event) {
                        return event;
                    }
                }
                _ = wait_for(&mut self.retry) => {
                    self.retry = None;
                    self.open_transport();
                }
            }
        }
    }

    fn open_transport(&mut self) {
        self.teardown();
        self.state = ConnectionState::Connecting;

        info!(
            "Connecting to {} (attempt {}/{})",
            self.settings.addr,
            self.policy.attempts(),
            self.policy.max_attempts()
        );

        let handle = tokio::spawn(run_transport(
            self.settings.clone(),
            self.generation,
            self.events_tx.clone(),
        ));
        self.transport = Some(handle);
    }

    fn teardown(&mut self) {
        self.generation += 1;
        self.outbound = None;
        if let Some(handle) = self.transport.take() {
            handle.abort();
        }
    }

    fn accept(&mut self, event: TransportEvent) -> Option<ConnectionEvent> {
        match event {
            TransportEvent::Opened {
                generation,
                outbound,
            } if generation == self.generation => {
                self.state = ConnectionState::Open;
                self.policy.reset();
                self.outbound = Some(outbound);
                info!("Connected to {}", self.settings.addr);

                if let Some(world_id) = self.world_id.clone() {
                    info!("Joining world {}", world_id);
                    self.send(ClientPacket::Join { world_id });
                }

                Some(ConnectionEvent::Opened)
            }

            TransportEvent::Packet { generation, packet } if generation == self.generation => {
                Some(ConnectionEvent::Message(packet))
            }

            TransportEvent::Closed { generation, reason } if generation == self.generation => {
                self.state = ConnectionState::Closed;
                self.outbound = None;
                self.transport = None;

                let retry_in = self.policy.next_retry();
                match retry_in {
                    Some(delay) => {
                        warn!(
                            "Connection closed ({}); reconnect {}/{} in {:?}",
                            reason,
                            self.policy.attempts(),
                            self.policy.max_attempts(),
                            delay
                        );
                        self.retry = Some(Box::pin(sleep(delay)));
                    }
                    None => {
                        warn!("Connection closed ({}); not reconnecting", reason);
                    }
                }

                Some(ConnectionEvent::Closed { reason, retry_in })
            }

            _ => {
                debug!("Discarding event from a superseded transport");
                None
            }
        }
    }
    /// Marks the connection open on an in-memory channel instead of a socket.
    #[cfg(test)]
    pub(crate) fn open_for_test(
        &mut self,
    ) -> (ConnectionEvent, mpsc::UnboundedReceiver<ClientPacket>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let event = self.accept(TransportEvent::Opened {
            generation: self.generation,
            outbound,
        });
        (event.expect("current generation"), rx)
    }

    #[cfg(test)]
    pub(crate) fn close_for_test(&mut self, reason: &str) -> ConnectionEvent {
        self.accept(TransportEvent::Closed {
            generation: self.generation,
            reason: reason.to_string(),
        })
        .expect("current generation")
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.transport.take() {
            handle.abort();
        }
    }
}

async fn wait_for(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(delay) => delay.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

async fn run_transport(
    settings: TransportSettings,
    generation: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let reason = match drive_transport(&settings, generation, &events).await {
        Ok(()) => "transport finished".to_string(),
        Err(e) => e.to_string(),
    };
    let _ = events.send(TransportEvent::Closed { generation, reason });
}

async fn drive_transport(
    settings: &TransportSettings,
    generation: u64,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), SessionError> {
    let stream =
        TcpStream::connect(&settings.addr)
            .await
            .map_err(|source| SessionError::Connect {
                addr: settings.addr.clone(),
                source,
            })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed: {}", e);
    }

    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(
        write_half,
        outbound_rx,
        settings.format,
        settings.one_way_delay,
    ));

    let opened = TransportEvent::Opened {
        generation,
        outbound: outbound_tx,
    };
    if events.send(opened).is_err() {
        writer.abort();
        return Ok(());
    }

    let result = read_loop(read_half, settings, generation, events).await;
    writer.abort();
    result
}

async fn read_loop(
    read_half: OwnedReadHalf,
    settings: &TransportSettings,
    generation: u64,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), SessionError> {
    let mut reader = BufReader::new(read_half);

    loop {
        let Some(frame) = settings.format.read_frame(&mut reader).await? else {
            return Err(SessionError::ClosedByPeer);
        };

        match settings.format.decode::<ServerPacket>(&frame) {
            Ok(packet) => {
                if !settings.one_way_delay.is_zero() {
                    sleep(settings.one_way_delay).await;
                }
                if events
                    .send(TransportEvent::Packet { generation, packet })
                    .is_err()
                {
                    return Ok(());
                }
            }
            Err(e) => warn!("Dropping malformed frame ({} bytes): {}", frame.len(), e),
        }
    }
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<ClientPacket>,
    format: WireFormat,
    one_way_delay: Duration,
) {
    while let Some(packet) = outbound.recv().await {
        if !one_way_delay.is_zero() {
            sleep(one_way_delay).await;
        }

        let frame = match format.encode(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} packet: {}", packet.tag(), e);
                continue;
            }
        };

        if let Err(e) = write_half.write_all(&frame).await {
            warn!("Write failed: {}", e);
            return;
        }
    }

    let _ = write_half.shutdown().await;
}
