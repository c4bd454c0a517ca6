use protocol::{
    WireFormat, INPUT_SEND_INTERVAL_MS, INTERPOLATION_DELAY_MS, MAX_RECONNECT_ATTEMPTS,
    PING_INTERVAL_MS, RECONNECT_DELAY_MS, SNAPSHOT_BUFFER_CAPACITY,
};
use std::time::Duration;

/// Which timestamp orders a remote actor's snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// The timestamp carried by the `actorState` message.
    #[default]
    Server,
    /// The local clock at the moment the message was handled.
    Arrival,
}

/// Every tunable of a session. `Default` gives the standard cadences.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server_addr: String,
    /// World to join once the transport opens. `None` connects without joining.
    pub world_id: Option<String>,
    pub wire_format: WireFormat,
    pub input_interval: Duration,
    pub ping_interval: Duration,
    pub interpolation_delay: Duration,
    pub snapshot_capacity: usize,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub timestamp_source: TimestampSource,
    /// Artificial round-trip delay, split evenly between both directions.
    pub simulated_latency: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            world_id: None,
            wire_format: WireFormat::Json,
            input_interval: Duration::from_millis(INPUT_SEND_INTERVAL_MS),
            ping_interval: Duration::from_millis(PING_INTERVAL_MS),
            interpolation_delay: Duration::from_millis(INTERPOLATION_DELAY_MS),
            snapshot_capacity: SNAPSHOT_BUFFER_CAPACITY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            timestamp_source: TimestampSource::Server,
            simulated_latency: Duration::ZERO,
        }
    }
}

impl SessionConfig {
    pub fn new(server_addr: impl Into<String>, world_id: Option<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            world_id,
            ..Self::default()
        }
    }
}
