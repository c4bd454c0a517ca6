//! The session orchestrator.
//!
//! [`Session`] owns the connection, the remote actor registry, the input
//! uplink and the latency probe, and turns inbound packets into calls on the
//! host. Everything runs on the task that awaits [`Session::poll`]; the host's
//! own frame loop calls [`Session::update_remote_actors`] in between.

use crate::cadence::RecurringTask;
use crate::clock::{Clock, SystemClock};
use crate::config::{SessionConfig, TimestampSource};
use crate::connection::{ConnectionEvent, ConnectionState, SessionConnection};
use crate::dispatch::{dispatch, InboundHandler};
use crate::events::SessionMode;
use crate::input::{InputUplink, InputUpdate};
use crate::latency::LatencyProbe;
use crate::reconcile::reconcile_local;
use crate::remote::RemoteActorRegistry;
use crate::world::SessionHost;
use log::{debug, info, warn};
use protocol::{
    ActorState, BlockPlacement, BlockPosition, ClientPacket, WorldSnapshot, DEFAULT_ACTOR_COLOR,
};

pub struct Session<H: SessionHost> {
    config: SessionConfig,
    connection: SessionConnection,
    host: H,
    clock: Box<dyn Clock>,
    remote: RemoteActorRegistry<H::Handle>,
    uplink: InputUplink,
    probe: LatencyProbe,
    input_cadence: RecurringTask,
    ping_cadence: RecurringTask,
    local_actor_id: Option<String>,
    local_color: Option<String>,
    mode: SessionMode,
}

impl<H: SessionHost> Session<H> {
    pub fn new(config: SessionConfig, host: H) -> Self {
        Self::with_clock(config, host, SystemClock)
    }

    pub fn with_clock(config: SessionConfig, host: H, clock: impl Clock + 'static) -> Self {
        let mode = if config.world_id.is_some() {
            SessionMode::Offline
        } else {
            SessionMode::NoWorld
        };

        Self {
            connection: SessionConnection::new(&config),
            remote: RemoteActorRegistry::new(config.snapshot_capacity, config.interpolation_delay),
            input_cadence: RecurringTask::new("input", config.input_interval),
            ping_cadence: RecurringTask::new("ping", config.ping_interval),
            uplink: InputUplink::new(),
            probe: LatencyProbe::new(),
            clock: Box::new(clock),
            local_actor_id: None,
            local_color: None,
            mode,
            host,
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    pub fn world_id(&self) -> Option<&str> {
        self.connection.world_id()
    }

    pub fn local_actor_id(&self) -> Option<&str> {
        self.local_actor_id.as_deref()
    }

    pub fn local_color(&self) -> Option<&str> {
        self.local_color.as_deref()
    }

    /// Latest round-trip time in milliseconds.
    pub fn latency(&self) -> Option<u64> {
        self.probe.latency()
    }

    pub fn latency_probe(&self) -> &LatencyProbe {
        &self.probe
    }

    pub fn remote_actors(&self) -> &RemoteActorRegistry<H::Handle> {
        &self.remote
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Merges controller input into the intent sent on the next uplink tick.
    pub fn set_input(&mut self, update: InputUpdate) {
        self.uplink.merge(update);
    }

    pub fn input(&self) -> &InputUplink {
        &self.uplink
    }

    pub fn connect(&mut self) {
        self.connection.connect();
        if self.connection.state() == ConnectionState::Connecting {
            self.set_mode(SessionMode::Connecting);
        }
    }

    /// Leaves the server for good; no automatic reconnect follows.
    pub fn disconnect(&mut self) {
        match self.connection.disconnect() {
            Some(event) => self.handle_connection_event(event),
            // Already closed; a cancelled retry still ends the session.
            None if self.mode == SessionMode::Connecting => self.set_mode(SessionMode::Offline),
            None => {}
        }
    }

    /// Drops the current session and joins `world_id` on a fresh connection.
    pub fn reconnect(&mut self, world_id: impl Into<String>) {
        let world_id = world_id.into();
        info!("Switching to world {}", world_id);

        self.disconnect();
        self.teardown_remote_actors();
        self.connection.set_world_id(Some(world_id.clone()));
        self.config.world_id = Some(world_id);
        self.connect();
    }

    /// Waits for one connection event or cadence tick and handles it.
    pub async fn poll(&mut self) {
        tokio::select! {
            event = self.connection.next_event() => self.handle_connection_event(event),
            _ = self.input_cadence.tick() => {
                self.send_inputs_to_server();
            }
            _ = self.ping_cadence.tick() => self.send_ping(),
        }
    }

    /// Applies one connection event. Any close disposes every remote actor
    /// visual, including closes that will be retried.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                self.input_cadence.start();
                self.ping_cadence.start();
                self.host.on_connected();

                let mode = if self.connection.world_id().is_some() {
                    SessionMode::Connecting
                } else {
                    SessionMode::NoWorld
                };
                self.set_mode(mode);
            }

            ConnectionEvent::Message(packet) => {
                debug!("<- {}", packet.tag());
                dispatch(self, packet);
            }

            ConnectionEvent::Closed { reason, retry_in } => {
                self.local_actor_id = None;
                self.input_cadence.stop();
                self.ping_cadence.stop();
                self.probe.reset();
                self.teardown_remote_actors();
                self.host.on_disconnected(&reason);

                let mode = if retry_in.is_some() {
                    SessionMode::Connecting
                } else {
                    SessionMode::Offline
                };
                self.set_mode(mode);
            }
        }
    }

    /// Interpolates every remote actor and pushes the poses to their visuals.
    pub fn update_remote_actors(&mut self, delta_time: f32) {
        let now = self.clock.now_ms();
        for entry in self.remote.entries_mut() {
            if let Some(pose) = entry.actor.update(now, delta_time) {
                self.host.update_remote_actor_visual(&mut entry.handle, pose);
            }
        }
    }

    /// Sends the current intent. Only happens once joined.
    pub fn send_inputs_to_server(&mut self) -> bool {
        if !self.is_connected() || self.local_actor_id.is_none() {
            return false;
        }
        let packet = self.uplink.next_packet(self.clock.now_ms());
        self.connection.send(packet)
    }

    pub fn send_block_placed(&mut self, block: BlockPlacement) -> bool {
        self.connection.send(ClientPacket::BlockPlaced { block })
    }

    pub fn send_block_removed(&mut self, position: BlockPosition) -> bool {
        self.connection.send(ClientPacket::BlockRemoved { position })
    }

    pub fn send_world_save(&mut self) -> bool {
        self.connection.send(ClientPacket::WorldSave)
    }

    pub fn send_world_reset(&mut self) -> bool {
        self.connection.send(ClientPacket::WorldReset)
    }

    fn send_ping(&mut self) {
        if !self.is_connected() {
            return;
        }
        let packet = self.probe.ping(self.clock.now_ms());
        self.connection.send(packet);
    }

    fn set_mode(&mut self, mode: SessionMode) {
        if self.mode != mode {
            info!("Session mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.host.on_mode_changed(mode);
        }
    }

    fn is_local(&self, actor_id: &str) -> bool {
        self.local_actor_id.as_deref() == Some(actor_id)
    }

    fn track_remote(&mut self, actor_id: &str, state: &ActorState, color: &str) -> bool {
        let host = &mut self.host;
        let added = self.remote.insert_with(actor_id, color, || {
            host.create_remote_actor_visual(actor_id, state, color)
        });
        if added {
            debug!("Tracking remote actor {}", actor_id);
        }
        added
    }

    fn teardown_remote_actors(&mut self) {
        for handle in self.remote.drain() {
            self.host.dispose_remote_actor_visual(handle);
        }
    }
}

impl<H: SessionHost> InboundHandler for Session<H> {
    fn welcome(&mut self, actor_id: String, color: String, state: ActorState, world: WorldSnapshot) {
        info!(
            "Joined world {} as {} ({} blocks)",
            world.world_id,
            actor_id,
            world.blocks.len()
        );

        if let Some(handle) = self.remote.remove(&actor_id) {
            self.host.dispose_remote_actor_visual(handle);
        }
        self.local_actor_id = Some(actor_id);
        self.local_color = Some(color);
        reconcile_local(&mut self.host, &state);

        self.host.clear_all_blocks();
        for block in &world.blocks {
            self.host.place_block_from_network(block);
        }
        self.host.on_world_state(&world);
        self.set_mode(SessionMode::Joined);
    }

    fn join_error(&mut self, message: String) {
        warn!("Join rejected: {}", message);
        self.host.on_join_error(&message);
    }

    fn actor_joined(&mut self, actor_id: String, state: ActorState, color: String) {
        if self.is_local(&actor_id) {
            debug!("Ignoring join announcement for the local actor");
            return;
        }
        self.track_remote(&actor_id, &state, &color);
        self.host.on_actor_joined(&actor_id, &state, &color);
    }

    fn actor_left(&mut self, actor_id: String) {
        match self.remote.remove(&actor_id) {
            Some(handle) => {
                self.host.dispose_remote_actor_visual(handle);
                self.host.on_actor_left(&actor_id);
            }
            None => debug!("actorLeft for unknown actor {}", actor_id),
        }
    }

    fn actor_state(&mut self, actor_id: String, state: ActorState, timestamp: u64) {
        if self.is_local(&actor_id) {
            reconcile_local(&mut self.host, &state);
        } else {
            self.track_remote(&actor_id, &state, DEFAULT_ACTOR_COLOR);
            let timestamp = match self.config.timestamp_source {
                TimestampSource::Server => timestamp,
                TimestampSource::Arrival => self.clock.now_ms(),
            };
            self.remote.receive_state(&actor_id, state, timestamp);
        }
        self.host.on_actor_state(&actor_id, &state);
    }

    fn block_placed(&mut self, actor_id: String, block: BlockPlacement) {
        if self.is_local(&actor_id) {
            debug!("Skipping echo of own placement at {:?}", block.position);
        } else {
            self.host.place_block_from_network(&block);
        }
        self.host.on_block_placed(&actor_id, &block);
    }

    fn block_removed(&mut self, actor_id: String, position: BlockPosition) {
        if self.is_local(&actor_id) {
            debug!("Skipping echo of own removal at {:?}", position);
        } else if !self.host.remove_block_at(position) {
            debug!("No block at {:?} to remove", position);
        }
        self.host.on_block_removed(&actor_id, position);
    }

    fn world_reset(&mut self, actor_id: String) {
        info!("World reset by {}", actor_id);
        self.host.clear_all_blocks();
        self.host.on_world_reset(&actor_id);
    }

    fn world_saved(&mut self, success: bool, message: Option<String>) {
        if success {
            info!("World saved");
        } else {
            warn!("World save failed: {}", message.as_deref().unwrap_or("no reason"));
        }
        self.host.on_world_saved(success, message.as_deref());
    }

    fn pong(&mut self, timestamp: u64) {
        let rtt = self.probe.on_pong(timestamp, self.clock.now_ms());
        debug!("Latency {} ms", rtt);
    }
}
