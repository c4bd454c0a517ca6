use clap::Parser;
use client::cadence::RecurringTask;
use client::{InputUpdate, LocalAvatar, MemoryWorld, Session, SessionConfig, TimestampSource};
use log::info;
use protocol::{
    BlockPlacement, BlockPosition, WireFormat, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_MS,
};
use rand::Rng;
use std::f32::consts::PI;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

const FRAME_MS: u64 = 16;
const WANDER_MS: u64 = 2000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// World to join once connected
    #[arg(short = 'w', long)]
    world: Option<String>,

    /// Wire format: json or bincode
    #[arg(short = 'f', long, default_value = "json")]
    format: WireFormat,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Time remote snapshots by arrival instead of the server timestamp
    #[arg(long)]
    arrival_timestamps: bool,

    /// Reconnect attempts after an unexpected close
    #[arg(long, default_value_t = MAX_RECONNECT_ATTEMPTS)]
    reconnect_attempts: u32,

    /// Delay between reconnect attempts in milliseconds
    #[arg(long, default_value_t = RECONNECT_DELAY_MS)]
    reconnect_delay: u64,

    /// Place a block every N seconds while joined, 0 to disable
    #[arg(short = 'b', long, default_value = "0")]
    build_every: u64,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            wire_format: self.format,
            simulated_latency: Duration::from_millis(self.fake_ping),
            max_reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: Duration::from_millis(self.reconnect_delay),
            timestamp_source: if self.arrival_timestamps {
                TimestampSource::Arrival
            } else {
                TimestampSource::Server
            },
            ..SessionConfig::new(self.server.clone(), self.world.clone())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {} ({})", args.server, args.format);
    match &args.world {
        Some(world) => info!("Joining world: {}", world),
        None => info!("No world requested, staying in the lobby"),
    }
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut session = Session::new(args.session_config(), MemoryWorld::new());
    session.connect();

    let mut frame = interval(Duration::from_millis(FRAME_MS));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut wander = interval(Duration::from_millis(WANDER_MS));
    let mut builder = build_task(args.build_every);

    let dt = FRAME_MS as f32 / 1000.0;
    loop {
        tokio::select! {
            _ = session.poll() => {}
            _ = frame.tick() => session.update_remote_actors(dt),
            _ = wander.tick() => {
                wander_step(&mut session);
                info!(
                    "{:?}: latency {:?} ms, {} remote actors, {} blocks",
                    session.mode(),
                    session.latency(),
                    session.remote_actors().len(),
                    session.host().block_count()
                );
            }
            _ = tick_optional(&mut builder) => build_step(&mut session),
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                session.disconnect();
                break;
            }
        }
    }

    Ok(())
}

/// A running build cadence, or `None` when building is disabled.
fn build_task(every_secs: u64) -> Option<RecurringTask> {
    if every_secs == 0 {
        return None;
    }
    let mut task = RecurringTask::new("build", Duration::from_secs(every_secs));
    task.start();
    Some(task)
}

async fn tick_optional(task: &mut Option<RecurringTask>) {
    match task {
        Some(task) => task.tick().await,
        None => std::future::pending::<()>().await,
    }
}

/// Picks a new heading and gait for the scripted actor.
fn wander_step(session: &mut Session<MemoryWorld>) {
    let mut rng = rand::thread_rng();
    session.set_input(InputUpdate {
        forward: Some(rng.gen_bool(0.8)),
        sprint: Some(rng.gen_bool(0.2)),
        jump: Some(rng.gen_bool(0.1)),
        camera_yaw: Some(rng.gen_range(-PI..PI)),
        ..InputUpdate::default()
    });
}

/// Drops a block under the local actor, locally first and then upstream.
fn build_step(session: &mut Session<MemoryWorld>) {
    if session.local_actor_id().is_none() {
        return;
    }

    let feet = session.host().local_actor_position();
    let block = BlockPlacement {
        position: BlockPosition::new(
            feet.x.floor() as i32,
            feet.y.floor() as i32 - 1,
            feet.z.floor() as i32,
        ),
        structure_id: "stone".to_string(),
        rotation: 0,
        material: None,
    };

    session.host_mut().place_local(block.clone());
    session.send_block_placed(block);
}
