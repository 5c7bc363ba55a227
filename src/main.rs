// Headless demo: one car on flat ground, scripted driver, JSON telemetry once per second.
//
//     RUST_LOG=debug cargo run -- path/to/vehicle.json

use tokio::time::{interval, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vehicle_dynamics::drive::types::InputSource;
use vehicle_dynamics::{PhysicsWorld, VehicleConfig};

const CAR: &str = "car";
const DT: f32 = 1.0 / 60.0;
const TICKS_PER_SECOND: u64 = 60;
const DEMO_SECONDS: u64 = 20;

/// Launch, hold a right-hand curve, coast, then brake to a stop.
#[derive(Default)]
struct ScriptedDriver {
    tick: u64,
}

impl ScriptedDriver {
    fn seconds(&self) -> f32 {
        self.tick as f32 / TICKS_PER_SECOND as f32
    }

    fn advance(&mut self) {
        self.tick += 1;
    }
}

impl InputSource for ScriptedDriver {
    fn vertical(&mut self) -> f32 {
        match self.seconds() {
            t if t < 10.0 => 1.0,
            t if t < 13.0 => 0.0,
            _ => -1.0,
        }
    }

    fn horizontal(&mut self) -> f32 {
        match self.seconds() {
            t if (6.0..10.0).contains(&t) => 0.4,
            _ => 0.0,
        }
    }
}

async fn run(mut physics: PhysicsWorld) {
    let mut driver = ScriptedDriver::default();

    // Fixed timestep: ~60 Hz
    let mut ticker = interval(Duration::from_millis(16));

    for tick in 0..DEMO_SECONDS * TICKS_PER_SECOND {
        ticker.tick().await;

        physics.set_input(CAR, driver.poll());
        physics.step(DT);
        driver.advance();

        if tick % TICKS_PER_SECOND == 0 {
            let Some(snapshot) = physics.snapshot(CAR) else { continue };
            match serde_json::to_string(&snapshot) {
                Ok(json) => info!(target: "telemetry", "{json}"),
                Err(err) => warn!(%err, "failed to encode snapshot"),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting vehicle dynamics demo");

    let config = match std::env::args().nth(1) {
        Some(path) => match VehicleConfig::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(%path, %err, "could not load vehicle config");
                std::process::exit(1);
            }
        },
        None => VehicleConfig::hatchback(),
    };

    let mut physics = PhysicsWorld::new();
    if let Err(err) = physics.spawn_vehicle(CAR, config, [0.0, 1.0, 0.0]) {
        error!(%err, "could not spawn vehicle");
        std::process::exit(1);
    }

    tokio::select! {
        _ = run(physics) => info!("demo finished"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
}
