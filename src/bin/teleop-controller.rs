use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{error, info};
use rover_teleop::{
    config::ControllerConfig,
    drivers::{location::FixedLocation, voice::VoiceRelay},
    messages::Position,
    operators,
    telemetry::{remote::RemoteStore, store::MemoryStore, TelemetryChannel},
    ui::{Gesture, SessionSnapshot, TeleopSession},
    Result,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
struct ControllerArgs {
    /// YAML controller config
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Telemetry hub address, overrides the config
    #[arg(long)]
    hub: Option<String>,
    /// Drive a simulated vehicle in process instead of connecting to a hub
    #[arg(short, long)]
    simulate: bool,
    /// This device's latitude
    #[arg(long, default_value_t = 37.78825)]
    lat: f64,
    /// This device's longitude
    #[arg(long, default_value_t = -122.4324, allow_hyphen_values = true)]
    lon: f64,
}

fn main() {
    pretty_env_logger::init();
    let args = ControllerArgs::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Could not build tokio runtime");

    if let Err(e) = runtime.block_on(run(args)) {
        error!("Controller stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: ControllerArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(hub) = args.hub {
        config.hub_addr = hub;
    }
    let here = Position::new(args.lat, args.lon);

    let channel = if args.simulate {
        let channel = TelemetryChannel::new(Arc::new(MemoryStore::new(config.bus_capacity)));
        operators::simulate(channel.clone(), &config.paths, here).await?;
        info!("Running against a simulated vehicle");
        channel
    } else {
        TelemetryChannel::new(RemoteStore::connect(&config.hub_addr, config.bus_capacity).await?)
    };

    let mut session = TeleopSession::start(
        channel,
        &config,
        Arc::new(FixedLocation::new(here)),
        VoiceRelay::missing(&config.voice_locale),
    )
    .await?;

    println!("press|release <F|B|L|R|FL|FR|BL|BR|STOP>, tap <lat> <lon>, speed <v>, steer <deg>,");
    println!("clear, route, publish, locate, voice start|stop, show, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        match line.parse::<Gesture>() {
            // Failures are already logged by the session, keep reading gestures.
            Ok(gesture) => {
                if let Err(e) = session.handle(gesture).await {
                    println!("! {}", e);
                }
            }
            Err(e) => {
                println!("! {}", e);
                continue;
            }
        }
        render(&session.snapshot());
    }

    session.shutdown();
    Ok(())
}

fn render(snapshot: &SessionSnapshot) {
    let vehicle = match snapshot.telemetry.vehicle_position {
        Some(p) => format!("{:.6}, {:.6}", p.latitude, p.longitude),
        None => "unknown".to_string(),
    };
    println!(
        "vehicle {} | obstacle {:.0} cm | speed {} | steering {} | held {:?}",
        vehicle,
        snapshot.telemetry.proximity_distance_cm,
        snapshot.speed,
        snapshot.steering,
        snapshot.pressed.iter().map(|d| d.tag()).collect::<Vec<_>>()
    );
    for waypoint in &snapshot.waypoints {
        println!(
            "  {}: {}, {}",
            waypoint.label(),
            waypoint.position.latitude,
            waypoint.position.longitude
        );
    }
    if let Some(route) = &snapshot.route {
        println!("  nearest {} at {:.6}", route.waypoint.label(), route.distance);
    }
}
