use clap::Parser;
use log::{error, info};
use rover_teleop::{
    config::{ControllerConfig, HUB_PORT},
    messages::Position,
    operators,
    telemetry::{remote::RemoteStore, TelemetryChannel},
};

#[derive(Parser)]
struct VehicleArgs {
    /// Telemetry hub to connect to
    #[arg(long, default_value_t = format!("127.0.0.1:{}", HUB_PORT))]
    hub: String,
    /// Starting latitude
    #[arg(long, default_value_t = 37.78825)]
    lat: f64,
    /// Starting longitude
    #[arg(long, default_value_t = -122.4324, allow_hyphen_values = true)]
    lon: f64,
}

fn main() {
    pretty_env_logger::init();
    let args = VehicleArgs::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Could not build tokio runtime");

    let outcome = runtime.block_on(async move {
        let config = ControllerConfig::default();
        let store = RemoteStore::connect(&args.hub, config.bus_capacity).await?;
        let channel = TelemetryChannel::new(store);
        let vehicle = operators::simulate(channel, &config.paths, Position::new(args.lat, args.lon)).await?;
        info!("Simulated vehicle running against {}", args.hub);
        let _ = vehicle.await;
        rover_teleop::Result::Ok(())
    });
    if let Err(e) = outcome {
        error!("Simulated vehicle stopped: {}", e);
        std::process::exit(1);
    }
}
