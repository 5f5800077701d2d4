use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use log::error;
use rover_teleop::telemetry::{hub::TelemetryHub, store::MemoryStore};

#[derive(Parser)]
struct HubArgs {
    /// Address to accept controllers and vehicles on
    #[arg(short, long, default_value = "0.0.0.0:4040")]
    bind: SocketAddr,
    /// Per-path update backlog
    #[arg(short, long, default_value_t = 1024)]
    capacity: usize,
}

fn main() {
    pretty_env_logger::init();
    let args = HubArgs::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Could not build tokio runtime");

    let outcome = runtime.block_on(async move {
        let store = Arc::new(MemoryStore::new(args.capacity));
        TelemetryHub::bind(args.bind, store).await?.run().await
    });
    if let Err(e) = outcome {
        error!("Telemetry hub stopped: {}", e);
        std::process::exit(1);
    }
}
