use prize_wheel_driver::config::DriverConfig;
use prize_wheel_driver::controller;
use prize_wheel_driver::{demo, logging};
use prize_wheel_shared::{RandSource, SpinAllocator};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DriverConfig::from_env()?;
    logging::setup()?;

    let source = match config.seed {
        Some(seed) => RandSource::seeded(seed),
        None => RandSource::from_entropy(),
    };
    let allocator = SpinAllocator::new(config.wheel.clone(), source)?;
    info!(
        "Starting {} wheel ({} outcome, {} demo spins)",
        config.variant, config.force, config.demo_spins
    );

    let mut handle = controller::spawn(allocator, config.timings, config.force);
    let revealed = demo::run(&mut handle, config.demo_spins, |event| {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Could not serialize event: {}", e),
        }
    })
    .await?;
    info!("Demo finished after {} spins", revealed);

    handle.shutdown().await?;
    Ok(())
}
