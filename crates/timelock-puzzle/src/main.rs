use anyhow::Result;
use timelock_puzzle::{PuzzleConfig, calibrate};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = PuzzleConfig::get_default();
    let calibration = calibrate(&config)?;

    println!(
        "{} {}-bit modular squarings per second",
        calibration.squarings_per_second(),
        config.modulus_bits
    );
    Ok(())
}
