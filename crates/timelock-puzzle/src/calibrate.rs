use std::time::{Duration, Instant};

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rug::Integer;
use tracing::info;

use crate::eta::{Eta, eta};
use crate::solver::square_mod;
use crate::{PuzzleConfig, PuzzleError, prime};

/// Measured squaring throughput of this host.
///
/// Only meaningful for the machine and process conditions it was measured
/// under. A puzzle's advertised solve time is an estimate against the
/// generating host, not a promise for the solving one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    squarings_per_second: u64,
}

impl Calibration {
    pub fn new(squarings_per_second: u64) -> Result<Self, PuzzleError> {
        if squarings_per_second == 0 {
            return Err(PuzzleError::Calibration(
                "throughput must be positive".to_string(),
            ));
        }
        Ok(Calibration {
            squarings_per_second,
        })
    }

    pub fn squarings_per_second(&self) -> u64 {
        self.squarings_per_second
    }

    /// Squarings this host performs in `duration`.
    pub fn steps_for(&self, duration: Duration) -> u64 {
        let steps = self.squarings_per_second as u128 * duration.as_millis() / 1000;
        u64::try_from(steps).unwrap_or(u64::MAX)
    }

    /// Squarings between checkpoints for a wall-clock `period`, at least one.
    pub fn checkpoint_interval(&self, period: Duration) -> u64 {
        self.steps_for(period).max(1)
    }

    /// Expected time for this host to perform `steps` squarings.
    pub fn estimate(&self, steps: u64) -> Eta {
        eta(steps, self.squarings_per_second as f64)
    }
}

/// Measures modular squaring throughput at the configured modulus size.
pub fn calibrate(config: &PuzzleConfig) -> Result<Calibration, PuzzleError> {
    calibrate_with_rng(config, &mut OsRng)
}

pub fn calibrate_with_rng<R: RngCore + CryptoRng>(
    config: &PuzzleConfig,
    rng: &mut R,
) -> Result<Calibration, PuzzleError> {
    let trials = config.calibration_trials;
    if trials == 0 {
        return Err(PuzzleError::Calibration(
            "at least one trial is required".to_string(),
        ));
    }

    // A fresh modulus of the real size, so the timing matches solve conditions
    let p_bits = config.modulus_bits / 2;
    let (p, q) = prime::random_prime_pair(
        p_bits,
        config.modulus_bits - p_bits,
        rng,
        config.max_prime_attempts,
    )
    .map_err(|e| PuzzleError::Calibration(e.to_string()))?;
    let modulus = Integer::from(&p * &q);
    let mut value = prime::random_below(&modulus, rng);

    let start = Instant::now();
    for _ in 0..trials {
        square_mod(&mut value, &modulus);
    }
    let elapsed = start.elapsed().as_secs_f64();

    if elapsed <= 0.0 {
        return Err(PuzzleError::Calibration(
            "elapsed time below clock resolution".to_string(),
        ));
    }
    let speed = (trials as f64 / elapsed) as u64;
    let calibration = Calibration::new(speed)?;

    info!(
        squarings_per_second = speed,
        modulus_bits = config.modulus_bits,
        "calibrated squaring speed"
    );
    Ok(calibration)
}
