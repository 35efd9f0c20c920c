use std::time::Duration;

/// Parameters shared by calibration, generation and solving.
#[derive(Debug, Clone)]
pub struct PuzzleConfig {
    /// Bit length of the modulus N
    pub modulus_bits: u32,
    /// Bit length of the secret key, at most 192 (the AES-192 key)
    pub key_bits: u32,
    /// Squarings timed by `calibrate`
    pub calibration_trials: u32,
    /// Wall-clock work between two checkpoints
    pub checkpoint_period: Duration,
    /// Squarings between two progress reports
    pub progress_interval: u64,
    /// Candidates tried per prime before generation gives up
    pub max_prime_attempts: u32,
}

impl PuzzleConfig {
    pub fn new(
        modulus_bits: u32,
        key_bits: u32,
        calibration_trials: u32,
        checkpoint_period: Duration,
        progress_interval: u64,
        max_prime_attempts: u32,
    ) -> Self {
        Self {
            modulus_bits,
            key_bits,
            calibration_trials,
            checkpoint_period,
            progress_interval,
            max_prime_attempts,
        }
    }

    pub fn get_default() -> Self {
        Self {
            modulus_bits: 2048,
            key_bits: 192,
            calibration_trials: 100,
            checkpoint_period: Duration::from_secs(10 * 60),
            progress_interval: 12345,
            max_prime_attempts: 64,
        }
    }

    /// Same as the default with a 256-bit modulus, small enough for tests.
    pub fn for_testing() -> Self {
        Self {
            modulus_bits: 256,
            ..Self::get_default()
        }
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self::get_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puzzle_config_new() {
        let config = PuzzleConfig::new(512, 128, 10, Duration::from_secs(30), 1000, 8);
        assert_eq!(config.modulus_bits, 512);
        assert_eq!(config.key_bits, 128);
        assert_eq!(config.calibration_trials, 10);
        assert_eq!(config.checkpoint_period, Duration::from_secs(30));
        assert_eq!(config.progress_interval, 1000);
        assert_eq!(config.max_prime_attempts, 8);
    }

    #[test]
    fn test_puzzle_config_default() {
        let config = PuzzleConfig::get_default();
        assert_eq!(config.modulus_bits, 2048);
        assert_eq!(config.key_bits, 192);
        assert_eq!(config.calibration_trials, 100);
        assert_eq!(config.checkpoint_period, Duration::from_secs(600));
        assert_eq!(config.progress_interval, 12345);
    }

    #[test]
    fn test_puzzle_config_for_testing() {
        let config = PuzzleConfig::for_testing();
        assert_eq!(config.modulus_bits, 256);
        assert_eq!(config.key_bits, 192);
    }
}
