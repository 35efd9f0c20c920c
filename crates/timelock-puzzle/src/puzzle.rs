use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rug::Integer;
use timelock_types::PuzzleDescriptor;
use tracing::debug;

use crate::cipher::KEY_SIZE;
use crate::{PuzzleConfig, PuzzleError, prime};

/// Smallest modulus accepted by the generator.
pub const MIN_MODULUS_BITS: u32 = 2 * prime::MIN_PRIME_BITS;

/// Key sealed inside a puzzle.
///
/// Only the generator and a successful solver ever hold one. `Debug` output
/// is redacted so keys do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Integer);

impl SecretKey {
    pub fn new(value: Integer) -> Self {
        SecretKey(value)
    }

    pub fn value(&self) -> &Integer {
        &self.0
    }

}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({} bits)", self.0.significant_bits())
    }
}

// Rivest-Shamir-Wagner puzzle generator
pub struct PuzzleGenerator<'a> {
    config: &'a PuzzleConfig,
}

impl<'a> PuzzleGenerator<'a> {
    pub fn new(config: &'a PuzzleConfig) -> Self {
        PuzzleGenerator { config }
    }

    /// Creates a puzzle that takes `steps` sequential squarings to open.
    pub fn generate(&self, steps: u64) -> Result<(SecretKey, PuzzleDescriptor), PuzzleError> {
        self.generate_with_rng(steps, &mut OsRng)
    }

    /// Creates a puzzle from the given RNG.
    ///
    /// 1. Sample primes p, q and set N = p * q, phi = (p - 1)(q - 1)
    /// 2. Sample the secret key k in [0, 2^key_bits) and the base a in [0, N)
    /// 3. Compute e = 2^t mod phi, then b = a^e mod N
    /// 4. Publish cipher_key = (k + b) mod N
    ///
    /// p, q, phi, e and b never leave this function.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        &self,
        steps: u64,
        rng: &mut R,
    ) -> Result<(SecretKey, PuzzleDescriptor), PuzzleError> {
        if steps == 0 {
            return Err(PuzzleError::InvalidDescriptor(
                "steps must be positive".to_string(),
            ));
        }
        self.check_config()?;

        let modulus_bits = self.config.modulus_bits;
        let p_bits = modulus_bits / 2;
        let q_bits = modulus_bits - p_bits;

        let (modulus, base, secret, cipher_key) = {
            let (p, q) =
                prime::random_prime_pair(p_bits, q_bits, rng, self.config.max_prime_attempts)?;
            let modulus = Integer::from(&p * &q);
            let totient = Integer::from(&p - 1u32) * Integer::from(&q - 1u32);

            let secret = prime::random_bits(self.config.key_bits, rng);
            let base = prime::random_below(&modulus, rng);

            // The shortcut: reduce the exponent 2^t modulo phi(N)
            let e = Integer::from(2)
                .pow_mod(&Integer::from(steps), &totient)
                .map_err(|_| PuzzleError::Generation("exponent reduction failed".to_string()))?;
            let b = Integer::from(&base)
                .pow_mod(&e, &modulus)
                .map_err(|_| PuzzleError::Generation("base exponentiation failed".to_string()))?;

            let mut cipher_key = Integer::from(&secret + &b);
            cipher_key %= &modulus;

            (modulus, base, secret, cipher_key)
        };

        debug!(modulus_bits, steps, "generated puzzle");

        let descriptor = PuzzleDescriptor::new(modulus, base, steps, cipher_key)?;
        Ok((SecretKey(secret), descriptor))
    }

    fn check_config(&self) -> Result<(), PuzzleError> {
        let config = self.config;
        if config.key_bits == 0 {
            return Err(PuzzleError::Generation(
                "key size must be positive".to_string(),
            ));
        }
        if config.key_bits as usize > 8 * KEY_SIZE {
            return Err(PuzzleError::Generation(format!(
                "key of {} bits does not fit the {}-bit payload cipher",
                config.key_bits,
                8 * KEY_SIZE
            )));
        }
        if config.modulus_bits < MIN_MODULUS_BITS {
            return Err(PuzzleError::Generation(format!(
                "modulus size of {} bits is below the minimum of {}",
                config.modulus_bits, MIN_MODULUS_BITS
            )));
        }
        // The key is recovered modulo N, so N must exceed every possible key
        if config.modulus_bits <= config.key_bits + 1 {
            return Err(PuzzleError::Generation(format!(
                "modulus of {} bits cannot hold a {}-bit key",
                config.modulus_bits, config.key_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PayloadCipher;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_puzzle_generation() {
        let config = PuzzleConfig::for_testing();
        let generator = PuzzleGenerator::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let (key, descriptor) = generator.generate_with_rng(1000, &mut rng).unwrap();

        assert_eq!(descriptor.steps(), 1000);
        assert_eq!(descriptor.modulus().significant_bits(), 256);
        assert!(descriptor.base() < descriptor.modulus());
        assert!(descriptor.cipher_key() < descriptor.modulus());
        assert!(key.value().significant_bits() <= 192);
    }

    #[test]
    fn test_cipher_key_matches_slow_path() {
        // Squaring t times by hand must reach the same b the shortcut produced
        let config = PuzzleConfig::for_testing();
        let generator = PuzzleGenerator::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (key, descriptor) = generator.generate_with_rng(64, &mut rng).unwrap();

        let mut b = descriptor.base().clone();
        for _ in 0..64 {
            b.square_mut();
            b %= descriptor.modulus();
        }
        let mut expected = Integer::from(key.value() + &b);
        expected %= descriptor.modulus();
        assert_eq!(descriptor.cipher_key(), &expected);
    }

    #[test]
    fn test_generation_deterministic_for_seed() {
        let config = PuzzleConfig::for_testing();
        let generator = PuzzleGenerator::new(&config);

        let (key1, d1) = generator
            .generate_with_rng(10, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        let (key2, d2) = generator
            .generate_with_rng(10, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        assert_eq!(key1, key2);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = PuzzleConfig::for_testing();
        let result = PuzzleGenerator::new(&config).generate(0);
        assert!(matches!(result, Err(PuzzleError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_modulus_must_exceed_key() {
        let config = PuzzleConfig {
            modulus_bits: 192,
            ..PuzzleConfig::for_testing()
        };
        let result = PuzzleGenerator::new(&config).generate(10);
        assert!(matches!(result, Err(PuzzleError::Generation(_))));
    }

    #[test]
    fn test_key_wider_than_cipher_rejected() {
        let config = PuzzleConfig {
            modulus_bits: 512,
            key_bits: 256,
            ..PuzzleConfig::for_testing()
        };
        let result = PuzzleGenerator::new(&config).generate(10);
        assert!(matches!(result, Err(PuzzleError::Generation(_))));
    }

    #[test]
    fn test_every_accepted_key_size_seals() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for key_bits in [8u32, 128, 191, 192] {
            let config = PuzzleConfig {
                key_bits,
                ..PuzzleConfig::for_testing()
            };
            let (key, _) = PuzzleGenerator::new(&config)
                .generate_with_rng(20, &mut rng)
                .unwrap();
            let cipher = PayloadCipher::default();
            let sealed = cipher.seal_with_rng(b"payload", &key, &mut rng).unwrap();
            assert_eq!(cipher.unseal(&sealed, &key).unwrap(), b"payload");
        }
    }

    #[test]
    fn test_tiny_modulus_rejected() {
        let config = PuzzleConfig {
            modulus_bits: 8,
            key_bits: 4,
            ..PuzzleConfig::for_testing()
        };
        let result = PuzzleGenerator::new(&config).generate(10);
        assert!(matches!(result, Err(PuzzleError::Generation(_))));
    }

    #[test]
    fn test_secret_key_debug_is_redacted() {
        let key = SecretKey::new(Integer::from(0x1234_5678u32));
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("305419896"));
        assert!(rendered.contains("bits"));
    }
}
