//! Random integers and primes for puzzle construction.
//!
//! All randomness comes from a caller supplied cryptographic RNG so the moduli
//! cannot be predicted from process state.
use rand::{CryptoRng, RngCore};
use rug::Integer;
use rug::integer::{IsPrime, Order};

use crate::PuzzleError;

const MAX_MILLER_RABIN: u32 = 30;

/// Smallest prime size accepted, so both top bits can be forced.
pub const MIN_PRIME_BITS: u32 = 8;

/// Uniform integer in `[0, 2^bits)`.
pub fn random_bits<R: RngCore + CryptoRng>(bits: u32, rng: &mut R) -> Integer {
    let mut bytes = vec![0u8; bits.div_ceil(8) as usize];
    rng.fill_bytes(&mut bytes);
    let mut value = Integer::from_digits(&bytes, Order::MsfBe);
    value.keep_bits_mut(bits);
    value
}

/// Uniform integer in `[0, bound)` by rejection sampling. `bound` must be positive.
pub fn random_below<R: RngCore + CryptoRng>(bound: &Integer, rng: &mut R) -> Integer {
    debug_assert!(*bound > 0);
    let bits = bound.significant_bits();
    loop {
        let candidate = random_bits(bits, rng);
        if candidate < *bound {
            return candidate;
        }
    }
}

/// Random prime of exactly `bits` bits with the two top bits set, so the
/// product of two such primes has exactly the sum of their lengths.
pub fn random_prime<R: RngCore + CryptoRng>(
    bits: u32,
    rng: &mut R,
    max_attempts: u32,
) -> Result<Integer, PuzzleError> {
    if bits < MIN_PRIME_BITS {
        return Err(PuzzleError::Generation(format!(
            "prime size of {} bits is below the minimum of {}",
            bits, MIN_PRIME_BITS
        )));
    }

    for _ in 0..max_attempts {
        let mut candidate = random_bits(bits, rng);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(bits - 2, true);
        candidate.set_bit(0, true);
        candidate.next_prime_mut();

        // next_prime can carry past the requested size near 2^bits
        if candidate.significant_bits() != bits {
            continue;
        }
        if candidate.is_probably_prime(MAX_MILLER_RABIN) != IsPrime::No {
            return Ok(candidate);
        }
    }

    Err(PuzzleError::Generation(format!(
        "Prime not found within {} attempts for bits={}",
        max_attempts, bits
    )))
}

/// Two distinct random primes of `p_bits` and `q_bits` bits.
pub fn random_prime_pair<R: RngCore + CryptoRng>(
    p_bits: u32,
    q_bits: u32,
    rng: &mut R,
    max_attempts: u32,
) -> Result<(Integer, Integer), PuzzleError> {
    let p = random_prime(p_bits, rng, max_attempts)?;
    for _ in 0..max_attempts {
        let q = random_prime(q_bits, rng, max_attempts)?;
        if q != p {
            return Ok((p, q));
        }
    }

    Err(PuzzleError::Generation(format!(
        "No distinct prime pair found within {} attempts",
        max_attempts
    )))
}
