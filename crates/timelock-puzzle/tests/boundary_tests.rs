use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rug::Integer;
use timelock_puzzle::{
    CancellationToken, Checkpoint, PayloadCipher, PuzzleArtifact, PuzzleConfig, PuzzleDescriptor,
    PuzzleError, PuzzleGenerator, PuzzleSolver, SealScheme, SealedPayload, SecretKey,
    SolveSchedule, TimeUnit, eta,
};

/// Boundary conditions for puzzle generation
#[cfg(test)]
mod generation_boundary_tests {
    use super::*;

    #[test]
    fn test_single_step_puzzle() {
        let config = PuzzleConfig::for_testing();
        let (key, descriptor) = PuzzleGenerator::new(&config)
            .generate_with_rng(1, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();

        // With t = 1 the mask is just a^2 mod N
        let mut masked = Integer::from(descriptor.base().square_ref());
        masked %= descriptor.modulus();
        masked += key.value();
        masked %= descriptor.modulus();
        assert_eq!(&masked, descriptor.cipher_key());
    }

    #[test]
    fn test_huge_step_count_generates_instantly() {
        // The totient shortcut keeps generation cheap whatever t is
        let config = PuzzleConfig::for_testing();
        let (_, descriptor) = PuzzleGenerator::new(&config)
            .generate_with_rng(u64::MAX, &mut ChaCha8Rng::seed_from_u64(2))
            .unwrap();
        assert_eq!(descriptor.steps(), u64::MAX);
    }

    #[test]
    fn test_smallest_accepted_modulus() {
        let config = PuzzleConfig {
            modulus_bits: 16,
            key_bits: 8,
            ..PuzzleConfig::for_testing()
        };
        let (key, descriptor) = PuzzleGenerator::new(&config)
            .generate_with_rng(50, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert!(descriptor.modulus().significant_bits() >= 15);

        let recovered = PuzzleSolver::new(&descriptor, SolveSchedule::default())
            .solve(None, &CancellationToken::new())
            .unwrap();
        assert_eq!(recovered, key);
    }

    #[test]
    fn test_zero_key_bits_rejected() {
        let config = PuzzleConfig {
            key_bits: 0,
            ..PuzzleConfig::for_testing()
        };
        let result = PuzzleGenerator::new(&config).generate(10);
        assert!(matches!(result, Err(PuzzleError::Generation(_))));
    }
}

/// Boundary conditions for descriptors and their encoding
#[cfg(test)]
mod descriptor_boundary_tests {
    use super::*;

    #[test]
    fn test_modulus_of_one_rejected() {
        let result = PuzzleDescriptor::new(Integer::from(1), Integer::ZERO, 1, Integer::ZERO);
        assert!(result.is_err());
        let result = PuzzleDescriptor::new(Integer::from(-7), Integer::ZERO, 1, Integer::ZERO);
        assert!(result.is_err());
    }

    #[test]
    fn test_residues_must_be_below_modulus() {
        let n = Integer::from(3233);
        assert!(PuzzleDescriptor::new(n.clone(), Integer::from(3233), 1, Integer::ZERO).is_err());
        assert!(PuzzleDescriptor::new(n.clone(), Integer::ZERO, 1, Integer::from(-1)).is_err());
        assert!(PuzzleDescriptor::new(n, Integer::from(3232), 1, Integer::from(3232)).is_ok());
    }

    #[test]
    fn test_zero_steps_descriptor_rejected() {
        let result = PuzzleDescriptor::new(Integer::from(3233), Integer::from(5), 0, Integer::ZERO);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_and_truncated_records_rejected() {
        let descriptor =
            PuzzleDescriptor::new(Integer::from(3233), Integer::from(5), 10, Integer::from(7))
                .unwrap();
        let bytes = PuzzleArtifact::new(descriptor, None).to_rlp_bytes();

        assert!(PuzzleArtifact::from_rlp_bytes(&[]).is_err());
        assert!(PuzzleArtifact::from_rlp_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut trailing = bytes;
        trailing.push(0x00);
        assert!(PuzzleArtifact::from_rlp_bytes(&trailing).is_err());
    }

    #[test]
    fn test_solving_rejects_checkpoint_beyond_steps() {
        let descriptor =
            PuzzleDescriptor::new(Integer::from(3233), Integer::from(5), 10, Integer::from(7))
                .unwrap();
        let too_far =
            Checkpoint::new(Integer::from(3233), Integer::from(5), 11, Integer::from(7)).unwrap();
        let result = PuzzleSolver::new(&descriptor, SolveSchedule::default())
            .solve(Some(&too_far), &CancellationToken::new());
        assert!(matches!(result, Err(PuzzleError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_finished_checkpoint_returns_key_immediately() {
        let descriptor =
            PuzzleDescriptor::new(Integer::from(3233), Integer::from(5), 10, Integer::from(7))
                .unwrap();
        let done =
            Checkpoint::new(Integer::from(3233), Integer::from(2), 0, Integer::from(7)).unwrap();
        let key = PuzzleSolver::new(&descriptor, SolveSchedule::default())
            .solve(Some(&done), &CancellationToken::new())
            .unwrap();
        assert_eq!(key.value(), &Integer::from(5));
    }
}

/// Boundary conditions for sealing
#[cfg(test)]
mod cipher_boundary_tests {
    use super::*;

    #[test]
    fn test_empty_payload() {
        let key = SecretKey::new(Integer::from(99));
        for scheme in [SealScheme::Legacy, SealScheme::Authenticated] {
            let cipher = PayloadCipher::new(scheme);
            let sealed = cipher.seal(&[], &key).unwrap();
            assert!(!sealed.bytes.is_empty());
            assert!(cipher.unseal(&sealed, &key).unwrap().is_empty());
        }
    }

    #[test]
    fn test_largest_192_bit_key() {
        let key = SecretKey::new((Integer::from(1) << 192) - 1u32);
        let cipher = PayloadCipher::default();
        let sealed = cipher.seal(b"max key", &key).unwrap();
        assert_eq!(cipher.unseal(&sealed, &key).unwrap(), b"max key");
    }

    #[test]
    fn test_block_aligned_payloads() {
        let key = SecretKey::new(Integer::from(0xdead_beefu32));
        for blocks in 1..=4 {
            let payload = vec![0x10u8; 16 * blocks];
            let sealed = PayloadCipher::legacy().seal(&payload, &key).unwrap();
            assert_eq!(sealed.bytes.len(), 16 * (blocks + 1));
            assert_eq!(PayloadCipher::legacy().unseal(&sealed, &key).unwrap(), payload);
        }
    }

    #[test]
    fn test_unknown_length_legacy_ciphertext() {
        let key = SecretKey::new(Integer::from(1));
        let sealed = SealedPayload {
            scheme: SealScheme::Legacy,
            bytes: vec![0u8; 31],
        };
        assert!(matches!(
            PayloadCipher::legacy().unseal(&sealed, &key),
            Err(PuzzleError::Format(_))
        ));
    }
}

/// Boundary conditions for ETA bucketing
#[cfg(test)]
mod eta_boundary_tests {
    use super::*;

    #[test]
    fn test_zero_remaining() {
        assert_eq!(eta(0, 1000.0).to_string(), "0 seconds");
    }

    #[test]
    fn test_unit_thresholds() {
        let cases = [
            (99, TimeUnit::Seconds),
            (100, TimeUnit::Minutes),
            (5_999, TimeUnit::Minutes),
            (6_000, TimeUnit::Hours),
            (359_999, TimeUnit::Hours),
            (360_000, TimeUnit::Days),
            (5_183_999, TimeUnit::Days),
            (5_184_000, TimeUnit::Months),
            (53_567_999, TimeUnit::Months),
            (53_568_000, TimeUnit::Years),
        ];
        for (seconds, unit) in cases {
            assert_eq!(eta(seconds, 1.0).unit(), Some(unit), "at {} seconds", seconds);
        }
    }

    #[test]
    fn test_extreme_values() {
        assert!(eta(u64::MAX, 1.0).is_known());
        assert_eq!(eta(u64::MAX, 1.0).unit(), Some(TimeUnit::Years));
        assert!(!eta(1, f64::INFINITY).is_known());
    }
}
