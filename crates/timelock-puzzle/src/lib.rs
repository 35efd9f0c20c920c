//! Rivest-Shamir-Wagner time-lock puzzles.
//!
//! A puzzle seals a secret key behind `t` sequential modular squarings. The
//! generator knows the factorization of `N` and takes a shortcut through the
//! totient; a solver has no such shortcut and must square `t` times. That no
//! faster method exists without factoring `N` is a standing assumption of the
//! scheme, not something this crate proves.
//!
//! Typical flow: [`calibrate`] the host, turn a wall-clock target into steps,
//! [`PuzzleGenerator::generate`] a puzzle, [`PayloadCipher::seal`] a payload
//! under the secret key, persist the [`PuzzleArtifact`]. Later,
//! [`PuzzleSolver::solve`] recovers the key (resuming from a [`Checkpoint`]
//! when one exists) and [`PayloadCipher::unseal`] restores the payload.
pub mod calibrate;
pub mod checkpoint;
pub mod cipher;
pub mod config;
pub mod error;
pub mod eta;
pub mod prime;
pub mod puzzle;
pub mod solver;

pub use calibrate::{Calibration, calibrate};
pub use checkpoint::{CheckpointId, CheckpointStore, MemoryCheckpointStore, puzzle_tag};
pub use cipher::PayloadCipher;
pub use config::PuzzleConfig;
pub use error::PuzzleError;
pub use eta::{Eta, TimeUnit, eta};
pub use puzzle::{PuzzleGenerator, SecretKey};
pub use solver::{CancellationToken, Progress, PuzzleSolver, SolveSchedule};
pub use timelock_types::{Checkpoint, PuzzleArtifact, PuzzleDescriptor, SealScheme, SealedPayload};
