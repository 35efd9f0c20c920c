use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rug::Integer;
use timelock_types::{Checkpoint, PuzzleDescriptor};
use tracing::{debug, info, warn};

use crate::calibrate::Calibration;
use crate::checkpoint::CheckpointStore;
use crate::eta::{Eta, eta};
use crate::puzzle::SecretKey;
use crate::{PuzzleConfig, PuzzleError};

/// Squarings between two cancellation checks.
pub const DEFAULT_CHECK_INTERVAL: u64 = 10_000;

/// Helper for in-place modular squaring
#[inline]
pub(crate) fn square_mod(value: &mut Integer, modulus: &Integer) {
    value.square_mut();
    *value %= modulus;
}

/// When the solver stops to persist or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveSchedule {
    /// Squarings between checkpoints, 0 disables checkpointing
    pub checkpoint_interval: u64,
    /// Squarings between progress reports, 0 disables reporting
    pub progress_interval: u64,
    /// Squarings between cancellation checks
    pub check_interval: u64,
}

impl SolveSchedule {
    pub fn new(checkpoint_interval: u64, progress_interval: u64) -> Self {
        SolveSchedule {
            checkpoint_interval,
            progress_interval,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Checkpoints every `config.checkpoint_period` of calibrated work.
    pub fn from_calibration(calibration: &Calibration, config: &PuzzleConfig) -> Self {
        Self::new(
            calibration.checkpoint_interval(config.checkpoint_period),
            config.progress_interval,
        )
    }
}

impl Default for SolveSchedule {
    fn default() -> Self {
        Self::new(0, PuzzleConfig::get_default().progress_interval)
    }
}

/// Snapshot of solver progress handed to observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Squarings done since this solve started
    pub completed: u64,
    pub remaining: u64,
    pub squarings_per_second: f64,
}

impl Progress {
    pub fn eta(&self) -> Eta {
        eta(self.remaining, self.squarings_per_second)
    }
}

/// Squarings counted since the solve started, for throughput sampling.
struct ProgressMeter {
    started: Instant,
    completed: u64,
}

impl ProgressMeter {
    fn new() -> Self {
        ProgressMeter {
            started: Instant::now(),
            completed: 0,
        }
    }

    fn sample(&self, remaining: u64) -> Progress {
        let elapsed = self.started.elapsed().as_secs_f64();
        let squarings_per_second = if elapsed > 0.0 {
            self.completed as f64 / elapsed
        } else {
            0.0
        };
        Progress {
            completed: self.completed,
            remaining,
            squarings_per_second,
        }
    }
}

/// Recovers the secret key of a puzzle by sequential squaring.
///
/// The squaring loop is the delay itself and runs on the calling thread.
/// Nothing here may be parallelized.
pub struct PuzzleSolver<'a> {
    descriptor: &'a PuzzleDescriptor,
    schedule: SolveSchedule,
    store: Option<&'a dyn CheckpointStore>,
    observer: Option<&'a dyn Fn(&Progress)>,
}

impl<'a> PuzzleSolver<'a> {
    pub fn new(descriptor: &'a PuzzleDescriptor, schedule: SolveSchedule) -> Self {
        PuzzleSolver {
            descriptor,
            schedule,
            store: None,
            observer: None,
        }
    }

    /// Persists a checkpoint through `store` every `checkpoint_interval` squarings.
    pub fn with_store(mut self, store: &'a dyn CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Calls `observer` every `progress_interval` squarings.
    pub fn with_observer(mut self, observer: &'a dyn Fn(&Progress)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Solves the puzzle, starting from `resume` when given.
    ///
    /// 1. acc = resume.accumulator or a, n = resume.remaining or t
    /// 2. Repeat acc = acc^2 mod N until n = 0, checkpointing along the way
    /// 3. key = (cipher_key - acc) mod N
    ///
    /// On cancellation the current snapshot is saved (when a store is set)
    /// and returned inside [`PuzzleError::Cancelled`], whether or not the
    /// save succeeded.
    pub fn solve(
        &self,
        resume: Option<&Checkpoint>,
        cancelled: &CancellationToken,
    ) -> Result<SecretKey, PuzzleError> {
        let mut state = match resume {
            Some(checkpoint) => {
                self.check_belongs(checkpoint)?;
                checkpoint.clone()
            }
            None => Checkpoint::start_of(self.descriptor),
        };

        info!(
            steps = self.descriptor.steps(),
            remaining = state.remaining(),
            "solving puzzle"
        );

        let interval = match self.schedule.checkpoint_interval {
            0 => u64::MAX,
            n => n,
        };
        let mut meter = ProgressMeter::new();

        while !state.is_complete() {
            state = self.run(&state, interval, cancelled, &mut meter);
            if state.is_complete() {
                break;
            }
            if cancelled.is_cancelled() {
                self.emit(&state);
                warn!(remaining = state.remaining(), "solve cancelled");
                return Err(PuzzleError::Cancelled(Box::new(state)));
            }
            if self.schedule.checkpoint_interval > 0 {
                self.emit(&state);
            }
        }

        info!(squarings = meter.completed, "puzzle solved");
        Ok(recover_key(&state))
    }

    /// Performs at most `max_steps` squarings from `from` and returns the new
    /// snapshot. Stores nothing; stops early only when `cancelled` is set.
    pub fn advance(
        &self,
        from: &Checkpoint,
        max_steps: u64,
        cancelled: &CancellationToken,
    ) -> Result<Checkpoint, PuzzleError> {
        self.check_belongs(from)?;
        let mut meter = ProgressMeter::new();
        Ok(self.run(from, max_steps, cancelled, &mut meter))
    }

    fn run(
        &self,
        from: &Checkpoint,
        max_steps: u64,
        cancelled: &CancellationToken,
        meter: &mut ProgressMeter,
    ) -> Checkpoint {
        let modulus = from.modulus();
        let steps = max_steps.min(from.remaining());
        let check_interval = self.schedule.check_interval.max(1);
        let progress_interval = self.schedule.progress_interval;

        let mut acc = from.accumulator().clone();
        let mut done = 0u64;

        while done < steps {
            if done % check_interval == 0 && cancelled.is_cancelled() {
                break;
            }

            square_mod(&mut acc, modulus);
            done += 1;
            meter.completed += 1;

            if progress_interval > 0 && meter.completed % progress_interval == 0 {
                self.report(&meter.sample(from.remaining() - done));
            }
        }

        from.with_progress(acc, from.remaining() - done)
    }

    fn report(&self, progress: &Progress) {
        debug!(
            squarings_per_second = progress.squarings_per_second,
            remaining = progress.remaining,
            eta = %progress.eta(),
            "solve progress"
        );
        if let Some(observer) = self.observer {
            observer(progress);
        }
    }

    /// Saves `state` when a store is set. A failed save keeps the solve
    /// going; the caller still holds `state`.
    fn emit(&self, state: &Checkpoint) {
        let Some(store) = self.store else {
            return;
        };
        match store.save(state) {
            Ok(id) => {
                info!(checkpoint = %id, remaining = state.remaining(), "saved checkpoint")
            }
            Err(e) => {
                warn!(error = %e, remaining = state.remaining(), "failed to save checkpoint")
            }
        }
    }

    fn check_belongs(&self, checkpoint: &Checkpoint) -> Result<(), PuzzleError> {
        if !checkpoint.belongs_to(self.descriptor) {
            return Err(PuzzleError::InvalidDescriptor(
                "checkpoint does not belong to this puzzle".to_string(),
            ));
        }
        Ok(())
    }
}

/// key = (cipher_key - acc) mod N, normalized into [0, N).
fn recover_key(state: &Checkpoint) -> SecretKey {
    let modulus = state.modulus();
    let mut key = Integer::from(state.cipher_key() - state.accumulator());
    key %= modulus;
    if key < 0 {
        key += modulus;
    }
    SecretKey::new(key)
}

/// Shared flag for stopping a solve from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation to any listening operations
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Checks if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
