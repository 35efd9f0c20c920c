/// Storage for time-lock puzzles, using RocksDB as the underlying database.
///
/// Two column families: solver checkpoints and puzzle artifacts. Checkpoint
/// keys sort by puzzle tag, then by remaining steps, so the most advanced
/// checkpoint of a puzzle is the first one at or after its tag prefix.
use anyhow::Result;
use rocksdb::{DBPinnableSlice, DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};
use rug::Integer;
use std::sync::Arc;
use timelock_puzzle::{CheckpointId, CheckpointStore};
use timelock_types::{Checkpoint, PuzzleArtifact};
use tracing::info;

use crate::Column;
use crate::Config;
use crate::PuzzleRepository;
use crate::StorageError;

/// Item returned by the database iterator.
/// Key and Value are boxed slices.
pub type IteratorItem = Result<(Box<[u8]>, Box<[u8]>)>;
/// Iterator type for database queries.
pub type DbIterator<'a> = Box<dyn Iterator<Item = IteratorItem> + Send + Sync + 'a>;

/// Trait abstracting database read operations.
pub trait DbReader: Send + Sync {
    /// The slice type returned by the backend.
    /// For RocksDB, this is `DBPinnableSlice` (zero-copy).
    /// For Mocks, this can be `Vec<u8>`.
    type Slice<'a>: AsRef<[u8]>
    where
        Self: 'a;

    fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>>;
    /// Entries with keys at or after `key`, in ascending key order.
    fn iter_from<'a>(&'a self, col: Column, key: &[u8]) -> DbIterator<'a>;
}

/// Trait abstracting database write operations.
pub trait DbWriter: Send + Sync {
    fn put(&self, col: Column, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&self, col: Column, key: &[u8]) -> Result<()>;
}

fn missing_column(col: Column) -> StorageError {
    StorageError::Config(format!("Missing column family: {}", col.name()))
}

impl DbReader for DBWithThreadMode<MultiThreaded> {
    type Slice<'a> = DBPinnableSlice<'a>;

    fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>> {
        let handle = self.cf_handle(col.name()).ok_or_else(|| missing_column(col))?;
        self.get_pinned_cf(&handle, key)
            .map_err(|e| StorageError::Database(e).into())
    }

    fn iter_from<'a>(&'a self, col: Column, key: &[u8]) -> DbIterator<'a> {
        match self.cf_handle(col.name()) {
            Some(handle) => {
                let iter = self
                    .iterator_cf(&handle, IteratorMode::From(key, Direction::Forward))
                    .map(|res| res.map_err(|e| StorageError::Database(e).into()));
                Box::new(iter)
            }
            None => Box::new(std::iter::once(Err(missing_column(col).into()))),
        }
    }
}

impl DbWriter for DBWithThreadMode<MultiThreaded> {
    fn put(&self, col: Column, key: &[u8], value: &[u8]) -> Result<()> {
        let handle = self.cf_handle(col.name()).ok_or_else(|| missing_column(col))?;
        self.put_cf(&handle, key, value)
            .map_err(|e| StorageError::Database(e).into())
    }

    fn delete(&self, col: Column, key: &[u8]) -> Result<()> {
        let handle = self.cf_handle(col.name()).ok_or_else(|| missing_column(col))?;
        self.delete_cf(&handle, key)
            .map_err(|e| StorageError::Database(e).into())
    }
}

pub struct Storage {
    puzzles: PuzzleRepository<DBWithThreadMode<MultiThreaded>>,
}

impl Storage {
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.db_path).map_err(StorageError::Io)?;

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(config.create_missing_column_families);
        opts.set_compression_type(config.compression);
        opts.set_max_open_files(config.max_open_files);

        let descriptors = config
            .column_families
            .iter()
            .map(|col| col.descriptor(&opts))
            .collect::<Vec<_>>();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            &config.db_path,
            descriptors,
        )
        .map_err(StorageError::Database)?;
        info!(path = %config.db_path.display(), "opened puzzle storage");

        Ok(Storage {
            puzzles: PuzzleRepository::new(Arc::new(db)),
        })
    }

    pub fn puzzles(&self) -> &PuzzleRepository<DBWithThreadMode<MultiThreaded>> {
        &self.puzzles
    }

    /// Stores an artifact under its puzzle tag and returns the tag.
    pub fn put_artifact(&self, artifact: &PuzzleArtifact) -> Result<u64> {
        self.puzzles.put_artifact(artifact)
    }

    pub fn load_artifact(&self, tag: u64) -> Result<PuzzleArtifact> {
        self.puzzles.artifact(tag)
    }
}

impl CheckpointStore for Storage {
    fn save(&self, checkpoint: &Checkpoint) -> Result<CheckpointId> {
        self.puzzles.save_checkpoint(checkpoint)
    }

    fn load(&self, id: &CheckpointId) -> Result<Checkpoint> {
        self.puzzles.checkpoint(id)
    }

    fn latest(&self, cipher_key: &Integer) -> Result<Option<Checkpoint>> {
        self.puzzles.latest_checkpoint(cipher_key)
    }
}
