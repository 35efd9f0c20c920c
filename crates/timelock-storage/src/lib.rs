//! Durable storage for time-lock puzzles: solver checkpoints and sealed
//! puzzle artifacts in RocksDB.
mod config;
mod db;
mod error;
mod puzzles;

pub use config::Column;
pub use config::Config;
pub use db::{DbIterator, DbReader, DbWriter, IteratorItem, Storage};
pub use error::StorageError;
pub use puzzles::PuzzleRepository;
