use anyhow::Result;
use std::path::PathBuf;

use crate::StorageError;

/// Configuration for the database connection.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,

    pub create_if_missing: bool,
    pub create_missing_column_families: bool,
    pub compression: rocksdb::DBCompressionType,
    pub max_open_files: i32,

    pub column_families: Vec<Column>,
}

impl Config {
    /// Creates a storage configuration rooted at `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Config {
            db_path: base_path.join("db"),
            create_if_missing: true,
            create_missing_column_families: true,
            compression: rocksdb::DBCompressionType::Lz4,
            max_open_files: 64,
            column_families: Column::all().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Solver snapshots keyed by `CheckpointId::to_key`
    Checkpoints,
    /// Encoded `PuzzleArtifact`s keyed by big-endian puzzle tag
    Puzzles,
}

impl Column {
    /// Returns the column family name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Checkpoints => "checkpoints",
            Column::Puzzles => "puzzles",
        }
    }

    /// Returns all columns in order.
    pub fn all() -> &'static [Column] {
        &[Column::Checkpoints, Column::Puzzles]
    }

    /// Parses a column from its name. Errors if the name matches no known column.
    pub fn from_name(name: &str) -> Result<Column> {
        match name {
            "checkpoints" => Ok(Column::Checkpoints),
            "puzzles" => Ok(Column::Puzzles),
            _ => Err(StorageError::Config(format!("Unknown column name: {}", name)).into()),
        }
    }

    /// Creates a ColumnFamilyDescriptor for this column.
    ///
    /// Keys are big-endian, so the default bytewise comparator already sorts
    /// them numerically.
    pub fn descriptor(&self, opts: &rocksdb::Options) -> rocksdb::ColumnFamilyDescriptor {
        rocksdb::ColumnFamilyDescriptor::new(self.name(), opts.clone())
    }
}
