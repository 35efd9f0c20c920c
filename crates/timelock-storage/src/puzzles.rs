use anyhow::Result;
use rug::Integer;
use std::sync::Arc;
use timelock_puzzle::{CheckpointId, puzzle_tag};
use timelock_types::{Checkpoint, PuzzleArtifact};
use tracing::debug;

use crate::db::{DbReader, DbWriter};
use crate::{Column, StorageError};

/// Checkpoints and artifacts of every puzzle in one database.
pub struct PuzzleRepository<D: DbReader + DbWriter> {
    db: Arc<D>,
}

impl<D: DbReader + DbWriter> PuzzleRepository<D> {
    pub fn new(db: Arc<D>) -> Self {
        PuzzleRepository { db }
    }

    pub fn put_artifact(&self, artifact: &PuzzleArtifact) -> Result<u64> {
        let tag = puzzle_tag(artifact.descriptor.cipher_key());
        self.db
            .put(Column::Puzzles, &tag.to_be_bytes(), &artifact.to_rlp_bytes())?;
        debug!(puzzle = tag, "stored puzzle artifact");
        Ok(tag)
    }

    pub fn artifact(&self, tag: u64) -> Result<PuzzleArtifact> {
        let value = self
            .db
            .get(Column::Puzzles, &tag.to_be_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("puzzle {}", tag)))?;
        Ok(PuzzleArtifact::from_rlp_bytes(value.as_ref()).map_err(StorageError::Types)?)
    }

    /// Tags of all stored artifacts, ascending.
    pub fn artifact_tags(&self) -> Result<Vec<u64>> {
        self.db
            .iter_from(Column::Puzzles, &[])
            .map(|item| -> Result<u64> {
                let (key, _) = item?;
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    StorageError::Read(format!("puzzle key of {} bytes", key.len()))
                })?;
                Ok(u64::from_be_bytes(bytes))
            })
            .collect()
    }

    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<CheckpointId> {
        let id = CheckpointId::of(checkpoint);
        self.db
            .put(Column::Checkpoints, &id.to_key(), &checkpoint.to_rlp_bytes())?;
        Ok(id)
    }

    pub fn checkpoint(&self, id: &CheckpointId) -> Result<Checkpoint> {
        let value = self
            .db
            .get(Column::Checkpoints, &id.to_key())?
            .ok_or_else(|| StorageError::NotFound(format!("checkpoint {}", id)))?;
        Ok(Checkpoint::from_rlp_bytes(value.as_ref()).map_err(StorageError::Types)?)
    }

    /// Ids of the checkpoints stored under `tag`, most advanced first.
    pub fn checkpoint_ids(&self, tag: u64) -> Result<Vec<CheckpointId>> {
        let mut ids = Vec::new();
        for item in self.db.iter_from(Column::Checkpoints, &tag.to_be_bytes()) {
            let (key, _) = item?;
            let id = CheckpointId::from_key(&key).ok_or_else(|| {
                StorageError::Read(format!("checkpoint key of {} bytes", key.len()))
            })?;
            if id.puzzle != tag {
                break;
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// The stored checkpoint with the fewest remaining steps for the puzzle
    /// with `cipher_key`.
    pub fn latest_checkpoint(&self, cipher_key: &Integer) -> Result<Option<Checkpoint>> {
        let tag = puzzle_tag(cipher_key);
        for item in self.db.iter_from(Column::Checkpoints, &tag.to_be_bytes()) {
            let (key, value) = item?;
            match CheckpointId::from_key(&key) {
                Some(id) if id.puzzle == tag => {}
                _ => break,
            }
            let checkpoint = Checkpoint::from_rlp_bytes(&value).map_err(StorageError::Types)?;
            // Different puzzles can share a tag
            if checkpoint.cipher_key() == cipher_key {
                return Ok(Some(checkpoint));
            }
        }
        Ok(None)
    }

    /// Deletes every checkpoint of the puzzle with `cipher_key`. Returns how
    /// many were removed.
    pub fn remove_checkpoints(&self, cipher_key: &Integer) -> Result<usize> {
        let tag = puzzle_tag(cipher_key);
        let mut doomed = Vec::new();
        for item in self.db.iter_from(Column::Checkpoints, &tag.to_be_bytes()) {
            let (key, value) = item?;
            match CheckpointId::from_key(&key) {
                Some(id) if id.puzzle == tag => {}
                _ => break,
            }
            let checkpoint = Checkpoint::from_rlp_bytes(&value).map_err(StorageError::Types)?;
            if checkpoint.cipher_key() == cipher_key {
                doomed.push(key);
            }
        }
        for key in &doomed {
            self.db.delete(Column::Checkpoints, key)?;
        }
        debug!(puzzle = tag, removed = doomed.len(), "removed checkpoints");
        Ok(doomed.len())
    }
}
