use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use rug::Integer;
use timelock_types::Checkpoint;

/// Puzzles are told apart by the low decimal digits of their cipher key.
pub const PUZZLE_TAG_MODULUS: u64 = 1_000_000_000_000;

/// Short, stable tag for the puzzle a cipher key belongs to.
pub fn puzzle_tag(cipher_key: &Integer) -> u64 {
    Integer::from(cipher_key % PUZZLE_TAG_MODULUS).to_u64_wrapping()
}

/// Key of a stored checkpoint: the puzzle tag and the squarings left.
///
/// Ordering puts the most advanced checkpoint of a puzzle first. Puzzles
/// whose cipher keys share a tag also share ids, so a save at the same
/// `remaining` replaces the other puzzle's checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointId {
    pub puzzle: u64,
    pub remaining: u64,
}

impl CheckpointId {
    pub const KEY_LEN: usize = 16;

    pub fn of(checkpoint: &Checkpoint) -> Self {
        CheckpointId {
            puzzle: puzzle_tag(checkpoint.cipher_key()),
            remaining: checkpoint.remaining(),
        }
    }

    /// Big-endian so byte order matches `Ord`.
    pub fn to_key(&self) -> [u8; Self::KEY_LEN] {
        let mut key = [0u8; Self::KEY_LEN];
        key[..8].copy_from_slice(&self.puzzle.to_be_bytes());
        key[8..].copy_from_slice(&self.remaining.to_be_bytes());
        key
    }

    pub fn from_key(key: &[u8]) -> Option<Self> {
        if key.len() != Self::KEY_LEN {
            return None;
        }
        let (puzzle, remaining) = key.split_at(8);
        Some(CheckpointId {
            puzzle: u64::from_be_bytes(puzzle.try_into().ok()?),
            remaining: u64::from_be_bytes(remaining.try_into().ok()?),
        })
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "puzzle_{}-{}", self.puzzle, self.remaining)
    }
}

/// Durable keyed storage for solver snapshots.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, checkpoint: &Checkpoint) -> Result<CheckpointId>;

    fn load(&self, id: &CheckpointId) -> Result<Checkpoint>;

    /// The most advanced checkpoint stored for the puzzle with `cipher_key`.
    fn latest(&self, cipher_key: &Integer) -> Result<Option<Checkpoint>>;
}

/// Checkpoints kept in process memory, encoded exactly as on disk.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: RwLock<BTreeMap<CheckpointId, Vec<u8>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<CheckpointId> {
        self.data
            .read()
            .map(|data| data.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<CheckpointId> {
        let id = CheckpointId::of(checkpoint);
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow!("checkpoint store lock poisoned"))?;
        data.insert(id, checkpoint.to_rlp_bytes());
        Ok(id)
    }

    fn load(&self, id: &CheckpointId) -> Result<Checkpoint> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow!("checkpoint store lock poisoned"))?;
        let bytes = data
            .get(id)
            .ok_or_else(|| anyhow!("checkpoint {} not found", id))?;
        Ok(Checkpoint::from_rlp_bytes(bytes)?)
    }

    fn latest(&self, cipher_key: &Integer) -> Result<Option<Checkpoint>> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow!("checkpoint store lock poisoned"))?;
        let tag = puzzle_tag(cipher_key);
        let range = CheckpointId {
            puzzle: tag,
            remaining: 0,
        }..=CheckpointId {
            puzzle: tag,
            remaining: u64::MAX,
        };
        for bytes in data.range(range).map(|(_, bytes)| bytes) {
            let checkpoint = Checkpoint::from_rlp_bytes(bytes)?;
            // Different puzzles can share a tag
            if checkpoint.cipher_key() == cipher_key {
                return Ok(Some(checkpoint));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(remaining: u64, cipher_key: u64) -> Checkpoint {
        Checkpoint::new(
            Integer::from(1_000_000_000_007u64) * 3u32,
            Integer::from(remaining + 2),
            remaining,
            Integer::from(cipher_key),
        )
        .unwrap()
    }

    #[test]
    fn test_puzzle_tag_low_digits() {
        let key = Integer::from(123_456_789_012_345u64);
        assert_eq!(puzzle_tag(&key), 456_789_012_345);
        assert_eq!(puzzle_tag(&Integer::from(42)), 42);
    }

    #[test]
    fn test_checkpoint_id_key_round_trip_and_order() {
        let a = CheckpointId {
            puzzle: 7,
            remaining: 3000,
        };
        let b = CheckpointId {
            puzzle: 7,
            remaining: 2000,
        };
        assert_eq!(CheckpointId::from_key(&a.to_key()), Some(a));
        assert!(b < a);
        assert!(b.to_key() < a.to_key());
        assert_eq!(CheckpointId::from_key(&[1, 2, 3]), None);
        assert_eq!(a.to_string(), "puzzle_7-3000");
    }

    #[test]
    fn test_memory_store_save_and_load() {
        let store = MemoryCheckpointStore::new();
        let cp = checkpoint(3000, 42);
        let id = store.save(&cp).unwrap();
        assert_eq!(id.remaining, 3000);
        assert_eq!(store.load(&id).unwrap(), cp);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_missing_checkpoint() {
        let store = MemoryCheckpointStore::new();
        let result = store.load(&CheckpointId {
            puzzle: 1,
            remaining: 1,
        });
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_memory_store_latest_prefers_least_remaining() {
        let store = MemoryCheckpointStore::new();
        store.save(&checkpoint(3000, 42)).unwrap();
        store.save(&checkpoint(1000, 42)).unwrap();
        store.save(&checkpoint(2000, 42)).unwrap();
        store.save(&checkpoint(10, 43)).unwrap();

        let latest = store.latest(&Integer::from(42)).unwrap().unwrap();
        assert_eq!(latest.remaining(), 1000);
        assert!(store.latest(&Integer::from(44)).unwrap().is_none());
    }

    #[test]
    fn test_memory_store_latest_skips_tag_collisions() {
        let store = MemoryCheckpointStore::new();
        let colliding = 42 + PUZZLE_TAG_MODULUS;
        store.save(&checkpoint(500, colliding)).unwrap();
        store.save(&checkpoint(900, 42)).unwrap();

        let latest = store.latest(&Integer::from(42)).unwrap().unwrap();
        assert_eq!(latest.remaining(), 900);
    }

    #[test]
    fn test_memory_store_colliding_save_replaces_same_remaining() {
        let store = MemoryCheckpointStore::new();
        let colliding = 42 + PUZZLE_TAG_MODULUS;
        store.save(&checkpoint(2000, 42)).unwrap();
        store.save(&checkpoint(1000, 42)).unwrap();
        let id = store.save(&checkpoint(1000, colliding)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.load(&id).unwrap().cipher_key(), &Integer::from(colliding));
        // The displaced puzzle falls back to its older checkpoint
        let latest = store.latest(&Integer::from(42)).unwrap().unwrap();
        assert_eq!(latest.remaining(), 2000);
    }
}
