//! # In-memory storage
//!
//! [`Database`] implementation that keeps blocks, the compaction-chain tip and
//! DKG private keys in memory. With persistence enabled, blocks are loaded from
//! a JSON snapshot on open and written back on [`close`](MemoryDatabase::close).

use meridian_core::{Database, StorageError};
use meridian_types::{Block, BlsSecretKey, Hash};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Default)]
struct BlockStore {
    /// Hashes in insertion order.
    sequence: Vec<Hash>,
    blocks: HashMap<Hash, Block>,
}

/// On-disk form of the block store.
#[derive(Serialize, Deserialize)]
struct BlockSnapshot {
    sequence: Vec<Hash>,
    blocks: Vec<Block>,
}

/// In-memory storage for tests and single-process deployments.
///
/// All operations are synchronous. Locks are held only for the map access,
/// never across I/O.
pub struct MemoryDatabase {
    blocks: RwLock<BlockStore>,
    compaction_tip: RwLock<(Hash, u64)>,
    dkg_private_keys: RwLock<HashMap<(u64, u64), BlsSecretKey>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(BlockStore::default()),
            compaction_tip: RwLock::new((Hash::NULL, 0)),
            dkg_private_keys: RwLock::new(HashMap::new()),
            persistence_path: None,
        }
    }

    /// Open a database backed by a JSON snapshot at `path`.
    ///
    /// A missing file yields an empty database; the file is created on close.
    pub fn with_persistence(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut db = Self::new();

        match File::open(&path) {
            Ok(file) => {
                let snapshot: BlockSnapshot = serde_json::from_reader(BufReader::new(file))
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                let store = BlockStore::from_snapshot(snapshot)?;
                info!(path = %path.display(), blocks = store.sequence.len(), "Loaded block snapshot");
                db.blocks = RwLock::new(store);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No block snapshot, starting empty");
            }
            Err(e) => return Err(e.into()),
        }

        db.persistence_path = Some(path);
        Ok(db)
    }

    /// Write blocks to the snapshot file if persistence is enabled.
    pub fn close(&self) -> Result<(), StorageError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let snapshot = self.blocks.read().to_snapshot();

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        info!(path = %path.display(), blocks = snapshot.sequence.len(), "Saved block snapshot");
        Ok(())
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    fn from_snapshot(snapshot: BlockSnapshot) -> Result<Self, StorageError> {
        let blocks: HashMap<Hash, Block> = snapshot
            .blocks
            .into_iter()
            .map(|block| (block.hash, block))
            .collect();
        if blocks.len() != snapshot.sequence.len()
            || snapshot.sequence.iter().any(|hash| !blocks.contains_key(hash))
        {
            return Err(StorageError::Serialization(
                "block sequence does not match stored blocks".into(),
            ));
        }
        Ok(Self {
            sequence: snapshot.sequence,
            blocks,
        })
    }

    fn to_snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            sequence: self.sequence.clone(),
            blocks: self
                .sequence
                .iter()
                .filter_map(|hash| self.blocks.get(hash).cloned())
                .collect(),
        }
    }
}

impl Database for MemoryDatabase {
    fn has_block(&self, hash: &Hash) -> bool {
        self.blocks.read().blocks.contains_key(hash)
    }

    fn get_block(&self, hash: &Hash) -> Result<Block, StorageError> {
        self.blocks
            .read()
            .blocks
            .get(hash)
            .cloned()
            .ok_or(StorageError::BlockDoesNotExist)
    }

    fn put_block(&self, block: Block) -> Result<(), StorageError> {
        let mut store = self.blocks.write();
        if store.blocks.contains_key(&block.hash) {
            return Err(StorageError::BlockExists);
        }
        store.sequence.push(block.hash);
        store.blocks.insert(block.hash, block);
        Ok(())
    }

    fn update_block(&self, block: Block) -> Result<(), StorageError> {
        let mut store = self.blocks.write();
        match store.blocks.get_mut(&block.hash) {
            Some(existing) => {
                *existing = block;
                Ok(())
            }
            None => Err(StorageError::BlockDoesNotExist),
        }
    }

    fn all_blocks(&self) -> Vec<Block> {
        let store = self.blocks.read();
        store
            .sequence
            .iter()
            .filter_map(|hash| store.blocks.get(hash).cloned())
            .collect()
    }

    fn put_compaction_chain_tip_info(&self, hash: Hash, height: u64) -> Result<(), StorageError> {
        let mut tip = self.compaction_tip.write();
        if tip.1 + 1 != height {
            return Err(StorageError::InvalidCompactionChainTipHeight {
                height,
                tip: tip.1,
            });
        }
        *tip = (hash, height);
        Ok(())
    }

    fn get_compaction_chain_tip_info(&self) -> (Hash, u64) {
        *self.compaction_tip.read()
    }

    fn get_dkg_private_key(&self, round: u64, reset: u64) -> Result<BlsSecretKey, StorageError> {
        self.dkg_private_keys
            .read()
            .get(&(round, reset))
            .cloned()
            .ok_or(StorageError::DkgPrivateKeyDoesNotExist { round, reset })
    }

    fn put_dkg_private_key(
        &self,
        round: u64,
        reset: u64,
        key: BlsSecretKey,
    ) -> Result<(), StorageError> {
        let mut keys = self.dkg_private_keys.write();
        if keys.contains_key(&(round, reset)) {
            return Err(StorageError::DkgPrivateKeyExists { round, reset });
        }
        keys.insert((round, reset), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::test_utils::{test_bls_key, test_block, test_hash};
    use meridian_types::Position;

    fn block(height: u64) -> Block {
        let mut block = test_block(Position::new(0, height));
        block.hash = test_hash(&format!("block-{height}"));
        block
    }

    #[test]
    fn test_put_get_update() {
        let db = MemoryDatabase::new();
        let b = block(1);
        assert!(!db.has_block(&b.hash));
        db.put_block(b.clone()).unwrap();
        assert!(db.has_block(&b.hash));
        assert!(matches!(db.put_block(b.clone()), Err(StorageError::BlockExists)));

        let mut finalized = b.clone();
        finalized.randomness = vec![9; 32];
        db.update_block(finalized.clone()).unwrap();
        assert_eq!(db.get_block(&b.hash).unwrap(), finalized);

        assert!(matches!(
            db.update_block(block(2)),
            Err(StorageError::BlockDoesNotExist)
        ));
        assert!(matches!(
            db.get_block(&test_hash("missing")),
            Err(StorageError::BlockDoesNotExist)
        ));
    }

    #[test]
    fn test_all_blocks_in_insertion_order() {
        let db = MemoryDatabase::new();
        for height in [5, 1, 3] {
            db.put_block(block(height)).unwrap();
        }
        let heights: Vec<_> = db.all_blocks().iter().map(|b| b.position.height).collect();
        assert_eq!(heights, vec![5, 1, 3]);
    }

    #[test]
    fn test_compaction_chain_tip_must_advance_by_one() {
        let db = MemoryDatabase::new();
        assert_eq!(db.get_compaction_chain_tip_info(), (Hash::NULL, 0));

        db.put_compaction_chain_tip_info(test_hash("h1"), 1).unwrap();
        let err = db
            .put_compaction_chain_tip_info(test_hash("h3"), 3)
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidCompactionChainTipHeight { height: 3, tip: 1 }
        ));
        assert!(db.put_compaction_chain_tip_info(test_hash("h1"), 1).is_err());

        db.put_compaction_chain_tip_info(test_hash("h2"), 2).unwrap();
        assert_eq!(db.get_compaction_chain_tip_info(), (test_hash("h2"), 2));
    }

    #[test]
    fn test_dkg_private_keys() {
        let db = MemoryDatabase::new();
        assert!(matches!(
            db.get_dkg_private_key(1, 0),
            Err(StorageError::DkgPrivateKeyDoesNotExist { round: 1, reset: 0 })
        ));

        db.put_dkg_private_key(1, 0, test_bls_key(1)).unwrap();
        assert!(matches!(
            db.put_dkg_private_key(1, 0, test_bls_key(2)),
            Err(StorageError::DkgPrivateKeyExists { round: 1, reset: 0 })
        ));
        db.put_dkg_private_key(1, 1, test_bls_key(2)).unwrap();

        assert_eq!(
            db.get_dkg_private_key(1, 0).unwrap().to_bytes(),
            test_bls_key(1).to_bytes()
        );
        assert_eq!(
            db.get_dkg_private_key(1, 1).unwrap().to_bytes(),
            test_bls_key(2).to_bytes()
        );
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");

        let db = MemoryDatabase::with_persistence(&path).unwrap();
        assert!(db.all_blocks().is_empty());
        for height in [2, 1] {
            db.put_block(block(height)).unwrap();
        }
        db.close().unwrap();

        let reopened = MemoryDatabase::with_persistence(&path).unwrap();
        assert_eq!(reopened.all_blocks(), vec![block(2), block(1)]);
        assert!(reopened.has_block(&block(1).hash));
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        std::fs::write(&path, b"{\"sequence\": [").unwrap();

        assert!(matches!(
            MemoryDatabase::with_persistence(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_close_without_persistence_is_noop() {
        let db = MemoryDatabase::new();
        db.put_block(block(1)).unwrap();
        db.close().unwrap();
    }
}
