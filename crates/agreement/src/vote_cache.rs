//! Bounded cache of recent votes and blocks for answering pull requests.

use meridian_core::Database;
use meridian_types::{Block, Hash, NodeId, Position, Vote, VoteType};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VoteKey {
    proposer_id: NodeId,
    vote_type: VoteType,
    block_hash: Hash,
    period: u64,
    position: Position,
}

impl From<&Vote> for VoteKey {
    fn from(vote: &Vote) -> Self {
        Self {
            proposer_id: vote.header.proposer_id,
            vote_type: vote.header.vote_type,
            block_hash: vote.header.block_hash,
            period: vote.header.period,
            position: vote.header.position,
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    votes: HashMap<Position, HashMap<VoteKey, Vote>>,
    /// Positions in insertion order; the front is evicted first.
    vote_positions: VecDeque<Position>,
    vote_count: usize,
    blocks: HashMap<Hash, Block>,
    finalized_blocks: HashMap<Position, Block>,
}

/// Keeps the votes and blocks of recent positions so peers that missed them
/// during pull-vote can fetch them again.
///
/// Votes are evicted a whole position at a time, oldest position first, once
/// `capacity` votes are stored. Block maps are bounded by `capacity` entries
/// each.
#[derive(Debug)]
pub struct VoteCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl VoteCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Store a vote. Duplicates are ignored and never trigger eviction.
    pub fn add_vote(&self, vote: Vote) {
        let position = vote.position();
        let key = VoteKey::from(&vote);
        let mut inner = self.inner.write();
        if inner
            .votes
            .get(&position)
            .is_some_and(|votes| votes.contains_key(&key))
        {
            return;
        }

        if inner.vote_count >= self.capacity {
            if let Some(oldest) = inner.vote_positions.pop_front() {
                let evicted = inner.votes.remove(&oldest).map_or(0, |votes| votes.len());
                inner.vote_count -= evicted;
            }
        }

        if !inner.votes.contains_key(&position) {
            inner.vote_positions.push_back(position);
        }
        inner.votes.entry(position).or_default().insert(key, vote);
        inner.vote_count += 1;
    }

    pub fn votes(&self, position: &Position) -> Vec<Vote> {
        self.inner
            .read()
            .votes
            .get(position)
            .map(|votes| votes.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn vote_count(&self) -> usize {
        self.inner.read().vote_count
    }

    /// Store blocks, routing finalized ones to the finalized map.
    pub fn add_blocks(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut inner = self.inner.write();
        for block in blocks {
            if block.is_finalized() {
                self.insert_finalized(&mut inner, block);
            } else {
                self.insert_block(&mut inner, block);
            }
        }
    }

    pub fn add_block(&self, block: Block) {
        let mut inner = self.inner.write();
        self.insert_block(&mut inner, block);
    }

    pub fn add_finalized_block(&self, block: Block) {
        let mut inner = self.inner.write();
        self.insert_finalized(&mut inner, block);
    }

    /// Blocks for `hashes`, optionally falling back to `db` for misses.
    /// Hashes found in neither are skipped.
    pub fn blocks(&self, hashes: &[Hash], db: Option<&dyn Database>) -> Vec<Block> {
        let inner = self.inner.read();
        hashes
            .iter()
            .filter_map(|hash| match inner.blocks.get(hash) {
                Some(block) => Some(block.clone()),
                None => db.and_then(|db| db.get_block(hash).ok()),
            })
            .collect()
    }

    pub fn finalized_block(&self, position: &Position) -> Option<Block> {
        self.inner.read().finalized_blocks.get(position).cloned()
    }

    fn insert_block(&self, inner: &mut CacheInner, block: Block) {
        // A finalized block for the position already wins.
        if inner.finalized_blocks.contains_key(&block.position) {
            return;
        }
        evict_any(&mut inner.blocks, self.capacity);
        inner.blocks.insert(block.hash, block);
    }

    fn insert_finalized(&self, inner: &mut CacheInner, block: Block) {
        evict_any(&mut inner.blocks, self.capacity);
        evict_any(&mut inner.finalized_blocks, self.capacity);
        inner.blocks.insert(block.hash, block.clone());
        inner.finalized_blocks.insert(block.position, block);
    }
}

/// Make room for one entry by dropping an arbitrary one.
fn evict_any<K: Clone + Eq + std::hash::Hash, V>(map: &mut HashMap<K, V>, capacity: usize) {
    if map.len() < capacity {
        return;
    }
    if let Some(key) = map.keys().next().cloned() {
        map.remove(&key);
    }
}
