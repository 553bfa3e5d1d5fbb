//! Per-round committee cache.

use crate::key_pool::{KeyHandle, KeyPool};
use meridian_core::RoundInfoProvider;
use meridian_types::{Hash, NodeId, NodeSet, PublicKey};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Rounds older than the newest populated round by more than this are evicted.
pub const DEFAULT_RETENTION_ROUNDS: u64 = 5;

/// Why a round cannot be resolved yet. Callers retry later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("node set is not ready for round {0}")]
    NodeSetNotReady(u64),

    #[error("crs is not ready for round {0}")]
    CrsNotReady(u64),

    #[error("configuration is not ready for round {0}")]
    ConfigurationNotReady(u64),
}

/// Cached view of one round.
#[derive(Debug)]
struct RoundSets {
    crs: Hash,
    node_set: NodeSet,
    notary_set: HashSet<NodeId>,
    keys: Vec<KeyHandle>,
}

#[derive(Debug, Default)]
struct CacheInner {
    rounds: HashMap<u64, RoundSets>,
    key_pool: KeyPool,
}

impl CacheInner {
    fn evict(&mut self, round: u64) -> bool {
        let Some(sets) = self.rounds.remove(&round) else {
            return false;
        };
        for handle in sets.keys {
            self.key_pool.release(handle);
        }
        true
    }
}

/// Everything fetched from the provider for one round, before any cache state
/// is touched.
struct RoundInfo {
    crs: Hash,
    notary_set_size: usize,
    keys: Vec<PublicKey>,
}

/// Resolves and memoizes per-round node sets, notary sets and CRS values.
///
/// All state sits behind a single reader/writer lock. Population fetches from
/// the provider without holding the lock, then re-checks under the write lock
/// so concurrent misses on the same round populate it exactly once.
///
/// Each retained round holds one key-pool reference per member, so a public
/// key stays resolvable exactly while some retained round contains its node.
pub struct NodeSetCache {
    provider: Arc<dyn RoundInfoProvider>,
    retention_rounds: u64,
    inner: RwLock<CacheInner>,
}

impl NodeSetCache {
    pub fn new(provider: Arc<dyn RoundInfoProvider>) -> Self {
        Self::with_retention(provider, DEFAULT_RETENTION_ROUNDS)
    }

    /// Keep the populated round plus `retention_rounds` rounds before it.
    pub fn with_retention(provider: Arc<dyn RoundInfoProvider>, retention_rounds: u64) -> Self {
        Self {
            provider,
            retention_rounds,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Whether `node_id` belongs to the node set of `round`.
    pub fn exists(&self, round: u64, node_id: &NodeId) -> Result<bool, CacheError> {
        self.with_round(round, |sets| sets.node_set.contains(node_id))
    }

    /// Public key of a node referenced by any retained round.
    ///
    /// Never consults the provider.
    pub fn public_key(&self, node_id: &NodeId) -> Option<PublicKey> {
        self.inner.read().key_pool.get(node_id)
    }

    pub fn node_set(&self, round: u64) -> Result<NodeSet, CacheError> {
        self.with_round(round, |sets| sets.node_set.clone())
    }

    pub fn notary_set(&self, round: u64) -> Result<HashSet<NodeId>, CacheError> {
        self.with_round(round, |sets| sets.notary_set.clone())
    }

    pub fn crs(&self, round: u64) -> Result<Hash, CacheError> {
        self.with_round(round, |sets| sets.crs)
    }

    /// Populate `round` if needed. Also advances the retention window.
    pub fn touch(&self, round: u64) -> Result<(), CacheError> {
        self.with_round(round, |_| ())
    }

    /// Evict one round and release its key references.
    pub fn purge(&self, round: u64) {
        if self.inner.write().evict(round) {
            debug!(round, "Purged committee round");
        }
    }

    /// Rounds currently cached, ascending.
    pub fn cached_rounds(&self) -> Vec<u64> {
        let mut rounds: Vec<u64> = self.inner.read().rounds.keys().copied().collect();
        rounds.sort_unstable();
        rounds
    }

    /// Number of retained rounds whose node set references `node_id`.
    pub fn key_ref_count(&self, node_id: &NodeId) -> usize {
        self.inner.read().key_pool.ref_count(node_id)
    }

    pub fn key_pool_len(&self) -> usize {
        self.inner.read().key_pool.len()
    }

    pub fn retention_rounds(&self) -> u64 {
        self.retention_rounds
    }

    fn with_round<T>(
        &self,
        round: u64,
        read: impl FnOnce(&RoundSets) -> T,
    ) -> Result<T, CacheError> {
        {
            let inner = self.inner.read();
            if let Some(sets) = inner.rounds.get(&round) {
                trace!(round, "Committee cache hit");
                return Ok(read(sets));
            }
        }

        let info = self.fetch(round)?;

        let mut inner = self.inner.write();
        if !inner.rounds.contains_key(&round) {
            self.insert(&mut inner, round, info);
        }
        inner
            .rounds
            .get(&round)
            .map(read)
            .ok_or(CacheError::NodeSetNotReady(round))
    }

    fn fetch(&self, round: u64) -> Result<RoundInfo, CacheError> {
        let keys = self
            .provider
            .node_set(round)
            .filter(|keys| !keys.is_empty())
            .ok_or(CacheError::NodeSetNotReady(round))?;
        let crs = self
            .provider
            .crs(round)
            .filter(|crs| !crs.is_null())
            .ok_or(CacheError::CrsNotReady(round))?;
        let config = self
            .provider
            .configuration(round)
            .ok_or(CacheError::ConfigurationNotReady(round))?;
        Ok(RoundInfo {
            crs,
            notary_set_size: config.notary_set_size as usize,
            keys,
        })
    }

    fn insert(&self, inner: &mut CacheInner, round: u64, info: RoundInfo) {
        let mut node_set = NodeSet::new();
        let mut handles = Vec::with_capacity(info.keys.len());
        for key in info.keys {
            if node_set.insert(key.node_id()) {
                handles.push(inner.key_pool.acquire(key));
            }
        }
        let notary_set = node_set.notary_set(info.notary_set_size, &info.crs);

        debug!(
            round,
            nodes = node_set.len(),
            notaries = notary_set.len(),
            crs = ?info.crs,
            "Populated committee round"
        );
        inner.rounds.insert(
            round,
            RoundSets {
                crs: info.crs,
                node_set,
                notary_set,
                keys: handles,
            },
        );

        let expired: Vec<u64> = inner
            .rounds
            .keys()
            .copied()
            .filter(|&cached| cached < round && round - cached > self.retention_rounds)
            .collect();
        for cached in expired {
            inner.evict(cached);
            debug!(round = cached, current = round, "Evicted expired committee round");
        }
    }
}

impl fmt::Debug for NodeSetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("NodeSetCache")
            .field("retention_rounds", &self.retention_rounds)
            .field("rounds", &inner.rounds.len())
            .field("keys", &inner.key_pool.len())
            .finish()
    }
}
