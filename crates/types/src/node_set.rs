//! Node sets and deterministic committee selection.

use crate::{Hash, HashBuilder, NodeId};
use std::collections::HashSet;

/// Which committee a selection target is for.
///
/// The discriminant is appended to the CRS when building the target, so
/// different committees drawn from the same seed are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubSetTargetType {
    Notary = 0,
}

/// A seed for ranking nodes into a committee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSetTarget(Vec<u8>);

impl SubSetTarget {
    pub fn notary(crs: &Hash) -> Self {
        Self::new(SubSetTargetType::Notary, crs)
    }

    fn new(target_type: SubSetTargetType, crs: &Hash) -> Self {
        let mut bytes = crs.0.to_vec();
        bytes.push(target_type as u8);
        Self(bytes)
    }

    /// Rank of a node under this target. Lower ranks are selected first.
    pub fn rank(&self, node_id: &NodeId) -> Hash {
        HashBuilder::new().hash(&node_id.0).bytes(&self.0).finish()
    }
}

/// The full set of nodes known for a round.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSet {
    ids: HashSet<NodeId>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.iter()
    }

    pub fn ids(&self) -> &HashSet<NodeId> {
        &self.ids
    }

    /// Select the `size` nodes with the smallest rank under `target`.
    ///
    /// Ties on rank are impossible for distinct ids in practice; the node id
    /// breaks them anyway so the result never depends on iteration order.
    pub fn sub_set(&self, size: usize, target: &SubSetTarget) -> HashSet<NodeId> {
        if size == 0 {
            return HashSet::new();
        }
        if size >= self.ids.len() {
            return self.ids.clone();
        }
        let mut ranked: Vec<(Hash, NodeId)> =
            self.ids.iter().map(|id| (target.rank(id), *id)).collect();
        ranked.sort_unstable();
        ranked.into_iter().take(size).map(|(_, id)| id).collect()
    }

    /// The notary committee for a round with the given CRS.
    pub fn notary_set(&self, size: usize, crs: &Hash) -> HashSet<NodeId> {
        self.sub_set(size, &SubSetTarget::notary(crs))
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
