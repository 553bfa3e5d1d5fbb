//! Reference-counted public key storage shared by all cached rounds.

use meridian_types::{NodeId, PublicKey};
use std::collections::HashMap;

/// Index of a live slot in the [`KeyPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct KeyHandle(usize);

#[derive(Debug)]
struct KeyPoolEntry {
    node_id: NodeId,
    public_key: PublicKey,
    ref_count: usize,
}

/// Arena of public keys indexed by node identity.
///
/// Each cached round holds one [`KeyHandle`] per member. A slot lives exactly
/// as long as at least one handle to it is outstanding; freed slots are reused.
#[derive(Debug, Default)]
pub(crate) struct KeyPool {
    slots: Vec<Option<KeyPoolEntry>>,
    free: Vec<usize>,
    index: HashMap<NodeId, KeyHandle>,
}

impl KeyPool {
    /// Take a reference to `public_key`, inserting it on first use.
    pub fn acquire(&mut self, public_key: PublicKey) -> KeyHandle {
        let node_id = public_key.node_id();
        if let Some(&handle) = self.index.get(&node_id) {
            if let Some(entry) = self.slots[handle.0].as_mut() {
                entry.ref_count += 1;
                return handle;
            }
        }

        let entry = KeyPoolEntry {
            node_id,
            public_key,
            ref_count: 1,
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                KeyHandle(slot)
            }
            None => {
                self.slots.push(Some(entry));
                KeyHandle(self.slots.len() - 1)
            }
        };
        self.index.insert(node_id, handle);
        handle
    }

    /// Drop one reference. Returns `true` if the key was removed.
    pub fn release(&mut self, handle: KeyHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.0) else {
            return false;
        };
        let Some(entry) = slot.as_mut() else {
            return false;
        };
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return false;
        }
        let node_id = entry.node_id;
        *slot = None;
        self.index.remove(&node_id);
        self.free.push(handle.0);
        true
    }

    pub fn get(&self, node_id: &NodeId) -> Option<PublicKey> {
        self.entry(node_id).map(|entry| entry.public_key)
    }

    pub fn ref_count(&self, node_id: &NodeId) -> usize {
        self.entry(node_id).map_or(0, |entry| entry.ref_count)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    fn entry(&self, node_id: &NodeId) -> Option<&KeyPoolEntry> {
        let handle = self.index.get(node_id)?;
        self.slots.get(handle.0)?.as_ref()
    }
}
