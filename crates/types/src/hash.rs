//! 256-bit digests and the Keccak-256 hasher used for every canonical encoding.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Length of a digest in bytes.
pub const HASH_LENGTH: usize = 32;

/// A 32-byte Keccak-256 digest.
///
/// Two values are reserved: [`Hash::NULL`] (all zeros) marks "no block", and
/// [`Hash::SKIP`] (all `0xff`) marks an explicit skip outcome of an agreement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; HASH_LENGTH]);

impl Hash {
    /// The null hash.
    pub const NULL: Hash = Hash([0u8; HASH_LENGTH]);

    /// The skip hash.
    pub const SKIP: Hash = Hash([0xffu8; HASH_LENGTH]);

    /// Create a hash from raw bytes.
    pub const fn from_bytes(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a hash from a slice, returning `None` if the length is wrong.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; HASH_LENGTH] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Hash arbitrary bytes with Keccak-256.
    pub fn digest(data: &[u8]) -> Self {
        Self(Keccak256::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn is_skip(&self) -> bool {
        *self == Self::SKIP
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &hex::encode(self.0)[..12])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Incremental Keccak-256 builder over a fixed field order.
///
/// Integers are always written as 8-byte little-endian values.
#[derive(Clone, Default)]
pub struct HashBuilder {
    inner: Keccak256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    pub fn hash(self, hash: &Hash) -> Self {
        self.bytes(&hash.0)
    }

    pub fn u64(self, value: u64) -> Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn byte(self, value: u8) -> Self {
        self.bytes(&[value])
    }

    pub fn finish(self) -> Hash {
        Hash(self.inner.finalize().into())
    }
}
