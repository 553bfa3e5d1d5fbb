//! Key and signature types.
//!
//! Two schemes are in use:
//!
//! - **ECDSA (secp256k1, recoverable)** for node identities. A signature is the
//!   64-byte compact form followed by one recovery-id byte, so the signer's
//!   public key (and therefore its [`NodeId`]) can be recovered from the
//!   signed digest alone.
//! - **BLS12-381 (min-pk)** for threshold material: DKG key shares, partial
//!   signatures and CRS signatures once a round has DKG keys.

use crate::{Hash, NodeId};
use blst::min_pk;
use blst::BLST_ERROR;
use rand::{CryptoRng, RngCore};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SECP256K1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain separation tag for BLS signatures over G2.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Length of a recoverable ECDSA signature.
pub const ECDSA_SIGNATURE_LENGTH: usize = 65;

/// Errors from key decoding, signing and public key recovery.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("unexpected signature scheme: {0:?}")]
    UnexpectedScheme(SignatureScheme),

    #[error("secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),

    #[error("bls error: {0:?}")]
    Bls(BLST_ERROR),
}

/// Which scheme produced a [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureScheme {
    #[default]
    Ecdsa,
    Bls,
}

/// Scheme-tagged signature bytes.
///
/// An empty signature means "not signed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature {
    pub scheme: SignatureScheme,
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn new(scheme: SignatureScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ECDSA node keys
// ═══════════════════════════════════════════════════════════════════════════

/// A node's secp256k1 signing key.
#[derive(Clone)]
pub struct PrivateKey(secp256k1::SecretKey);

impl PrivateKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(secp256k1::SecretKey::new(rng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self(secp256k1::SecretKey::from_slice(bytes)?))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.secret_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(secp256k1::PublicKey::from_secret_key(SECP256K1, &self.0))
    }

    /// Sign a 32-byte digest, producing a recoverable signature.
    pub fn sign(&self, hash: &Hash) -> Result<Signature, CryptoError> {
        let message = Message::from_digest(hash.0);
        let recoverable = SECP256K1.sign_ecdsa_recoverable(&message, &self.0);
        let (recovery_id, compact) = recoverable.serialize_compact();

        let mut bytes = Vec::with_capacity(ECDSA_SIGNATURE_LENGTH);
        bytes.extend_from_slice(&compact);
        bytes.push(recovery_id.to_i32() as u8);
        Ok(Signature::new(SignatureScheme::Ecdsa, bytes))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A node's secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self(secp256k1::PublicKey::from_slice(bytes)?))
    }

    /// Uncompressed SEC1 encoding (65 bytes, leading `0x04`).
    pub fn to_bytes(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    /// Keccak-256 of the uncompressed key without its prefix byte.
    pub fn node_id(&self) -> NodeId {
        NodeId(Hash::digest(&self.to_bytes()[1..]))
    }

    /// Recover the key that produced `signature` over `hash`.
    pub fn recover(hash: &Hash, signature: &Signature) -> Result<Self, CryptoError> {
        if signature.scheme != SignatureScheme::Ecdsa {
            return Err(CryptoError::UnexpectedScheme(signature.scheme));
        }
        if signature.bytes.len() != ECDSA_SIGNATURE_LENGTH {
            return Err(CryptoError::InvalidSignatureLength {
                expected: ECDSA_SIGNATURE_LENGTH,
                actual: signature.bytes.len(),
            });
        }
        let recovery_id = RecoveryId::from_i32(i32::from(signature.bytes[64]))?;
        let recoverable = RecoverableSignature::from_compact(&signature.bytes[..64], recovery_id)?;
        let message = Message::from_digest(hash.0);
        Ok(Self(SECP256K1.recover_ecdsa(&message, &recoverable)?))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.node_id())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BLS threshold keys
// ═══════════════════════════════════════════════════════════════════════════

/// A BLS secret key, used as a DKG private share.
#[derive(Clone)]
pub struct BlsSecretKey(min_pk::SecretKey);

impl BlsSecretKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut ikm = [0u8; 32];
        rng.fill_bytes(&mut ikm);
        Self::from_ikm(&ikm)
    }

    /// Derive a key from at least 32 bytes of input keying material.
    pub fn from_ikm(ikm: &[u8]) -> Result<Self, CryptoError> {
        min_pk::SecretKey::key_gen(ikm, &[])
            .map(Self)
            .map_err(CryptoError::Bls)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        min_pk::SecretKey::from_bytes(bytes)
            .map(Self)
            .map_err(CryptoError::Bls)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey(self.0.sk_to_pk())
    }

    pub fn sign(&self, hash: &Hash) -> Signature {
        let signature = self.0.sign(&hash.0, BLS_DST, &[]);
        Signature::new(SignatureScheme::Bls, signature.to_bytes().to_vec())
    }
}

impl PartialEq for BlsSecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSecretKey {}

impl fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlsSecretKey(..)")
    }
}

/// A BLS public key (compressed G1 point).
#[derive(Clone)]
pub struct BlsPublicKey(min_pk::PublicKey);

impl BlsPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        min_pk::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(CryptoError::Bls)
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_bytes()
    }

    /// Verify a BLS signature over `hash`. Any decoding failure counts as invalid.
    pub fn verify(&self, hash: &Hash, signature: &Signature) -> bool {
        if signature.scheme != SignatureScheme::Bls {
            return false;
        }
        let Ok(signature) = min_pk::Signature::from_bytes(&signature.bytes) else {
            return false;
        };
        signature.verify(true, &hash.0, BLS_DST, &[], &self.0, true) == BLST_ERROR::BLST_SUCCESS
    }
}

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey({})", &hex::encode(self.to_bytes())[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_ecdsa_recover_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let key = PrivateKey::generate(&mut rng);
        let hash = Hash::digest(b"message");

        let signature = key.sign(&hash).unwrap();
        assert_eq!(signature.bytes.len(), ECDSA_SIGNATURE_LENGTH);

        let recovered = PublicKey::recover(&hash, &signature).unwrap();
        assert_eq!(recovered, key.public_key());
        assert_eq!(recovered.node_id(), key.public_key().node_id());
    }

    #[test]
    fn test_recover_rejects_short_signature() {
        let signature = Signature::new(SignatureScheme::Ecdsa, vec![0u8; 10]);
        let result = PublicKey::recover(&Hash::NULL, &signature);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidSignatureLength { actual: 10, .. })
        ));
    }

    #[test]
    fn test_recover_rejects_bls_scheme() {
        let signature = Signature::new(SignatureScheme::Bls, vec![0u8; 65]);
        assert!(matches!(
            PublicKey::recover(&Hash::NULL, &signature),
            Err(CryptoError::UnexpectedScheme(SignatureScheme::Bls))
        ));
    }

    #[test]
    fn test_public_key_bytes() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let key = PrivateKey::generate(&mut rng).public_key();
        let decoded = PublicKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_bls_sign_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let key = BlsSecretKey::generate(&mut rng).unwrap();
        let other = BlsSecretKey::generate(&mut rng).unwrap();
        let hash = Hash::digest(b"crs");

        let signature = key.sign(&hash);
        assert!(key.public_key().verify(&hash, &signature));
        assert!(!other.public_key().verify(&hash, &signature));
        assert!(!key.public_key().verify(&Hash::digest(b"other"), &signature));
    }
}
