//! Canonical digests of every signable structure.
//!
//! Each digest is Keccak-256 over a fixed sequence of fields. Integers are
//! encoded as 8-byte little-endian values and hashes/ids as their raw 32
//! bytes. The field order of each function is part of the protocol: changing
//! it breaks signature compatibility with every other node.
//!
//! Messages are told apart by their field layout rather than by an explicit
//! tag. The three DKG phase announcements (`MpkReady`, `Finalize`, `Success`)
//! share the same fields, so they carry a one-byte phase marker after them.

use crate::{
    Block, Complaint, Finalize, Hash, HashBuilder, MasterPublicKey, MpkReady, PartialSignature,
    Position, PrivateShare, Success, Vote, Witness,
};

/// First round whose CRS signature is a real BLS threshold signature.
///
/// Rounds before this have no DKG key material yet and commit to the CRS with
/// the raw digest instead.
pub const DKG_DELAY_ROUND: u64 = 1;

#[repr(u8)]
enum DkgPhase {
    MpkReady = 0,
    Finalize = 1,
    Success = 2,
}

pub fn hash_position(position: &Position) -> Hash {
    HashBuilder::new()
        .u64(position.round)
        .u64(position.height)
        .finish()
}

pub fn hash_witness(witness: &Witness) -> Hash {
    HashBuilder::new()
        .u64(witness.height)
        .bytes(&witness.data)
        .finish()
}

pub fn hash_payload(payload: &[u8]) -> Hash {
    Hash::digest(payload)
}

/// Digest covering proposer, parent, position, timestamp, payload hash and
/// witness. Uses the stored `payload_hash`, not the payload itself.
pub fn hash_block(block: &Block) -> Hash {
    HashBuilder::new()
        .hash(&block.proposer_id.0)
        .hash(&block.parent_hash)
        .hash(&hash_position(&block.position))
        .u64(block.timestamp)
        .hash(&block.payload_hash)
        .hash(&hash_witness(&block.witness))
        .finish()
}

pub fn hash_vote(vote: &Vote) -> Hash {
    let header = &vote.header;
    HashBuilder::new()
        .hash(&header.proposer_id.0)
        .hash(&header.block_hash)
        .u64(header.period)
        .hash(&hash_position(&header.position))
        .bytes(&vote.partial_signature.bytes)
        .byte(header.vote_type.as_byte())
        .finish()
}

/// Digest signed when a block carries the next CRS.
///
/// Before [`DKG_DELAY_ROUND`] the proposer id is mixed in, since the digest
/// itself is what gets stored. From that round on the digest is the same for
/// every proposer, which lets threshold partial signatures combine.
pub fn hash_crs(block: &Block, crs: &Hash) -> Hash {
    let builder = HashBuilder::new()
        .hash(crs)
        .hash(&hash_position(&block.position));
    if block.position.round < DKG_DELAY_ROUND {
        builder.hash(&block.proposer_id.0).finish()
    } else {
        builder.finish()
    }
}

pub fn hash_dkg_private_share(share: &PrivateShare) -> Hash {
    HashBuilder::new()
        .hash(&share.proposer_id.0)
        .hash(&share.receiver_id.0)
        .u64(share.round)
        .u64(share.reset)
        .bytes(&share.private_share.to_bytes())
        .finish()
}

pub fn hash_dkg_master_public_key(mpk: &MasterPublicKey) -> Hash {
    HashBuilder::new()
        .hash(&mpk.proposer_id.0)
        .bytes(&mpk.dkg_id.to_le_bytes())
        .bytes(&mpk.public_key_shares.master_key_bytes())
        .u64(mpk.round)
        .u64(mpk.reset)
        .finish()
}

/// Covers the complaint fields and the digest of the embedded share.
pub fn hash_dkg_complaint(complaint: &Complaint) -> Hash {
    HashBuilder::new()
        .hash(&complaint.proposer_id.0)
        .u64(complaint.round)
        .u64(complaint.reset)
        .hash(&hash_dkg_private_share(&complaint.private_share))
        .finish()
}

pub fn hash_dkg_partial_signature(psig: &PartialSignature) -> Hash {
    HashBuilder::new()
        .hash(&psig.proposer_id.0)
        .u64(psig.round)
        .hash(&psig.hash)
        .bytes(&psig.partial_signature.bytes)
        .finish()
}

pub fn hash_dkg_mpk_ready(ready: &MpkReady) -> Hash {
    hash_dkg_phase(ready.proposer_id.as_hash(), ready.round, ready.reset, DkgPhase::MpkReady)
}

pub fn hash_dkg_finalize(finalize: &Finalize) -> Hash {
    hash_dkg_phase(
        finalize.proposer_id.as_hash(),
        finalize.round,
        finalize.reset,
        DkgPhase::Finalize,
    )
}

pub fn hash_dkg_success(success: &Success) -> Hash {
    hash_dkg_phase(
        success.proposer_id.as_hash(),
        success.round,
        success.reset,
        DkgPhase::Success,
    )
}

fn hash_dkg_phase(proposer: &Hash, round: u64, reset: u64, phase: DkgPhase) -> Hash {
    HashBuilder::new()
        .hash(proposer)
        .u64(round)
        .u64(reset)
        .byte(phase as u8)
        .finish()
}

/// Apply Keccak-256 to `hash` `count` times. `rehash(h, 0) == h`.
pub fn rehash(hash: &Hash, count: u64) -> Hash {
    let mut current = *hash;
    for _ in 0..count {
        current = Hash::digest(&current.0);
    }
    current
}
