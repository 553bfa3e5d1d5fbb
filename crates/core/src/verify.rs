//! Signature verification.
//!
//! All functions are pure. Structures whose recovered signer does not match
//! the claimed proposer verify as `Ok(false)`; malformed signatures surface as
//! errors so callers can tell "forged" from "garbage".

use crate::SignerError;
use meridian_types::signing::{self, DKG_DELAY_ROUND};
use meridian_types::{
    Block, Complaint, CryptoError, Finalize, Hash, MasterPublicKey, MpkReady, NodeId,
    NodePublicKeys, PartialSignature, PrivateShare, PublicKey, Signature, Success, Vote,
};

/// Whether `signature` over `hash` was produced by `claimed`.
fn signed_by(hash: &Hash, signature: &Signature, claimed: &NodeId) -> Result<bool, CryptoError> {
    let public_key = PublicKey::recover(hash, signature)?;
    Ok(public_key.node_id() == *claimed)
}

/// Verify the payload hash, hash and signature of a block.
pub fn verify_block_signature(block: &Block) -> Result<(), SignerError> {
    if signing::hash_payload(&block.payload) != block.payload_hash {
        return Err(SignerError::IncorrectHash);
    }
    verify_block_signature_without_payload(block)
}

/// Verify hash and signature of a block, trusting its stored payload hash.
///
/// Used for blocks received without their payload.
pub fn verify_block_signature_without_payload(block: &Block) -> Result<(), SignerError> {
    if signing::hash_block(block) != block.hash {
        return Err(SignerError::IncorrectHash);
    }
    // Undecodable signatures count as a mismatch for blocks.
    match signed_by(&block.hash, &block.signature, &block.proposer_id) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(SignerError::IncorrectSignature),
    }
}

pub fn verify_vote_signature(vote: &Vote) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_vote(vote),
        &vote.signature,
        &vote.header.proposer_id,
    )
}

/// Verify the CRS signature carried by `block` for `crs`.
///
/// Before [`DKG_DELAY_ROUND`] this only checks that the stored bytes equal the
/// recomputed digest. That proves nothing about who produced it; it is the
/// protocol's commitment phase while no DKG keys exist. From that round on the
/// signature must verify under the proposer's threshold key in
/// `node_public_keys`, and an unknown proposer fails.
pub fn verify_crs_signature(
    block: &Block,
    crs: &Hash,
    node_public_keys: Option<&NodePublicKeys>,
) -> bool {
    let digest = signing::hash_crs(block, crs);
    if block.position.round < DKG_DELAY_ROUND {
        return block.crs_signature.bytes == digest.0;
    }
    let Some(key) = node_public_keys.and_then(|keys| keys.get(&block.proposer_id)) else {
        return false;
    };
    key.verify(&digest, &block.crs_signature)
}

pub fn verify_dkg_private_share_signature(share: &PrivateShare) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_private_share(share),
        &share.signature,
        &share.proposer_id,
    )
}

pub fn verify_dkg_master_public_key_signature(
    mpk: &MasterPublicKey,
) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_master_public_key(mpk),
        &mpk.signature,
        &mpk.proposer_id,
    )
}

/// Verify a complaint, and the embedded share unless the complaint is a nack.
pub fn verify_dkg_complaint_signature(complaint: &Complaint) -> Result<bool, CryptoError> {
    if complaint.round != complaint.private_share.round
        || complaint.reset != complaint.private_share.reset
    {
        return Ok(false);
    }
    if !signed_by(
        &signing::hash_dkg_complaint(complaint),
        &complaint.signature,
        &complaint.proposer_id,
    )? {
        return Ok(false);
    }
    if complaint.is_nack() {
        return Ok(true);
    }
    verify_dkg_private_share_signature(&complaint.private_share)
}

pub fn verify_dkg_partial_signature_signature(
    psig: &PartialSignature,
) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_partial_signature(psig),
        &psig.signature,
        &psig.proposer_id,
    )
}

pub fn verify_dkg_mpk_ready_signature(ready: &MpkReady) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_mpk_ready(ready),
        &ready.signature,
        &ready.proposer_id,
    )
}

pub fn verify_dkg_finalize_signature(finalize: &Finalize) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_finalize(finalize),
        &finalize.signature,
        &finalize.proposer_id,
    )
}

pub fn verify_dkg_success_signature(success: &Success) -> Result<bool, CryptoError> {
    signed_by(
        &signing::hash_dkg_success(success),
        &success.signature,
        &success.proposer_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signer;
    use meridian_types::test_utils::{test_block, test_bls_key, test_hash, test_private_key};
    use meridian_types::{
        DkgId, PublicKeyShares, Position, SignatureScheme, VoteType, Witness,
    };
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn signed_block(signer: &Signer, position: Position) -> Block {
        let mut block = test_block(position);
        signer.sign_block(&mut block).unwrap();
        block
    }

    fn signed_share(dealer: &Signer, receiver: NodeId, round: u64, reset: u64) -> PrivateShare {
        let mut share = PrivateShare {
            proposer_id: NodeId::default(),
            receiver_id: receiver,
            round,
            reset,
            private_share: test_bls_key(round),
            signature: Signature::default(),
        };
        dealer.sign_dkg_private_share(&mut share).unwrap();
        share
    }

    #[traced_test]
    #[test]
    fn test_signed_block_verifies() {
        let signer = Signer::new(test_private_key(1));
        let block = signed_block(&signer, Position::new(2, 10));
        assert!(verify_block_signature(&block).is_ok());
    }

    #[traced_test]
    #[test]
    fn test_block_mutations_break_verification() {
        let signer = Signer::new(test_private_key(1));
        let block = signed_block(&signer, Position::new(2, 10));

        let mutations: [(&str, fn(&mut Block)); 6] = [
            ("payload", |b| b.payload.push(0)),
            ("position", |b| b.position.height += 1),
            ("timestamp", |b| b.timestamp += 1),
            ("witness", |b| b.witness = Witness { height: 99, data: vec![] }),
            ("parent_hash", |b| b.parent_hash = test_hash("other-parent")),
            ("proposer_id", |b| b.proposer_id = NodeId(test_hash("mallory"))),
        ];

        for (field, mutate) in mutations {
            let mut tampered = block.clone();
            mutate(&mut tampered);
            assert!(
                verify_block_signature(&tampered).is_err(),
                "mutating {field} should break verification"
            );
        }
    }

    #[test]
    fn test_payload_mismatch_is_hash_error() {
        let signer = Signer::new(test_private_key(1));
        let mut block = signed_block(&signer, Position::new(0, 3));
        block.payload = b"different".to_vec();
        assert!(matches!(
            verify_block_signature(&block),
            Err(SignerError::IncorrectHash)
        ));
    }

    #[test]
    fn test_resigned_by_other_key_is_signature_error() {
        let signer = Signer::new(test_private_key(1));
        let mut block = signed_block(&signer, Position::new(0, 3));
        block.signature = test_private_key(2).sign(&block.hash).unwrap();
        assert!(matches!(
            verify_block_signature(&block),
            Err(SignerError::IncorrectSignature)
        ));
    }

    #[test]
    fn test_every_vote_type_verifies() {
        let signer = Signer::new(test_private_key(7));
        for vote_type in VoteType::ALL {
            let mut vote =
                Vote::new(vote_type, test_hash("block"), 4).with_position(Position::new(1, 8));
            signer.sign_vote(&mut vote).unwrap();
            assert!(verify_vote_signature(&vote).unwrap(), "{vote_type} vote");
        }
    }

    #[test]
    fn test_corrupted_vote_signature_is_rejected() {
        let signer = Signer::new(test_private_key(7));
        let mut vote = Vote::new(VoteType::PreCom, test_hash("block"), 1);
        signer.sign_vote(&mut vote).unwrap();

        for index in [0usize, 31, 63] {
            let mut corrupted = vote.clone();
            corrupted.signature.bytes[index] ^= 0x01;
            // Either recovery fails or it recovers some unrelated key.
            assert!(!verify_vote_signature(&corrupted).unwrap_or(false));
        }
    }

    #[test]
    fn test_vote_signed_for_other_proposer_reports_mismatch() {
        let signer = Signer::new(test_private_key(7));
        let mut vote = Vote::new(VoteType::Com, test_hash("block"), 1);
        signer.sign_vote(&mut vote).unwrap();
        vote.header.proposer_id = NodeId(test_hash("impostor"));
        assert!(!verify_vote_signature(&vote).unwrap());
    }

    #[test]
    fn test_truncated_vote_signature_is_error() {
        let mut vote = Vote::new(VoteType::Com, test_hash("block"), 1);
        vote.signature = Signature::new(SignatureScheme::Ecdsa, vec![1, 2, 3]);
        assert!(verify_vote_signature(&vote).is_err());
    }

    #[test]
    fn test_crs_before_threshold_compares_digest() {
        let signer = Signer::new(test_private_key(3));
        let crs = test_hash("crs");
        let mut block = signed_block(&signer, Position::new(DKG_DELAY_ROUND - 1, 1));
        signer.sign_crs(&mut block, &crs).unwrap();

        assert!(verify_crs_signature(&block, &crs, None));
        assert!(!verify_crs_signature(&block, &test_hash("other-crs"), None));
    }

    #[test]
    fn test_crs_after_threshold_needs_matching_key() {
        let mut signer = Signer::new(test_private_key(3));
        let share = test_bls_key(30);
        let share_for_signer = share.clone();
        signer.set_threshold_signer(Arc::new(move |_round: u64, digest: &Hash| {
            Ok::<_, CryptoError>(share_for_signer.sign(digest))
        }));

        let crs = test_hash("crs");
        let round = DKG_DELAY_ROUND + 1;
        let mut block = signed_block(&signer, Position::new(round, 1));
        signer.sign_crs(&mut block, &crs).unwrap();

        let mut keys = NodePublicKeys::new(round);
        assert!(!verify_crs_signature(&block, &crs, Some(&keys)));
        assert!(!verify_crs_signature(&block, &crs, None));

        keys.insert(signer.proposer_id(), test_bls_key(31).public_key());
        assert!(!verify_crs_signature(&block, &crs, Some(&keys)));

        keys.insert(signer.proposer_id(), share.public_key());
        assert!(verify_crs_signature(&block, &crs, Some(&keys)));
    }

    #[test]
    fn test_dkg_messages_verify() {
        let signer = Signer::new(test_private_key(11));
        let receiver = NodeId(test_hash("receiver"));

        let share = signed_share(&signer, receiver, 2, 0);
        assert!(verify_dkg_private_share_signature(&share).unwrap());

        let mut mpk = MasterPublicKey {
            proposer_id: NodeId::default(),
            round: 2,
            reset: 0,
            dkg_id: DkgId::from_node_id(&signer.proposer_id()),
            public_key_shares: PublicKeyShares {
                master_public_keys: vec![test_bls_key(1).public_key(), test_bls_key(2).public_key()],
            },
            signature: Signature::default(),
        };
        signer.sign_dkg_master_public_key(&mut mpk).unwrap();
        assert!(verify_dkg_master_public_key_signature(&mpk).unwrap());

        let mut psig = PartialSignature {
            proposer_id: NodeId::default(),
            round: 2,
            hash: test_hash("target"),
            partial_signature: test_bls_key(2).sign(&test_hash("target")),
            signature: Signature::default(),
        };
        signer.sign_dkg_partial_signature(&mut psig).unwrap();
        assert!(verify_dkg_partial_signature_signature(&psig).unwrap());

        let mut ready = MpkReady {
            round: 2,
            ..Default::default()
        };
        signer.sign_dkg_mpk_ready(&mut ready).unwrap();
        assert!(verify_dkg_mpk_ready_signature(&ready).unwrap());

        let mut finalize = Finalize {
            round: 2,
            ..Default::default()
        };
        signer.sign_dkg_finalize(&mut finalize).unwrap();
        assert!(verify_dkg_finalize_signature(&finalize).unwrap());

        let mut success = Success {
            round: 2,
            ..Default::default()
        };
        signer.sign_dkg_success(&mut success).unwrap();
        assert!(verify_dkg_success_signature(&success).unwrap());

        // A phase message signed as one kind does not verify as another.
        let as_finalize = Finalize {
            proposer_id: ready.proposer_id,
            round: ready.round,
            reset: ready.reset,
            signature: ready.signature.clone(),
        };
        assert!(!verify_dkg_finalize_signature(&as_finalize).unwrap());
    }

    #[test]
    fn test_complaint_checks_round_and_reset() {
        let dealer = Signer::new(test_private_key(12));
        let complainer = Signer::new(test_private_key(13));
        let share = signed_share(&dealer, complainer.proposer_id(), 4, 1);

        let mut complaint = Complaint {
            proposer_id: NodeId::default(),
            round: 4,
            reset: 1,
            private_share: share,
            signature: Signature::default(),
        };
        complainer.sign_dkg_complaint(&mut complaint).unwrap();
        assert!(verify_dkg_complaint_signature(&complaint).unwrap());

        let mut wrong_reset = complaint.clone();
        wrong_reset.reset = 2;
        complainer.sign_dkg_complaint(&mut wrong_reset).unwrap();
        assert!(!verify_dkg_complaint_signature(&wrong_reset).unwrap());
    }

    #[test]
    fn test_complaint_recurses_into_share() {
        let dealer = Signer::new(test_private_key(12));
        let complainer = Signer::new(test_private_key(13));
        let mut share = signed_share(&dealer, complainer.proposer_id(), 4, 0);
        // Claim the share came from someone else: its signature no longer matches.
        share.proposer_id = complainer.proposer_id();

        let mut complaint = Complaint {
            proposer_id: NodeId::default(),
            round: 4,
            reset: 0,
            private_share: share,
            signature: Signature::default(),
        };
        complainer.sign_dkg_complaint(&mut complaint).unwrap();
        assert!(!complaint.is_nack());
        assert!(!verify_dkg_complaint_signature(&complaint).unwrap());
    }

    #[test]
    fn test_nack_complaint_skips_share() {
        let complainer = Signer::new(test_private_key(13));
        let mut complaint = Complaint {
            proposer_id: NodeId::default(),
            round: 4,
            reset: 0,
            private_share: PrivateShare {
                proposer_id: NodeId(test_hash("silent-dealer")),
                receiver_id: complainer.proposer_id(),
                round: 4,
                reset: 0,
                private_share: test_bls_key(0),
                signature: Signature::default(),
            },
            signature: Signature::default(),
        };
        complainer.sign_dkg_complaint(&mut complaint).unwrap();
        assert!(complaint.is_nack());
        assert!(verify_dkg_complaint_signature(&complaint).unwrap());
    }
}
