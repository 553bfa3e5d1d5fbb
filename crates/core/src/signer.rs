//! Signing of blocks, votes, CRS values and DKG messages.

use crate::{SignerError, ThresholdSigner};
use meridian_types::signing::{self, DKG_DELAY_ROUND};
use meridian_types::{
    Block, Complaint, Finalize, Hash, MasterPublicKey, MpkReady, NodeId, PartialSignature,
    PrivateKey, PublicKey, PrivateShare, Signature, SignatureScheme, Success, Vote,
};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Signs structures with a node's key.
///
/// Every `sign_*` method first stamps the signer's identity into the structure
/// and then writes the signature. If signing fails, the identity (and for
/// blocks the payload hash and hash) stays written while the signature field
/// keeps its previous value.
pub struct Signer {
    private_key: PrivateKey,
    public_key: PublicKey,
    proposer_id: NodeId,
    threshold_signer: Option<Arc<dyn ThresholdSigner>>,
}

impl Signer {
    pub fn new(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            proposer_id: public_key.node_id(),
            private_key,
            public_key,
            threshold_signer: None,
        }
    }

    /// Install the threshold signer used for CRS signatures from
    /// [`DKG_DELAY_ROUND`] on.
    pub fn set_threshold_signer(&mut self, signer: Arc<dyn ThresholdSigner>) {
        self.threshold_signer = Some(signer);
    }

    pub fn has_threshold_signer(&self) -> bool {
        self.threshold_signer.is_some()
    }

    pub fn proposer_id(&self) -> NodeId {
        self.proposer_id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Stamp proposer, payload hash and hash into `block`, then sign the hash.
    pub fn sign_block(&self, block: &mut Block) -> Result<(), SignerError> {
        block.proposer_id = self.proposer_id;
        block.payload_hash = signing::hash_payload(&block.payload);
        block.hash = signing::hash_block(block);
        block.signature = self.private_key.sign(&block.hash)?;
        trace!(hash = ?block.hash, position = %block.position, "Signed block");
        Ok(())
    }

    pub fn sign_vote(&self, vote: &mut Vote) -> Result<(), SignerError> {
        vote.header.proposer_id = self.proposer_id;
        vote.signature = self.private_key.sign(&signing::hash_vote(vote))?;
        Ok(())
    }

    /// Attach the CRS signature for `crs` to a block proposed by this node.
    ///
    /// Before [`DKG_DELAY_ROUND`] no threshold key exists yet, so the stored
    /// value is the CRS digest itself (a commitment, not a signature). From
    /// that round on the installed [`ThresholdSigner`] produces it.
    pub fn sign_crs(&self, block: &mut Block, crs: &Hash) -> Result<(), SignerError> {
        if block.proposer_id != self.proposer_id {
            return Err(SignerError::InvalidProposerId);
        }
        let digest = signing::hash_crs(block, crs);
        if block.position.round < DKG_DELAY_ROUND {
            block.crs_signature = Signature::new(SignatureScheme::Bls, digest.0.to_vec());
            return Ok(());
        }
        let signer = self
            .threshold_signer
            .as_ref()
            .ok_or(SignerError::NoThresholdSigner)?;
        block.crs_signature = signer.sign(block.position.round, &digest)?;
        Ok(())
    }

    pub fn sign_dkg_complaint(&self, complaint: &mut Complaint) -> Result<(), SignerError> {
        complaint.proposer_id = self.proposer_id;
        complaint.signature = self
            .private_key
            .sign(&signing::hash_dkg_complaint(complaint))?;
        Ok(())
    }

    pub fn sign_dkg_master_public_key(&self, mpk: &mut MasterPublicKey) -> Result<(), SignerError> {
        mpk.proposer_id = self.proposer_id;
        mpk.signature = self
            .private_key
            .sign(&signing::hash_dkg_master_public_key(mpk))?;
        Ok(())
    }

    pub fn sign_dkg_private_share(&self, share: &mut PrivateShare) -> Result<(), SignerError> {
        share.proposer_id = self.proposer_id;
        share.signature = self
            .private_key
            .sign(&signing::hash_dkg_private_share(share))?;
        Ok(())
    }

    pub fn sign_dkg_partial_signature(
        &self,
        psig: &mut PartialSignature,
    ) -> Result<(), SignerError> {
        psig.proposer_id = self.proposer_id;
        psig.signature = self
            .private_key
            .sign(&signing::hash_dkg_partial_signature(psig))?;
        Ok(())
    }

    pub fn sign_dkg_mpk_ready(&self, ready: &mut MpkReady) -> Result<(), SignerError> {
        ready.proposer_id = self.proposer_id;
        ready.signature = self.private_key.sign(&signing::hash_dkg_mpk_ready(ready))?;
        Ok(())
    }

    pub fn sign_dkg_finalize(&self, finalize: &mut Finalize) -> Result<(), SignerError> {
        finalize.proposer_id = self.proposer_id;
        finalize.signature = self
            .private_key
            .sign(&signing::hash_dkg_finalize(finalize))?;
        Ok(())
    }

    pub fn sign_dkg_success(&self, success: &mut Success) -> Result<(), SignerError> {
        success.proposer_id = self.proposer_id;
        success.signature = self.private_key.sign(&signing::hash_dkg_success(success))?;
        Ok(())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("proposer_id", &self.proposer_id)
            .field("threshold_signer", &self.threshold_signer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::test_utils::{test_block, test_bls_key, test_hash, test_private_key};
    use meridian_types::{CryptoError, Position, VoteType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_sign_block_stamps_fields() {
        let signer = Signer::new(test_private_key(1));
        let mut block = test_block(Position::new(0, 5));

        signer.sign_block(&mut block).unwrap();

        assert_eq!(block.proposer_id, signer.proposer_id());
        assert_eq!(block.payload_hash, signing::hash_payload(&block.payload));
        assert_eq!(block.hash, signing::hash_block(&block));
        assert_eq!(block.signature.scheme, SignatureScheme::Ecdsa);
        assert!(!block.signature.is_empty());
    }

    #[test]
    fn test_sign_vote_sets_proposer() {
        let signer = Signer::new(test_private_key(2));
        let mut vote = Vote::new(VoteType::Com, test_hash("b"), 0);
        signer.sign_vote(&mut vote).unwrap();
        assert_eq!(vote.header.proposer_id, signer.proposer_id());
        assert!(!vote.signature.is_empty());
    }

    #[test]
    fn test_sign_crs_rejects_foreign_block() {
        let signer = Signer::new(test_private_key(3));
        let mut block = test_block(Position::new(0, 1));
        block.proposer_id = NodeId(test_hash("someone-else"));

        let result = signer.sign_crs(&mut block, &test_hash("crs"));
        assert!(matches!(result, Err(SignerError::InvalidProposerId)));
        assert!(block.crs_signature.is_empty());
    }

    #[test]
    fn test_sign_crs_before_threshold_stores_digest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut signer = Signer::new(test_private_key(4));
        let counter = calls.clone();
        signer.set_threshold_signer(Arc::new(move |_round: u64, _digest: &Hash| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CryptoError>(Signature::default())
        }));

        let crs = test_hash("crs");
        let mut block = test_block(Position::new(DKG_DELAY_ROUND - 1, 1));
        signer.sign_block(&mut block).unwrap();
        signer.sign_crs(&mut block, &crs).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(block.crs_signature.bytes, signing::hash_crs(&block, &crs).0.to_vec());
    }

    #[test]
    fn test_sign_crs_after_threshold_requires_signer() {
        let signer = Signer::new(test_private_key(5));
        let mut block = test_block(Position::new(DKG_DELAY_ROUND, 1));
        signer.sign_block(&mut block).unwrap();

        let result = signer.sign_crs(&mut block, &test_hash("crs"));
        assert!(matches!(result, Err(SignerError::NoThresholdSigner)));
        assert!(block.crs_signature.is_empty());
    }

    #[test]
    fn test_sign_crs_after_threshold_delegates() {
        let mut signer = Signer::new(test_private_key(6));
        let bls = test_bls_key(6);
        signer.set_threshold_signer(Arc::new(move |_round: u64, digest: &Hash| {
            Ok::<_, CryptoError>(bls.sign(digest))
        }));

        let crs = test_hash("crs");
        let mut block = test_block(Position::new(DKG_DELAY_ROUND + 2, 1));
        signer.sign_block(&mut block).unwrap();
        signer.sign_crs(&mut block, &crs).unwrap();

        let digest = signing::hash_crs(&block, &crs);
        assert!(test_bls_key(6).public_key().verify(&digest, &block.crs_signature));
    }
}
