//! Sparse Merkle Tree non-membership (exclusion proof) verification
//!
//! An exclusion proof witnesses that a `leaf` is *absent* from the tree
//! rooted at `root`: a path of up to 256 `(direction_bit, 32-byte sibling)`
//! pairs, each level folded with Poseidon exactly like the commitment and
//! nullifier helpers in [`crate::poseidon`]. §9's hard length bound
//! (`32 <= len <= 32 + 256*33`) is enforced before any hashing starts. The
//! records occupy the *front* of the buffer (`depth = (len - 32) / 33`
//! records, 33 bytes each, starting at offset 0); the trailing 32 bytes are
//! reserved padding the original engine never reads and this port doesn't
//! either.

use crate::poseidon::{self, PoseidonError};

/// Maximum tree depth this crate will walk (§9: "depth 256 covers every
/// practical blacklist").
pub const MAX_DEPTH: usize = crate::SMT_MAX_DEPTH;

const SIBLING_RECORD_SIZE: usize = 33; // 1 direction byte + 32 sibling bytes

/// Errors raised while walking an exclusion proof.
#[derive(Debug, thiserror::Error)]
pub enum SmtError {
    #[error("exclusion proof length {0} is outside [32, {max}]", max = 32 + MAX_DEPTH * SIBLING_RECORD_SIZE)]
    BadLength(usize),
    #[error("direction byte {0} is neither 0 nor 1")]
    BadDirection(u8),
    #[error("poseidon hashing failed while folding the path: {0}")]
    Hash(#[from] PoseidonError),
}

/// Walk the exclusion proof and report whether `leaf` is excluded from the
/// tree rooted at `root`.
///
/// Layout: `depth = (proof.len() - 32) / 33` records of `(direction: 1
/// byte, sibling: 32 bytes)`, most-significant level first, starting at
/// offset 0; the trailing 32 bytes are reserved and never read. At each
/// level: `cur = Poseidon(left, right)` where `(left, right)` is `(cur,
/// sibling)` if `direction == 0` else `(sibling, cur)`; any other direction
/// byte is rejected outright. The walk starts from `leaf` and the proof
/// excludes it iff the final folded value equals `root`.
pub fn verify_exclusion(root: &[u8; 32], leaf: &[u8; 32], proof: &[u8]) -> Result<bool, SmtError> {
    let min_len = 32;
    let max_len = 32 + MAX_DEPTH * SIBLING_RECORD_SIZE;
    if proof.len() < min_len || proof.len() > max_len {
        return Err(SmtError::BadLength(proof.len()));
    }
    if (proof.len() - min_len) % SIBLING_RECORD_SIZE != 0 {
        return Err(SmtError::BadLength(proof.len()));
    }
    let depth = (proof.len() - min_len) / SIBLING_RECORD_SIZE;
    let records = &proof[..depth * SIBLING_RECORD_SIZE];

    let mut cur = *leaf;
    for chunk in records.chunks_exact(SIBLING_RECORD_SIZE) {
        let direction = chunk[0];
        if direction > 1 {
            return Err(SmtError::BadDirection(direction));
        }
        let mut sibling = [0u8; 32];
        sibling.copy_from_slice(&chunk[1..33]);

        let (left, right) = if direction == 0 {
            (cur, sibling)
        } else {
            (sibling, cur)
        };
        cur = fold(&left, &right)?;
    }

    Ok(&cur == root)
}

fn fold(left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32], PoseidonError> {
    use ark_bn254::Fr;
    use ark_ff::PrimeField;

    let l = Fr::from_be_bytes_mod_order(left);
    let r = Fr::from_be_bytes_mod_order(right);
    let out = poseidon::hash(&[l, r])?;

    use ark_ff::BigInteger;
    let le = out.into_bigint().to_bytes_le();
    let mut be = [0u8; 32];
    for (dst, src) in be.iter_mut().zip(le.iter().rev()) {
        *dst = *src;
    }
    Ok(be)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_proof(levels: &[(u8, [u8; 32])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (dir, sib) in levels {
            out.push(*dir);
            out.extend_from_slice(sib);
        }
        out.extend_from_slice(&[0u8; 32]); // trailing reserved padding, never read
        out
    }

    #[test]
    fn empty_path_means_leaf_must_equal_root() {
        let leaf = [7u8; 32];
        let proof = build_proof(&[]);
        assert!(verify_exclusion(&leaf, &leaf, &proof).unwrap());
        let other_root = [9u8; 32];
        assert!(!verify_exclusion(&other_root, &leaf, &proof).unwrap());
    }

    #[test]
    fn single_level_path_matches_manual_fold() {
        let leaf = [1u8; 32];
        let sibling = [2u8; 32];
        let proof = build_proof(&[(0u8, sibling)]);
        let expected = fold(&leaf, &sibling).unwrap();
        assert!(verify_exclusion(&expected, &leaf, &proof).unwrap());
        assert!(!verify_exclusion(&leaf, &leaf, &proof).unwrap());
    }

    #[test]
    fn direction_bit_changes_the_fold_order() {
        let leaf = [1u8; 32];
        let sibling = [2u8; 32];
        let left_fold = fold(&leaf, &sibling).unwrap();
        let right_fold = fold(&sibling, &leaf).unwrap();
        assert_ne!(left_fold, right_fold);

        let proof_dir0 = build_proof(&[(0u8, sibling)]);
        let proof_dir1 = build_proof(&[(1u8, sibling)]);
        assert!(verify_exclusion(&left_fold, &leaf, &proof_dir0).unwrap());
        assert!(verify_exclusion(&right_fold, &leaf, &proof_dir1).unwrap());
        assert!(!verify_exclusion(&left_fold, &leaf, &proof_dir1).unwrap());
    }

    #[test]
    fn rejects_too_short_proof() {
        assert!(matches!(
            verify_exclusion(&[0u8; 32], &[0u8; 32], &[0u8; 10]),
            Err(SmtError::BadLength(10))
        ));
    }

    #[test]
    fn rejects_too_long_proof() {
        let too_long = vec![0u8; 32 + MAX_DEPTH * SIBLING_RECORD_SIZE + SIBLING_RECORD_SIZE];
        assert!(matches!(verify_exclusion(&[0u8; 32], &[0u8; 32], &too_long), Err(SmtError::BadLength(_))));
    }

    #[test]
    fn rejects_misaligned_trailing_bytes() {
        let mut proof = build_proof(&[(0u8, [3u8; 32])]);
        proof.push(0xAA); // one stray byte, breaks the 33-byte record alignment
        assert!(matches!(
            verify_exclusion(&[0u8; 32], &[0u8; 32], &proof),
            Err(SmtError::BadLength(_))
        ));
    }

    #[test]
    fn rejects_non_canonical_direction_byte() {
        let mut proof = build_proof(&[(0u8, [3u8; 32])]);
        proof[0] = 2; // direction byte is only ever 0 or 1
        assert!(matches!(
            verify_exclusion(&[0u8; 32], &[0u8; 32], &proof),
            Err(SmtError::BadDirection(2))
        ));
    }

    #[test]
    fn max_depth_path_is_accepted() {
        let leaf = [0u8; 32];
        let levels: Vec<(u8, [u8; 32])> = (0..MAX_DEPTH).map(|i| ((i % 2) as u8, [i as u8; 32])).collect();
        let proof = build_proof(&levels);

        let mut cur = leaf;
        for (dir, sib) in &levels {
            cur = if *dir == 0 { fold(&cur, sib).unwrap() } else { fold(sib, &cur).unwrap() };
        }
        assert!(verify_exclusion(&cur, &leaf, &proof).unwrap());
    }
}
