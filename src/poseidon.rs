//! Poseidon (t=3, α=5) sponge: commitments, nullifiers, and SMT hashing
//!
//! §9 (Open Question 1) of the design flags that the original engine's round
//! constant table diverges from the standard circomlib layout and
//! deliberately demotes its known-answer self-test to a warning. That is
//! exactly the kind of ambiguity this crate is told not to guess at: we pin
//! the parameter set to the one canonical reference (circomlib's BN254
//! Poseidon, width `t = 3`, `alpha = 5`, `R_F = 8`, `R_P = 57`) via the
//! `light-poseidon` crate, which ships those exact round constants and MDS
//! matrix, and we make the known-answer test a hard failure, not a warning.
//! Commitments produced by this module are therefore interoperable with any
//! other circomlib-compatible Poseidon implementation; they were not with
//! the original engine's table.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::field::FieldError;

/// Errors raised by Poseidon hashing.
#[derive(Debug, thiserror::Error)]
pub enum PoseidonError {
    #[error("poseidon accepts at most 2 inputs (t=3), got {0}")]
    TooManyInputs(usize),
    #[error("poseidon accepts at least 1 input, got 0")]
    NoInputs,
    #[error("underlying poseidon permutation failed: {0}")]
    Permutation(String),
    #[error("field decode error: {0}")]
    Field(#[from] FieldError),
}

fn sponge(nr_inputs: usize) -> Result<Poseidon<Fr>, PoseidonError> {
    Poseidon::<Fr>::new_circom(nr_inputs)
        .map_err(|e| PoseidonError::Permutation(e.to_string()))
}

/// Absorb `inputs` (1 or 2 field elements, since state width is `t = 3` —
/// one capacity lane plus one lane per input) and return the single output
/// lane after the full permutation (8 full rounds + 57 partial rounds).
pub fn hash(inputs: &[Fr]) -> Result<Fr, PoseidonError> {
    if inputs.is_empty() {
        return Err(PoseidonError::NoInputs);
    }
    if inputs.len() > 2 {
        return Err(PoseidonError::TooManyInputs(inputs.len()));
    }
    let mut p = sponge(inputs.len())?;
    p.hash(inputs)
        .map_err(|e| PoseidonError::Permutation(e.to_string()))
}

/// `commitment = Poseidon(score, secret)`, serialized as a 32-byte
/// big-endian field element (standard form, never Montgomery).
pub fn commitment(score: u16, secret: &[u8; 32]) -> Result<[u8; 32], PoseidonError> {
    let score_f = Fr::from(score as u64);
    let secret_f = Fr::from_be_bytes_mod_order(secret);
    let out = hash(&[score_f, secret_f])?;
    Ok(fr_to_be_bytes(&out))
}

/// `nullifier = Poseidon(agent_pk, nonce)`. One-shot tag that prevents
/// replay without revealing the agent key: distinct nonces for the same
/// `agent_pk` are computationally unlinkable (Poseidon's algebraic but
/// pseudorandom output), and the same `(agent_pk, nonce)` pair always
/// reproduces the same nullifier.
pub fn nullifier(agent_pk: &Fr, nonce: u64) -> Result<Fr, PoseidonError> {
    hash(&[*agent_pk, Fr::from(nonce)])
}

/// Convenience wrapper matching the wire-level `compute_nullifier` helper:
/// takes a 32-byte agent public key and returns a 32-byte big-endian
/// nullifier.
pub fn nullifier_bytes(agent_pk: &[u8; 32], nonce: u64) -> Result<[u8; 32], PoseidonError> {
    let pk_f = Fr::from_be_bytes_mod_order(agent_pk);
    let out = nullifier(&pk_f, nonce)?;
    Ok(fr_to_be_bytes(&out))
}

fn fr_to_be_bytes(x: &Fr) -> [u8; 32] {
    let le = x.into_bigint().to_bytes_le();
    let mut out = [0u8; 32];
    for (dst, src) in out.iter_mut().zip(le.iter().rev()) {
        *dst = *src;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hard known-answer test against the circomlib BN254 Poseidon(1, 2)
    /// reference value — the same parameter family every other
    /// circomlib-compatible implementation (circuits, circomlibjs, and
    /// `light-poseidon` itself) produces. Per §9 this MUST hard-fail, not
    /// merely warn, if the parameter table ever drifts.
    #[test]
    fn known_answer_vector_circomlib_poseidon_1_2() {
        let out = hash(&[Fr::from(1u64), Fr::from(2u64)]).expect("poseidon(1,2) must succeed");
        let expected: Fr =
            "7853200120776062878684798364095072458815029376092732009249414926327459813530"
                .parse()
                .unwrap();
        assert_eq!(out, expected, "poseidon(1,2) diverged from the circomlib reference vector");
    }

    #[test]
    fn hash_is_a_pure_function() {
        let a = hash(&[Fr::from(11u64), Fr::from(22u64)]).unwrap();
        let b = hash(&[Fr::from(11u64), Fr::from(22u64)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn commitment_roundtrips_through_bytes_and_is_deterministic() {
        let secret = [1u8; 32];
        let c1 = commitment(7500, &secret).unwrap();
        let c2 = commitment(7500, &secret).unwrap();
        assert_eq!(c1, c2);

        let mut flipped = c1;
        flipped[0] ^= 0x01;
        assert_ne!(flipped, c1);
    }

    #[test]
    fn nullifier_is_deterministic_and_domain_separated_by_nonce() {
        let pk = [0x42u8; 32];
        let n1 = nullifier_bytes(&pk, 12345).unwrap();
        let n2 = nullifier_bytes(&pk, 12345).unwrap();
        assert_eq!(n1, n2);

        let n0 = nullifier_bytes(&pk, 0).unwrap();
        let n1_alt = nullifier_bytes(&pk, 1).unwrap();
        assert_ne!(n0, n1_alt);
    }

    #[test]
    fn rejects_out_of_range_input_counts() {
        assert!(matches!(hash(&[]), Err(PoseidonError::NoInputs)));
        assert!(matches!(
            hash(&[Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)]),
            Err(PoseidonError::TooManyInputs(3))
        ));
    }
}
