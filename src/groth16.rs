//! Groth16 single-proof verification over BN254
//!
//! The verification key layout matches the wire form from §6: `α (64) ||
//! β (128) || γ (128) || δ (128) || ic_len (4, LE) || IC[0..ic_len-1] (64
//! each)`, all points uncompressed big-endian affine, the same per-coordinate
//! encoding `proof.rs` uses for A/B/C. `e(α, β)` is computed once at load
//! time and cached on the key, mirroring the teacher's KZG opening verifier
//! precomputing `e(g2, beta_g2)` once in `PcsParams`.

use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;

use crate::curve::{self, CurveError, GtElement};
use crate::pairing::{self, PairingError};

/// Errors raised while loading a verifying key or checking the Groth16
/// equation.
#[derive(Debug, thiserror::Error)]
pub enum Groth16Error {
    #[error("verifying key blob too short: need at least {need}, got {got}")]
    BadVkLength { need: usize, got: usize },
    #[error("verifying key blob length mismatch: ic_len={ic_len} implies {expected} bytes, got {got}")]
    IcLengthMismatch {
        ic_len: u32,
        expected: usize,
        got: usize,
    },
    #[error("verifying key must have at least one IC point (IC[0])")]
    EmptyIc,
    #[error("public input count {got} does not match len(IC) - 1 = {expected}")]
    PublicInputCountMismatch { expected: usize, got: usize },
    #[error("verifying key point invalid: {0}")]
    Curve(#[from] CurveError),
    #[error("pairing evaluation failed: {0}")]
    Pairing(#[from] PairingError),
}

const G1_POINT_SIZE: usize = 64;
const G2_POINT_SIZE: usize = 128;
const VK_FIXED_SIZE: usize = G1_POINT_SIZE + 3 * G2_POINT_SIZE + 4; // alpha + beta/gamma/delta + ic_len

/// A loaded Groth16 verifying key: `α ∈ G1`, `β, γ, δ ∈ G2`, and `IC`, an
/// ordered vector of G1 points of length `n_inputs + 1`. Immutable after
/// construction (§3's verification-context lifecycle); `alpha_beta` is
/// computed once here so every subsequent `verify` call skips straight to
/// the left-hand side.
#[derive(Debug, Clone)]
pub struct VerifyingKey {
    pub alpha: G1Affine,
    pub beta: G2Affine,
    pub gamma: G2Affine,
    pub delta: G2Affine,
    pub ic: Vec<G1Affine>,
    pub alpha_beta: GtElement,
}

impl VerifyingKey {
    /// Number of public inputs this key expects (`len(IC) - 1`).
    pub fn n_inputs(&self) -> usize {
        self.ic.len().saturating_sub(1)
    }

    /// Parse and validate a verifying-key blob per §6's wire format. Every
    /// constituent point is run through the same on-curve/subgroup gate as
    /// proof points; a key built from a malformed blob can never be loaded.
    pub fn parse(bytes: &[u8]) -> Result<Self, Groth16Error> {
        if bytes.len() < VK_FIXED_SIZE {
            return Err(Groth16Error::BadVkLength {
                need: VK_FIXED_SIZE,
                got: bytes.len(),
            });
        }

        let mut off = 0;
        let alpha = decode_g1(&bytes[off..off + G1_POINT_SIZE])?;
        off += G1_POINT_SIZE;
        let beta = decode_g2(&bytes[off..off + G2_POINT_SIZE])?;
        off += G2_POINT_SIZE;
        let gamma = decode_g2(&bytes[off..off + G2_POINT_SIZE])?;
        off += G2_POINT_SIZE;
        let delta = decode_g2(&bytes[off..off + G2_POINT_SIZE])?;
        off += G2_POINT_SIZE;

        let ic_len = u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]]);
        off += 4;

        let expected_total = VK_FIXED_SIZE + (ic_len as usize) * G1_POINT_SIZE;
        if bytes.len() != expected_total {
            return Err(Groth16Error::IcLengthMismatch {
                ic_len,
                expected: expected_total,
                got: bytes.len(),
            });
        }
        if ic_len == 0 {
            return Err(Groth16Error::EmptyIc);
        }

        let mut ic = Vec::with_capacity(ic_len as usize);
        for _ in 0..ic_len {
            ic.push(decode_g1(&bytes[off..off + G1_POINT_SIZE])?);
            off += G1_POINT_SIZE;
        }

        curve::validate_g1(&alpha)?;
        curve::validate_g2(&beta)?;
        curve::validate_g2(&gamma)?;
        curve::validate_g2(&delta)?;
        for p in &ic {
            curve::validate_g1(p)?;
        }

        let alpha_beta = pairing::pair(&alpha, &beta)?;

        Ok(VerifyingKey {
            alpha,
            beta,
            gamma,
            delta,
            ic,
            alpha_beta,
        })
    }

    /// `IC_acc = IC[0] + Σᵢ xᵢ · IC[i+1]`.
    pub fn accumulate_inputs(&self, public_inputs: &[Fr]) -> Result<G1Affine, Groth16Error> {
        let expected = self.n_inputs();
        if public_inputs.len() != expected {
            return Err(Groth16Error::PublicInputCountMismatch {
                expected,
                got: public_inputs.len(),
            });
        }
        use ark_ec::{AffineRepr, CurveGroup};
        let mut acc = self.ic[0].into_group();
        for (x, p) in public_inputs.iter().zip(self.ic[1..].iter()) {
            acc += curve::scalar_mul_g1(p, x).into_group();
        }
        Ok(acc.into_affine())
    }
}

fn decode_fq(bytes: &[u8]) -> Fq {
    Fq::from_be_bytes_mod_order(bytes)
}

fn decode_g1(bytes: &[u8]) -> Result<G1Affine, CurveError> {
    let x = decode_fq(&bytes[0..32]);
    let y = decode_fq(&bytes[32..64]);
    use ark_ff::Zero;
    if x.is_zero() && y.is_zero() {
        use ark_ec::AffineRepr;
        return Ok(G1Affine::identity());
    }
    Ok(G1Affine::new_unchecked(x, y))
}

fn decode_g2(bytes: &[u8]) -> Result<G2Affine, CurveError> {
    let x = Fq2::new(decode_fq(&bytes[0..32]), decode_fq(&bytes[32..64]));
    let y = Fq2::new(decode_fq(&bytes[64..96]), decode_fq(&bytes[96..128]));
    use ark_ff::Zero;
    if x.is_zero() && y.is_zero() {
        use ark_ec::AffineRepr;
        return Ok(G2Affine::identity());
    }
    Ok(G2Affine::new_unchecked(x, y))
}

/// Evaluate the Groth16 verification equation (§4.6):
/// `e(A, B) · e(−IC_acc, γ) · e(−C, δ) = e(α, β)`.
///
/// Implemented as a single multi-pairing over three pairs compared against
/// the cached `e(α, β)`, rather than three separate pairings, for the same
/// reason the batch verifier amortizes its final exponentiation: one Miller
/// loop interleave, one final exponentiation.
pub fn verify(
    vk: &VerifyingKey,
    a: &G1Affine,
    b: &G2Affine,
    c: &G1Affine,
    public_inputs: &[Fr],
) -> Result<bool, Groth16Error> {
    let ic_acc = vk.accumulate_inputs(public_inputs)?;
    let neg_ic_acc = -ic_acc;
    let neg_c = -*c;

    let ps = [*a, neg_ic_acc, neg_c];
    let qs = [*b, vk.gamma, vk.delta];
    Ok(pairing::multi_pairing_equals(&ps, &qs, &vk.alpha_beta)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::{AffineRepr, CurveGroup, Group};
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    /// Build a toy Groth16 instance the way a trusted setup would: pick
    /// random `alpha, beta, gamma, delta, tau` and a single witness scalar,
    /// then hand-construct A/B/C and IC so the verification equation holds
    /// exactly. This is not a real circuit — it's the minimal algebraic
    /// witness needed to exercise `verify`'s equation end-to-end.
    struct Toy {
        vk: VerifyingKey,
        a: G1Affine,
        b: G2Affine,
        c: G1Affine,
        x: Fr,
    }

    fn build_toy() -> Toy {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let g1 = ark_bn254::G1Projective::generator();
        let g2 = ark_bn254::G2Projective::generator();

        let alpha_s = Fr::rand(&mut rng);
        let beta_s = Fr::rand(&mut rng);
        let gamma_s = Fr::rand(&mut rng);
        let delta_s = Fr::rand(&mut rng);
        let x = Fr::rand(&mut rng);
        let ic0_s = Fr::rand(&mut rng);
        let ic1_s = Fr::rand(&mut rng);

        let alpha = (g1 * alpha_s).into_affine();
        let beta = (g2 * beta_s).into_affine();
        let gamma = (g2 * gamma_s).into_affine();
        let delta = (g2 * delta_s).into_affine();
        let ic0 = (g1 * ic0_s).into_affine();
        let ic1 = (g1 * ic1_s).into_affine();

        // Choose A, C freely (random), then solve for B such that
        // e(A,B) = e(alpha,beta) * e(IC_acc, gamma) * e(C, delta).
        // Work entirely in the exponent since all bases are known scalars
        // of fixed generators: pick b_s with A = g1^a_s, and set
        // a_s * b_s = alpha_s*beta_s + (ic0_s + x*ic1_s)*gamma_s + c_s*delta_s.
        let a_s = Fr::rand(&mut rng);
        let c_s = Fr::rand(&mut rng);
        let ic_acc_s = ic0_s + x * ic1_s;
        let rhs_exp = alpha_s * beta_s + ic_acc_s * gamma_s + c_s * delta_s;
        let b_s = rhs_exp * a_s.inverse().expect("a_s sampled nonzero w.h.p.");

        let a = (g1 * a_s).into_affine();
        let b = (g2 * b_s).into_affine();
        let c = (g1 * c_s).into_affine();

        let alpha_beta = crate::pairing::pair(&alpha, &beta).unwrap();
        let vk = VerifyingKey {
            alpha,
            beta,
            gamma,
            delta,
            ic: vec![ic0, ic1],
            alpha_beta,
        };

        Toy { vk, a, b, c, x }
    }

    #[test]
    fn honest_proof_verifies() {
        let t = build_toy();
        assert!(verify(&t.vk, &t.a, &t.b, &t.c, &[t.x]).unwrap());
    }

    #[test]
    fn wrong_public_input_fails() {
        let t = build_toy();
        let wrong = t.x + Fr::from(1u64);
        assert!(!verify(&t.vk, &t.a, &t.b, &t.c, &[wrong]).unwrap());
    }

    #[test]
    fn mutated_c_fails() {
        let t = build_toy();
        let mutated_c = (t.c.into_group() + ark_bn254::G1Projective::generator()).into_affine();
        assert!(!verify(&t.vk, &t.a, &t.b, &mutated_c, &[t.x]).unwrap());
    }

    #[test]
    fn wrong_public_input_count_is_an_error() {
        let t = build_toy();
        assert!(matches!(
            verify(&t.vk, &t.a, &t.b, &t.c, &[]),
            Err(Groth16Error::PublicInputCountMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn vk_wire_roundtrip() {
        let t = build_toy();
        let mut blob = Vec::new();
        encode_g1(&mut blob, &t.vk.alpha);
        encode_g2(&mut blob, &t.vk.beta);
        encode_g2(&mut blob, &t.vk.gamma);
        encode_g2(&mut blob, &t.vk.delta);
        blob.extend_from_slice(&(t.vk.ic.len() as u32).to_le_bytes());
        for p in &t.vk.ic {
            encode_g1(&mut blob, p);
        }

        let parsed = VerifyingKey::parse(&blob).unwrap();
        assert_eq!(parsed.alpha, t.vk.alpha);
        assert_eq!(parsed.ic, t.vk.ic);
        assert!(verify(&parsed, &t.a, &t.b, &t.c, &[t.x]).unwrap());
    }

    fn encode_fq(out: &mut Vec<u8>, v: &Fq) {
        use ark_ff::BigInteger;
        let le = v.into_bigint().to_bytes_le();
        let mut be = le;
        be.reverse();
        out.extend_from_slice(&be);
    }

    fn encode_g1(out: &mut Vec<u8>, p: &G1Affine) {
        let (x, y) = p.xy().unwrap_or((Fq::from(0u64), Fq::from(0u64)));
        encode_fq(out, &x);
        encode_fq(out, &y);
    }

    fn encode_g2(out: &mut Vec<u8>, p: &G2Affine) {
        let (x, y) = p
            .xy()
            .unwrap_or((Fq2::new(Fq::from(0u64), Fq::from(0u64)), Fq2::new(Fq::from(0u64), Fq::from(0u64))));
        encode_fq(out, &x.c0);
        encode_fq(out, &x.c1);
        encode_fq(out, &y.c0);
        encode_fq(out, &y.c1);
    }

    #[test]
    fn rejects_short_blob() {
        assert!(matches!(
            VerifyingKey::parse(&[0u8; 10]),
            Err(Groth16Error::BadVkLength { .. })
        ));
    }
}
