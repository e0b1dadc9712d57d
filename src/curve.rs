//! G1 / G2 / GT group operations, on-curve and subgroup validation
//!
//! Affine group elements are `ark_bn254::{G1Affine, G2Affine}`; arithmetic
//! (add, double, scalar multiply, negation) is `ark_ec`'s, which already
//! runs a constant-time Montgomery-ladder-style scalar multiplication and
//! never branches on the secret scalar's bits. This module's job is the
//! validation gate every externally supplied point must pass before it is
//! allowed to reach a pairing: on-curve, correct-subgroup, and (for A/C)
//! non-infinity.

use ark_bn254::{Fq12, G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;

/// Errors raised while validating a curve point. Exposed internally for
/// tests and logging; the public boundary collapses all of these to
/// `MALFORMED` or `INVALID_POINT` per §4.5/§7.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("point is not on the curve")]
    NotOnCurve,
    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,
    #[error("point must not be the identity")]
    UnexpectedInfinity,
}

/// Validate a G1 point: on-curve and in the prime-order subgroup. Does not
/// reject infinity — callers that require a non-trivial point (Groth16's A
/// and C, per §4.5 step 5) call [`require_non_infinite_g1`] afterwards.
pub fn validate_g1(p: &G1Affine) -> Result<(), CurveError> {
    if p.is_zero() {
        return Ok(());
    }
    if !p.is_on_curve() {
        return Err(CurveError::NotOnCurve);
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CurveError::NotInSubgroup);
    }
    Ok(())
}

/// Validate a G2 point. G2 has a non-trivial cofactor on the twist, so the
/// subgroup check here is mandatory, not optional (§4.2).
pub fn validate_g2(p: &G2Affine) -> Result<(), CurveError> {
    if p.is_zero() {
        return Ok(());
    }
    if !p.is_on_curve() {
        return Err(CurveError::NotOnCurve);
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CurveError::NotInSubgroup);
    }
    Ok(())
}

/// Reject the point at infinity. Groth16 proofs must have non-trivial A
/// and C (§4.5 step 5); a trivial A or C is never produced by an honest
/// prover and is treated as malformed.
pub fn require_non_infinite_g1(p: &G1Affine) -> Result<(), CurveError> {
    if p.is_zero() {
        return Err(CurveError::UnexpectedInfinity);
    }
    Ok(())
}

/// `s * P` using `ark_ec`'s constant-time scalar multiplication. Scalar
/// multiplication of the neutral element returns the neutral element.
pub fn scalar_mul_g1(p: &G1Affine, s: &ark_bn254::Fr) -> G1Affine {
    (p.into_group() * s).into_affine()
}

/// Sum of G1 points (naive accumulation; the MSM-heavy paths in `batch`
/// use `ark_ec::VariableBaseMSM` instead for sublinear cost).
pub fn sum_g1(points: &[G1Affine]) -> G1Affine {
    points
        .iter()
        .fold(G1Projective::default(), |acc, p| acc + p.into_group())
        .into_affine()
}

/// An opaque element of the order-r subgroup of `Fq12` (the pairing target
/// group GT). After construction, values are only ever produced by pairing
/// operations — arithmetic on a `GtElement` is restricted to equality and
/// multiplication so the internal Fq12-tower representation can never leak
/// through an unrelated field operation (§9's "Opaque GT" design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtElement(pub(crate) Fq12);

impl GtElement {
    /// The multiplicative identity of GT.
    pub fn identity() -> Self {
        GtElement(Fq12::from(1u64))
    }

    /// `self * other` in GT.
    pub fn mul(&self, other: &GtElement) -> GtElement {
        GtElement(self.0 * other.0)
    }

    /// Whether this element is the GT identity.
    pub fn is_identity(&self) -> bool {
        use ark_ff::One;
        self.0.is_one()
    }

    /// 384-byte uncompressed encoding, matching the format defined by the
    /// pairing implementation (`ark_serialize`'s canonical uncompressed
    /// `Fq12` encoding is exactly 12 * 32 = 384 bytes).
    pub fn to_bytes(&self) -> [u8; 384] {
        use ark_serialize::CanonicalSerialize;
        let mut buf = Vec::with_capacity(384);
        self.0
            .serialize_uncompressed(&mut buf)
            .expect("Fq12 serialization cannot fail for a valid element");
        let mut out = [0u8; 384];
        out.copy_from_slice(&buf);
        out
    }
}

impl From<Fq12> for GtElement {
    fn from(value: Fq12) -> Self {
        GtElement(value)
    }
}
