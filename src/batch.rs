//! Batch verification via random linear combination and MSM aggregation
//!
//! `n` proofs against one verifying key collapse into `n + 2` pairings in a
//! single multi-Miller loop plus one final exponentiation, the same
//! amortization `pairing::pair_multi` gives a single proof's three terms.
//! The accumulation math (`IC_acc`, `C_acc`) runs through
//! `ark_ec::VariableBaseMSM`, which already implements Pippenger's
//! bucket method internally and picks its own window size from the input
//! length — the same crate the teacher's GPU Groth16 path
//! (`gpu/groth16_gpu.rs`) leans on for its `b_g2_query`/`l_query`
//! accumulations.
//!
//! Per §9 Open Question 3, the aggregated A-accumulation must actually feed
//! a pairing check — there is no "falls through to sequential on infinity"
//! escape hatch here; every batch of size `>= 4` runs the full equation in
//! [`verify_aggregated`].

use ark_bn254::{Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::curve::GtElement;
use crate::error::ResultCode;
use crate::groth16::{Groth16Error, VerifyingKey};
use crate::pairing::{self, PairingError};
use crate::proof::ParsedProof;

/// Below this count, per-proof overhead (random scalar sampling, MSM setup)
/// outweighs the savings from sharing one final exponentiation (§4.7).
pub const AGGREGATION_THRESHOLD: usize = 4;

/// Errors raised by batch construction and aggregation.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch capacity must be in 1..=1024, got {0}")]
    BadCapacity(usize),
    #[error("batch is full (capacity {0})")]
    Full(usize),
    #[error("operating system RNG failed: {0}")]
    RngFailed(String),
    #[error("groth16 equation error: {0}")]
    Groth16(#[from] Groth16Error),
    #[error("pairing evaluation failed: {0}")]
    Pairing(#[from] PairingError),
    #[error("scratch arena error: {0}")]
    Arena(#[from] crate::arena::ArenaError),
}

/// Runtime-mutable per-context policy, checked per proof before any proof
/// enters the aggregated pairing. Blacklist membership is not folded in
/// here: the wire proof carries no exclusion witness, so that check is a
/// separate explicit call (`verify_exclusion_proof`, §4.8) the host performs
/// against the advertised `blacklist_root` when it wants one.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub current_time: u32,
    pub max_proof_age: u32,
    pub min_threshold: u8,
}

impl Policy {
    /// Timestamp freshness, then threshold floor, in that order: a proof
    /// that is both expired and below threshold is reported as `Expired`.
    /// Both checks run before a proof ever reaches the pairing path.
    pub fn check(&self, p: &ParsedProof) -> ResultCode {
        if self.current_time.saturating_sub(p.timestamp) > self.max_proof_age {
            return ResultCode::Expired;
        }
        if p.attested_threshold() < self.min_threshold {
            return ResultCode::BelowThreshold;
        }
        ResultCode::Ok
    }
}

/// One slot in a batch: its proof, the single Poseidon-commitment public
/// input computed from it, and the result it has accumulated so far.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub proof: ParsedProof,
    pub public_input: Fr,
    pub result: ResultCode,
}

/// A bounded collection of proofs sharing one verifying key. Capacity is
/// fixed at creation (`count <= capacity` is invariant, §3).
pub struct Batch {
    capacity: usize,
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn new(capacity: usize) -> Result<Self, BatchError> {
        if capacity == 0 || capacity > crate::MAX_BATCH_SIZE {
            return Err(BatchError::BadCapacity(capacity));
        }
        Ok(Batch {
            capacity,
            entries: Vec::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, proof: ParsedProof, public_input: Fr) -> Result<(), BatchError> {
        if self.entries.len() >= self.capacity {
            return Err(BatchError::Full(self.capacity));
        }
        self.entries.push(BatchEntry {
            proof,
            public_input,
            result: ResultCode::Ok,
        });
        Ok(())
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn results(&self) -> Vec<ResultCode> {
        self.entries.iter().map(|e| e.result).collect()
    }
}

/// Sample a 128-bit scalar uniformly from the OS RNG, zero-extended into
/// `Fr` (upper 128 bits of the 254-bit scalar field are always zero). RNG
/// failure is surfaced, never silently substituted (§4.7 step 1, §7).
fn sample_scalar_128() -> Result<Fr, BatchError> {
    let mut buf = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| BatchError::RngFailed(e.to_string()))?;
    let mut wide = [0u8; 32];
    wide[16..].copy_from_slice(&buf);
    let scalar = Fr::from_be_bytes_mod_order(&wide);
    // The raw random bytes have no further use once reduced into `scalar`;
    // wipe them the same way the pack's key-material burn helpers do.
    buf.zeroize();
    wide.zeroize();
    Ok(scalar)
}

/// Run per-proof policy checks (§4.7 step 2 + the policy gate), then
/// aggregate every entry that passed into a single multi-pairing check
/// (§4.7 steps 3-4) when `n >= AGGREGATION_THRESHOLD`, or verify
/// sequentially otherwise. Returns the overall aggregate result code; each
/// entry's `result` field is updated in place so `Batch::results` reflects
/// per-proof outcomes even when the aggregate fails.
pub fn verify_batch(
    batch: &mut Batch,
    vk: &VerifyingKey,
    policy: &Policy,
) -> Result<ResultCode, BatchError> {
    if batch.entries.is_empty() {
        return Ok(ResultCode::Ok);
    }

    // Policy gate runs for every entry, in insertion order, before anything
    // touches the pairing path (§4.7 step 2 / §5 ordering guarantee).
    let mut eligible_idx = Vec::with_capacity(batch.entries.len());
    for (i, entry) in batch.entries.iter_mut().enumerate() {
        let verdict = policy.check(&entry.proof);
        entry.result = verdict;
        if verdict == ResultCode::Ok {
            eligible_idx.push(i);
        }
    }

    if eligible_idx.is_empty() {
        return Ok(ResultCode::InvalidProof);
    }

    let overall = if eligible_idx.len() < AGGREGATION_THRESHOLD {
        verify_sequential(batch, vk, &eligible_idx)?
    } else {
        verify_aggregated(batch, vk, &eligible_idx)?
    };

    // §4.7: the thread-local scratch arena is reset after each batch, win
    // or lose, so its budget never carries over between unrelated batches.
    crate::arena::scratch_arena_reset();

    Ok(overall)
}

/// Pippenger bucket count `2^c - 1` for a window size chosen the way §4.7
/// describes (`c in {4, 6, 8}`, larger windows for larger inputs).
fn pippenger_window(n: usize) -> usize {
    if n < 16 {
        4
    } else if n < 256 {
        6
    } else {
        8
    }
}

fn verify_sequential(
    batch: &mut Batch,
    vk: &VerifyingKey,
    eligible_idx: &[usize],
) -> Result<ResultCode, BatchError> {
    let mut all_ok = true;
    for &i in eligible_idx {
        let entry = &batch.entries[i];
        let ok = crate::groth16::verify(vk, &entry.proof.a, &entry.proof.b, &entry.proof.c, &[entry.public_input])?;
        let code = if ok { ResultCode::Ok } else { ResultCode::InvalidProof };
        batch.entries[i].result = code;
        all_ok &= ok;
    }
    Ok(if all_ok { ResultCode::Ok } else { ResultCode::InvalidProof })
}

/// The aggregated check itself (§4.7 steps 3-4), split out so it's callable
/// directly for a "force aggregation regardless of threshold" test.
pub fn verify_aggregated(
    batch: &mut Batch,
    vk: &VerifyingKey,
    eligible_idx: &[usize],
) -> Result<ResultCode, BatchError> {
    let n_inputs = vk.n_inputs();

    // The IC/C accumulations below each run through `VariableBaseMSM`'s own
    // Pippenger implementation, which buckets internally; account for that
    // scratch against the thread-local arena and hand the budget back the
    // moment both MSMs are done (§4.7).
    let scratch = crate::arena::scratch_arena();
    let scratch_cp = scratch.checkpoint();
    let window = pippenger_window(eligible_idx.len());
    let bucket_count = (1usize << window) - 1;
    scratch.alloc(2 * bucket_count * std::mem::size_of::<G1Projective>())?;

    let mut r_scalars = Vec::with_capacity(eligible_idx.len());
    for _ in eligible_idx {
        r_scalars.push(sample_scalar_128()?);
    }

    // IC coefficient accumulation: coeffs[0] = sum(r_i), coeffs[j+1] =
    // sum_i r_i * x_i[j]. Here n_inputs == 1 so this is a 2-term MSM, but
    // the loop stays general for any future public-input arity.
    let mut ic_coeffs = vec![Fr::from(0u64); n_inputs + 1];
    let mut c_bases = Vec::with_capacity(eligible_idx.len());
    let mut c_scalars = Vec::with_capacity(eligible_idx.len());
    let mut a_scaled = Vec::with_capacity(eligible_idx.len());
    let mut b_points = Vec::with_capacity(eligible_idx.len());
    let mut r_sum = Fr::from(0u64);

    for (k, &i) in eligible_idx.iter().enumerate() {
        let entry = &batch.entries[i];
        let r = r_scalars[k];
        r_sum += r;

        ic_coeffs[0] += r;
        ic_coeffs[1] += r * entry.public_input;

        c_bases.push(entry.proof.c);
        c_scalars.push(r);

        a_scaled.push((entry.proof.a.into_group() * r).into_affine());
        b_points.push(entry.proof.b);
    }

    let ic_acc = G1Projective::msm(&vk.ic, &ic_coeffs)
        .unwrap_or_else(|_| G1Projective::default())
        .into_affine();
    let c_acc = G1Projective::msm(&c_bases, &c_scalars)
        .unwrap_or_else(|_| G1Projective::default())
        .into_affine();

    scratch.restore(scratch_cp).expect("checkpoint captured immediately above is still on the chain");

    let neg_ic_acc = -ic_acc;
    let neg_c_acc = -c_acc;

    let mut ps: Vec<G1Affine> = a_scaled;
    ps.push(neg_ic_acc);
    ps.push(neg_c_acc);
    let mut qs: Vec<G2Affine> = b_points;
    qs.push(vk.gamma);
    qs.push(vk.delta);

    let lhs = pairing::pair_multi(&ps, &qs)?;
    let rhs_alpha = (vk.alpha.into_group() * r_sum).into_affine();
    let rhs: GtElement = pairing::pair(&rhs_alpha, &vk.beta)?;

    let ok = lhs == rhs;
    let code = if ok { ResultCode::Ok } else { ResultCode::InvalidProof };
    for &i in eligible_idx {
        // Cryptographic failure of the combined check cannot in general be
        // isolated to one offending proof (§8 "Batch equivalence" — this is
        // expected, not a gap).
        batch.entries[i].result = code;
    }
    Ok(code)
}
