//! Verification context lifecycle, runtime policy, and statistics
//!
//! A `VerificationContext` owns an arena, an optional loaded verifying key,
//! mutable policy scalars, and running statistics — the same
//! grouping the teacher's `PcsParams`/prover-side context objects use
//! (immutable crypto parameters plus a small mutable bookkeeping struct).
//! Fail-closed is enforced in exactly one place: [`VerificationContext::verify`]
//! returns [`ResultCode::InvalidProof`], never `Ok`, whenever no verifying
//! key has been loaded (§4.8, §7 — "the single most important invariant of
//! the whole system").

use std::time::Instant;

use ark_bn254::Fr;

use crate::arena::Arena;
use crate::batch::{self, Batch, BatchError, Policy};
use crate::error::{ContextError, ResultCode};
use crate::groth16::VerifyingKey;
use crate::poseidon::{self, PoseidonError};
use crate::proof::{self, ParsedProof};
use crate::smt::{self, SmtError};

/// Configuration supplied to [`VerificationContext::create`]. `vk_blob` is
/// the same wire format `groth16::VerifyingKey::parse` expects; passing
/// `None` is legal and yields a context that fails closed on every
/// `verify` call until a key is loaded some other way.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub vk_blob: Option<Vec<u8>>,
    pub current_time: u32,
    pub max_proof_age: u32,
    pub min_threshold: u8,
    pub blacklist_root: Option<[u8; 32]>,
    pub arena_block_size: usize,
    pub arena_total_limit: usize,
}

/// Running verification statistics, mirroring the original engine's
/// `tetsuo_stats_t`: counters the host can snapshot via `get_stats` without
/// taking the context's arena lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextStats {
    pub total_verified: u64,
    pub total_failed: u64,
    pub total_batches: u64,
    pub avg_batch_size: f64,
    pub avg_verify_time_us: f64,
    pub peak_memory: usize,
}

impl ContextStats {
    fn record_verify(&mut self, ok: bool, elapsed_us: f64, peak_memory: usize) {
        if ok {
            self.total_verified += 1;
        } else {
            self.total_failed += 1;
        }
        let n = self.total_verified + self.total_failed;
        self.avg_verify_time_us += (elapsed_us - self.avg_verify_time_us) / n as f64;
        self.peak_memory = self.peak_memory.max(peak_memory);
    }

    fn record_batch(&mut self, size: usize, peak_memory: usize) {
        self.total_batches += 1;
        let n = self.total_batches;
        self.avg_batch_size += (size as f64 - self.avg_batch_size) / n as f64;
        self.peak_memory = self.peak_memory.max(peak_memory);
    }
}

/// A live verification context. Single-owner: concurrent use of the same
/// context from two threads is undefined (§5); distinct contexts are fully
/// independent.
pub struct VerificationContext {
    arena: Arena,
    vk: Option<VerifyingKey>,
    policy: Policy,
    blacklist_root: Option<[u8; 32]>,
    stats: ContextStats,
}

impl VerificationContext {
    /// Allocate the arena, pre-parse the verifying key if one was supplied,
    /// and zero-initialize statistics (§4.8).
    pub fn create(config: Config) -> Result<Self, ContextError> {
        let block_size = if config.arena_block_size == 0 {
            crate::ARENA_DEFAULT_BLOCK_SIZE
        } else {
            config.arena_block_size
        };
        let total_limit = if config.arena_total_limit == 0 {
            crate::MAX_ARENA_SIZE
        } else {
            config.arena_total_limit
        };
        let arena = Arena::new(block_size, total_limit)?;

        let vk = match config.vk_blob {
            Some(blob) => {
                if blob.len() > crate::MAX_VK_SIZE {
                    return Err(ContextError::SizeLimit);
                }
                Some(VerifyingKey::parse(&blob)?)
            }
            None => None,
        };

        Ok(VerificationContext {
            arena,
            vk,
            policy: Policy {
                current_time: config.current_time,
                max_proof_age: config.max_proof_age,
                min_threshold: config.min_threshold,
            },
            blacklist_root: config.blacklist_root,
            stats: ContextStats::default(),
        })
    }

    pub fn set_time(&mut self, t: u32) {
        self.policy.current_time = t;
    }

    pub fn set_threshold(&mut self, t: u8) {
        self.policy.min_threshold = t;
    }

    pub fn set_blacklist(&mut self, root: [u8; 32]) {
        self.blacklist_root = Some(root);
    }

    pub fn blacklist_root(&self) -> Option<[u8; 32]> {
        self.blacklist_root
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Parse, policy-check, and cryptographically verify one wire-format
    /// proof (§4.8's `verify`). Fails closed with [`ResultCode::InvalidProof`]
    /// when no verifying key is loaded — this never becomes `Ok` regardless
    /// of how well-formed the proof is.
    pub fn verify(&mut self, wire: &[u8]) -> ResultCode {
        let start = Instant::now();

        let code = self.verify_inner(wire);
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        self.stats.record_verify(code == ResultCode::Ok, elapsed_us, self.arena.peak());
        code
    }

    /// Fail-closed gate: no loaded key is never `Ok`, independent of how the
    /// rest of the checked path resolves (§4.8, §7). Every other failure
    /// reason is a [`ContextError`], collapsed to its [`ResultCode`] by
    /// [`ContextError::code`].
    fn verify_inner(&mut self, wire: &[u8]) -> ResultCode {
        if self.vk.is_none() {
            return ResultCode::InvalidProof;
        }
        match self.verify_checked(wire) {
            Ok(code) => code,
            Err(e) => e.code(),
        }
    }

    fn verify_checked(&mut self, wire: &[u8]) -> Result<ResultCode, ContextError> {
        let vk = self.vk.as_ref().expect("checked by verify_inner");

        if wire.len() > crate::MAX_PROOF_SIZE {
            return Err(ContextError::SizeLimit);
        }

        let parsed = proof::parse(wire)?;

        // Parsed proofs are transient, owned by the context's arena (§4 —
        // "Proof (parsed)"); account the allocation against its budget.
        self.arena.alloc(std::mem::size_of::<ParsedProof>())?;

        match self.policy.check(&parsed) {
            ResultCode::Ok => {}
            ResultCode::BelowThreshold => return Err(ContextError::BelowThreshold),
            ResultCode::Expired => return Err(ContextError::Expired),
            other => return Ok(other),
        }

        let x = derive_public_input(&parsed)?;

        let ok = crate::groth16::verify(vk, &parsed.a, &parsed.b, &parsed.c, &[x])?;
        Ok(if ok { ResultCode::Ok } else { ResultCode::InvalidProof })
    }

    /// Create a batch bound to this context's capacity limits (§6:
    /// `batch_create(ctx, cap)`, `cap` in `1..=1024`).
    pub fn create_batch(&self, capacity: usize) -> Result<Batch, BatchError> {
        Batch::new(capacity)
    }

    /// Parse `wire` and enqueue it into `batch`. Policy and cryptographic
    /// checks happen later, in [`VerificationContext::batch_verify`] — this
    /// only validates wire-format shape (§4.5). The batch's parsed-proof
    /// and coefficient slots are owned by this context's arena (§4 —
    /// "Batch... Owns (via its parent context's arena)").
    pub fn batch_add(&self, batch: &mut Batch, wire: &[u8]) -> ResultCode {
        if let Err(e) = self.arena.alloc(std::mem::size_of::<crate::batch::BatchEntry>()) {
            return ContextError::from(e).code();
        }
        batch_enqueue(batch, wire)
    }

    /// Run the aggregated (or sequential-fallback) batch check (§4.7) and
    /// fold the outcome into this context's statistics.
    pub fn batch_verify(&mut self, batch: &mut Batch) -> Result<ResultCode, ContextError> {
        let Some(vk) = &self.vk else {
            return Ok(ResultCode::InvalidProof);
        };
        let size = batch.len();
        let result = batch::verify_batch(batch, vk, &self.policy)?;
        self.stats.record_batch(size, self.arena.peak());
        Ok(result)
    }

    /// `compute_nullifier` helper (§4.8, §6).
    pub fn compute_nullifier(agent_pk: &[u8; 32], nonce: u64) -> Result<[u8; 32], PoseidonError> {
        poseidon::nullifier_bytes(agent_pk, nonce)
    }

    /// `make_commitment` helper (§4.8, §6).
    pub fn make_commitment(score: u16, secret: &[u8; 32]) -> Result<[u8; 32], PoseidonError> {
        poseidon::commitment(score, secret)
    }

    /// `verify_exclusion_proof` helper: Sparse Merkle Tree non-membership
    /// walk against this context's stored `blacklist_root`, or an explicit
    /// root supplied by the caller.
    pub fn verify_exclusion_proof(root: &[u8; 32], leaf: &[u8; 32], path: &[u8]) -> Result<bool, SmtError> {
        smt::verify_exclusion(root, leaf, path)
    }
}

/// Parse `wire` and push it into `batch` without needing a context handle —
/// the §6 wire signature `batch_add(batch, proof)` takes no context, since
/// wire-format validation alone doesn't need a verifying key or policy.
pub fn batch_enqueue(batch: &mut Batch, wire: &[u8]) -> ResultCode {
    if wire.len() > crate::MAX_PROOF_SIZE {
        return ResultCode::SizeLimit;
    }
    let parsed = match proof::parse(wire) {
        Ok(p) => p,
        Err(_) => return ResultCode::Malformed,
    };
    let x = match derive_public_input(&parsed) {
        Ok(x) => x,
        Err(_) => return ResultCode::Malformed,
    };
    match batch.add(parsed, x) {
        Ok(()) => ResultCode::Ok,
        Err(BatchError::Full(_)) => ResultCode::BatchFull,
        Err(_) => ResultCode::InvalidParam,
    }
}

/// The Groth16 public input bound to a parsed proof: `Poseidon(agent_pk,
/// commitment)`. The wire proof's attested threshold is checked as a
/// policy scalar (§4.7/§4.8), not folded into this hash — Poseidon here
/// runs at its native width (`t = 3`, one capacity lane, two input lanes),
/// so only the two 32-byte fields that are actually hashed values (rather
/// than a small integer flag) enter the sponge.
fn derive_public_input(p: &ParsedProof) -> Result<Fr, PoseidonError> {
    poseidon::hash(&[p.agent_pk_scalar(), p.commitment_scalar()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ProofType;
    use ark_ec::{AffineRepr, CurveGroup, Group};
    use ark_ff::{Field, UniformRand};
    use rand::{rngs::StdRng, SeedableRng};

    /// Build a toy VK + matching proof for a given agent_pk/commitment pair,
    /// the same construction `groth16::tests::build_toy` uses but driven by
    /// the actual Poseidon-derived public input so `VerificationContext`'s
    /// full pipeline (parse -> policy -> hash -> pairing) is exercised.
    fn build_toy_wire(agent_pk: [u8; 32], commitment: [u8; 32], threshold: u8, timestamp: u32) -> (Vec<u8>, Config) {
        let mut rng = StdRng::from_seed([21u8; 32]);
        let g1 = ark_bn254::G1Projective::generator();
        let g2 = ark_bn254::G2Projective::generator();

        let alpha_s = Fr::rand(&mut rng);
        let beta_s = Fr::rand(&mut rng);
        let gamma_s = Fr::rand(&mut rng);
        let delta_s = Fr::rand(&mut rng);
        let ic0_s = Fr::rand(&mut rng);
        let ic1_s = Fr::rand(&mut rng);

        let alpha = (g1 * alpha_s).into_affine();
        let beta = (g2 * beta_s).into_affine();
        let gamma = (g2 * gamma_s).into_affine();
        let delta = (g2 * delta_s).into_affine();
        let ic0 = (g1 * ic0_s).into_affine();
        let ic1 = (g1 * ic1_s).into_affine();

        let parsed_tmp = ParsedProof {
            proof_type: ProofType::Reputation,
            flags: threshold as u16,
            timestamp,
            agent_pk,
            commitment,
            a: ark_bn254::G1Affine::identity(),
            b: ark_bn254::G2Affine::identity(),
            c: ark_bn254::G1Affine::identity(),
        };
        let x = derive_public_input(&parsed_tmp).unwrap();

        let a_s = Fr::rand(&mut rng);
        let c_s = Fr::rand(&mut rng);
        let ic_acc_s = ic0_s + x * ic1_s;
        let rhs_exp = alpha_s * beta_s + ic_acc_s * gamma_s + c_s * delta_s;
        let b_s = rhs_exp * a_s.inverse().unwrap();
        let a = (g1 * a_s).into_affine();
        let b = (g2 * b_s).into_affine();
        let c = (g1 * c_s).into_affine();

        let wire = proof::encode(ProofType::Reputation, threshold, &agent_pk, &commitment, &a, &b, &c, timestamp);

        let mut vk_blob = Vec::new();
        push_g1(&mut vk_blob, &alpha);
        push_g2(&mut vk_blob, &beta);
        push_g2(&mut vk_blob, &gamma);
        push_g2(&mut vk_blob, &delta);
        vk_blob.extend_from_slice(&2u32.to_le_bytes());
        push_g1(&mut vk_blob, &ic0);
        push_g1(&mut vk_blob, &ic1);

        let config = Config {
            vk_blob: Some(vk_blob),
            current_time: timestamp,
            max_proof_age: 1000,
            min_threshold: 0,
            blacklist_root: None,
            arena_block_size: 0,
            arena_total_limit: 0,
        };
        (wire.to_vec(), config)
    }

    fn push_fq(out: &mut Vec<u8>, v: &ark_bn254::Fq) {
        use ark_ff::BigInteger;
        use ark_ff::PrimeField;
        let le = v.into_bigint().to_bytes_le();
        let mut be = le;
        be.reverse();
        out.extend_from_slice(&be);
    }

    fn push_g1(out: &mut Vec<u8>, p: &ark_bn254::G1Affine) {
        let (x, y) = p.xy().unwrap();
        push_fq(out, &x);
        push_fq(out, &y);
    }

    fn push_g2(out: &mut Vec<u8>, p: &ark_bn254::G2Affine) {
        let (x, y) = p.xy().unwrap();
        push_fq(out, &x.c0);
        push_fq(out, &x.c1);
        push_fq(out, &y.c0);
        push_fq(out, &y.c1);
    }

    #[test]
    fn fails_closed_without_a_loaded_vk() {
        let mut ctx = VerificationContext::create(Config::default()).unwrap();
        let (wire, _config) = build_toy_wire([0x11; 32], [0x22; 32], 0, 0);
        assert_eq!(ctx.verify(&wire), ResultCode::InvalidProof);
    }

    #[test]
    fn honest_proof_verifies_end_to_end() {
        let (wire, config) = build_toy_wire([0x11; 32], [0x22; 32], 50, 1_000);
        let mut ctx = VerificationContext::create(config).unwrap();
        assert_eq!(ctx.verify(&wire), ResultCode::Ok);
        assert_eq!(ctx.stats().total_verified, 1);
    }

    #[test]
    fn below_threshold_short_circuits_before_pairing() {
        let (wire, mut config) = build_toy_wire([0x11; 32], [0x22; 32], 30, 1_000);
        config.min_threshold = 50;
        let mut ctx = VerificationContext::create(config).unwrap();
        assert_eq!(ctx.verify(&wire), ResultCode::BelowThreshold);
    }

    #[test]
    fn expired_proof_is_rejected() {
        let (wire, mut config) = build_toy_wire([0x11; 32], [0x22; 32], 0, 5_000);
        config.current_time = 10_000;
        config.max_proof_age = 3_600;
        let mut ctx = VerificationContext::create(config).unwrap();
        assert_eq!(ctx.verify(&wire), ResultCode::Expired);
    }

    #[test]
    fn nullifier_is_deterministic_across_context_recreation() {
        let pk = [0x42u8; 32];
        let n1 = VerificationContext::compute_nullifier(&pk, 12345).unwrap();
        let n2 = VerificationContext::compute_nullifier(&pk, 12345).unwrap();
        assert_eq!(n1, n2);
    }

    #[test]
    fn batch_roundtrip_through_context() {
        let (wire, config) = build_toy_wire([0x33; 32], [0x44; 32], 0, 1_000);
        let mut ctx = VerificationContext::create(config).unwrap();
        let mut batch = ctx.create_batch(8).unwrap();
        for _ in 0..3 {
            assert_eq!(ctx.batch_add(&mut batch, &wire), ResultCode::Ok);
        }
        let result = ctx.batch_verify(&mut batch).unwrap();
        assert_eq!(result, ResultCode::Ok);
        assert_eq!(ctx.stats().total_batches, 1);
    }
}
