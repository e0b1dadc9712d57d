//! Crate root: public surface, core aliases, and protocol-wide invariants
//!
//! This crate is a native, high-throughput verification engine for
//! BN254/Groth16 reputation, payment, and inference attestations. It exposes
//! a small C-callable surface (see [`ffi`]) that lets a host process derive
//! public commitments from private scores, verify individual Groth16 proofs
//! against a loaded verification key, and amortize verification cost by
//! combining many proofs into one aggregated pairing check.
//!
//! ## Invariants
//!
//! - **Field & curve.** The scalar/base field is `ark_bn254::{Fr, Fq}`; group
//!   arithmetic is `ark_bn254::{G1Affine, G2Affine}`. All arithmetic is
//!   delegated to `ark-ff`/`ark-ec`, which gives us constant-time, audited
//!   Montgomery-form arithmetic without hand-rolled assembly. We
//!   `#![deny(unsafe_code)]` crate-wide and narrow that back to `allow`
//!   only inside [`ffi`], where dereferencing caller-supplied C pointers is
//!   unavoidable — every other module is unsafe-free.
//!
//! - **Fail closed.** If the pairing back-end is not initialized, or no
//!   verification key is loaded, `verify` returns `INVALID_PROOF` — never
//!   `OK`. This is the single most important invariant of the whole system
//!   (see [`context`] and [`error::ResultCode`]).
//!
//! - **No pointer graph, no GC.** Working memory for a batch is arena-owned
//!   (see [`arena`]); destroying a context frees every object it derived.
//!
//! - **Side-channel hygiene.** Parsing and policy failures collapse to a
//!   single opaque result code at the public boundary; the specific reason
//!   is only ever logged internally, never returned to the caller.
//!
//! These invariants are enforced by design across the submodules. If any is
//! violated at runtime, the failure mode is always a precise `ResultCode`,
//! never undefined behavior.

#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Fragmentation-free scoped allocation (L0): block chain, checkpoint /
/// restore, and the per-thread scratch arena used by the batch verifier.
pub mod arena;
/// 256-bit prime-field helpers over BN254's `Fr`/`Fq` (L1).
pub mod field;
/// G1 / G2 / GT group operations, on-curve and subgroup validation (L1).
pub mod curve;
/// Optimal-ate pairing and multi-pairing aggregation (L2).
pub mod pairing;
/// Poseidon (t=3, α=5) sponge, commitments, and nullifiers (L2).
pub mod poseidon;
/// Wire-format proof decode and validation (L3).
pub mod proof;
/// Groth16 single-proof verification equation (L3).
pub mod groth16;
/// Random-linear-combination batch verifier with MSM aggregation (L3).
pub mod batch;
/// Sparse Merkle Tree non-membership (exclusion proof) walk.
pub mod smt;
/// Error taxonomy and the flat, FFI-stable result code.
pub mod error;
/// Context lifecycle, runtime policy, and verification statistics (L4).
pub mod context;
/// Ambient logging / tracing initialization.
pub mod logging;
/// C-ABI-compatible public surface (L4).
pub mod ffi;

/// Scalar field used across the crate (BN254 `Fr`).
pub type Fr = ark_bn254::Fr;
/// Base field of G1 (BN254 `Fq`).
pub type Fq = ark_bn254::Fq;

/// Security parameter λ for the 128-bit batch scalars of §4.7.
pub const SECURITY_LAMBDA: usize = 128;

/// Maximum number of proofs a single batch may hold.
pub const MAX_BATCH_SIZE: usize = 1024;
/// Maximum total bytes a context's arena will allocate across all blocks.
pub const MAX_ARENA_SIZE: usize = 64 * 1024 * 1024;
/// Maximum accepted size, in bytes, of an encoded proof.
pub const MAX_PROOF_SIZE: usize = 4096;
/// Maximum accepted size, in bytes, of a verification-key blob.
pub const MAX_VK_SIZE: usize = 1024 * 1024;

/// Below this batch size, aggregation overhead outweighs its savings and the
/// batch verifier falls through to sequential `verify` per proof (§4.7).
pub const BATCH_AGGREGATION_THRESHOLD: usize = 4;

/// Default arena block size (1 MiB), matching the original block allocator.
pub const ARENA_DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;
/// Per-thread scratch arena size (256 KiB), reset after each batch.
pub const SCRATCH_ARENA_SIZE: usize = 256 * 1024;

/// Maximum depth of a Sparse Merkle Tree exclusion-proof walk.
pub const SMT_MAX_DEPTH: usize = 256;

/// Reputation tier thresholds, scores are in `0..=10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReputationTier {
    /// Below the Bronze threshold.
    Unranked,
    /// Score >= 2500.
    Bronze,
    /// Score >= 5000.
    Silver,
    /// Score >= 7500.
    Gold,
    /// Score >= 9000.
    Platinum,
}

impl ReputationTier {
    /// Classify a raw score (0..=10000) into its tier.
    pub fn from_score(score: u16) -> Self {
        match score {
            s if s >= 9000 => ReputationTier::Platinum,
            s if s >= 7500 => ReputationTier::Gold,
            s if s >= 5000 => ReputationTier::Silver,
            s if s >= 2500 => ReputationTier::Bronze,
            _ => ReputationTier::Unranked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(ReputationTier::from_score(0), ReputationTier::Unranked);
        assert_eq!(ReputationTier::from_score(2499), ReputationTier::Unranked);
        assert_eq!(ReputationTier::from_score(2500), ReputationTier::Bronze);
        assert_eq!(ReputationTier::from_score(4999), ReputationTier::Bronze);
        assert_eq!(ReputationTier::from_score(5000), ReputationTier::Silver);
        assert_eq!(ReputationTier::from_score(7499), ReputationTier::Silver);
        assert_eq!(ReputationTier::from_score(7500), ReputationTier::Gold);
        assert_eq!(ReputationTier::from_score(8999), ReputationTier::Gold);
        assert_eq!(ReputationTier::from_score(9000), ReputationTier::Platinum);
        assert_eq!(ReputationTier::from_score(10000), ReputationTier::Platinum);
    }
}
