//! Error taxonomy and the flat, FFI-stable result code.
//!
//! Internal modules raise richly typed `thiserror` errors so that tests and
//! logs can tell failures apart. At the public boundary (`context`, `ffi`)
//! every one of those errors collapses into [`ResultCode`] — a single flat
//! integer enum with no payload. This collapse is deliberate: §7 of the
//! design requires that a caller can never learn *why* a proof was rejected,
//! only *that* it was. Internal reasons are logged (see `logging`), never
//! returned.

#![allow(missing_docs)]

use crate::arena::ArenaError;
use crate::batch::BatchError;
use crate::curve::CurveError;
use crate::field::FieldError;
use crate::groth16::Groth16Error;
use crate::poseidon::PoseidonError;
use crate::proof::ProofError;

/// Stable, FFI-compatible result code. Numeric values must never change
/// once shipped — the host process may persist them.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok = 0,
    InvalidProof = 1,
    BelowThreshold = 2,
    Expired = 3,
    Malformed = 4,
    Blacklisted = 5,

    InvalidParam = 101,
    NotInitialized = 102,

    OutOfMemory = 100,
    BatchFull = 103,
    ArenaExhausted = 104,
    SizeLimit = 105,

    RngFailed = 106,
    InvalidPoint = 107,
    NotOnCurve = 108,
    PairingFailed = 109,
}

impl ResultCode {
    /// `strerror`-style mapping to a constant string, for logging only. The
    /// application layer decides whether to retry, drop, or escalate.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::InvalidProof => "invalid proof",
            ResultCode::BelowThreshold => "below threshold",
            ResultCode::Expired => "expired",
            ResultCode::Malformed => "malformed",
            ResultCode::Blacklisted => "blacklisted",
            ResultCode::InvalidParam => "invalid parameter",
            ResultCode::NotInitialized => "not initialized",
            ResultCode::OutOfMemory => "out of memory",
            ResultCode::BatchFull => "batch full",
            ResultCode::ArenaExhausted => "arena exhausted",
            ResultCode::SizeLimit => "size limit exceeded",
            ResultCode::RngFailed => "RNG failed",
            ResultCode::InvalidPoint => "invalid point",
            ResultCode::NotOnCurve => "not on curve",
            ResultCode::PairingFailed => "pairing failed",
        }
    }

    /// True for any non-`Ok` code — convenience for FFI callers that just
    /// want a pass/fail boolean.
    pub const fn is_ok(self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

/// Top-level error type used internally by `context`/`batch`. Every variant
/// maps to exactly one [`ResultCode`] via [`ContextError::code`].
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("proof rejected: {0}")]
    Proof(#[from] ProofError),
    #[error("groth16 verification failed: {0}")]
    Groth16(#[from] Groth16Error),
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    #[error("field error: {0}")]
    Field(#[from] FieldError),
    #[error("arena error: {0}")]
    Arena(#[from] ArenaError),
    #[error("poseidon error: {0}")]
    Poseidon(#[from] PoseidonError),
    #[error("below policy threshold")]
    BelowThreshold,
    #[error("proof expired")]
    Expired,
    #[error("agent is blacklisted")]
    Blacklisted,
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),
    #[error("pairing back-end or verification key not initialized")]
    NotInitialized,
    #[error("batch is full")]
    BatchFull,
    #[error("secure RNG read failed")]
    RngFailed,
    #[error("resource size limit exceeded")]
    SizeLimit,
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),
}

impl ContextError {
    /// Collapse this internal error into the flat, caller-visible result
    /// code. Multiple distinct internal reasons intentionally map to the
    /// same code (e.g. every parse/validation failure becomes `Malformed`).
    pub fn code(&self) -> ResultCode {
        match self {
            ContextError::Proof(_) => ResultCode::Malformed,
            ContextError::Groth16(_) => ResultCode::InvalidProof,
            ContextError::Curve(CurveError::NotOnCurve) => ResultCode::NotOnCurve,
            ContextError::Curve(_) => ResultCode::InvalidPoint,
            ContextError::Field(_) => ResultCode::InvalidProof,
            ContextError::Arena(ArenaError::OutOfMemory) => ResultCode::OutOfMemory,
            ContextError::Arena(_) => ResultCode::ArenaExhausted,
            ContextError::Poseidon(_) => ResultCode::Malformed,
            ContextError::BelowThreshold => ResultCode::BelowThreshold,
            ContextError::Expired => ResultCode::Expired,
            ContextError::Blacklisted => ResultCode::Blacklisted,
            ContextError::InvalidParam(_) => ResultCode::InvalidParam,
            ContextError::NotInitialized => ResultCode::NotInitialized,
            ContextError::BatchFull => ResultCode::BatchFull,
            ContextError::RngFailed => ResultCode::RngFailed,
            ContextError::SizeLimit => ResultCode::SizeLimit,
            ContextError::Batch(BatchError::RngFailed(_)) => ResultCode::RngFailed,
            ContextError::Batch(BatchError::Full(_)) => ResultCode::BatchFull,
            ContextError::Batch(BatchError::BadCapacity(_)) => ResultCode::InvalidParam,
            ContextError::Batch(BatchError::Groth16(_)) => ResultCode::InvalidProof,
            ContextError::Batch(BatchError::Pairing(_)) => ResultCode::PairingFailed,
            ContextError::Batch(BatchError::Arena(ArenaError::OutOfMemory)) => ResultCode::OutOfMemory,
            ContextError::Batch(BatchError::Arena(_)) => ResultCode::ArenaExhausted,
        }
    }
}
