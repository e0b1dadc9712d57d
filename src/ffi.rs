//! C-ABI-compatible public surface
//!
//! This is the one module in the crate allowed to touch raw pointers: every
//! other module is unsafe-free under the crate-level `#![deny(unsafe_code)]`
//! (see `lib.rs`), and this module narrows that back open with
//! `#![allow(unsafe_code)]` because dereferencing caller-supplied C pointers
//! has no safe equivalent. Every function here does the minimum unsafe work
//! (null checks, slice reconstruction, box (de)allocation) and immediately
//! hands off into safe Rust (`context`, `batch`, `proof`, `poseidon`, `smt`).
//!
//! Naming and struct-export conventions (the `repr(C)` wire structs, the
//! `cbindgen.toml` prefix/enum settings) follow the teacher pack's
//! `daoquynhthu-TOGM-Rust` `build.rs`/`cbindgen` integration, generalized
//! from its single autogenerated header to this crate's `include/repverify.h`.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::batch::Batch;
use crate::context::{self, Config, VerificationContext};
use crate::error::ResultCode;
use crate::proof::{self, ProofType};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// `init()`: idempotent, race-free pairing-backend initialization guard
/// (§5). Returns `OK` whether or not this call was the one that flipped
/// the flag — the spec only distinguishes "ok" from "already initialized"
/// for host-side logging, not for control flow, so both map to `OK` here.
#[no_mangle]
pub extern "C" fn repverify_init() -> ResultCode {
    INITIALIZED.store(true, Ordering::SeqCst);
    ResultCode::Ok
}

/// `cleanup()`: shutdown hook. Using the API after this call is undefined
/// (§5) — callers are responsible for destroying every context first.
#[no_mangle]
pub extern "C" fn repverify_cleanup() {
    INITIALIZED.store(false, Ordering::SeqCst);
}

/// Wire form of [`Config`]. `vk_data`/`vk_len` may be null/0 for a context
/// that fails closed until a key is loaded some other way.
#[repr(C)]
pub struct FfiConfig {
    pub vk_data: *const u8,
    pub vk_len: usize,
    pub current_time: u32,
    pub max_proof_age: u32,
    pub min_threshold: u8,
    pub has_blacklist_root: u8,
    pub blacklist_root: [u8; 32],
    pub arena_block_size: usize,
    pub arena_total_limit: usize,
}

/// Opaque context handle. Fields are private to Rust; C code only ever
/// holds a `FfiContext*`.
pub struct FfiContext {
    inner: VerificationContext,
}

/// Opaque batch handle. Carries the owning context pointer so the terse
/// `batch_verify(batch)` / `batch_get_results(batch, ...)` wire calls (§6)
/// don't need to repeat the context handle the way the Rust-level API does.
pub struct FfiBatch {
    inner: Batch,
    ctx: *mut FfiContext,
}

/// `ctx_create(config?)`: allocate a context from an (optional) config
/// blob. Returns null on a null `config` with no way to default it, or on
/// any parse/size failure.
#[no_mangle]
pub extern "C" fn repverify_ctx_create(config: *const FfiConfig) -> *mut FfiContext {
    if config.is_null() {
        return std::ptr::null_mut();
    }
    let c = unsafe { &*config };

    let vk_blob = if c.vk_data.is_null() || c.vk_len == 0 {
        None
    } else {
        Some(unsafe { std::slice::from_raw_parts(c.vk_data, c.vk_len) }.to_vec())
    };

    let blacklist_root = if c.has_blacklist_root != 0 {
        Some(c.blacklist_root)
    } else {
        None
    };

    let config = Config {
        vk_blob,
        current_time: c.current_time,
        max_proof_age: c.max_proof_age,
        min_threshold: c.min_threshold,
        blacklist_root,
        arena_block_size: c.arena_block_size,
        arena_total_limit: c.arena_total_limit,
    };

    match VerificationContext::create(config) {
        Ok(ctx) => Box::into_raw(Box::new(FfiContext { inner: ctx })),
        Err(_) => std::ptr::null_mut(),
    }
}

/// `ctx_destroy(ctx)`: free the context and everything its arena owns.
#[no_mangle]
pub extern "C" fn repverify_ctx_destroy(ctx: *mut FfiContext) {
    if ctx.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(ctx) });
}

#[no_mangle]
pub extern "C" fn repverify_ctx_set_time(ctx: *mut FfiContext, t: u32) -> ResultCode {
    let Some(ctx) = (unsafe { ctx.as_mut() }) else {
        return ResultCode::InvalidParam;
    };
    ctx.inner.set_time(t);
    ResultCode::Ok
}

#[no_mangle]
pub extern "C" fn repverify_ctx_set_threshold(ctx: *mut FfiContext, t: u8) -> ResultCode {
    let Some(ctx) = (unsafe { ctx.as_mut() }) else {
        return ResultCode::InvalidParam;
    };
    ctx.inner.set_threshold(t);
    ResultCode::Ok
}

/// `ctx_set_blacklist`: `root` must point at 32 readable bytes.
#[no_mangle]
pub extern "C" fn repverify_ctx_set_blacklist(ctx: *mut FfiContext, root: *const u8) -> ResultCode {
    let (Some(ctx), false) = (unsafe { ctx.as_mut() }, root.is_null()) else {
        return ResultCode::InvalidParam;
    };
    let bytes = unsafe { std::slice::from_raw_parts(root, 32) };
    let mut arr = [0u8; 32];
    arr.copy_from_slice(bytes);
    ctx.inner.set_blacklist(arr);
    ResultCode::Ok
}

/// `verify(ctx, proof)`: `proof` must point at exactly `len` readable
/// bytes. Fails closed (`INVALID_PARAM`) on a null context or proof.
#[no_mangle]
pub extern "C" fn repverify_verify(ctx: *mut FfiContext, proof: *const u8, len: usize) -> ResultCode {
    let (Some(ctx), false) = (unsafe { ctx.as_mut() }, proof.is_null()) else {
        return ResultCode::InvalidParam;
    };
    let wire = unsafe { std::slice::from_raw_parts(proof, len) };
    ctx.inner.verify(wire)
}

/// `batch_create(ctx, cap)`.
#[no_mangle]
pub extern "C" fn repverify_batch_create(ctx: *mut FfiContext, capacity: usize) -> *mut FfiBatch {
    let Some(ctx_ref) = (unsafe { ctx.as_ref() }) else {
        return std::ptr::null_mut();
    };
    match ctx_ref.inner.create_batch(capacity) {
        Ok(batch) => Box::into_raw(Box::new(FfiBatch { inner: batch, ctx })),
        Err(_) => std::ptr::null_mut(),
    }
}

/// `batch_add(batch, proof)`.
#[no_mangle]
pub extern "C" fn repverify_batch_add(batch: *mut FfiBatch, proof: *const u8, len: usize) -> ResultCode {
    let (Some(batch), false) = (unsafe { batch.as_mut() }, proof.is_null()) else {
        return ResultCode::InvalidParam;
    };
    let wire = unsafe { std::slice::from_raw_parts(proof, len) };
    context::batch_enqueue(&mut batch.inner, wire)
}

/// `batch_verify(batch)`.
#[no_mangle]
pub extern "C" fn repverify_batch_verify(batch: *mut FfiBatch) -> ResultCode {
    let Some(batch) = (unsafe { batch.as_mut() }) else {
        return ResultCode::InvalidParam;
    };
    let Some(ctx) = (unsafe { batch.ctx.as_mut() }) else {
        return ResultCode::InvalidParam;
    };
    ctx.inner.batch_verify(&mut batch.inner).unwrap_or_else(|e| e.code())
}

/// `batch_get_results(batch, out, &n)`: on entry `*n` is the capacity of
/// `out`; on return it is the number of result codes actually written
/// (`min(capacity, batch.len())`).
#[no_mangle]
pub extern "C" fn repverify_batch_get_results(
    batch: *mut FfiBatch,
    out: *mut ResultCode,
    n: *mut usize,
) -> ResultCode {
    let (Some(batch), false, false) = (unsafe { batch.as_ref() }, out.is_null(), n.is_null()) else {
        return ResultCode::InvalidParam;
    };
    let results = batch.inner.results();
    let cap = unsafe { *n };
    let to_write = results.len().min(cap);
    let out_slice = unsafe { std::slice::from_raw_parts_mut(out, to_write) };
    out_slice.copy_from_slice(&results[..to_write]);
    unsafe {
        *n = to_write;
    }
    ResultCode::Ok
}

#[no_mangle]
pub extern "C" fn repverify_batch_reset(batch: *mut FfiBatch) {
    if let Some(batch) = unsafe { batch.as_mut() } {
        batch.inner.reset();
    }
}

#[no_mangle]
pub extern "C" fn repverify_batch_destroy(batch: *mut FfiBatch) {
    if batch.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(batch) });
}

/// Wire form of [`crate::context::ContextStats`].
#[repr(C)]
pub struct FfiStats {
    pub total_verified: u64,
    pub total_failed: u64,
    pub total_batches: u64,
    pub avg_batch_size: f64,
    pub avg_verify_time_us: f64,
    pub peak_memory: u64,
}

/// `get_stats(ctx, out)`.
#[no_mangle]
pub extern "C" fn repverify_get_stats(ctx: *mut FfiContext, out: *mut FfiStats) -> ResultCode {
    let (Some(ctx), false) = (unsafe { ctx.as_ref() }, out.is_null()) else {
        return ResultCode::InvalidParam;
    };
    let s = ctx.inner.stats();
    unsafe {
        *out = FfiStats {
            total_verified: s.total_verified,
            total_failed: s.total_failed,
            total_batches: s.total_batches,
            avg_batch_size: s.avg_batch_size,
            avg_verify_time_us: s.avg_verify_time_us,
            peak_memory: s.peak_memory as u64,
        };
    }
    ResultCode::Ok
}

/// `proof_create(out, type, threshold, agent_pk, commitment, bytes, len)`:
/// pack a wire-format record from a caller-supplied `proof_data` blob
/// (the 256-byte `A || B || C` produced by the external prover) plus
/// metadata, stamping `timestamp = now`. `out` must have room for
/// [`proof::WIRE_SIZE`] bytes; `bytes`/`len` must be exactly 256 bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn repverify_proof_create(
    out: *mut u8,
    out_cap: usize,
    proof_type: i32,
    threshold: u8,
    agent_pk: *const u8,
    commitment: *const u8,
    bytes: *const u8,
    len: usize,
) -> ResultCode {
    if out.is_null() || agent_pk.is_null() || commitment.is_null() || bytes.is_null() {
        return ResultCode::InvalidParam;
    }
    if out_cap < proof::WIRE_SIZE || len != 256 {
        return ResultCode::InvalidParam;
    }

    let agent_pk_slice = unsafe { std::slice::from_raw_parts(agent_pk, 32) };
    let commitment_slice = unsafe { std::slice::from_raw_parts(commitment, 32) };
    let proof_data = unsafe { std::slice::from_raw_parts(bytes, 256) };

    let mut agent_pk_arr = [0u8; 32];
    agent_pk_arr.copy_from_slice(agent_pk_slice);
    let mut commitment_arr = [0u8; 32];
    commitment_arr.copy_from_slice(commitment_slice);

    let a = match decode_g1_raw(&proof_data[0..64]) {
        Some(p) => p,
        None => return ResultCode::Malformed,
    };
    let b = match decode_g2_raw(&proof_data[64..192]) {
        Some(p) => p,
        None => return ResultCode::Malformed,
    };
    let c = match decode_g1_raw(&proof_data[192..256]) {
        Some(p) => p,
        None => return ResultCode::Malformed,
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    let wire = proof::encode(
        ProofType::from(proof_type as u8),
        threshold,
        &agent_pk_arr,
        &commitment_arr,
        &a,
        &b,
        &c,
        timestamp,
    );

    let out_slice = unsafe { std::slice::from_raw_parts_mut(out, proof::WIRE_SIZE) };
    out_slice.copy_from_slice(&wire);
    ResultCode::Ok
}

fn decode_g1_raw(bytes: &[u8]) -> Option<ark_bn254::G1Affine> {
    use ark_ff::PrimeField;
    let x = ark_bn254::Fq::from_be_bytes_mod_order(&bytes[0..32]);
    let y = ark_bn254::Fq::from_be_bytes_mod_order(&bytes[32..64]);
    use ark_ec::AffineRepr;
    use ark_ff::Zero;
    if x.is_zero() && y.is_zero() {
        return Some(ark_bn254::G1Affine::identity());
    }
    Some(ark_bn254::G1Affine::new_unchecked(x, y))
}

fn decode_g2_raw(bytes: &[u8]) -> Option<ark_bn254::G2Affine> {
    use ark_ff::PrimeField;
    let x = ark_bn254::Fq2::new(
        ark_bn254::Fq::from_be_bytes_mod_order(&bytes[0..32]),
        ark_bn254::Fq::from_be_bytes_mod_order(&bytes[32..64]),
    );
    let y = ark_bn254::Fq2::new(
        ark_bn254::Fq::from_be_bytes_mod_order(&bytes[64..96]),
        ark_bn254::Fq::from_be_bytes_mod_order(&bytes[96..128]),
    );
    use ark_ec::AffineRepr;
    use ark_ff::Zero;
    if x.is_zero() && y.is_zero() {
        return Some(ark_bn254::G2Affine::identity());
    }
    Some(ark_bn254::G2Affine::new_unchecked(x, y))
}

/// `compute_nullifier(out, agent_pk, nonce)`: `agent_pk` must point at 32
/// readable bytes, `out` at 32 writable bytes.
#[no_mangle]
pub extern "C" fn repverify_compute_nullifier(out: *mut u8, agent_pk: *const u8, nonce: u64) -> ResultCode {
    if out.is_null() || agent_pk.is_null() {
        return ResultCode::InvalidParam;
    }
    let pk_slice = unsafe { std::slice::from_raw_parts(agent_pk, 32) };
    let mut pk = [0u8; 32];
    pk.copy_from_slice(pk_slice);

    match VerificationContext::compute_nullifier(&pk, nonce) {
        Ok(n) => {
            let out_slice = unsafe { std::slice::from_raw_parts_mut(out, 32) };
            out_slice.copy_from_slice(&n);
            ResultCode::Ok
        }
        Err(_) => ResultCode::InvalidProof,
    }
}

/// `verify_exclusion(root, leaf, proof, len)`: writes `1`/`0` into
/// `*out_excluded` and returns `OK` on a well-formed path, or `MALFORMED`
/// if `proof`'s length is out of bounds.
#[no_mangle]
pub extern "C" fn repverify_verify_exclusion(
    root: *const u8,
    leaf: *const u8,
    proof: *const u8,
    len: usize,
    out_excluded: *mut u8,
) -> ResultCode {
    if root.is_null() || leaf.is_null() || proof.is_null() || out_excluded.is_null() {
        return ResultCode::InvalidParam;
    }
    let root_slice = unsafe { std::slice::from_raw_parts(root, 32) };
    let leaf_slice = unsafe { std::slice::from_raw_parts(leaf, 32) };
    let path = unsafe { std::slice::from_raw_parts(proof, len) };

    let mut root_arr = [0u8; 32];
    root_arr.copy_from_slice(root_slice);
    let mut leaf_arr = [0u8; 32];
    leaf_arr.copy_from_slice(leaf_slice);

    match VerificationContext::verify_exclusion_proof(&root_arr, &leaf_arr, path) {
        Ok(excluded) => {
            unsafe {
                *out_excluded = excluded as u8;
            }
            ResultCode::Ok
        }
        Err(_) => ResultCode::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_cleanup_roundtrip() {
        assert_eq!(repverify_init(), ResultCode::Ok);
        repverify_cleanup();
        assert_eq!(repverify_init(), ResultCode::Ok);
    }

    #[test]
    fn ctx_create_rejects_null_config() {
        assert!(repverify_ctx_create(std::ptr::null()).is_null());
    }

    #[test]
    fn ctx_create_with_no_vk_fails_closed_on_verify() {
        let config = FfiConfig {
            vk_data: std::ptr::null(),
            vk_len: 0,
            current_time: 0,
            max_proof_age: 0,
            min_threshold: 0,
            has_blacklist_root: 0,
            blacklist_root: [0u8; 32],
            arena_block_size: 0,
            arena_total_limit: 0,
        };
        let ctx = repverify_ctx_create(&config as *const FfiConfig);
        assert!(!ctx.is_null());

        let wire = [0u8; proof::WIRE_SIZE];
        let code = repverify_verify(ctx, wire.as_ptr(), wire.len());
        assert_eq!(code, ResultCode::InvalidProof);

        repverify_ctx_destroy(ctx);
    }

    #[test]
    fn proof_create_rejects_wrong_length_proof_data() {
        let mut out = [0u8; proof::WIRE_SIZE];
        let agent_pk = [0u8; 32];
        let commitment = [0u8; 32];
        let bytes = [0u8; 100];
        let code = repverify_proof_create(
            out.as_mut_ptr(),
            out.len(),
            0,
            50,
            agent_pk.as_ptr(),
            commitment.as_ptr(),
            bytes.as_ptr(),
            bytes.len(),
        );
        assert_eq!(code, ResultCode::InvalidParam);
    }

    #[test]
    fn compute_nullifier_matches_safe_api() {
        let agent_pk = [0x42u8; 32];
        let mut out = [0u8; 32];
        let code = repverify_compute_nullifier(out.as_mut_ptr(), agent_pk.as_ptr(), 7);
        assert_eq!(code, ResultCode::Ok);
        let expected = VerificationContext::compute_nullifier(&agent_pk, 7).unwrap();
        assert_eq!(out, expected);
    }
}
