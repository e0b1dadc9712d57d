//! Fragmentation-free scoped allocation
//!
//! An [`Arena`] is a singly linked chain of blocks with a monotonically
//! increasing `used` cursor per block. Allocation bumps the cursor; there is
//! no free list and no fragmentation. A [`Checkpoint`] captures
//! `(block, used)`; [`Arena::restore`] releases everything allocated after
//! it in `O(blocks)` by walking back to that point.
//!
//! Real Rust collections (`Vec<T>`) already give us a safe, leak-free way to
//! own the bytes a bucket array or coefficient tile needs; what the original
//! engine's arena buys on top of that is the *shape* this crate also needs:
//! a block-chain budget with deterministic checkpoint/restore and a hard
//! ceiling ([`crate::MAX_ARENA_SIZE`]). So `Arena` here is an accounting and
//! lifecycle structure — it tracks how much has been committed and enforces
//! the ceiling and checkpoint discipline — while the bytes themselves are
//! owned by ordinary `Vec`s the caller allocates once `Arena::alloc` grants
//! the budget. This keeps the crate free of `unsafe` while still giving the
//! batch verifier (§4.7) the exact "allocate scratch, checkpoint, restore"
//! control flow the design calls for.

use std::sync::{Arc, Mutex};

/// Errors raised by the arena allocator.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena block size must be positive")]
    ZeroBlockSize,
    #[error("allocation of {0} bytes would exceed the arena's total size limit")]
    OutOfMemory,
    #[error("checkpoint does not belong to this arena's current block chain")]
    InvalidCheckpoint,
}

#[derive(Debug)]
struct Block {
    used: usize,
    capacity: usize,
}

impl Block {
    fn new(capacity: usize) -> Self {
        Block { used: 0, capacity }
    }

    fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

#[derive(Debug)]
struct ArenaInner {
    blocks: Vec<Block>,
    /// Index of the block new allocations bump into.
    current: usize,
    block_size: usize,
    total_limit: usize,
    total_allocated: usize,
    peak_usage: usize,
}

impl ArenaInner {
    fn new(block_size: usize, total_limit: usize) -> Self {
        ArenaInner {
            blocks: vec![Block::new(block_size)],
            current: 0,
            block_size,
            total_limit,
            total_allocated: 0,
            peak_usage: 0,
        }
    }

    fn used(&self) -> usize {
        self.blocks.iter().map(|b| b.used).sum()
    }

    fn alloc(&mut self, size: usize) -> Result<Allocation, ArenaError> {
        if self.used() + size > self.total_limit {
            return Err(ArenaError::OutOfMemory);
        }
        if self.blocks[self.current].remaining() < size {
            // Bump to a new block, sized to fit `size` if it exceeds the
            // default block size (a "large object" falls into its own block).
            let cap = size.max(self.block_size);
            self.blocks.push(Block::new(cap));
            self.current = self.blocks.len() - 1;
        }
        let block = &mut self.blocks[self.current];
        let offset = block.used;
        block.used += size;
        self.total_allocated += size;
        let used_now = self.used();
        if used_now > self.peak_usage {
            self.peak_usage = used_now;
        }
        Ok(Allocation {
            block: self.current,
            offset,
            size,
        })
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            block: self.current,
            used: self.blocks[self.current].used,
        }
    }

    fn restore(&mut self, cp: Checkpoint) -> Result<(), ArenaError> {
        if cp.block >= self.blocks.len() {
            return Err(ArenaError::InvalidCheckpoint);
        }
        self.blocks.truncate(cp.block + 1);
        self.blocks[cp.block].used = cp.used;
        self.current = cp.block;
        Ok(())
    }

    fn reset(&mut self) {
        self.blocks.truncate(1);
        self.blocks[0].used = 0;
        self.current = 0;
    }
}

/// A single allocation's location within the arena's block chain. Opaque to
/// callers; its only purpose is to be handed back for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    block: usize,
    offset: usize,
    size: usize,
}

impl Allocation {
    /// Size in bytes of this allocation.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Captures `(block, used)` so a later [`Arena::restore`] can release
/// everything allocated after this point in `O(blocks)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    block: usize,
    used: usize,
}

/// Reference-counted, fragmentation-free scoped allocator.
///
/// Cloning an `Arena` shares the same underlying block chain (the original
/// engine reference-counts its arena for sharing across threads); per §5,
/// only the thread that owns a given verification context is expected to
/// touch that context's arena concurrently — this is a caller contract, not
/// something the type system enforces.
#[derive(Debug, Clone)]
pub struct Arena {
    inner: Arc<Mutex<ArenaInner>>,
}

impl Arena {
    /// Create a new arena with the given per-block size and total budget.
    pub fn new(block_size: usize, total_limit: usize) -> Result<Self, ArenaError> {
        if block_size == 0 {
            return Err(ArenaError::ZeroBlockSize);
        }
        Ok(Arena {
            inner: Arc::new(Mutex::new(ArenaInner::new(block_size, total_limit))),
        })
    }

    /// Create an arena using the crate defaults (1 MiB blocks, 64 MiB total).
    pub fn with_defaults() -> Self {
        Arena::new(crate::ARENA_DEFAULT_BLOCK_SIZE, crate::MAX_ARENA_SIZE)
            .expect("default block size is non-zero")
    }

    /// Grant a budget of `size` bytes from the arena, bumping the cursor.
    /// The actual storage is the caller's `Vec`/`Box`; this only accounts
    /// for it against the arena's block chain and total limit.
    pub fn alloc(&self, size: usize) -> Result<Allocation, ArenaError> {
        self.inner.lock().expect("arena mutex poisoned").alloc(size)
    }

    /// Capture the current `(block, used)` position.
    pub fn checkpoint(&self) -> Checkpoint {
        self.inner.lock().expect("arena mutex poisoned").checkpoint()
    }

    /// Release everything allocated since `cp` in `O(blocks)`.
    pub fn restore(&self, cp: Checkpoint) -> Result<(), ArenaError> {
        self.inner.lock().expect("arena mutex poisoned").restore(cp)
    }

    /// Release everything back to a single, empty initial block.
    pub fn reset(&self) {
        self.inner.lock().expect("arena mutex poisoned").reset();
    }

    /// Bytes currently committed across all blocks.
    pub fn used(&self) -> usize {
        self.inner.lock().expect("arena mutex poisoned").used()
    }

    /// High-water mark of bytes committed, since creation or the last reset.
    pub fn peak(&self) -> usize {
        self.inner.lock().expect("arena mutex poisoned").peak_usage
    }

    /// Number of blocks currently in the chain.
    pub fn block_count(&self) -> usize {
        self.inner.lock().expect("arena mutex poisoned").blocks.len()
    }
}

thread_local! {
    static SCRATCH: std::cell::RefCell<Option<Arena>> = const { std::cell::RefCell::new(None) };
}

/// Get (lazily initializing) this thread's scratch arena. Used by the batch
/// verifier for bucket arrays (Pippenger MSM) that must not outlive a batch.
pub fn scratch_arena() -> Arena {
    SCRATCH.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(
                Arena::new(crate::SCRATCH_ARENA_SIZE, crate::SCRATCH_ARENA_SIZE)
                    .expect("scratch arena block size is non-zero"),
            );
        }
        slot.as_ref().unwrap().clone()
    })
}

/// Reset this thread's scratch arena to empty. Called after each batch.
pub fn scratch_arena_reset() {
    SCRATCH.with(|cell| {
        if let Some(arena) = cell.borrow().as_ref() {
            arena.reset();
        }
    });
}

/// Drop this thread's scratch arena. Callers should invoke this before
/// thread exit to release the thread-local slot promptly.
pub fn scratch_arena_destroy() {
    SCRATCH.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_bumps_cursor_within_a_block() {
        let arena = Arena::new(1024, 1024 * 1024).unwrap();
        let a = arena.alloc(100).unwrap();
        let b = arena.alloc(200).unwrap();
        assert_eq!(a.size(), 100);
        assert_eq!(b.size(), 200);
        assert_eq!(arena.used(), 300);
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    fn alloc_overflows_into_new_block() {
        let arena = Arena::new(100, 1024 * 1024).unwrap();
        arena.alloc(90).unwrap();
        arena.alloc(50).unwrap(); // doesn't fit in remaining 10 -> new block
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena.used(), 140);
    }

    #[test]
    fn checkpoint_restore_releases_everything_after() {
        let arena = Arena::new(1024, 1024 * 1024).unwrap();
        arena.alloc(100).unwrap();
        let cp = arena.checkpoint();
        arena.alloc(500).unwrap();
        assert_eq!(arena.used(), 600);
        arena.restore(cp).unwrap();
        assert_eq!(arena.used(), 100);
    }

    #[test]
    fn reset_zeroes_every_block() {
        let arena = Arena::new(100, 1024 * 1024).unwrap();
        arena.alloc(90).unwrap();
        arena.alloc(90).unwrap();
        assert!(arena.block_count() > 1);
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    fn total_limit_is_enforced() {
        let arena = Arena::new(1024, 2048).unwrap();
        arena.alloc(2000).unwrap();
        assert_eq!(arena.alloc(100), Err(ArenaError::OutOfMemory));
    }

    #[test]
    fn scratch_arena_is_thread_local_and_resettable() {
        let s = scratch_arena();
        s.alloc(10).unwrap();
        assert_eq!(scratch_arena().used(), 10);
        scratch_arena_reset();
        assert_eq!(scratch_arena().used(), 0);
        scratch_arena_destroy();
    }
}
