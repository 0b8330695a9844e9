// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle pool: allocates small integer handles backed by slot records
//! carrying an atomically-updated status, error detail, and fence reference.
//!
//! # Growth vs. in-flight readers
//!
//! The worker thread indexes into `slots` by a `slot_index` it cached at
//! submission time, while submitter threads may concurrently `allocate`,
//! growing the pool. Per the source's re-architecture guidance (SPEC_FULL.md
//! §9), slots live behind `Arc` in an append-only
//! [`DynamicArray`](crate::containers::DynamicArray): growth only ever
//! appends new entries, so an `Arc<HandleSlot<G>>` cloned out from under the
//! `RwLock` before a grow remains valid and at the same logical index after
//! it. The `RwLock` is held only across the `resize` call of a grow — reads
//! (`slot` below) take a brief read lock and clone an `Arc`, never holding
//! the lock while touching the slot's own atomics or payload mutex.

use crate::containers::DynamicArray;
use crate::error::{ErrorRecord, InternalError};
use crate::gpu::GpuBackend;
use crate::handle::Handle;
use crate::status::{AtomicStatus, TransferStatus};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of the fence a handle was bound to at submission time.
#[derive(Debug, Clone)]
pub struct FenceRef<G: GpuBackend> {
    pub fence: G::Fence,
    pub generation: u64,
    pub slot_index: usize,
}

struct SlotPayload<G: GpuBackend> {
    error: ErrorRecord,
    fence_ref: Option<FenceRef<G>>,
}

impl<G: GpuBackend> Default for SlotPayload<G> {
    fn default() -> Self {
        Self {
            error: ErrorRecord::none(),
            fence_ref: None,
        }
    }
}

struct HandleSlot<G: GpuBackend> {
    valid: AtomicBool,
    status: AtomicStatus,
    payload: Mutex<SlotPayload<G>>,
}

impl<G: GpuBackend> HandleSlot<G> {
    fn new() -> Self {
        Self {
            valid: AtomicBool::new(false),
            status: AtomicStatus::new(TransferStatus::Ready),
            payload: Mutex::new(SlotPayload::default()),
        }
    }
}

/// Allocates/frees [`Handle`] values and stores their per-handle state.
///
/// Handle `0` (`Handle::INVALID`) is a reserved sentinel: slot index 0 exists
/// in `slots` but is never pushed onto `free_indices` and never allocated.
pub struct HandlePool<G: GpuBackend> {
    slots: RwLock<DynamicArray<Arc<HandleSlot<G>>>>,
    free_indices: Mutex<Vec<usize>>,
}

impl<G: GpuBackend> HandlePool<G> {
    /// Create a pool with `initial_capacity` usable slots (plus the reserved
    /// sentinel slot at index 0). Reference default is 50.
    pub fn new(initial_capacity: usize) -> Self {
        let total = initial_capacity + 1;
        let mut slots = DynamicArray::create(total);
        slots.resize(total, || Arc::new(HandleSlot::new()));

        // Descending push so the first pop (LIFO) yields index 1, then 2, ...
        let mut free_indices: Vec<usize> = (1..total).collect();
        free_indices.reverse();

        Self {
            slots: RwLock::new(slots),
            free_indices: Mutex::new(free_indices),
        }
    }

    fn slot(&self, handle: Handle) -> Option<Arc<HandleSlot<G>>> {
        if handle.is_invalid() {
            return None;
        }
        let slots = self.slots.read();
        slots.at(handle.index()).cloned()
    }

    fn grow(&self) {
        let mut slots = self.slots.write();
        let old_len = slots.len();
        let new_len = old_len * 2;
        slots.resize(new_len, || Arc::new(HandleSlot::new()));
        drop(slots);

        let mut new_indices: Vec<usize> = (old_len..new_len).collect();
        new_indices.reverse();
        self.free_indices.lock().extend(new_indices);
    }

    /// Allocate a handle. Pops a free index; if none are available, doubles
    /// the backing storage and retries. Only fails if doubling itself would
    /// overflow `usize`, which is unreachable in practice.
    pub fn allocate(&self) -> Option<Handle> {
        let index = loop {
            if let Some(index) = self.free_indices.lock().pop() {
                break index;
            }
            self.grow();
        };

        let slot = self.slot(Handle::from_index(index))?;
        slot.valid.store(true, Ordering::Release);
        Some(Handle::from_index(index))
    }

    /// Reset a slot to defaults (`Ready`, no error, no fence) without
    /// freeing it. A no-op on an invalid or unallocated handle.
    pub fn reset(&self, handle: Handle) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        if !slot.valid.load(Ordering::Acquire) {
            return;
        }
        *slot.payload.lock() = SlotPayload::default();
        slot.status.store(TransferStatus::Ready, Ordering::Release);
    }

    /// Free a handle: reset its slot, mark it invalid, and return the index
    /// to the free stack.
    pub fn free(&self, handle: Handle) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        *slot.payload.lock() = SlotPayload::default();
        slot.status.store(TransferStatus::Ready, Ordering::Release);
        slot.valid.store(false, Ordering::Release);
        self.free_indices.lock().push(handle.index());
    }

    /// Store the fence reference for an in-flight submission. Must be
    /// called, and its effects observed by a release store to `status`,
    /// strictly before [`HandlePool::publish_status`] publishes `Executing`.
    pub fn set_fence(&self, handle: Handle, fence_ref: FenceRef<G>) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        slot.payload.lock().fence_ref = Some(fence_ref);
    }

    /// Publish a new status with release ordering.
    pub fn publish_status(&self, handle: Handle, status: TransferStatus) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        slot.status.store(status, Ordering::Release);
    }

    /// Load the current status with acquire ordering. `None` if the handle
    /// is out of range (never allocated).
    pub fn status(&self, handle: Handle) -> Option<TransferStatus> {
        let slot = self.slot(handle)?;
        Some(slot.status.load(Ordering::Acquire))
    }

    /// The fence reference stored by the worker for an executing handle.
    pub fn fence_ref(&self, handle: Handle) -> Option<FenceRef<G>> {
        let slot = self.slot(handle)?;
        slot.payload.lock().fence_ref.clone()
    }

    /// Fill the error record with a GPU failure, then publish `Error`. The
    /// error write happens-before the status store (same lock scope, then a
    /// release store), so any observer seeing `Error` also sees the payload.
    pub fn set_error_gpu(&self, handle: Handle, description: impl Into<String>) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        slot.payload.lock().error = ErrorRecord::gpu(description);
        slot.status.store(TransferStatus::Error, Ordering::Release);
    }

    /// Fill the error record with an internal failure, then publish `Error`.
    pub fn set_error_internal(&self, handle: Handle, code: InternalError) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        slot.payload.lock().error = ErrorRecord::internal(code);
        slot.status.store(TransferStatus::Error, Ordering::Release);
    }

    /// The error record attached to `handle`, if any.
    pub fn error(&self, handle: Handle) -> Option<ErrorRecord> {
        let slot = self.slot(handle)?;
        Some(slot.payload.lock().error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::MockBackend;

    fn pool() -> HandlePool<MockBackend> {
        HandlePool::new(4)
    }

    #[test]
    fn allocate_never_returns_invalid() {
        let pool = pool();
        for _ in 0..10 {
            let h = pool.allocate().unwrap();
            assert!(!h.is_invalid());
        }
    }

    #[test]
    fn fresh_allocation_is_ready() {
        let pool = pool();
        let h = pool.allocate().unwrap();
        assert_eq!(pool.status(h), Some(TransferStatus::Ready));
        assert!(pool.fence_ref(h).is_none());
    }

    #[test]
    fn free_then_allocate_round_trips_to_ready() {
        let pool = pool();
        let h = pool.allocate().unwrap();
        pool.publish_status(h, TransferStatus::Error);
        pool.set_error_gpu(h, "boom");
        pool.free(h);

        let h2 = pool.allocate().unwrap();
        assert_eq!(h, h2, "freeing the only outstanding handle should recycle its index");
        assert_eq!(pool.status(h2), Some(TransferStatus::Ready));
        assert!(pool.error(h2).unwrap().kind() == crate::error::ErrorKind::None);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let pool = HandlePool::<MockBackend>::new(2);
        let handles: Vec<_> = (0..20).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(handles.len(), 20);
        // All indices distinct.
        let mut seen = std::collections::HashSet::new();
        for h in handles {
            assert!(seen.insert(h));
        }
    }

    #[test]
    fn invalid_handle_operations_are_noops() {
        let pool = pool();
        pool.reset(Handle::INVALID);
        pool.free(Handle::INVALID);
        assert_eq!(pool.status(Handle::INVALID), None);
    }

    #[test]
    fn error_precedes_error_status_observably() {
        let pool = pool();
        let h = pool.allocate().unwrap();
        pool.set_error_internal(h, InternalError::DequeueFailed);
        assert_eq!(pool.status(h), Some(TransferStatus::Error));
        assert_eq!(
            pool.error(h).unwrap().internal_code(),
            Some(InternalError::DequeueFailed)
        );
    }
}
