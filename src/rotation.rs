// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size rotation of command buffers + fences, recycled by the worker
//! via a generation counter that breaks the ABA hazard described in
//! SPEC_FULL.md §4.8.

use crate::gpu::{BackendError, FenceStatus, GpuBackend};
use std::sync::atomic::{AtomicU64, Ordering};

struct RotationSlot<G: GpuBackend> {
    command_buffer: G::CommandBuffer,
    fence: G::Fence,
    generation: AtomicU64,
}

/// Fixed-size `{command_buffer, fence, generation}` triples. Reference size
/// is 5; configurable via [`crate::config::EngineConfig::rotation_size`].
pub struct CommandBufferRotation<G: GpuBackend> {
    queue_family: u32,
    slots: Vec<RotationSlot<G>>,
}

/// A claimed slot in the rotation, returned by [`CommandBufferRotation::claim_available`].
pub struct ClaimedSlot<'a, G: GpuBackend> {
    pub index: usize,
    pub command_buffer: &'a G::CommandBuffer,
    pub fence: &'a G::Fence,
    pub generation: u64,
}

impl<G: GpuBackend> CommandBufferRotation<G> {
    /// Create the command pool on `queue_family`, allocate `size` primary
    /// command buffers, and create `size` fences in the signaled state so
    /// the first [`CommandBufferRotation::claim_available`] succeeds
    /// immediately.
    pub fn create(backend: &G, queue_family: u32, size: usize) -> Result<Self, BackendError> {
        let command_buffers = backend.create_command_buffers(queue_family, size)?;
        let mut slots = Vec::with_capacity(size);
        for command_buffer in command_buffers {
            let fence = backend.create_signaled_fence()?;
            slots.push(RotationSlot {
                command_buffer,
                fence,
                generation: AtomicU64::new(0),
            });
        }
        Ok(Self {
            queue_family,
            slots,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current generation counter for `slot_index`.
    ///
    /// # Panics
    /// Panics if `slot_index >= self.len()`.
    pub fn generation(&self, slot_index: usize) -> u64 {
        self.slots[slot_index].generation.load(Ordering::Acquire)
    }

    /// Scan the rotation round-robin starting at 0, looking for a signaled
    /// fence. On success, atomically bumps that slot's generation (claiming
    /// it for a new submission) and returns it.
    ///
    /// This spins without sleeping: the worker is single-threaded and the
    /// number of in-flight transfers is bounded by `self.len()`, so under
    /// normal operation a signaled fence appears quickly. SPEC_FULL.md §9
    /// (Open Question 2) notes a blocking wait-with-timeout is a valid
    /// alternative implementation; this one keeps the reference design's
    /// unconditional spin.
    pub fn claim_available(&self, backend: &G) -> Result<ClaimedSlot<'_, G>, BackendError> {
        let mut i = 0usize;
        loop {
            let slot = &self.slots[i];
            match backend.fence_status(&slot.fence)? {
                FenceStatus::Signaled => {
                    let generation = slot.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    return Ok(ClaimedSlot {
                        index: i,
                        command_buffer: &slot.command_buffer,
                        fence: &slot.fence,
                        generation,
                    });
                }
                FenceStatus::NotReady => {
                    i = (i + 1) % self.slots.len();
                }
            }
        }
    }

    /// Destroy every fence, then the command pool the fences and command
    /// buffers were allocated from. The caller (`Engine::shutdown`) must
    /// have already joined the worker and waited for the device to go idle:
    /// destroying a fence or command pool while GPU work referencing it is
    /// still in flight is undefined behavior in the underlying graphics
    /// API, mirroring `vk_transfer.c`'s teardown ordering.
    pub fn destroy(&self, backend: &G) -> Result<(), BackendError> {
        for slot in &self.slots {
            backend.destroy_fence(&slot.fence)?;
        }
        backend.destroy_command_pool(self.queue_family)
    }
}
