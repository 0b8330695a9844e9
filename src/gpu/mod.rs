// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Narrow capability interface the engine consumes from a graphics API.
//!
//! The engine is generic over [`GpuBackend`] so that the hard part of this
//! crate — the concurrent submission pipeline — can be exercised without a
//! real device. Production callers implement `GpuBackend` over whatever
//! graphics API they have wired up (Vulkan via `ash`, `wgpu`, etc); this
//! crate never names a concrete API.
//!
//! This module deliberately mirrors the narrowness of
//! [`ByteStream`](https://en.wikipedia.org/wiki/Berkeley_sockets)-style
//! abstractions elsewhere in this codebase: just enough surface for the
//! worker loop to drive, nothing about device creation or memory allocation.

#[cfg(feature = "test-util")]
pub mod mock;

use std::fmt;

/// Opaque error surfaced by a [`GpuBackend`] call. The engine never inspects
/// this beyond stringifying it into an [`ErrorRecord`](crate::error::ErrorRecord).
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a non-blocking fence status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence is signaled: the GPU work it guards has completed.
    Signaled,
    /// The fence has not yet signaled.
    NotReady,
}

/// Pipeline barrier access/stage pair used when transitioning a buffer or
/// image after a transfer-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BarrierMasks {
    /// Destination access mask. `0` means "substitute the safest permissive
    /// value" (see [`BarrierMasks::dst_access_or_default`]).
    pub dst_access_mask: u32,
    /// Destination pipeline stage mask. `0` means "substitute the safest
    /// permissive value" (see [`BarrierMasks::dst_stage_or_default`]).
    pub dst_stage_mask: u32,
}

/// Safest permissive access mask substituted when a request leaves
/// `dst_access_mask` at zero. Mirrors `VK_ACCESS_MEMORY_READ_BIT |
/// VK_ACCESS_MEMORY_WRITE_BIT` without naming a concrete graphics API.
pub const ACCESS_MEMORY_READ_WRITE: u32 = 0x8000 | 0x10000;

/// Safest permissive pipeline stage mask substituted when a request leaves
/// `dst_stage_mask` at zero. Mirrors `VK_PIPELINE_STAGE_ALL_COMMANDS_BIT`.
pub const STAGE_ALL_COMMANDS: u32 = 0x0002_0000;

/// Sentinel queue family index meaning "no ownership transfer": the engine
/// owns a single queue family for transfers. Mirrors `VK_QUEUE_FAMILY_IGNORED`.
pub const QUEUE_FAMILY_IGNORED: u32 = u32::MAX;

impl BarrierMasks {
    /// `dst_access_mask`, or the safest permissive value if it was left at 0.
    pub fn dst_access_or_default(self) -> u32 {
        if self.dst_access_mask == 0 {
            ACCESS_MEMORY_READ_WRITE
        } else {
            self.dst_access_mask
        }
    }

    /// `dst_stage_mask`, or the safest permissive value if it was left at 0.
    pub fn dst_stage_or_default(self) -> u32 {
        if self.dst_stage_mask == 0 {
            STAGE_ALL_COMMANDS
        } else {
            self.dst_stage_mask
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_masks_substitute_permissive_defaults() {
        let masks = BarrierMasks::default();
        assert_eq!(masks.dst_access_or_default(), ACCESS_MEMORY_READ_WRITE);
        assert_eq!(masks.dst_stage_or_default(), STAGE_ALL_COMMANDS);
    }

    #[test]
    fn nonzero_masks_pass_through_unchanged() {
        let masks = BarrierMasks {
            dst_access_mask: 0x1,
            dst_stage_mask: 0x2,
        };
        assert_eq!(masks.dst_access_or_default(), 0x1);
        assert_eq!(masks.dst_stage_or_default(), 0x2);
    }
}

/// Whole-buffer copy description, `src_offset = dst_offset = 0`, whole size.
#[derive(Debug, Clone)]
pub struct BufferCopy<B> {
    pub src: B,
    pub dst: B,
    pub barrier: BarrierMasks,
}

/// Whole-image copy description (additive: see SPEC_FULL.md §9 on image
/// transfers). Left intentionally coarse — layout management is the
/// responsibility of the concrete backend, not this crate.
#[derive(Debug, Clone)]
pub struct ImageCopy<I> {
    pub src: I,
    pub dst: I,
    pub barrier: BarrierMasks,
}

/// Whole-buffer-to-whole-image copy description (additive).
#[derive(Debug, Clone)]
pub struct BufferImageCopy<B, I> {
    pub src: B,
    pub dst: I,
    pub barrier: BarrierMasks,
}

/// The narrow set of graphics-API capabilities the engine needs.
///
/// Implementations must be `Send + Sync`: the engine calls this trait only
/// from its single worker thread and from polling submitter threads, but it
/// is held behind an `Arc` so the bound is required regardless.
pub trait GpuBackend: Send + Sync + 'static {
    /// Opaque command-buffer handle.
    type CommandBuffer: Send + Sync + Clone + fmt::Debug;
    /// Opaque fence handle.
    type Fence: Send + Sync + Clone + fmt::Debug;
    /// Opaque queue handle.
    type Queue: Send + Sync + Clone + fmt::Debug;
    /// Opaque buffer handle (application-owned).
    type Buffer: Send + Sync + Clone + fmt::Debug;
    /// Opaque image handle (application-owned).
    type Image: Send + Sync + Clone + fmt::Debug;

    /// Create a command pool on `queue_family` with per-buffer reset allowed,
    /// then allocate `count` primary command buffers from it.
    fn create_command_buffers(
        &self,
        queue_family: u32,
        count: usize,
    ) -> Result<Vec<Self::CommandBuffer>, BackendError>;

    /// Retrieve the transfer queue for `queue_family`.
    fn queue(&self, queue_family: u32) -> Result<Self::Queue, BackendError>;

    /// Create a fence in the **signaled** state.
    fn create_signaled_fence(&self) -> Result<Self::Fence, BackendError>;

    /// Non-blocking fence status query.
    fn fence_status(&self, fence: &Self::Fence) -> Result<FenceStatus, BackendError>;

    /// Reset a fence to the unsignaled state.
    fn reset_fence(&self, fence: &Self::Fence) -> Result<(), BackendError>;

    /// Begin recording with the one-time-submit usage flag.
    fn begin_one_time_submit(&self, cmd: &Self::CommandBuffer) -> Result<(), BackendError>;

    /// Record a pipeline barrier followed by a whole-buffer copy.
    fn record_buffer_copy(
        &self,
        cmd: &Self::CommandBuffer,
        copy: &BufferCopy<Self::Buffer>,
    ) -> Result<(), BackendError>;

    /// Record a pipeline barrier followed by a whole-image copy.
    fn record_image_copy(
        &self,
        cmd: &Self::CommandBuffer,
        copy: &ImageCopy<Self::Image>,
    ) -> Result<(), BackendError>;

    /// Record a pipeline barrier followed by a whole-buffer-to-whole-image copy.
    fn record_buffer_to_image_copy(
        &self,
        cmd: &Self::CommandBuffer,
        copy: &BufferImageCopy<Self::Buffer, Self::Image>,
    ) -> Result<(), BackendError>;

    /// Finish recording.
    fn end_command_buffer(&self, cmd: &Self::CommandBuffer) -> Result<(), BackendError>;

    /// Submit one command buffer with one fence.
    fn submit(
        &self,
        queue: &Self::Queue,
        cmd: &Self::CommandBuffer,
        fence: &Self::Fence,
    ) -> Result<(), BackendError>;

    /// Block until all work on the device has completed. Used only by the
    /// engine's shutdown path, after the worker thread has joined.
    fn wait_idle(&self) -> Result<(), BackendError>;

    /// Destroy a fence. Called once per rotation slot during
    /// [`Engine::shutdown`](crate::Engine::shutdown), after `wait_idle` has
    /// returned, so no in-flight GPU work still references the fence.
    fn destroy_fence(&self, fence: &Self::Fence) -> Result<(), BackendError>;

    /// Destroy the command pool opened on `queue_family` by
    /// [`GpuBackend::create_command_buffers`], freeing every command buffer
    /// allocated from it. Called once during
    /// [`Engine::shutdown`](crate::Engine::shutdown), after every rotation
    /// fence has been destroyed.
    fn destroy_command_pool(&self, queue_family: u32) -> Result<(), BackendError>;
}
