// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory [`GpuBackend`] used by this crate's own test harness.
//!
//! Provides configurable fence signaling and error injection so the
//! concurrent submission pipeline can be exercised deterministically without
//! a real device, mirroring this codebase's `MockStream` pattern for the
//! transport layer.

use super::{BackendError, BufferCopy, BufferImageCopy, FenceStatus, GpuBackend, ImageCopy};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock fence: a shared atomic flag, plus an id for assertions in tests.
#[derive(Clone)]
pub struct MockFence {
    id: u32,
    signaled: Arc<AtomicBool>,
}

impl fmt::Debug for MockFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFence").field("id", &self.id).finish()
    }
}

impl MockFence {
    /// Force this fence into the signaled state (simulates GPU completion).
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Mock command buffer: just an id, recording is a no-op bookkeeping step.
#[derive(Debug, Clone)]
pub struct MockCommandBuffer {
    pub id: u32,
}

/// Mock queue: a single shared id, since the engine only ever uses one.
#[derive(Debug, Clone)]
pub struct MockQueue {
    pub id: u32,
}

/// Mock buffer/image handle: an opaque tag the test assigns meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockResource(pub u64);

#[derive(Debug)]
struct MockFailure {
    message: String,
}

impl fmt::Display for MockFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MockFailure {}

fn failure(message: impl Into<String>) -> BackendError {
    Box::new(MockFailure {
        message: message.into(),
    })
}

/// Error-injection switches. Each is consumed (reset to `false`) the first
/// time the corresponding call observes it, so a test can fail exactly one
/// submission and let subsequent ones succeed.
#[derive(Default)]
struct Injected {
    submit_fails: AtomicBool,
    fence_status_errors: AtomicBool,
}

/// In-memory [`GpuBackend`]. Fences start signaled, as the contract requires;
/// a test drives completion by calling [`MockFence::signal`] or by leaving
/// fences perpetually unsignaled to model a stalled worker.
pub struct MockBackend {
    next_cmd_id: AtomicU32,
    next_fence_id: AtomicU32,
    injected: Injected,
    submit_count: AtomicUsize,
    destroyed_fence_count: AtomicUsize,
    command_pool_destroyed: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            next_cmd_id: AtomicU32::new(0),
            next_fence_id: AtomicU32::new(0),
            injected: Injected::default(),
            submit_count: AtomicUsize::new(0),
            destroyed_fence_count: AtomicUsize::new(0),
            command_pool_destroyed: AtomicBool::new(false),
        }
    }

    /// Make the next `submit` call fail with a GPU error.
    pub fn fail_next_submit(&self) {
        self.injected.submit_fails.store(true, Ordering::Release);
    }

    /// Make the next `fence_status` call fail with a GPU error (distinct
    /// from `NotReady`).
    pub fn fail_next_fence_status(&self) {
        self.injected
            .fence_status_errors
            .store(true, Ordering::Release);
    }

    /// Total number of successful submissions observed so far.
    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::Acquire)
    }

    /// Total number of `destroy_fence` calls observed so far.
    pub fn destroyed_fence_count(&self) -> usize {
        self.destroyed_fence_count.load(Ordering::Acquire)
    }

    /// Whether `destroy_command_pool` has been called.
    pub fn command_pool_destroyed(&self) -> bool {
        self.command_pool_destroyed.load(Ordering::Acquire)
    }
}

impl GpuBackend for MockBackend {
    type CommandBuffer = MockCommandBuffer;
    type Fence = MockFence;
    type Queue = MockQueue;
    type Buffer = MockResource;
    type Image = MockResource;

    fn create_command_buffers(
        &self,
        _queue_family: u32,
        count: usize,
    ) -> Result<Vec<Self::CommandBuffer>, BackendError> {
        Ok((0..count)
            .map(|_| MockCommandBuffer {
                id: self.next_cmd_id.fetch_add(1, Ordering::Relaxed),
            })
            .collect())
    }

    fn queue(&self, queue_family: u32) -> Result<Self::Queue, BackendError> {
        Ok(MockQueue { id: queue_family })
    }

    fn create_signaled_fence(&self) -> Result<Self::Fence, BackendError> {
        Ok(MockFence {
            id: self.next_fence_id.fetch_add(1, Ordering::Relaxed),
            signaled: Arc::new(AtomicBool::new(true)),
        })
    }

    fn fence_status(&self, fence: &Self::Fence) -> Result<FenceStatus, BackendError> {
        if self
            .injected
            .fence_status_errors
            .swap(false, Ordering::AcqRel)
        {
            return Err(failure("injected fence status error"));
        }
        Ok(if fence.signaled.load(Ordering::Acquire) {
            FenceStatus::Signaled
        } else {
            FenceStatus::NotReady
        })
    }

    fn reset_fence(&self, fence: &Self::Fence) -> Result<(), BackendError> {
        fence.signaled.store(false, Ordering::Release);
        Ok(())
    }

    fn begin_one_time_submit(&self, _cmd: &Self::CommandBuffer) -> Result<(), BackendError> {
        Ok(())
    }

    fn record_buffer_copy(
        &self,
        _cmd: &Self::CommandBuffer,
        _copy: &BufferCopy<Self::Buffer>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn record_image_copy(
        &self,
        _cmd: &Self::CommandBuffer,
        _copy: &ImageCopy<Self::Image>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn record_buffer_to_image_copy(
        &self,
        _cmd: &Self::CommandBuffer,
        _copy: &BufferImageCopy<Self::Buffer, Self::Image>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: &Self::CommandBuffer) -> Result<(), BackendError> {
        Ok(())
    }

    fn submit(
        &self,
        _queue: &Self::Queue,
        _cmd: &Self::CommandBuffer,
        fence: &Self::Fence,
    ) -> Result<(), BackendError> {
        if self.injected.submit_fails.swap(false, Ordering::AcqRel) {
            return Err(failure("injected submit failure"));
        }
        self.submit_count.fetch_add(1, Ordering::Relaxed);
        // A real queue signals the fence asynchronously; the mock signals
        // it immediately unless the test wants to model an in-flight
        // transfer, in which case it should reset the fence again before
        // polling status.
        fence.signal();
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn destroy_fence(&self, _fence: &Self::Fence) -> Result<(), BackendError> {
        self.destroyed_fence_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn destroy_command_pool(&self, _queue_family: u32) -> Result<(), BackendError> {
        self.command_pool_destroyed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_start_signaled() {
        let backend = MockBackend::new();
        let fence = backend.create_signaled_fence().unwrap();
        assert_eq!(backend.fence_status(&fence).unwrap(), FenceStatus::Signaled);
    }

    #[test]
    fn reset_then_not_ready() {
        let backend = MockBackend::new();
        let fence = backend.create_signaled_fence().unwrap();
        backend.reset_fence(&fence).unwrap();
        assert_eq!(backend.fence_status(&fence).unwrap(), FenceStatus::NotReady);
    }

    #[test]
    fn injected_submit_failure_is_one_shot() {
        let backend = MockBackend::new();
        let fence = backend.create_signaled_fence().unwrap();
        let cmd = MockCommandBuffer { id: 0 };
        let queue = MockQueue { id: 0 };

        backend.fail_next_submit();
        assert!(backend.submit(&queue, &cmd, &fence).is_err());
        assert!(backend.submit(&queue, &cmd, &fence).is_ok());
    }
}
