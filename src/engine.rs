// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The public façade: [`Engine`].

use crate::config::EngineConfig;
use crate::error::{Error, InternalError};
use crate::gpu::GpuBackend;
use crate::handle::Handle;
use crate::pool::HandlePool;
use crate::queue::RequestQueue;
use crate::request::{BufferToBufferRequest, BufferToImageRequest, ImageToImageRequest};
use crate::rotation::CommandBufferRotation;
use crate::status::TransferStatus;
use crate::worker::{worker_loop, WorkerContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Queue family the engine opens its transfer queue and command pool on.
/// A fixed value is sufficient: this crate never shares the queue with
/// other work, so there is nothing for a caller to configure here.
const TRANSFER_QUEUE_FAMILY: u32 = 0;

/// Asynchronous GPU transfer engine.
///
/// Owns a dedicated worker thread, a bounded request queue, a rotating pool
/// of command buffers/fences, and a growable pool of submission handles.
/// Application threads call `submit_*` to enqueue work without blocking and
/// `status` to poll for completion.
pub struct Engine<G: GpuBackend> {
    backend: Arc<G>,
    rotation: Arc<CommandBufferRotation<G>>,
    handles: Arc<HandlePool<G>>,
    requests: Arc<RequestQueue<G>>,
    worker: Option<JoinHandle<()>>,
    shutdown: AtomicBool,
}

impl<G: GpuBackend> Engine<G> {
    /// Open the transfer queue and command pool on `gpu`, then spawn the
    /// worker thread. Returns as soon as the thread is spawned; it does not
    /// wait for the first submission.
    pub fn init(gpu: G, config: EngineConfig) -> Result<Self, Error> {
        log::info!(
            "initializing transfer engine: rotation_size={}, queue_capacity={}, initial_handle_capacity={}",
            config.rotation_size,
            config.queue_capacity,
            config.initial_handle_capacity,
        );

        let backend = Arc::new(gpu);
        let rotation = Arc::new(
            CommandBufferRotation::create(&backend, TRANSFER_QUEUE_FAMILY, config.rotation_size)
                .map_err(Error::Gpu)?,
        );
        let queue = backend.queue(TRANSFER_QUEUE_FAMILY).map_err(Error::Gpu)?;

        let handles = Arc::new(HandlePool::new(config.initial_handle_capacity));
        let requests = Arc::new(RequestQueue::new(config.queue_capacity));

        let ctx = WorkerContext {
            backend: backend.clone(),
            queue,
            rotation: rotation.clone(),
            handles: handles.clone(),
            requests: requests.clone(),
        };

        let worker = std::thread::Builder::new()
            .name("transfer-engine-worker".into())
            .spawn(move || worker_loop(ctx))
            .map_err(|_| Error::Internal(InternalError::ThreadCreateFailed))?;

        log::info!("transfer engine initialized");

        Ok(Self {
            backend,
            rotation,
            handles,
            requests,
            worker: Some(worker),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Allocate a fresh handle in the `Ready` state.
    pub fn allocate_handle(&self) -> Option<Handle> {
        let handle = self.handles.allocate();
        if let Some(handle) = handle {
            log::debug!("allocated {handle}");
        }
        handle
    }

    /// Reset a handle to `Ready`, clearing any prior error or fence
    /// reference, without freeing its slot. The handle may be resubmitted.
    pub fn reset_handle(&self, handle: Handle) {
        self.handles.reset(handle);
    }

    /// Free a handle, returning its slot to the allocator.
    ///
    /// # Panics (logical, not Rust panics)
    /// Freeing a handle that is `Pending` or `Executing` is the caller's
    /// bug: the slot is recycled immediately and a late worker write would
    /// land on whatever request reuses the index next. This crate does not
    /// guard against it, matching the source's non-reentrant contract.
    pub fn free_handle(&self, handle: Handle) {
        log::debug!("freed {handle}");
        self.handles.free(handle);
    }

    /// Enqueue a whole-buffer-to-whole-buffer copy. Resets the handle's
    /// prior status/error/fence before publishing `Pending`, so resubmitting
    /// a `Complete` or `Error` handle starts from a clean slate. Never
    /// blocks: the bounded queue grows under pressure rather than rejecting
    /// the submission.
    pub fn submit_buffer_to_buffer(&self, request: BufferToBufferRequest<G>) {
        self.handles.reset(request.handle);
        self.requests.enqueue(request.into(), &self.handles);
    }

    /// Enqueue a whole-buffer-to-whole-image copy. See
    /// [`Engine::submit_buffer_to_buffer`] for the handle-reset contract.
    pub fn submit_buffer_to_image(&self, request: BufferToImageRequest<G>) {
        self.handles.reset(request.handle);
        self.requests.enqueue(request.into(), &self.handles);
    }

    /// Enqueue a whole-image-to-whole-image copy. See
    /// [`Engine::submit_buffer_to_buffer`] for the handle-reset contract.
    pub fn submit_image_to_image(&self, request: ImageToImageRequest<G>) {
        self.handles.reset(request.handle);
        self.requests.enqueue(request.into(), &self.handles);
    }

    /// Query the current status of `handle`, reconciling against live fence
    /// state when the cached status is `Executing`.
    ///
    /// `Ready`/`Pending`/`Complete`/`Error` are returned as last published by
    /// the worker or a prior call to `status`. `Executing` additionally
    /// checks the handle's fence: if it has signaled, this call publishes
    /// `Complete` and returns it. If the rotation slot's generation no
    /// longer matches the one recorded at submission time, the slot was
    /// already reclaimed and resubmitted by the worker, which can only
    /// happen after this handle's own fence signaled — so `Complete` is
    /// returned without consulting the (now unrelated) live fence. This is
    /// the ABA check described in SPEC_FULL.md §4.8.
    pub fn status(&self, handle: Handle) -> Option<TransferStatus> {
        let status = self.handles.status(handle)?;
        if status != TransferStatus::Executing {
            return Some(status);
        }

        let fence_ref = self.handles.fence_ref(handle)?;
        if self.rotation.generation(fence_ref.slot_index) != fence_ref.generation {
            // The worker has already claimed this rotation slot again for a
            // newer submission. That can only happen after this handle's
            // fence was observed signaled, so the handle completed at some
            // point between its own claim and the slot's reuse; report
            // `Complete` without touching the fence, which by now belongs to
            // someone else's in-flight transfer.
            self.handles.publish_status(handle, TransferStatus::Complete);
            return Some(TransferStatus::Complete);
        }

        match self.backend.fence_status(&fence_ref.fence) {
            Ok(crate::gpu::FenceStatus::Signaled) => {
                self.handles.publish_status(handle, TransferStatus::Complete);
                Some(TransferStatus::Complete)
            }
            Ok(crate::gpu::FenceStatus::NotReady) => Some(TransferStatus::Executing),
            Err(err) => {
                log::warn!("transfer {handle}: status query failed: {err}");
                self.handles.set_error_gpu(handle, err.to_string());
                Some(TransferStatus::Error)
            }
        }
    }

    /// Block until the worker has drained the queue and all submitted work
    /// has completed on the device, then join the worker thread and destroy
    /// the rotation's fences and command pool. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("shutting down transfer engine");
        self.requests.request_stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if let Err(err) = self.backend.wait_idle() {
            log::warn!("transfer engine shutdown: wait_idle failed: {err}");
        }
        // Fences and the command pool are only destroyed once the device is
        // known idle: destroying them while the last-submitted GPU work
        // still references them is undefined behavior in a real backend.
        if let Err(err) = self.rotation.destroy(&self.backend) {
            log::warn!("transfer engine shutdown: failed to destroy command pool/fences: {err}");
        }
        log::info!("transfer engine shutdown complete");
    }
}

impl<G: GpuBackend> Drop for Engine<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::{MockBackend, MockResource};
    use crate::pool::FenceRef;

    #[test]
    fn happy_path_reaches_complete() {
        let mut engine = Engine::init(MockBackend::new(), EngineConfig::new()).unwrap();
        let handle = engine.allocate_handle().unwrap();

        engine.submit_buffer_to_buffer(BufferToBufferRequest {
            handle,
            src: MockResource(1),
            dst: MockResource(2),
            dst_access_mask: 0,
            dst_stage_mask: 0,
        });

        let status = loop {
            match engine.status(handle) {
                Some(TransferStatus::Ready) | Some(TransferStatus::Pending) => continue,
                Some(other) => break other,
                None => panic!("handle disappeared"),
            }
        };
        assert_eq!(status, TransferStatus::Complete);
        engine.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent_and_joins_worker() {
        let mut engine = Engine::init(MockBackend::new(), EngineConfig::new()).unwrap();
        engine.shutdown();
        engine.shutdown();
    }

    #[test]
    fn status_detects_generation_mismatch_without_consulting_live_fence() {
        // Driven directly against the rotation and handle pool rather than
        // through `submit_*`/the worker thread, so the generation-mismatch
        // branch (SPEC_FULL.md §4.8, the ABA-breaker) is pinned down without
        // racing worker-thread timing.
        let engine = Engine::init(MockBackend::new(), EngineConfig::new().rotation_size(1)).unwrap();
        let handle = engine.handles.allocate().unwrap();

        // Claim the only rotation slot (generation 0 -> 1) and attach that
        // stale fence reference to `handle`, as the worker would right
        // after a successful submit, without actually submitting anything.
        let claimed = engine.rotation.claim_available(&engine.backend).unwrap();
        let stale_fence_ref = FenceRef {
            fence: claimed.fence.clone(),
            generation: claimed.generation,
            slot_index: claimed.index,
        };
        let reused_fence = claimed.fence.clone();
        drop(claimed);
        engine.handles.set_fence(handle, stale_fence_ref);
        engine.handles.publish_status(handle, TransferStatus::Executing);

        // Simulate the worker reclaiming the same slot for a later
        // submission: reset and resignal the fence, then claim again,
        // bumping the live generation to 2 without ever publishing
        // anything back onto `handle`.
        engine.backend.reset_fence(&reused_fence).unwrap();
        reused_fence.signal();
        let _reclaimed = engine.rotation.claim_available(&engine.backend).unwrap();

        // `handle`'s fence reference still carries generation 1 against a
        // rotation slot now on generation 2: `status` must take the
        // mismatch branch and publish `Complete` without ever querying
        // `reused_fence` (which by now belongs to the other submission).
        assert_eq!(engine.status(handle), Some(TransferStatus::Complete));
        assert_eq!(engine.status(handle), Some(TransferStatus::Complete));
    }

    #[test]
    fn reset_after_error_allows_resubmission() {
        let mut engine = Engine::init(MockBackend::new(), EngineConfig::new()).unwrap();
        let backend_handle = engine.allocate_handle().unwrap();
        engine.handles.set_error_gpu(backend_handle, "synthetic");
        assert_eq!(engine.status(backend_handle), Some(TransferStatus::Error));

        engine.reset_handle(backend_handle);
        assert_eq!(engine.status(backend_handle), Some(TransferStatus::Ready));
        engine.shutdown();
    }
}
