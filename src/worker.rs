// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The single worker thread: claims a rotation slot, records a request,
//! submits it, and publishes status. Mirrors `vk_transfer.c`'s
//! `transfer_thread_func` one-for-one, minus the bug discussed in
//! SPEC_FULL.md §9 (Open Question 1).

use crate::gpu::{BufferCopy, BufferImageCopy, GpuBackend, ImageCopy};
use crate::pool::{FenceRef, HandlePool};
use crate::queue::{Dequeued, RequestQueue};
use crate::request::Request;
use crate::rotation::CommandBufferRotation;
use crate::status::TransferStatus;
use std::sync::Arc;

/// Everything the worker loop needs, bundled so `Engine::init` can hand it
/// off to a spawned thread without a pile of separate `Arc::clone` calls at
/// the call site.
pub(crate) struct WorkerContext<G: GpuBackend> {
    pub(crate) backend: Arc<G>,
    pub(crate) queue: G::Queue,
    pub(crate) rotation: Arc<CommandBufferRotation<G>>,
    pub(crate) handles: Arc<HandlePool<G>>,
    pub(crate) requests: Arc<RequestQueue<G>>,
}

/// Drain the request queue until told to stop. Runs on the dedicated worker
/// thread spawned by `Engine::init`.
pub(crate) fn worker_loop<G: GpuBackend>(ctx: WorkerContext<G>) {
    loop {
        match ctx.requests.dequeue() {
            Dequeued::Request(request) => handle_request(&ctx, request),
            Dequeued::Stop => return,
        }
    }
}

fn handle_request<G: GpuBackend>(ctx: &WorkerContext<G>, request: Request<G>) {
    let handle = request.handle();

    let claimed = match ctx.rotation.claim_available(&ctx.backend) {
        Ok(claimed) => claimed,
        Err(err) => {
            log::warn!("transfer {handle}: failed to claim a command buffer slot: {err}");
            ctx.handles.set_error_gpu(handle, err.to_string());
            return;
        }
    };

    if let Err(err) = ctx.backend.reset_fence(claimed.fence) {
        log::warn!("transfer {handle}: failed to reset fence: {err}");
        ctx.handles.set_error_gpu(handle, err.to_string());
        return;
    }

    if let Err(err) = ctx.backend.begin_one_time_submit(claimed.command_buffer) {
        log::warn!("transfer {handle}: failed to begin command buffer: {err}");
        ctx.handles.set_error_gpu(handle, err.to_string());
        return;
    }

    let record_result = match &request {
        Request::BufferToBuffer {
            src, dst, barrier, ..
        } => ctx.backend.record_buffer_copy(
            claimed.command_buffer,
            &BufferCopy {
                src: src.clone(),
                dst: dst.clone(),
                barrier: *barrier,
            },
        ),
        Request::BufferToImage {
            src, dst, barrier, ..
        } => ctx.backend.record_buffer_to_image_copy(
            claimed.command_buffer,
            &BufferImageCopy {
                src: src.clone(),
                dst: dst.clone(),
                barrier: *barrier,
            },
        ),
        Request::ImageToImage {
            src, dst, barrier, ..
        } => ctx.backend.record_image_copy(
            claimed.command_buffer,
            &ImageCopy {
                src: src.clone(),
                dst: dst.clone(),
                barrier: *barrier,
            },
        ),
    };

    if let Err(err) = record_result {
        log::warn!("transfer {handle}: failed to record copy: {err}");
        ctx.handles.set_error_gpu(handle, err.to_string());
        // Deliberately still ends and submits below: the reference
        // implementation's early `continue` here drops the command buffer
        // in a recording state and leaks the rotation slot permanently.
        // This worker always finishes the end/submit pair so the slot's
        // fence eventually signals and the slot is reclaimed, even when the
        // recording itself failed. See SPEC_FULL.md §9 (Open Question 1).
    }

    if let Err(err) = ctx.backend.end_command_buffer(claimed.command_buffer) {
        log::warn!("transfer {handle}: failed to end command buffer: {err}");
        ctx.handles.set_error_gpu(handle, err.to_string());
        return;
    }

    if let Err(err) = ctx
        .backend
        .submit(&ctx.queue, claimed.command_buffer, claimed.fence)
    {
        log::warn!("transfer {handle}: failed to submit: {err}");
        ctx.handles.set_error_gpu(handle, err.to_string());
        return;
    }

    // The fence snapshot is published only once the submission itself has
    // succeeded, and `Executing` is stored only after the fence reference is
    // visible, so a concurrent `status()` call that observes `Executing`
    // always finds a fence that has actually been (re-)submitted rather than
    // one still carrying its prior signaled state (SPEC_FULL.md §4.8).
    let fence_ref = FenceRef {
        fence: claimed.fence.clone(),
        generation: claimed.generation,
        slot_index: claimed.index,
    };
    ctx.handles.set_fence(handle, fence_ref);
    ctx.handles.publish_status(handle, TransferStatus::Executing);
}
