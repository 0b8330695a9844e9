// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transfer request types: the public submit-time parameters and the
//! internal tagged record the worker dispatches on.

use crate::gpu::{BarrierMasks, GpuBackend};
use crate::handle::Handle;

/// Public request for a whole-buffer-to-whole-buffer copy.
#[derive(Debug, Clone)]
pub struct BufferToBufferRequest<G: GpuBackend> {
    pub handle: Handle,
    pub src: G::Buffer,
    pub dst: G::Buffer,
    /// `0` substitutes the safest permissive access mask.
    pub dst_access_mask: u32,
    /// `0` substitutes the safest permissive stage mask.
    pub dst_stage_mask: u32,
}

/// Public request for a whole-buffer-to-whole-image copy.
///
/// Additive relative to the distilled spec's single `BUFFER_TO_BUFFER`
/// variant: `transfer_type` is an open sum in the source design (SPEC_FULL.md
/// §9), and buffer-to-image is the natural next transfer kind for a GPU
/// upload path.
#[derive(Debug, Clone)]
pub struct BufferToImageRequest<G: GpuBackend> {
    pub handle: Handle,
    pub src: G::Buffer,
    pub dst: G::Image,
    pub dst_access_mask: u32,
    pub dst_stage_mask: u32,
}

/// Public request for a whole-image-to-whole-image copy.
#[derive(Debug, Clone)]
pub struct ImageToImageRequest<G: GpuBackend> {
    pub handle: Handle,
    pub src: G::Image,
    pub dst: G::Image,
    pub dst_access_mask: u32,
    pub dst_stage_mask: u32,
}

/// Internal tagged request the worker dequeues and dispatches on. Carries
/// the handle so the worker can publish status without a further lookup
/// through any shared map.
#[derive(Debug, Clone)]
pub(crate) enum Request<G: GpuBackend> {
    BufferToBuffer {
        handle: Handle,
        src: G::Buffer,
        dst: G::Buffer,
        barrier: BarrierMasks,
    },
    BufferToImage {
        handle: Handle,
        src: G::Buffer,
        dst: G::Image,
        barrier: BarrierMasks,
    },
    ImageToImage {
        handle: Handle,
        src: G::Image,
        dst: G::Image,
        barrier: BarrierMasks,
    },
}

impl<G: GpuBackend> Request<G> {
    pub(crate) fn handle(&self) -> Handle {
        match self {
            Self::BufferToBuffer { handle, .. }
            | Self::BufferToImage { handle, .. }
            | Self::ImageToImage { handle, .. } => *handle,
        }
    }
}

impl<G: GpuBackend> From<BufferToBufferRequest<G>> for Request<G> {
    fn from(request: BufferToBufferRequest<G>) -> Self {
        Self::BufferToBuffer {
            handle: request.handle,
            src: request.src,
            dst: request.dst,
            barrier: BarrierMasks {
                dst_access_mask: request.dst_access_mask,
                dst_stage_mask: request.dst_stage_mask,
            },
        }
    }
}

impl<G: GpuBackend> From<BufferToImageRequest<G>> for Request<G> {
    fn from(request: BufferToImageRequest<G>) -> Self {
        Self::BufferToImage {
            handle: request.handle,
            src: request.src,
            dst: request.dst,
            barrier: BarrierMasks {
                dst_access_mask: request.dst_access_mask,
                dst_stage_mask: request.dst_stage_mask,
            },
        }
    }
}

impl<G: GpuBackend> From<ImageToImageRequest<G>> for Request<G> {
    fn from(request: ImageToImageRequest<G>) -> Self {
        Self::ImageToImage {
            handle: request.handle,
            src: request.src,
            dst: request.dst,
            barrier: BarrierMasks {
                dst_access_mask: request.dst_access_mask,
                dst_stage_mask: request.dst_stage_mask,
            },
        }
    }
}
