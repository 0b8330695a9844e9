// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Asynchronous GPU transfer engine.
//!
//! Application threads hand buffer and image copy requests to a dedicated
//! transfer queue without blocking, and poll for completion through an
//! opaque [`Handle`]. A single worker thread owns the GPU-facing state: a
//! rotating pool of command buffers and fences, and a bounded FIFO feeding
//! it. This crate never names a concrete graphics API — implement
//! [`gpu::GpuBackend`] over whatever one you have wired up.
//!
//! ```ignore
//! use transfer_engine::{BufferToBufferRequest, Engine, EngineConfig};
//!
//! let mut engine = Engine::init(my_backend, EngineConfig::new())?;
//! let handle = engine.allocate_handle().unwrap();
//! engine.submit_buffer_to_buffer(BufferToBufferRequest {
//!     handle,
//!     src,
//!     dst,
//!     dst_access_mask: 0,
//!     dst_stage_mask: 0,
//! });
//!
//! // Elsewhere, on any thread:
//! let _status = engine.status(handle);
//! ```

mod config;
mod containers;
mod engine;
mod error;
pub mod gpu;
mod handle;
mod pool;
mod queue;
mod request;
mod rotation;
mod status;
mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, ErrorKind, ErrorRecord, InternalError};
pub use handle::Handle;
pub use request::{BufferToBufferRequest, BufferToImageRequest, ImageToImageRequest};
pub use status::TransferStatus;
