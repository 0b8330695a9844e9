// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the transfer engine.
//!
//! Two error kinds exist: [`InternalError`] for thread/queue primitives and
//! a GPU error code (opaque to this crate, supplied by the [`gpu`](crate::gpu)
//! backend) for any graphics-API call failing. Errors are either returned
//! synchronously from [`Engine::init`](crate::Engine::init) or attached to a
//! handle and surfaced by [`Engine::status`](crate::Engine::status) returning
//! [`TransferStatus::Error`](crate::TransferStatus::Error).

use std::fmt;

/// Internal (non-GPU) failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalError {
    /// The worker thread could not be spawned.
    ThreadCreateFailed,
    /// The request queue's dequeue operation failed unexpectedly.
    DequeueFailed,
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadCreateFailed => write!(f, "failed to create worker thread"),
            Self::DequeueFailed => write!(f, "request queue dequeue failed"),
        }
    }
}

/// Top-level error type returned synchronously from `Engine::init` and
/// stored (as [`ErrorRecord`]) on a handle in the `Error` state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A graphics-API call failed. `code` is backend-defined and opaque.
    #[error("gpu error: {0}")]
    Gpu(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A thread/queue primitive failed.
    #[error("internal error: {0}")]
    Internal(InternalError),
}

/// Tag identifying which kind of error a handle carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No error recorded (handle not in the `Error` state).
    None,
    /// Internal (thread/queue) failure.
    Internal,
    /// GPU (graphics-API) failure.
    Gpu,
}

/// Error payload attached to a handle slot. Meaningful only when the
/// handle's status is [`TransferStatus::Error`](crate::TransferStatus::Error).
///
/// Mirrors the source's tagged `{kind, internal_code, gpu_code}` record:
/// only one of `internal_code` / `gpu_code` is populated at a time, selected
/// by `kind`.
#[derive(Debug, Clone, Default)]
pub struct ErrorRecord {
    kind: ErrorKindState,
}

#[derive(Debug, Clone)]
enum ErrorKindState {
    None,
    Internal(InternalError),
    Gpu(String),
}

impl Default for ErrorKindState {
    fn default() -> Self {
        Self::None
    }
}

impl ErrorRecord {
    /// The empty error record (`kind = None`), used to reset a slot.
    pub const fn none() -> Self {
        Self {
            kind: ErrorKindState::None,
        }
    }

    pub(crate) fn internal(code: InternalError) -> Self {
        Self {
            kind: ErrorKindState::Internal(code),
        }
    }

    pub(crate) fn gpu(description: impl Into<String>) -> Self {
        Self {
            kind: ErrorKindState::Gpu(description.into()),
        }
    }

    /// Which kind of error, if any, this record carries.
    pub fn kind(&self) -> ErrorKind {
        match self.kind {
            ErrorKindState::None => ErrorKind::None,
            ErrorKindState::Internal(_) => ErrorKind::Internal,
            ErrorKindState::Gpu(_) => ErrorKind::Gpu,
        }
    }

    /// The internal error code, if `kind() == ErrorKind::Internal`.
    pub fn internal_code(&self) -> Option<InternalError> {
        match self.kind {
            ErrorKindState::Internal(code) => Some(code),
            _ => None,
        }
    }

    /// The GPU error description, if `kind() == ErrorKind::Gpu`.
    pub fn gpu_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKindState::Gpu(desc) => Some(desc.as_str()),
            _ => None,
        }
    }
}
