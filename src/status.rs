// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The handle lifecycle state machine.

use std::sync::atomic::Ordering;

/// Lifecycle state of a submitted transfer.
///
/// Legal transitions: `Ready -> Pending -> Executing -> {Complete, Error}`,
/// with `reset` restoring `Ready` from any state and `Error` reachable from
/// any non-`Ready` state directly (a worker or status-query failure can
/// taint a request at any point after submission).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferStatus {
    /// Slot allocated but no transfer submitted (or reset since the last one).
    Ready = 0,
    /// Submitted; waiting for the worker to claim a command-buffer slot.
    Pending = 1,
    /// Recorded and submitted to the GPU queue; fence not yet observed signaled.
    Executing = 2,
    /// The GPU work has completed.
    Complete = 3,
    /// The transfer failed; see the handle's error record for detail.
    Error = 4,
}

impl TransferStatus {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ready,
            1 => Self::Pending,
            2 => Self::Executing,
            3 => Self::Complete,
            4 => Self::Error,
            other => unreachable!("invalid TransferStatus encoding: {other}"),
        }
    }
}

/// Atomic cell holding a [`TransferStatus`], used for the slot's release/acquire
/// publication protocol.
#[derive(Debug)]
pub(crate) struct AtomicStatus(std::sync::atomic::AtomicU8);

impl AtomicStatus {
    pub(crate) fn new(initial: TransferStatus) -> Self {
        Self(std::sync::atomic::AtomicU8::new(initial as u8))
    }

    pub(crate) fn load(&self, order: Ordering) -> TransferStatus {
        TransferStatus::from_u8(self.0.load(order))
    }

    pub(crate) fn store(&self, status: TransferStatus, order: Ordering) {
        self.0.store(status as u8, order);
    }
}
