// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.

/// Builder-style configuration for [`Engine::init`](crate::Engine::init).
///
/// Not part of the distilled interface; added so the reference sizes in
/// SPEC_FULL.md (rotation of 5, queue capacity of 100, initial handle
/// capacity of 50) are overridable without recompiling, in the style of
/// this codebase's other `*Config` builders.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub(crate) rotation_size: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) initial_handle_capacity: usize,
}

impl EngineConfig {
    /// Start from the reference defaults (rotation 5, queue capacity 100,
    /// initial handle capacity 50).
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of command-buffer/fence pairs in the rotation. Bounds the
    /// number of in-flight transfers. Reference default: 5.
    pub fn rotation_size(mut self, size: usize) -> Self {
        assert!(size > 0, "rotation_size must be at least 1");
        self.rotation_size = size;
        self
    }

    /// Starting capacity of the request queue (it doubles under pressure
    /// rather than rejecting submissions). Reference default: 100.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "queue_capacity must be at least 1");
        self.queue_capacity = capacity;
        self
    }

    /// Starting number of allocatable handle slots (it doubles on
    /// exhaustion). Reference default: 50.
    pub fn initial_handle_capacity(mut self, capacity: usize) -> Self {
        self.initial_handle_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rotation_size: 5,
            queue_capacity: 100,
            initial_handle_capacity: 50,
        }
    }
}
