// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic containers backing the request queue and the handle pool.
//!
//! The source expresses these as byte-buffers parameterized by an
//! `element_size`; in Rust the idiomatic equivalent is a thin generic
//! wrapper over a standard-library collection that pins the same vocabulary
//! rather than reimplementing allocation: [`BoundedFifo`] over `VecDeque`
//! for the request queue, [`DynamicArray`] over `Vec` for the handle pool's
//! slot table. The command-buffer rotation is fixed-size once created and
//! has no growth to pin a contract around, so it indexes a plain `Vec`
//! directly (see `rotation.rs`).

mod bounded_fifo;
mod dynamic_array;

pub use bounded_fifo::BoundedFifo;
pub use dynamic_array::DynamicArray;
