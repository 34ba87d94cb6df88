// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Combinatorial tile-factorization engines for mapping-space
//! exploration.
//!
//! Mapping a nested-loop computation onto a hierarchical hardware
//! target means splitting each loop dimension into an ordered product
//! of per-level tile factors. This crate enumerates the valid splits
//! and hands out indices over the resulting combinatorial spaces; the
//! surrounding search loop, the workload model, and mapping evaluation
//! all live elsewhere.
//!
//! # Architecture
//!
//! Three layers, leaves first:
//!
//! - [`arith`]: exact integer square root and trial-division divisor
//!   enumeration — the primitives both engines search over.
//! - [`split`]: the two factorization engines. [`Factors`] enumerates
//!   exact multiplicative splits of a dimension; [`ResidualFactors`]
//!   generalizes to levels bound to fixed-size spatial arrays that may
//!   run partially filled, pairing every cofactor tuple with a
//!   residual tuple of actually-utilized counts. Both support
//!   caller-pinned factors and an opt-in search budget.
//! - [`sampling`]: sequential and uniform-random `u128` index
//!   generators, for walking mapping spaces whose cardinality exceeds
//!   64 bits.
//!
//! Engines run their entire search during construction and are
//! immutable, freely shareable collections afterwards. Samplers carry
//! mutable cursor/engine state; give each thread its own.
//!
//! # Example
//!
//! ```
//! use tilespace::{Factors, Sampler, SequentialSampler};
//!
//! // Every ordered two-level split of 12.
//! let factors = Factors::new(12, 2);
//! assert_eq!(factors.len(), 6);
//!
//! // Walk the collection through a sampler, as a search driver would.
//! let mut cursor = SequentialSampler::new(factors.len() as u128, false);
//! for _ in 0..factors.len() {
//!     let tuple = &factors[cursor.next_index() as usize];
//!     assert_eq!(tuple.iter().product::<u64>(), 12);
//! }
//! ```

pub mod arith;
pub mod sampling;
pub mod split;

// Re-export the library surface.
pub use sampling::{RandomSampler, Sampler, SequentialSampler};
pub use split::{
    BudgetError, DowngradedFactor, Factors, ResidualFactors, ResidualSplit, SearchBudget,
};
