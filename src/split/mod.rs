// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Multiplicative split engines.
//!
//! A dimension of size n is mapped onto a hardware hierarchy by writing
//! n as an ordered product of per-level tile factors. Two engines
//! enumerate the valid ways to do that:
//!
//! - [`Factors`] enumerates exact splits: every ordered `order`-tuple of
//!   positive integers whose product is n.
//! - [`ResidualFactors`] generalizes to levels bound to fixed-size
//!   spatial arrays that may be only partially utilized, pairing each
//!   cofactor tuple with a residual tuple of actually-utilized counts.
//!
//! Both engines run their entire search during construction and are
//! read-only indexable collections afterwards. Both accept a map of
//! caller-pinned factors ([`given`]) and both can run under an opt-in
//! [`SearchBudget`] that caps how many tuples a query may materialize.
//!
//! # Ordering convention
//!
//! Emitted tuples are in hierarchy order: position 0 is the outermost
//! level. The searches accumulate factors innermost-first internally;
//! each engine reverses its tuples at exactly one finalization boundary,
//! and every caller-facing position (given factors, spatial positions,
//! prune bounds) is interpreted in the emitted frame.

pub mod budget;
pub mod exact;
pub mod given;
pub mod residual;

pub use budget::{BudgetError, SearchBudget};
pub use exact::Factors;
pub use given::DowngradedFactor;
pub use residual::{ResidualFactors, ResidualSplit};
