// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Residual factorization for partially-utilized spatial levels.
//!
//! When a hierarchy level is bound to a fixed-size spatial array, the
//! dimension does not have to divide evenly across it: the array may
//! run partially filled, with a residual count recording how much of it
//! is actually used. [`ResidualFactors`] enumerates the (cofactor,
//! residual) tuple pairs that tile n exactly under that model.
//!
//! # Search structure
//!
//! Construction runs four phases:
//!
//! 1. **Candidate divisors** — the divisors of n, augmented with
//!    divisors of capacity-scaled multiples of n. Partial tiles make
//!    non-divisors of n viable cofactors, so the candidate pool must be
//!    wider than the exact splitter's.
//! 2. **Cofactor candidates** — per-position candidate lists crossed
//!    into tuples. One position per "rotation" acts as the outer free
//!    variable and draws from the large candidates; the rest stay at or
//!    below the balanced-split pivot ≈ √n. A loose (value − 1) product
//!    bound discards tuples that could not possibly reach n.
//! 3. **Residual candidates** — every utilization count in
//!    [1, capacity] per spatial position, crossed into tuples, bounded
//!    by a loose sum check.
//! 4. **Exact verification** — the only sound and complete step. Every
//!    surviving (cofactor, residual) pair is checked against the
//!    positional equation below; nothing from phases 1–3 is trusted.
//!
//! Phases 2 and 3 are deliberately loose, polynomial-size
//! over-approximations. They exist so that phase 4 runs over a pruned
//! candidate set instead of the full combinatorial space; collapsing
//! the search into exact verification alone is prohibitively slow, and
//! skipping the exact check is unsound. Keep both halves.
//!
//! # The positional equation
//!
//! With tuples indexed innermost-first, a pair is accepted iff
//!
//! ```text
//! acc = 0
//! for i from outermost to innermost:
//!     acc = cofactor[i] * acc + (residual'[i] - 1)
//! acc + 1 == n
//! ```
//!
//! where residual' takes the residual candidate at spatial positions
//! and the cofactor value itself elsewhere (non-spatial levels are
//! always fully utilized). Accepted pairs are reversed into hierarchy
//! order at the finalization boundary, so emitted position 0 is the
//! outermost level, matching [`Factors`](crate::split::Factors).

use crate::arith::{divisors, isqrt};
use crate::split::budget::{BudgetError, SearchBudget};
use crate::split::given::{resolve_given, DowngradedFactor};
use itertools::Itertools;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Index;

/// One accepted residual factorization, in hierarchy order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResidualSplit {
    /// Tile counts per level; position 0 is the outermost level.
    pub cofactors: Vec<u64>,
    /// Utilized counts per level; equals the cofactor at non-spatial
    /// positions and never exceeds it anywhere.
    pub residuals: Vec<u64>,
}

/// All residual factorizations of a dimension across `order` levels,
/// some of which are bound to fixed-size spatial arrays.
///
/// The entire search runs during construction; afterwards the instance
/// is an indexable, read-only collection of [`ResidualSplit`] pairs. An
/// empty collection is a normal outcome meaning "no mapping possible".
///
/// # Examples
///
/// ```
/// use tilespace::ResidualFactors;
///
/// // Split 7 across two levels; the outer level is a spatial array of
/// // capacity 4 that may run partially filled.
/// let splits = ResidualFactors::new(7, 2, &[4], &[0]);
/// for split in splits.iter() {
///     assert!(split.residuals[0] <= split.cofactors[0]);
///     assert!(split.cofactors[0] <= 4);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ResidualFactors {
    n: u64,
    order: usize,
    /// Capacity per spatial position, keyed in the internal
    /// innermost-first frame.
    capacities: BTreeMap<usize, u64>,
    splits: Vec<ResidualSplit>,
    downgraded: Vec<DowngradedFactor>,
}

impl ResidualFactors {
    /// Enumerate residual splits of `n` across `order` levels.
    ///
    /// `capacities` and `positions` pair index-wise: `positions[i]` is
    /// a hierarchy position (0 = outermost) bound to a spatial array of
    /// size `capacities[i]`. Positions not listed are free
    /// multiplicative levels.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero, the two slices differ in length, a
    /// position repeats or lies outside [0, order), or a capacity is
    /// zero.
    pub fn new(n: u64, order: usize, capacities: &[u64], positions: &[usize]) -> Self {
        Self::with_given(n, order, capacities, positions, &BTreeMap::new())
    }

    /// Enumerate residual splits with caller-pinned factors.
    ///
    /// Given handling matches the exact splitter: entries fold into a
    /// partial product in ascending position order, non-dividing
    /// entries are demoted to free variables (see
    /// [`downgraded`](ResidualFactors::downgraded)), and accepted
    /// values appear verbatim in both tuples of every returned pair.
    ///
    /// # Panics
    ///
    /// As [`new`](ResidualFactors::new), plus the given-map contracts
    /// of [`Factors::with_given`](crate::split::Factors::with_given).
    pub fn with_given(
        n: u64,
        order: usize,
        capacities: &[u64],
        positions: &[usize],
        given: &BTreeMap<usize, u64>,
    ) -> Self {
        Self::build(n, order, capacities, positions, given, &SearchBudget::unlimited())
            .expect("an unlimited search budget cannot be exhausted")
    }

    /// Like [`with_given`](ResidualFactors::with_given), but abandons
    /// the query with [`BudgetError`] once any phase materializes more
    /// tuples than `budget` allows.
    pub fn bounded(
        n: u64,
        order: usize,
        capacities: &[u64],
        positions: &[usize],
        given: &BTreeMap<usize, u64>,
        budget: &SearchBudget,
    ) -> Result<Self, BudgetError> {
        Self::build(n, order, capacities, positions, given, budget)
    }

    fn build(
        n: u64,
        order: usize,
        capacities: &[u64],
        positions: &[usize],
        given: &BTreeMap<usize, u64>,
        budget: &SearchBudget,
    ) -> Result<Self, BudgetError> {
        assert!(n >= 1, "dimension size must be positive");
        assert_eq!(
            capacities.len(),
            positions.len(),
            "one capacity per spatial position"
        );

        // Convert caller-facing hierarchy positions to the internal
        // innermost-first frame used by the search and the equation.
        let mut internal = BTreeMap::new();
        for (&position, &capacity) in positions.iter().zip(capacities) {
            assert!(
                position < order,
                "spatial position {} is outside order {}",
                position,
                order
            );
            assert!(
                capacity >= 1,
                "spatial capacity at position {} must be positive",
                position
            );
            let previous = internal.insert(order - 1 - position, capacity);
            assert!(previous.is_none(), "duplicate spatial position {}", position);
        }

        let resolution = resolve_given(n, order, given);
        let pinned: BTreeMap<usize, u64> = resolution
            .accepted
            .iter()
            .map(|(&position, &value)| (order - 1 - position, value))
            .collect();

        let reduced_n = n / resolution.partial_product;
        let reduced_order = resolution.remaining_order(order);

        let candidates = candidate_divisors(n, &internal);
        let cofactor_candidates =
            cofactor_candidates(&candidates, n, reduced_n, reduced_order, budget)?;
        let residual_candidates =
            residual_candidates(&internal, reduced_n, reduced_order, n, budget)?;
        debug!(
            "residual split of {}: {} candidate divisors, {} cofactor tuples, {} residual tuples",
            n,
            candidates.len(),
            cofactor_candidates.len(),
            residual_candidates.len()
        );

        let splits = verify(
            n,
            &internal,
            &pinned,
            cofactor_candidates,
            &residual_candidates,
            budget,
        )?;

        Ok(Self {
            n,
            order,
            capacities: internal,
            splits,
            downgraded: resolution.downgraded,
        })
    }

    /// The dimension size this query split.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Requested tuple length / hierarchy depth.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Spatial capacity bound at a hierarchy position, or `None` for a
    /// free multiplicative level.
    ///
    /// # Panics
    ///
    /// Panics if `position` lies outside [0, order).
    pub fn capacity_at(&self, position: usize) -> Option<u64> {
        assert!(
            position < self.order,
            "position {} is outside order {}",
            position,
            self.order
        );
        self.capacities.get(&(self.order - 1 - position)).copied()
    }

    /// Number of accepted (cofactor, residual) pairs.
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    /// Whether the query produced no pairs. An empty collection is a
    /// normal outcome meaning "no mapping possible", not an error.
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Iterate over the accepted pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResidualSplit> + '_ {
        self.splits.iter()
    }

    /// Given entries that were demoted to free variables.
    pub fn downgraded(&self) -> &[DowngradedFactor] {
        &self.downgraded
    }
}

impl Index<usize> for ResidualFactors {
    type Output = ResidualSplit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.splits[index]
    }
}

impl fmt::Display for ResidualFactors {
    /// Diagnostic dump, one pair per line. Not a stable format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} residual splits of {}:", self.splits.len(), self.n)?;
        for split in &self.splits {
            writeln!(
                f,
                "    {} = {} utilizing {}",
                self.n,
                split.cofactors.iter().join(" * "),
                split.residuals.iter().join(", ")
            )?;
        }
        Ok(())
    }
}

/// Phase 1: candidate cofactor values.
///
/// Starts from the divisors of n and augments with divisors of
/// capacity-scaled multiples of n: for every utilization s of every
/// spatial array, values dividing s · n · ceil(n / s) describe tilings
/// in which the array carries s lanes of a partial tile. Only values
/// below n are taken from the augmentation; n itself enters through its
/// own divisor set. The scan runs in 128-bit arithmetic so the scaled
/// products cannot wrap.
fn candidate_divisors(n: u64, capacities: &BTreeMap<usize, u64>) -> BTreeSet<u64> {
    let mut candidates: BTreeSet<u64> = divisors(n).into_iter().collect();

    for &capacity in capacities.values() {
        for utilization in 1..=capacity {
            let lanes = utilization as u128;
            let per_lane = (n as u128 + lanes - 1) / lanes;
            // Saturation keeps the scan defined at the far end of the
            // u64 domain; a clamped scan only widens the candidate
            // pool, and phase 4 rejects anything spurious.
            let scaled = lanes.saturating_mul(n as u128).saturating_mul(per_lane);
            for value in 1..=n {
                if scaled % value as u128 != 0 {
                    continue;
                }
                if value < n {
                    candidates.insert(value);
                }
                let paired = scaled / value as u128;
                if (value as u128) * (value as u128) != scaled && paired < n as u128 {
                    candidates.insert(paired as u64);
                }
            }
        }
    }

    candidates
}

/// Phase 2: candidate cofactor tuples (internal frame, reduced order).
///
/// For each rotation, one position draws from the candidates at or
/// above the balanced-split pivot (rotation 0 keeps the full list —
/// restricting it would lose balanced splits whose members all sit
/// below √n) and every other position draws from the candidates at or
/// below the pivot. Tuples whose (value − 1) product already exceeds
/// the reduced dimension cannot verify and are dropped. Collecting into
/// an ordered set deduplicates tuples reachable through more than one
/// rotation.
fn cofactor_candidates(
    candidates: &BTreeSet<u64>,
    n: u64,
    reduced_n: u64,
    order: usize,
    budget: &SearchBudget,
) -> Result<BTreeSet<Vec<u64>>, BudgetError> {
    let pivot = isqrt(n) + 1;
    let all: Vec<u64> = candidates.iter().copied().collect();
    let small: Vec<u64> = all.iter().copied().filter(|&v| v <= pivot).collect();
    let large: Vec<u64> = all.iter().copied().filter(|&v| v >= pivot).collect();

    let mut kept = BTreeSet::new();
    for rotation in 0..order {
        let mut lists: Vec<&[u64]> = vec![&small; order];
        lists[rotation] = if rotation == 0 { &all } else { &large };

        for tuple in lists
            .iter()
            .map(|list| list.iter().copied())
            .multi_cartesian_product()
        {
            let headroom = tuple
                .iter()
                .filter(|&&value| value != 1)
                .fold(1u128, |product, &value| {
                    product.saturating_mul((value - 1) as u128)
                });
            if headroom <= reduced_n as u128 {
                kept.insert(tuple);
                budget.check(kept.len(), n)?;
            }
        }
    }
    Ok(kept)
}

/// Phase 3: candidate residual tuples, one entry per spatial position
/// in ascending internal order.
///
/// Every utilization in [1, capacity] is a candidate; combinations
/// whose sum already exceeds n + order cannot verify and are dropped.
/// With no spatial positions the sole candidate is the empty tuple
/// (every level fully utilized), which `multi_cartesian_product` does
/// not produce on its own.
fn residual_candidates(
    capacities: &BTreeMap<usize, u64>,
    reduced_n: u64,
    reduced_order: usize,
    n: u64,
    budget: &SearchBudget,
) -> Result<Vec<Vec<u64>>, BudgetError> {
    if capacities.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let ranges: Vec<Vec<u64>> = capacities
        .values()
        .map(|&capacity| (1..=capacity).collect())
        .collect();
    let limit = reduced_n as u128 + reduced_order as u128;

    let mut kept = Vec::new();
    for tuple in ranges
        .iter()
        .map(|range| range.iter().copied())
        .multi_cartesian_product()
    {
        let total: u128 = tuple.iter().map(|&value| value as u128).sum();
        if total <= limit {
            kept.push(tuple);
            budget.check(kept.len(), n)?;
        }
    }
    Ok(kept)
}

/// Phase 4: exact verification of every candidate pair.
///
/// Pinned given values are spliced into each cofactor candidate first,
/// so the equation runs over full-length tuples against the full n.
/// The accumulator is 128-bit; intermediate values are bounded by n²,
/// which a u64 cannot always hold.
fn verify(
    n: u64,
    capacities: &BTreeMap<usize, u64>,
    pinned: &BTreeMap<usize, u64>,
    cofactor_candidates: BTreeSet<Vec<u64>>,
    residual_candidates: &[Vec<u64>],
    budget: &SearchBudget,
) -> Result<Vec<ResidualSplit>, BudgetError> {
    let mut splits = Vec::new();

    for reduced in cofactor_candidates {
        let mut cofactors = reduced;
        for (&position, &value) in pinned {
            cofactors.insert(position, value);
        }

        // A cofactor exceeding its array size can never be mapped,
        // whatever the residual.
        let fits = capacities
            .iter()
            .all(|(&position, &capacity)| cofactors[position] <= capacity);
        if !fits {
            continue;
        }

        for residual in residual_candidates {
            // residual' — the candidate at spatial positions, full
            // utilization everywhere else.
            let mut utilized = Vec::with_capacity(cofactors.len());
            let mut next_spatial = residual.iter();
            for (position, &cofactor) in cofactors.iter().enumerate() {
                if capacities.contains_key(&position) {
                    let entry = next_spatial
                        .next()
                        .expect("one residual entry per spatial position");
                    utilized.push(*entry);
                } else {
                    utilized.push(cofactor);
                }
            }

            // An accumulator that saturates has left the u64 domain
            // and can only fail the equality below, which is what an
            // overflowing pair deserves.
            let mut acc: u128 = 0;
            let mut feasible = true;
            for i in (0..cofactors.len()).rev() {
                if cofactors[i] < utilized[i] {
                    feasible = false;
                    break;
                }
                acc = (cofactors[i] as u128)
                    .saturating_mul(acc)
                    .saturating_add(utilized[i] as u128 - 1);
            }

            if feasible && acc == (n - 1) as u128 {
                splits.push(ResidualSplit {
                    cofactors: cofactors.clone(),
                    residuals: utilized,
                });
                budget.check(splits.len(), n)?;
            }
        }
    }

    // Finalization boundary: the search ran innermost-first; emit in
    // hierarchy order.
    for split in &mut splits {
        split.cofactors.reverse();
        split.residuals.reverse();
    }
    Ok(splits)
}
