// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Exact multiplicative splitting of a dimension size.
//!
//! [`Factors`] answers one query: in how many ordered ways can n be
//! written as a product of `order` positive tile factors, and what are
//! they? The search is a recursive descent over the divisors of n —
//! choose a divisor for the innermost level, split the quotient across
//! the remaining levels, union over all admissible choices. Optional
//! caller-pinned factors shrink the search to the free positions, and
//! [`Factors::prune_max`] discards finished tuples that exceed
//! per-position bounds.

use crate::arith;
use crate::split::budget::{BudgetError, SearchBudget};
use crate::split::given::{resolve_given, splice, DowngradedFactor};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

/// All ordered `order`-way multiplicative splits of a dimension size.
///
/// The entire search runs during construction; afterwards the instance
/// is an indexable, read-only collection of cofactor tuples (plus the
/// explicit [`prune_max`](Factors::prune_max) step). Position 0 of
/// every tuple is the outermost hierarchy level.
///
/// # Examples
///
/// ```
/// use tilespace::Factors;
///
/// let factors = Factors::new(12, 2);
/// assert_eq!(factors.len(), 6);
/// for tuple in factors.iter() {
///     assert_eq!(tuple.iter().product::<u64>(), 12);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Factors {
    n: u64,
    divisors: Vec<u64>,
    cofactors: Vec<Vec<u64>>,
    downgraded: Vec<DowngradedFactor>,
}

impl Factors {
    /// Enumerate every ordered `order`-way split of `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn new(n: u64, order: usize) -> Self {
        Self::with_given(n, order, &BTreeMap::new())
    }

    /// Enumerate splits with caller-pinned factors at fixed positions.
    ///
    /// Given entries are folded into a partial product in ascending
    /// position order; an entry that cannot divide `n` under
    /// accumulation is demoted to a free variable (see
    /// [`downgraded`](Factors::downgraded)) instead of failing the
    /// query. Accepted values appear verbatim at their positions in
    /// every returned tuple.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero, if `given` holds more entries than
    /// `order`, if a position lies outside [0, order), or if a pinned
    /// value is zero.
    pub fn with_given(n: u64, order: usize, given: &BTreeMap<usize, u64>) -> Self {
        Self::build(n, order, given, &SearchBudget::unlimited())
            .expect("an unlimited search budget cannot be exhausted")
    }

    /// Like [`with_given`](Factors::with_given), but abandons the query
    /// with [`BudgetError`] once the search materializes more tuples
    /// than `budget` allows.
    pub fn bounded(
        n: u64,
        order: usize,
        given: &BTreeMap<usize, u64>,
        budget: &SearchBudget,
    ) -> Result<Self, BudgetError> {
        Self::build(n, order, given, budget)
    }

    fn build(
        n: u64,
        order: usize,
        given: &BTreeMap<usize, u64>,
        budget: &SearchBudget,
    ) -> Result<Self, BudgetError> {
        assert!(n >= 1, "dimension size must be positive");

        let resolution = resolve_given(n, order, given);
        let divisors = arith::divisors(n);

        let mut cofactors = split_recursive(
            &divisors,
            n / resolution.partial_product,
            resolution.remaining_order(order),
            n,
            budget,
        )?;

        // Single finalization boundary: the recursion accumulates
        // innermost-first, so one reversal restores hierarchy order.
        // Accepted givens are pinned afterwards, in the emitted frame.
        for tuple in &mut cofactors {
            tuple.reverse();
            splice(tuple, &resolution.accepted);
        }

        Ok(Self {
            n,
            divisors,
            cofactors,
            downgraded: resolution.downgraded,
        })
    }

    /// The dimension size this query split.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Number of cofactor tuples found.
    pub fn len(&self) -> usize {
        self.cofactors.len()
    }

    /// Whether the query produced no tuples. An empty collection is a
    /// normal outcome meaning "no mapping possible", not an error.
    pub fn is_empty(&self) -> bool {
        self.cofactors.is_empty()
    }

    /// Iterate over the cofactor tuples in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &[u64]> + '_ {
        self.cofactors.iter().map(|tuple| tuple.as_slice())
    }

    /// All divisors of n, ascending.
    pub fn divisors(&self) -> &[u64] {
        &self.divisors
    }

    /// Given entries that were demoted to free variables.
    pub fn downgraded(&self) -> &[DowngradedFactor] {
        &self.downgraded
    }

    /// Discard every tuple whose value at a bounded position exceeds
    /// the bound (inclusive upper bounds, keyed by hierarchy position).
    ///
    /// This is a post-filter rather than part of the recursive search:
    /// bounds may reference positions that only exist once given
    /// factors have been spliced back in, so filtering mid-recursion
    /// would need a shifted-position translation table. Pruning is
    /// idempotent and only ever shrinks the collection.
    ///
    /// # Panics
    ///
    /// Panics if a bound position lies outside [0, order).
    pub fn prune_max(&mut self, bounds: &BTreeMap<usize, u64>) {
        self.cofactors.retain(|tuple| {
            bounds.iter().all(|(&position, &bound)| {
                assert!(
                    position < tuple.len(),
                    "prune bound position {} is outside order {}",
                    position,
                    tuple.len()
                );
                tuple[position] <= bound
            })
        });
    }
}

impl Index<usize> for Factors {
    type Output = [u64];

    fn index(&self, index: usize) -> &Self::Output {
        &self.cofactors[index]
    }
}

impl fmt::Display for Factors {
    /// Diagnostic dump, one factorization per line. Not a stable
    /// format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} cofactor tuples of {}:", self.cofactors.len(), self.n)?;
        for tuple in &self.cofactors {
            writeln!(f, "    {} = {}", self.n, tuple.iter().join(" * "))?;
        }
        Ok(())
    }
}

/// Recursive descent over the remaining order.
///
/// Returns tuples innermost-first: the factor chosen at the current
/// level is appended after the recursion returns, so the outermost
/// choice ends up last. Callers reverse at the finalization boundary.
fn split_recursive(
    divisors: &[u64],
    residual: u64,
    order: usize,
    n: u64,
    budget: &SearchBudget,
) -> Result<Vec<Vec<u64>>, BudgetError> {
    if order == 0 {
        return Ok(vec![Vec::new()]);
    }
    if order == 1 {
        return Ok(vec![vec![residual]]);
    }

    let mut tuples = Vec::new();
    for &divisor in divisors {
        // Divisors of n that do not divide the current residual are
        // inadmissible at this level.
        if residual % divisor != 0 {
            continue;
        }
        let mut subproblem = split_recursive(divisors, residual / divisor, order - 1, n, budget)?;
        for tuple in &mut subproblem {
            tuple.push(divisor);
        }
        tuples.append(&mut subproblem);
        budget.check(tuples.len(), n)?;
    }
    Ok(tuples)
}
