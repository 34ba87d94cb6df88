// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Resolution of caller-pinned tile factors.
//!
//! Both split engines accept a partial map of hierarchy position →
//! fixed factor value. Entries are folded into a running partial
//! product in ascending position order; an entry whose inclusion would
//! leave the partial product unable to divide n is demoted to a free
//! variable rather than failing the whole query. Demotions are recorded
//! as inspectable [`DowngradedFactor`] annotations in addition to the
//! logged diagnostic, so drivers and tests can assert on them.

use log::warn;
use std::collections::BTreeMap;

/// Record of a given factor that was demoted to a free variable.
///
/// Produced when a caller-pinned value cannot divide n under the
/// running partial product. The position searches freely instead; the
/// query itself still succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DowngradedFactor {
    /// Hierarchy position the caller tried to pin.
    pub position: usize,
    /// The rejected value.
    pub value: u64,
}

/// Outcome of folding a given-factor map against a dimension size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GivenResolution {
    /// Entries accepted verbatim, keyed by hierarchy position.
    pub accepted: BTreeMap<usize, u64>,
    /// Entries demoted to free variables, in position order.
    pub downgraded: Vec<DowngradedFactor>,
    /// Product of all accepted values. Always divides n.
    pub partial_product: u64,
}

impl GivenResolution {
    /// Order left for the free search once accepted entries are pinned.
    pub fn remaining_order(&self, order: usize) -> usize {
        order - self.accepted.len()
    }
}

/// Fold `given` into a partial product, demoting entries that cannot
/// divide `n` under accumulation.
///
/// Entries are consumed in ascending position order. An entry is
/// accepted iff partial_product × value still divides n (overflow of
/// the product counts as "cannot divide"). Rejected entries are dropped
/// from the search, annotated, and logged; they never fail the query.
///
/// # Panics
///
/// Panics if more entries are given than `order` allows, if a position
/// lies outside [0, order), or if a value is zero.
pub(crate) fn resolve_given(
    n: u64,
    order: usize,
    given: &BTreeMap<usize, u64>,
) -> GivenResolution {
    assert!(
        given.len() <= order,
        "{} given factors exceed order {}",
        given.len(),
        order
    );

    let mut accepted = BTreeMap::new();
    let mut downgraded = Vec::new();
    let mut partial_product: u64 = 1;

    for (&position, &value) in given {
        assert!(
            position < order,
            "given position {} is outside order {}",
            position,
            order
        );
        assert!(
            value >= 1,
            "given factor at position {} must be positive",
            position
        );

        match partial_product.checked_mul(value) {
            Some(product) if n % product == 0 => {
                partial_product = product;
                accepted.insert(position, value);
            }
            _ => {
                warn!(
                    "cannot accept {} as a factor of {} under partial product {}; \
                     position {} becomes a free variable",
                    value, n, partial_product, position
                );
                downgraded.push(DowngradedFactor { position, value });
            }
        }
    }

    GivenResolution {
        accepted,
        downgraded,
        partial_product,
    }
}

/// Splice accepted values into a search result at their original
/// positions, shifting later positions right.
///
/// Ascending insertion lands every value at its final hierarchy
/// position even though the tuple grows as it goes.
pub(crate) fn splice(tuple: &mut Vec<u64>, accepted: &BTreeMap<usize, u64>) {
    for (&position, &value) in accepted {
        debug_assert!(
            position <= tuple.len(),
            "splice position {} is beyond tuple length {}",
            position,
            tuple.len()
        );
        tuple.insert(position, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(usize, u64)]) -> BTreeMap<usize, u64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_empty_map_resolves_trivially() {
        let resolution = resolve_given(12, 3, &BTreeMap::new());
        assert!(resolution.accepted.is_empty());
        assert!(resolution.downgraded.is_empty());
        assert_eq!(resolution.partial_product, 1);
        assert_eq!(resolution.remaining_order(3), 3);
    }

    #[test]
    fn test_dividing_entries_accumulate() {
        let resolution = resolve_given(12, 3, &map(&[(0, 2), (1, 2)]));
        assert_eq!(resolution.accepted, map(&[(0, 2), (1, 2)]));
        assert_eq!(resolution.partial_product, 4);
        assert_eq!(resolution.remaining_order(3), 1);
        assert!(resolution.downgraded.is_empty());
    }

    #[test]
    fn test_non_dividing_entry_is_downgraded() {
        let resolution = resolve_given(12, 2, &map(&[(0, 5)]));
        assert!(resolution.accepted.is_empty());
        assert_eq!(
            resolution.downgraded,
            vec![DowngradedFactor {
                position: 0,
                value: 5
            }]
        );
        assert_eq!(resolution.partial_product, 1);
        assert_eq!(resolution.remaining_order(2), 2);
    }

    #[test]
    fn test_entry_dividing_n_but_not_the_accumulation_is_downgraded() {
        // 4 and 6 each divide 12, but 4 * 6 = 24 does not.
        let resolution = resolve_given(12, 2, &map(&[(0, 4), (1, 6)]));
        assert_eq!(resolution.accepted, map(&[(0, 4)]));
        assert_eq!(
            resolution.downgraded,
            vec![DowngradedFactor {
                position: 1,
                value: 6
            }]
        );
        assert_eq!(resolution.partial_product, 4);
    }

    #[test]
    fn test_overflowing_accumulation_is_downgraded() {
        let resolution = resolve_given(u64::MAX, 2, &map(&[(0, u64::MAX), (1, u64::MAX)]));
        assert_eq!(resolution.accepted, map(&[(0, u64::MAX)]));
        assert_eq!(resolution.downgraded.len(), 1);
    }

    #[test]
    fn test_splice_ascending_lands_final_positions() {
        let accepted = map(&[(1, 7), (3, 9)]);
        let mut tuple = vec![2, 4];
        splice(&mut tuple, &accepted);
        assert_eq!(tuple, vec![2, 7, 4, 9]);
    }

    #[test]
    #[should_panic(expected = "exceed order")]
    fn test_too_many_entries_is_a_contract_violation() {
        resolve_given(12, 1, &map(&[(0, 2), (1, 3)]));
    }

    #[test]
    #[should_panic(expected = "outside order")]
    fn test_out_of_range_position_is_a_contract_violation() {
        resolve_given(12, 2, &map(&[(2, 2)]));
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_zero_value_is_a_contract_violation() {
        resolve_given(12, 2, &map(&[(0, 0)]));
    }
}
