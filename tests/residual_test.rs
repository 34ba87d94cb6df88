// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Integration tests for the residual factorization solver.

mod common;

use common::{brute_force_splits, sorted_tuples};
use std::collections::BTreeMap;
use tilespace::{Factors, ResidualFactors, ResidualSplit};

/// Every invariant an accepted pair must satisfy, checked in the
/// emitted hierarchy frame (position 0 outermost).
fn assert_sound(factors: &ResidualFactors, n: u64, order: usize, capacities: &BTreeMap<usize, u64>) {
    for split in factors.iter() {
        assert_eq!(split.cofactors.len(), order);
        assert_eq!(split.residuals.len(), order);

        for position in 0..order {
            assert!(
                split.residuals[position] <= split.cofactors[position],
                "residual exceeds cofactor in {:?}",
                split
            );
            match capacities.get(&position) {
                Some(&capacity) => {
                    assert!(
                        split.cofactors[position] <= capacity,
                        "spatial cofactor exceeds capacity in {:?}",
                        split
                    );
                    assert!(split.residuals[position] <= capacity);
                }
                None => assert_eq!(
                    split.residuals[position], split.cofactors[position],
                    "non-spatial level not fully utilized in {:?}",
                    split
                ),
            }
        }

        let mut acc: u128 = 0;
        for position in 0..order {
            acc = split.cofactors[position] as u128 * acc
                + (split.residuals[position] as u128 - 1);
        }
        assert_eq!(acc + 1, n as u128, "positional equation fails for {:?}", split);
    }
}

#[test]
fn test_every_returned_pair_is_sound() {
    for n in 1u64..=10 {
        for order in 1usize..=3 {
            for position in 0..order {
                for capacity in 1u64..=4 {
                    let factors = ResidualFactors::new(n, order, &[capacity], &[position]);
                    let capacities: BTreeMap<usize, u64> =
                        [(position, capacity)].into_iter().collect();
                    assert_sound(&factors, n, order, &capacities);
                }
            }
        }
    }
}

#[test]
fn test_two_spatial_levels_are_sound() {
    for n in [4u64, 6, 8, 12] {
        let factors = ResidualFactors::new(n, 3, &[3, 4], &[0, 2]);
        let capacities: BTreeMap<usize, u64> = [(0, 3), (2, 4)].into_iter().collect();
        assert_sound(&factors, n, 3, &capacities);
    }
}

#[test]
fn test_degenerate_mode_matches_the_exact_splitter() {
    // With no spatial positions the equation collapses to an exact
    // product, so the cofactor sets must agree with Factors and every
    // level must be fully utilized.
    for n in 1u64..=12 {
        for order in 1usize..=3 {
            let residual = ResidualFactors::new(n, order, &[], &[]);
            let exact = Factors::new(n, order);

            let mut cofactor_sets: Vec<Vec<u64>> = residual
                .iter()
                .map(|split| split.cofactors.clone())
                .collect();
            cofactor_sets.sort();
            assert_eq!(
                cofactor_sets,
                sorted_tuples(&exact),
                "degenerate residual split of {} across {} levels diverged",
                n,
                order
            );

            for split in residual.iter() {
                assert_eq!(split.residuals, split.cofactors);
            }
        }
    }
}

#[test]
fn test_degenerate_mode_matches_the_oracle() {
    for n in 1u64..=12 {
        let residual = ResidualFactors::new(n, 2, &[], &[]);
        let mut cofactor_sets: Vec<Vec<u64>> = residual
            .iter()
            .map(|split| split.cofactors.clone())
            .collect();
        cofactor_sets.sort();
        assert_eq!(cofactor_sets, brute_force_splits(n, 2));
    }
}

#[test]
fn test_oversized_spatial_array_runs_partially_filled() {
    // A 5-wide array tiling 12 cannot divide evenly; the solver must
    // still find the partially-filled mapping.
    let factors = ResidualFactors::new(12, 2, &[5], &[1]);
    let expected = ResidualSplit {
        cofactors: vec![3, 5],
        residuals: vec![3, 2],
    };
    assert!(factors.iter().any(|split| *split == expected));
}

#[test]
fn test_undersized_spatial_array_forces_more_outer_tiles() {
    // Capacity 2 cannot carry 7 in one pass; the outer level must pick
    // up the slack entirely, since 7 is prime.
    let factors = ResidualFactors::new(7, 2, &[2], &[1]);
    let capacities: BTreeMap<usize, u64> = [(1, 2)].into_iter().collect();
    assert_sound(&factors, 7, 2, &capacities);
    for split in factors.iter() {
        assert!(split.cofactors[1] <= 2);
    }
}

#[test]
fn test_given_factor_round_trips_through_both_tuples() {
    let given: BTreeMap<usize, u64> = [(0, 3)].into_iter().collect();
    let factors = ResidualFactors::with_given(12, 2, &[5], &[1], &given);
    assert!(!factors.is_empty());
    for split in factors.iter() {
        assert_eq!(split.cofactors[0], 3);
        assert_eq!(split.residuals[0], 3);
    }
    let capacities: BTreeMap<usize, u64> = [(1, 5)].into_iter().collect();
    assert_sound(&factors, 12, 2, &capacities);
}

#[test]
fn test_indexing_yields_the_enumerated_pair() {
    let factors = ResidualFactors::new(7, 2, &[4], &[0]);
    assert!(factors.len() >= 1);
    let first = &factors[0];
    assert_eq!(first.cofactors.len(), 2);
}
