// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! The brick size search turns a requested volume size into a sequence of
//! candidate layouts, each a number of brick sets and the size of every brick
//! in them.
//!
//! Fewer, larger bricks are preferred: they fragment the cluster less and
//! cost fewer processes. But a brick may not exceed the configured maximum,
//! so the search keeps raising the set count until the bricks fit, and gives
//! up once they would fall below the configured minimum.
//!
//! Set counts are drawn from six interleaved doubling chains:
//!
//! ```text
//!   1  2  4  8 16 ...
//!   3  6 12 24 48 ...
//!   5 10 20 40 80 ...
//!   7 14 28 56 ...
//!   9 18 36 72 ...
//!  11 22 44 88 ...
//! ```
//!
//! Each step takes the smallest head among the chains and advances that
//! chain. Small set counts are therefore tried densely and large ones
//! sparsely, and the state carries over between calls so that a caller whose
//! placement attempt failed can ask for the next larger layout.

use crate::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Initial heads of the set-count chains. Changing these changes the layout
/// of every volume sized afterwards.
pub const SEARCH_SEEDS: [u64; 6] = [1, 3, 5, 7, 9, 11];

/// Inclusive range a single brick's size must fall in.
#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrickBounds {
    pub min: u64,
    pub max: u64,
}

impl BrickBounds {
    pub fn new(min: u64, max: u64) -> Self {
        BrickBounds { min, max }
    }

    pub fn contains(&self, brick_size: u64) -> bool {
        self.min <= brick_size && brick_size <= self.max
    }
}

/// A candidate layout: `set_count` brick sets, every brick `brick_size` large.
#[derive(Clone, Copy, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrickLayout {
    pub set_count: u64,
    pub brick_size: u64,
}

impl BrickLayout {
    /// Capacity actually provided by this layout when each set stores one
    /// brick's worth of data. Truncation in the brick size means this may be
    /// less than the requested size.
    pub fn usable_size(&self) -> u64 {
        self.set_count * self.brick_size
    }
}

/// Resumable search over brick layouts for one volume size.
///
/// Each call to [BrickSizeSearch::next_layout] advances shared seed state, so
/// a search belongs to a single sizing attempt and is not meant to be shared.
#[derive(Clone, Debug)]
pub struct BrickSizeSearch {
    total_size: u64,
    bounds: BrickBounds,
    /// Number of data bricks each set's share is spread over. 1 for every
    /// policy that stores whole copies.
    stripe: u64,
    seeds: [u64; 6],
}

impl BrickSizeSearch {
    pub fn new(total_size: u64, bounds: BrickBounds) -> Self {
        BrickSizeSearch {
            total_size,
            bounds,
            stripe: 1,
            seeds: SEARCH_SEEDS,
        }
    }

    /// A search whose per-set share is further divided over `stripe` data
    /// bricks, as in erasure-coded sets.
    pub fn striped(total_size: u64, bounds: BrickBounds, stripe: u64) -> Self {
        BrickSizeSearch {
            stripe: stripe.max(1),
            ..Self::new(total_size, bounds)
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn bounds(&self) -> BrickBounds {
        self.bounds
    }

    /// Takes the smallest head among the chains, first one on ties, and
    /// doubles it in place.
    fn advance(&mut self) -> u64 {
        let mut min_idx = 0;
        for (idx, v) in self.seeds.iter().enumerate() {
            if *v < self.seeds[min_idx] {
                min_idx = idx;
            }
        }
        let set_count = self.seeds[min_idx];
        self.seeds[min_idx] = set_count.saturating_mul(2);
        set_count
    }

    /// Returns the next layout whose bricks fit within the bounds, or
    /// [Error::MinimumBrickSize] once bricks have shrunk below the minimum.
    /// Set counts returned by successive calls never decrease.
    pub fn next_layout(&mut self) -> Result<BrickLayout, Error> {
        if self.total_size == 0 {
            warn!("brick size search started for an empty volume");
            return Err(Error::MinimumBrickSize);
        }
        loop {
            let set_count = self.advance();
            let brick_size = self.total_size / set_count / self.stripe;
            if brick_size < self.bounds.min {
                debug!(
                    "{} sets of {} for size {}: below minimum brick size {}",
                    set_count, brick_size, self.total_size, self.bounds.min
                );
                return Err(Error::MinimumBrickSize);
            } else if brick_size <= self.bounds.max {
                debug!(
                    "{} sets of {} for size {}: accepted",
                    set_count, brick_size, self.total_size
                );
                return Ok(BrickLayout {
                    set_count,
                    brick_size,
                });
            }
            debug!(
                "{} sets of {} for size {}: above maximum brick size {}",
                set_count, brick_size, self.total_size, self.bounds.max
            );
        }
    }
}

#[cfg(test)]
fn layouts(search: &mut BrickSizeSearch) -> Vec<BrickLayout> {
    let mut v = Vec::new();
    while let Ok(l) = search.next_layout() {
        v.push(l);
    }
    v
}

#[test]
fn test_seed_selection_order() {
    let mut s = BrickSizeSearch::new(1, BrickBounds::new(0, u64::MAX));
    let order: Vec<u64> = (0..16).map(|_| s.advance()).collect();
    assert_eq!(
        order,
        vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 16, 18, 20]
    );
}

#[test]
fn test_ties_advance_earliest_chain() {
    // Equal heads: the earlier chain moves first.
    let mut s = BrickSizeSearch::new(1, BrickBounds::new(0, u64::MAX));
    while s.seeds != [16, 12, 10, 14, 18, 11] {
        s.advance();
    }
    assert_eq!(s.advance(), 10);
    assert_eq!(s.advance(), 11);
    assert_eq!(s.advance(), 12);
    assert_eq!(s.seeds, [16, 24, 20, 14, 18, 22]);
    assert_eq!(s.advance(), 14);
    assert_eq!(s.advance(), 16);
    s.seeds = [20, 20, 20, 20, 20, 20];
    assert_eq!(s.advance(), 20);
    assert_eq!(s.seeds, [40, 20, 20, 20, 20, 20]);
    assert_eq!(s.advance(), 20);
    assert_eq!(s.seeds, [40, 40, 20, 20, 20, 20]);
}

#[test]
fn test_loops_past_oversized_bricks() {
    let mut s = BrickSizeSearch::new(1000, BrickBounds::new(1, 100));
    assert_eq!(
        s.next_layout(),
        Ok(BrickLayout {
            set_count: 10,
            brick_size: 100
        })
    );
    assert_eq!(
        s.next_layout(),
        Ok(BrickLayout {
            set_count: 11,
            brick_size: 90
        })
    );
    assert_eq!(
        s.next_layout(),
        Ok(BrickLayout {
            set_count: 12,
            brick_size: 83
        })
    );
}

#[test]
fn test_single_set_when_it_fits() {
    let mut s = BrickSizeSearch::new(50, BrickBounds::new(10, 100));
    let l = s.next_layout().unwrap();
    assert_eq!(l.set_count, 1);
    assert_eq!(l.brick_size, 50);
    assert_eq!(l.usable_size(), 50);
}

#[test]
fn test_too_small_fails_immediately() {
    let mut s = BrickSizeSearch::new(5, BrickBounds::new(10, 100));
    assert_eq!(s.next_layout(), Err(Error::MinimumBrickSize));
}

#[test]
fn test_empty_volume_fails() {
    let mut s = BrickSizeSearch::new(0, BrickBounds::new(0, 100));
    assert_eq!(s.next_layout(), Err(Error::MinimumBrickSize));
}

#[test]
fn test_exhaustion_is_reported() {
    let mut s = BrickSizeSearch::new(100, BrickBounds::new(20, 100));
    // 1 -> 100, 2 -> 50, 3 -> 33, 4 -> 25, 5 -> 20, 6 -> 16.
    let sets: Vec<u64> = layouts(&mut s).iter().map(|l| l.set_count).collect();
    assert_eq!(sets, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_layouts_respect_bounds_and_truncation() {
    for total in [1u64, 7, 99, 100, 101, 999, 1000, 4096, 65_537, 1_000_000].iter() {
        for (min, max) in [(1u64, 10u64), (3, 50), (10, 1000), (64, 64)].iter() {
            let mut s = BrickSizeSearch::new(*total, BrickBounds::new(*min, *max));
            let mut prev = 0;
            for l in layouts(&mut s) {
                assert!(s.bounds().contains(l.brick_size));
                assert_eq!(l.brick_size, total / l.set_count);
                assert!(l.usable_size() <= *total);
                assert!(l.set_count >= prev);
                prev = l.set_count;
            }
        }
    }
}

#[test]
fn test_each_chain_strictly_increases() {
    let mut s = BrickSizeSearch::new(1 << 40, BrickBounds::new(1, 1 << 20));
    let mut last = [0u64; 6];
    for l in layouts(&mut s).iter().take(200) {
        // Every set count is an odd seed times a power of two.
        let mut odd = l.set_count;
        while odd % 2 == 0 {
            odd /= 2;
        }
        let chain = SEARCH_SEEDS.iter().position(|s| *s == odd).unwrap();
        assert!(l.set_count > last[chain]);
        last[chain] = l.set_count;
    }
}

#[test]
fn test_striped_divides_over_data_bricks() {
    let mut s = BrickSizeSearch::striped(4000, BrickBounds::new(10, 250), 4);
    // 1 set -> 1000 per brick, 2 -> 500, 3 -> 333, 4 -> 250.
    assert_eq!(
        s.next_layout(),
        Ok(BrickLayout {
            set_count: 4,
            brick_size: 250
        })
    );
}
