// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! This module defines the arithmetic of write quorums within a brick set and
//! tests that it has the expected values. Like any quorum arithmetic it is
//! small and easy to get subtly wrong.

// A brick set holds `n` bricks carrying the same data. A write to the set is
// considered durable once `q` of them acknowledge it.
//
// For sets of three or more we use a strict majority, which is what lets a
// set keep accepting writes with `(n-1)/2` bricks unreachable without two
// disjoint halves ever both believing they hold the latest data.
//
// For sets of one or two bricks a majority would mean "all of them", which
// turns a two-way replica into something less available than a single
// brick. Those sets accept a single acknowledgement instead.
//
//  bricks     | failures    | majority     | replica       |
//  in set     | tolerated   | quorum       | quorum        |
//  `n`        | `(n-1)/2`   | `(n/2) + 1`  |               |
//  -----------|-------------|--------------|---------------|
//   1         |  0          |  1           |  1            |
//   2         |  0          |  2           |  1            |
//   3         |  1          |  2           |  2            |
//   4         |  1          |  3           |  3            |
//   5         |  2          |  3           |  3            |
//   6         |  2          |  4           |  4            |
//   7         |  3          |  4           |  4            |
//

/// Number of unreachable bricks a set of `bricks_in_set` can lose while a
/// majority stays available.
pub fn failures_tolerated(bricks_in_set: usize) -> usize {
    if bricks_in_set == 0 {
        0
    } else {
        (bricks_in_set - 1) / 2
    }
}

/// Smallest strict majority of `bricks_in_set`.
pub fn majority_quorum(bricks_in_set: usize) -> usize {
    (bricks_in_set / 2) + 1
}

/// Write quorum for a replica set: one acknowledgement for sets smaller than
/// three, a strict majority otherwise.
pub fn replica_quorum(bricks_in_set: usize) -> usize {
    if bricks_in_set < 3 {
        1
    } else {
        majority_quorum(bricks_in_set)
    }
}

#[test]
fn test_quorums() {
    assert_eq!(failures_tolerated(0), 0);
    assert_eq!(failures_tolerated(1), 0);
    assert_eq!(failures_tolerated(2), 0);
    assert_eq!(failures_tolerated(3), 1);
    assert_eq!(failures_tolerated(4), 1);
    assert_eq!(failures_tolerated(5), 2);
    assert_eq!(failures_tolerated(6), 2);
    assert_eq!(failures_tolerated(7), 3);

    assert_eq!(majority_quorum(1), 1);
    assert_eq!(majority_quorum(2), 2);
    assert_eq!(majority_quorum(3), 2);
    assert_eq!(majority_quorum(4), 3);
    assert_eq!(majority_quorum(5), 3);
    assert_eq!(majority_quorum(6), 4);

    assert_eq!(replica_quorum(1), 1);
    assert_eq!(replica_quorum(2), 1);
    assert_eq!(replica_quorum(3), 2);
    assert_eq!(replica_quorum(4), 3);
    assert_eq!(replica_quorum(5), 3);
    assert_eq!(replica_quorum(6), 4);
    assert_eq!(replica_quorum(7), 4);
}

#[test]
fn test_replica_quorum_is_majority_from_three() {
    for n in 3..64 {
        assert_eq!(replica_quorum(n), n / 2 + 1);
        assert!(2 * replica_quorum(n) > n);
    }
}
