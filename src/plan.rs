// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! Drives a [Durability] through one volume-sizing attempt: normalize, search
//! for a layout the placement layer can satisfy, then derive the quorum and
//! the execution request.

use crate::{BrickLayout, Durability, Error, SizingConfig, VolumeRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// The placement collaborator. Given a layout of `set_count` sets of
/// `bricks_per_set` bricks each `brick_size` large, says whether the cluster
/// can host it. A `false` moves the search on to the next, finer layout.
pub trait BrickPlacer {
    fn try_place(&mut self, layout: &BrickLayout, bricks_per_set: usize) -> bool;
}

/// A [BrickPlacer] that accepts any layout, for sizing without a cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyPlacement;

impl BrickPlacer for AnyPlacement {
    fn try_place(&mut self, _layout: &BrickLayout, _bricks_per_set: usize) -> bool {
        true
    }
}

impl<F> BrickPlacer for F
where
    F: FnMut(&BrickLayout, usize) -> bool,
{
    fn try_place(&mut self, layout: &BrickLayout, bricks_per_set: usize) -> bool {
        self(layout, bricks_per_set)
    }
}

/// Outcome of a successful sizing attempt.
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumePlan {
    pub layout: BrickLayout,
    pub bricks_per_set: usize,
    pub quorum: usize,
    /// Capacity the volume will actually offer, at most the requested size.
    pub usable_size: u64,
    pub request: VolumeRequest,
}

impl VolumePlan {
    pub fn brick_count(&self) -> u64 {
        self.layout.set_count * self.bricks_per_set as u64
    }
}

/// Sizes a volume of `total_size` under `durability`, offering each candidate
/// layout to `placer` until one is accepted.
///
/// Fails with [Error::InvalidBrickBounds] or [Error::InvalidDefaults] on a
/// bad `config`, and with [Error::MinimumBrickSize] if the size is below the
/// policy's minimum or every layout was rejected before bricks got too small.
#[instrument(skip(durability, config, placer))]
pub fn plan_volume<D, P>(
    durability: &mut D,
    total_size: u64,
    config: &SizingConfig,
    placer: &mut P,
) -> Result<VolumePlan, Error>
where
    D: Durability,
    P: BrickPlacer,
{
    config.validate()?;
    durability.normalize(config);

    let min_size = durability.min_volume_size(config);
    if total_size < min_size {
        warn!(
            "requested size {} is below the minimum volume size {}",
            total_size, min_size
        );
        return Err(Error::MinimumBrickSize);
    }

    let bricks_per_set = durability.bricks_per_set();
    let mut search = durability.brick_size_search(total_size, config);
    let layout = loop {
        let layout = search.next_layout().map_err(|e| {
            warn!("no placeable layout for size {}: {}", total_size, e);
            e
        })?;
        if placer.try_place(&layout, bricks_per_set) {
            break layout;
        }
        debug!(
            "placement rejected {} sets of {} bricks sized {}",
            layout.set_count, bricks_per_set, layout.brick_size
        );
    };

    let mut request = VolumeRequest {
        size: total_size,
        ..Default::default()
    };
    durability.describe_for_execution(&mut request);

    let data_bricks = durability.data_bricks_per_set() as u64;
    let plan = VolumePlan {
        layout,
        bricks_per_set,
        quorum: durability.quorum_count(),
        usable_size: layout.usable_size() * data_bricks,
        request,
    };
    info!(
        "planned {} sets x {} bricks of {}, quorum {}",
        layout.set_count, bricks_per_set, layout.brick_size, plan.quorum
    );
    Ok(plan)
}

#[cfg(test)]
use crate::{DisperseDurability, DurabilityType, ReplicaDurability, VolumeDurability};

#[test]
fn test_plan_first_layout() {
    let config = SizingConfig::with_bounds(1, 100);
    let mut r = ReplicaDurability::new(3);
    let plan = plan_volume(&mut r, 1000, &config, &mut AnyPlacement).unwrap();
    assert_eq!(plan.layout.set_count, 10);
    assert_eq!(plan.layout.brick_size, 100);
    assert_eq!(plan.bricks_per_set, 3);
    assert_eq!(plan.brick_count(), 30);
    assert_eq!(plan.quorum, 2);
    assert_eq!(plan.usable_size, 1000);
    assert_eq!(plan.request.durability, DurabilityType::Replica);
    assert_eq!(plan.request.replica, 3);
    assert_eq!(plan.request.size, 1000);
}

#[test]
fn test_plan_normalizes_policy() {
    let config = SizingConfig::with_bounds(1, 100);
    let mut v = VolumeDurability::Replica(ReplicaDurability::new(0));
    let plan = plan_volume(&mut v, 50, &config, &mut AnyPlacement).unwrap();
    assert_eq!(v, VolumeDurability::Replica(ReplicaDurability::new(2)));
    assert_eq!(plan.bricks_per_set, 2);
    assert_eq!(plan.quorum, 1);
}

#[test]
fn test_plan_retries_rejected_layouts() {
    let config = SizingConfig::with_bounds(1, 100);
    let mut r = ReplicaDurability::new(2);
    let mut offered = Vec::new();
    let mut placer = |l: &BrickLayout, n: usize| {
        assert_eq!(n, 2);
        offered.push(l.set_count);
        l.brick_size <= 80
    };
    let plan = plan_volume(&mut r, 1000, &config, &mut placer).unwrap();
    assert_eq!(offered, vec![10, 11, 12, 14]);
    assert_eq!(plan.layout.set_count, 14);
    assert_eq!(plan.layout.brick_size, 71);
    assert_eq!(plan.usable_size, 994);
}

#[test]
fn test_plan_exhausted() {
    let config = SizingConfig::with_bounds(40, 100);
    let mut r = ReplicaDurability::new(2);
    let mut never = |_: &BrickLayout, _: usize| false;
    assert_eq!(
        plan_volume(&mut r, 200, &config, &mut never),
        Err(Error::MinimumBrickSize)
    );
}

#[test]
fn test_plan_rejects_small_and_bad_config() {
    let mut r = ReplicaDurability::new(3);
    assert_eq!(
        plan_volume(&mut r, 9, &SizingConfig::with_bounds(10, 100), &mut AnyPlacement),
        Err(Error::MinimumBrickSize)
    );
    assert_eq!(
        plan_volume(&mut r, 9, &SizingConfig::with_bounds(0, 100), &mut AnyPlacement),
        Err(Error::InvalidBrickBounds)
    );
}

#[test]
fn test_plan_rejects_zero_defaults() {
    let config = SizingConfig {
        default_replica: 0,
        default_ec_data: 0,
        ..SizingConfig::with_bounds(1, 100)
    };
    let mut r = ReplicaDurability::new(0);
    assert_eq!(
        plan_volume(&mut r, 1000, &config, &mut AnyPlacement),
        Err(Error::InvalidDefaults)
    );
    let mut d = DisperseDurability::new(0, 2);
    assert_eq!(
        plan_volume(&mut d, 1000, &config, &mut AnyPlacement),
        Err(Error::InvalidDefaults)
    );
    assert_eq!(r.replica, 0);
}

#[test]
fn test_plan_disperse_oversized_minimum() {
    let config = SizingConfig::with_bounds(u64::MAX / 2, u64::MAX / 2);
    let mut d = DisperseDurability::new(4, 2);
    assert_eq!(
        plan_volume(&mut d, u64::MAX / 2, &config, &mut AnyPlacement),
        Err(Error::MinimumBrickSize)
    );
}

#[test]
fn test_plan_disperse() {
    let config = SizingConfig::with_bounds(10, 250);
    let mut d = DisperseDurability::new(4, 2);
    let plan = plan_volume(&mut d, 4000, &config, &mut AnyPlacement).unwrap();
    assert_eq!(plan.layout.set_count, 4);
    assert_eq!(plan.layout.brick_size, 250);
    assert_eq!(plan.brick_count(), 24);
    assert_eq!(plan.quorum, 4);
    assert_eq!(plan.usable_size, 4000);
    assert_eq!(plan.request.durability, DurabilityType::Disperse);
    assert_eq!(
        plan_volume(&mut d, 39, &config, &mut AnyPlacement),
        Err(Error::MinimumBrickSize)
    );
}
