// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! # Overview
//!
//! This crate makes the capacity-planning decisions a distributed storage
//! volume provisioner needs before it touches any disk:
//!
//!   - How many brick sets a volume of a given size is carved into.
//!
//!   - How large each brick in those sets must be.
//!
//!   - How many bricks of a set must acknowledge a write before it counts as
//!     durable.
//!
//! All of this is driven by a [Durability] policy. The policy is chosen per
//! volume by the user (replication, plain distribution or erasure-coded
//! dispersal), normalized against a [SizingConfig], stored alongside the
//! volume as a [VolumeDurability], and consulted again whenever the volume
//! is grown or repaired.
//!
//! ## Summary
//!
//!   - A volume of `size` is split into `n` brick sets, each brick being
//!     `size / n` (truncated). The usable capacity is `n * (size / n)`.
//!
//!   - Every brick must fit within `[brick_min_size, brick_max_size]`.
//!
//!   - A [BrickSizeSearch] proposes set counts from six interleaved doubling
//!     chains seeded with `1, 3, 5, 7, 9, 11`, always advancing the chain with
//!     the smallest current value. Fewer sets are preferred; the search only
//!     grows the set count until bricks fit under the maximum, and fails once
//!     they drop below the minimum.
//!
//!   - The search is resumable: if the placement layer cannot satisfy a
//!     layout, asking again yields the next larger set count.
//!
//! The crate does no I/O. Deciding which devices host the bricks, issuing
//! the create command and persisting the volume record all belong to the
//! caller; see [plan_volume] and [BrickPlacer] for the seam.
//!
//! Sizes are unitless `u64`s; the default [SizingConfig] assumes KiB.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Error {
    #[error("Minimum brick size limit reached")]
    MinimumBrickSize,
    #[error("Invalid brick size bounds")]
    InvalidBrickBounds,
    #[error("Default redundancy counts must be nonzero")]
    InvalidDefaults,
}

mod config;
mod durability;
mod execution;
mod plan;
mod quorum;
mod sizing;

pub use config::SizingConfig;
pub use durability::{
    DisperseDurability, DistributeDurability, Durability, ReplicaDurability, VolumeDurability,
};
pub use execution::{DurabilityType, VolumeRequest};
pub use plan::{plan_volume, AnyPlacement, BrickPlacer, VolumePlan};
pub use quorum::{failures_tolerated, majority_quorum, replica_quorum};
pub use sizing::{BrickBounds, BrickLayout, BrickSizeSearch, SEARCH_SEEDS};
