// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::{replica_quorum, BrickSizeSearch, DurabilityType, SizingConfig, VolumeRequest};
use serde::{Deserialize, Serialize};

/// A `Durability` is the redundancy scheme of one volume. It decides how
/// many bricks make up a set, how large those bricks may be for a requested
/// volume size, and how many of them must acknowledge a write.
///
/// Policies are built from user-supplied values, [Durability::normalize]d
/// once, and read-only from then on.
pub trait Durability {
    /// Replaces unset (zero) fields with the defaults from `config`. Calling
    /// it again has no further effect.
    fn normalize(&mut self, config: &SizingConfig);

    /// Starts a fresh search over brick layouts for a volume of `total_size`.
    fn brick_size_search(&self, total_size: u64, config: &SizingConfig) -> BrickSizeSearch;

    /// Smallest volume size for which sizing could succeed at all.
    fn min_volume_size(&self, config: &SizingConfig) -> u64;

    fn bricks_per_set(&self) -> usize;

    /// Bricks of a set whose sizes add up to the set's share of the volume.
    /// Every brick holds a whole copy unless the policy stripes.
    fn data_bricks_per_set(&self) -> usize {
        1
    }

    /// Bricks of a set that must acknowledge a write for it to be durable.
    fn quorum_count(&self) -> usize;

    /// Writes this policy's type and redundancy into `request`, leaving every
    /// other field alone.
    fn describe_for_execution(&self, request: &mut VolumeRequest);
}

/// N-way replication: every brick of a set holds a full copy.
#[derive(Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicaDurability {
    pub replica: usize,
}

impl ReplicaDurability {
    pub fn new(replica: usize) -> Self {
        ReplicaDurability { replica }
    }
}

impl Durability for ReplicaDurability {
    fn normalize(&mut self, config: &SizingConfig) {
        if self.replica == 0 {
            self.replica = config.default_replica;
        }
    }

    fn brick_size_search(&self, total_size: u64, config: &SizingConfig) -> BrickSizeSearch {
        BrickSizeSearch::new(total_size, config.bounds())
    }

    fn min_volume_size(&self, config: &SizingConfig) -> u64 {
        config.brick_min_size
    }

    fn bricks_per_set(&self) -> usize {
        self.replica
    }

    fn quorum_count(&self) -> usize {
        replica_quorum(self.bricks_per_set())
    }

    fn describe_for_execution(&self, request: &mut VolumeRequest) {
        request.durability = DurabilityType::Replica;
        request.replica = self.replica;
    }
}

/// Plain distribution: one brick per set, no redundancy.
#[derive(Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributeDurability;

impl Durability for DistributeDurability {
    fn normalize(&mut self, _config: &SizingConfig) {}

    fn brick_size_search(&self, total_size: u64, config: &SizingConfig) -> BrickSizeSearch {
        BrickSizeSearch::new(total_size, config.bounds())
    }

    fn min_volume_size(&self, config: &SizingConfig) -> u64 {
        config.brick_min_size
    }

    fn bricks_per_set(&self) -> usize {
        1
    }

    fn quorum_count(&self) -> usize {
        1
    }

    fn describe_for_execution(&self, request: &mut VolumeRequest) {
        request.durability = DurabilityType::Distribute;
    }
}

/// Erasure-coded dispersal: each set's share is cut into `data` fragments
/// plus `redundancy` parity fragments, one per brick.
#[derive(Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisperseDurability {
    pub data: usize,
    pub redundancy: usize,
}

impl DisperseDurability {
    pub fn new(data: usize, redundancy: usize) -> Self {
        DisperseDurability { data, redundancy }
    }
}

impl Durability for DisperseDurability {
    fn normalize(&mut self, config: &SizingConfig) {
        if self.data == 0 {
            self.data = config.default_ec_data;
        }
        if self.redundancy == 0 {
            self.redundancy = config.default_ec_redundancy;
        }
    }

    fn brick_size_search(&self, total_size: u64, config: &SizingConfig) -> BrickSizeSearch {
        BrickSizeSearch::striped(total_size, config.bounds(), self.data as u64)
    }

    // Saturates so an oversized minimum rejects every request instead of
    // wrapping.
    fn min_volume_size(&self, config: &SizingConfig) -> u64 {
        config.brick_min_size.saturating_mul(self.data as u64)
    }

    fn bricks_per_set(&self) -> usize {
        self.data + self.redundancy
    }

    fn data_bricks_per_set(&self) -> usize {
        self.data
    }

    // Any `data` fragments reconstruct the stripe.
    fn quorum_count(&self) -> usize {
        self.data
    }

    fn describe_for_execution(&self, request: &mut VolumeRequest) {
        request.durability = DurabilityType::Disperse;
        request.data = self.data;
        request.redundancy = self.redundancy;
    }
}

/// The durability stored in a volume record. Each variant is written with an
/// explicit `type` tag so records keep decoding as variants are added.
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VolumeDurability {
    Distribute(DistributeDurability),
    Replica(ReplicaDurability),
    Disperse(DisperseDurability),
}

impl Default for VolumeDurability {
    fn default() -> Self {
        VolumeDurability::Replica(ReplicaDurability::default())
    }
}

impl VolumeDurability {
    pub fn durability_type(&self) -> DurabilityType {
        match self {
            VolumeDurability::Distribute(_) => DurabilityType::Distribute,
            VolumeDurability::Replica(_) => DurabilityType::Replica,
            VolumeDurability::Disperse(_) => DurabilityType::Disperse,
        }
    }

    fn inner(&self) -> &dyn Durability {
        match self {
            VolumeDurability::Distribute(d) => d,
            VolumeDurability::Replica(r) => r,
            VolumeDurability::Disperse(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Durability {
        match self {
            VolumeDurability::Distribute(d) => d,
            VolumeDurability::Replica(r) => r,
            VolumeDurability::Disperse(d) => d,
        }
    }
}

impl From<ReplicaDurability> for VolumeDurability {
    fn from(r: ReplicaDurability) -> Self {
        VolumeDurability::Replica(r)
    }
}

impl From<DistributeDurability> for VolumeDurability {
    fn from(d: DistributeDurability) -> Self {
        VolumeDurability::Distribute(d)
    }
}

impl From<DisperseDurability> for VolumeDurability {
    fn from(d: DisperseDurability) -> Self {
        VolumeDurability::Disperse(d)
    }
}

impl Durability for VolumeDurability {
    fn normalize(&mut self, config: &SizingConfig) {
        self.inner_mut().normalize(config)
    }
    fn brick_size_search(&self, total_size: u64, config: &SizingConfig) -> BrickSizeSearch {
        self.inner().brick_size_search(total_size, config)
    }
    fn min_volume_size(&self, config: &SizingConfig) -> u64 {
        self.inner().min_volume_size(config)
    }
    fn bricks_per_set(&self) -> usize {
        self.inner().bricks_per_set()
    }
    fn data_bricks_per_set(&self) -> usize {
        self.inner().data_bricks_per_set()
    }
    fn quorum_count(&self) -> usize {
        self.inner().quorum_count()
    }
    fn describe_for_execution(&self, request: &mut VolumeRequest) {
        self.inner().describe_for_execution(request)
    }
}

#[test]
fn test_replica_normalize() {
    let config = SizingConfig::default();
    for n in 0..8 {
        let mut r = ReplicaDurability::new(n);
        r.normalize(&config);
        let expected = if n == 0 { config.default_replica } else { n };
        assert_eq!(r.bricks_per_set(), expected);
        r.normalize(&config);
        assert_eq!(r.bricks_per_set(), expected);
    }

    let mut r = ReplicaDurability::default();
    let config = SizingConfig {
        default_replica: 3,
        ..Default::default()
    };
    r.normalize(&config);
    assert_eq!(r.replica, 3);
}

#[test]
fn test_replica_quorum_count() {
    let expected = [(1, 1), (2, 1), (3, 2), (4, 3), (5, 3), (6, 4)];
    for (n, q) in expected.iter() {
        assert_eq!(ReplicaDurability::new(*n).quorum_count(), *q);
    }
}

#[test]
fn test_replica_sizing_queries() {
    let config = SizingConfig::with_bounds(10, 100);
    let r = ReplicaDurability::new(3);
    assert_eq!(r.min_volume_size(&config), 10);
    let mut s = r.brick_size_search(1000, &config);
    let l = s.next_layout().unwrap();
    assert_eq!((l.set_count, l.brick_size), (10, 100));
}

#[test]
fn test_describe_touches_only_durability_fields() {
    let base = VolumeRequest {
        name: "vol_1".to_string(),
        size: 1 << 30,
        bricks: vec!["node1:/bricks/b1".to_string()],
        ..Default::default()
    };

    let mut req = base.clone();
    ReplicaDurability::new(3).describe_for_execution(&mut req);
    assert_eq!(req.durability, DurabilityType::Replica);
    assert_eq!(req.replica, 3);
    assert_eq!(
        VolumeRequest {
            durability: base.durability,
            replica: base.replica,
            ..req.clone()
        },
        base
    );

    let mut req = base.clone();
    DisperseDurability::new(4, 2).describe_for_execution(&mut req);
    assert_eq!(req.durability, DurabilityType::Disperse);
    assert_eq!((req.data, req.redundancy, req.replica), (4, 2, 0));
    assert_eq!(req.name, base.name);

    let mut req = base.clone();
    req.durability = DurabilityType::Replica;
    DistributeDurability.describe_for_execution(&mut req);
    assert_eq!(req.durability, DurabilityType::Distribute);
    assert_eq!(req.bricks, base.bricks);
}

#[test]
fn test_disperse() {
    let config = SizingConfig::with_bounds(10, 250);
    let mut d = DisperseDurability::new(0, 3);
    d.normalize(&config);
    assert_eq!((d.data, d.redundancy), (4, 3));
    assert_eq!(d.bricks_per_set(), 7);
    assert_eq!(d.quorum_count(), 4);
    assert_eq!(d.min_volume_size(&config), 40);
    let l = d.brick_size_search(4000, &config).next_layout().unwrap();
    assert_eq!((l.set_count, l.brick_size), (4, 250));
}

#[test]
fn test_disperse_min_volume_size_saturates() {
    let config = SizingConfig::with_bounds(u64::MAX / 2, u64::MAX / 2);
    assert_eq!(config.validate(), Ok(()));
    let d = DisperseDurability::new(4, 2);
    assert_eq!(d.min_volume_size(&config), u64::MAX);
    assert_eq!(d.data_bricks_per_set(), 4);
    assert_eq!(ReplicaDurability::new(3).data_bricks_per_set(), 1);
    assert_eq!(VolumeDurability::from(d).data_bricks_per_set(), 4);
}

#[test]
fn test_distribute() {
    let config = SizingConfig::default();
    let d = DistributeDurability;
    assert_eq!(d.bricks_per_set(), 1);
    assert_eq!(d.quorum_count(), 1);
    assert_eq!(d.min_volume_size(&config), config.brick_min_size);
}

#[test]
fn test_volume_durability_delegates() {
    let config = SizingConfig::default();
    let mut v = VolumeDurability::default();
    v.normalize(&config);
    assert_eq!(v, VolumeDurability::Replica(ReplicaDurability::new(2)));
    assert_eq!(v.bricks_per_set(), 2);
    assert_eq!(v.quorum_count(), 1);
    assert_eq!(v.durability_type(), DurabilityType::Replica);

    let v: VolumeDurability = ReplicaDurability::new(5).into();
    assert_eq!(v.quorum_count(), 3);
    assert_eq!(v.quorum_count(), crate::majority_quorum(5));
}

#[test]
fn test_stored_encoding() {
    let v: VolumeDurability = ReplicaDurability::new(3).into();
    let json = serde_json::to_string(&v).unwrap();
    assert_eq!(json, r#"{"type":"replica","replica":3}"#);

    let stored = [
        (
            r#"{"type":"replica","replica":2}"#,
            VolumeDurability::Replica(ReplicaDurability::new(2)),
        ),
        (
            r#"{"type":"distribute"}"#,
            VolumeDurability::Distribute(DistributeDurability),
        ),
        (
            r#"{"type":"disperse","data":8,"redundancy":3}"#,
            VolumeDurability::Disperse(DisperseDurability::new(8, 3)),
        ),
    ];
    for (json, expected) in stored.iter() {
        let decoded: VolumeDurability = serde_json::from_str(json).unwrap();
        assert_eq!(&decoded, expected);
    }

    assert!(serde_json::from_str::<VolumeDurability>(r#"{"type":"arbiter"}"#).is_err());
}
