// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use brickset::{
    plan_volume, AnyPlacement, BrickLayout, BrickPlacer, Durability, DurabilityType, Error,
    ReplicaDurability, SizingConfig, VolumeDurability,
};

use std::collections::BTreeMap;
use tracing::info;

/// A toy cluster: a handful of nodes, each with a fixed amount of free
/// space. A layout fits if every brick of every set lands on a distinct node
/// within its set and no node runs out of space.
struct TCluster {
    free: BTreeMap<String, u64>,
}

impl TCluster {
    fn new(nodes: &[(&str, u64)]) -> Self {
        TCluster {
            free: nodes.iter().map(|(n, f)| (n.to_string(), *f)).collect(),
        }
    }
}

impl BrickPlacer for TCluster {
    fn try_place(&mut self, layout: &BrickLayout, bricks_per_set: usize) -> bool {
        if bricks_per_set > self.free.len() {
            return false;
        }
        let mut free = self.free.clone();
        for _ in 0..layout.set_count {
            let mut nodes: Vec<(String, u64)> =
                free.iter().map(|(n, f)| (n.clone(), *f)).collect();
            nodes.sort_by(|a, b| b.1.cmp(&a.1));
            for (node, space) in nodes.into_iter().take(bricks_per_set) {
                if space < layout.brick_size {
                    return false;
                }
                free.insert(node, space - layout.brick_size);
            }
        }
        self.free = free;
        true
    }
}

fn setup_tracing_subscriber() {
    tracing_subscriber::fmt::try_init().ok();
}

pub fn provisioning_flow_test() {
    setup_tracing_subscriber();

    let config = SizingConfig::with_bounds(1, 100);

    // A replica volume whose user left the count unset.
    let mut durability = VolumeDurability::Replica(ReplicaDurability::new(0));
    let mut cluster = TCluster::new(&[("n1", 600), ("n2", 600), ("n3", 600), ("n4", 600)]);
    let plan = plan_volume(&mut durability, 1000, &config, &mut cluster).unwrap();
    info!("resolved plan {:?}", plan);

    // 10 sets of 2 x 100 spread over four nodes: 500 used on each.
    assert_eq!(plan.bricks_per_set, 2);
    assert_eq!(plan.quorum, 1);
    assert_eq!(plan.layout.set_count, 10);
    assert_eq!(plan.brick_count(), 20);
    assert_eq!(plan.request.durability, DurabilityType::Replica);

    // The stored record decodes back to the normalized policy.
    let stored = serde_json::to_string(&durability).unwrap();
    let restored: VolumeDurability = serde_json::from_str(&stored).unwrap();
    assert_eq!(restored, durability);
    assert_eq!(restored.bricks_per_set(), 2);
}

pub fn full_cluster_test() {
    setup_tracing_subscriber();

    let config = SizingConfig::with_bounds(1, 100);
    let mut durability = ReplicaDurability::new(3);

    // Exactly enough room: ten bricks of 100 on each node.
    let mut cluster = TCluster::new(&[("n1", 1000), ("n2", 1000), ("n3", 1000)]);
    let plan = plan_volume(&mut durability, 1000, &config, &mut cluster).unwrap();
    info!("resolved plan {:?}", plan);
    assert_eq!(plan.layout.set_count, 10);
    assert_eq!(plan.quorum, 2);
    assert_eq!(plan.usable_size, 1000);

    // Everything is now used; the next volume cannot be placed at any size.
    let mut durability = ReplicaDurability::new(3);
    assert_eq!(
        plan_volume(&mut durability, 500, &config, &mut cluster),
        Err(Error::MinimumBrickSize)
    );
}

pub fn search_reuse_test() {
    setup_tracing_subscriber();

    let config = SizingConfig::with_bounds(1, 100);
    let durability = ReplicaDurability::new(2);
    let mut search = durability.brick_size_search(1000, &config);
    let sets: Vec<u64> = (0..6)
        .map(|_| search.next_layout().unwrap().set_count)
        .collect();
    assert_eq!(sets, vec![10, 11, 12, 14, 16, 18]);

    let mut tiny = durability.brick_size_search(5, &SizingConfig::with_bounds(10, 100));
    assert_eq!(tiny.next_layout(), Err(Error::MinimumBrickSize));

    let plan = plan_volume(
        &mut ReplicaDurability::new(1),
        64,
        &config,
        &mut AnyPlacement,
    )
    .unwrap();
    assert_eq!(plan.layout.set_count, 1);
    assert_eq!(plan.quorum, 1);
}
