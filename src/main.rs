// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

pub use brickset::*;

use clap::Parser;

#[cfg(test)]
mod test;

// These tests live outside the library so they can only reach the public
// API, the way a provisioning service would.

#[test]
fn provisioning_flow_test() {
    test::provisioning_flow_test();
}

#[test]
fn full_cluster_test() {
    test::full_cluster_test();
}

#[test]
fn search_reuse_test() {
    test::search_reuse_test();
}

#[derive(Debug, Parser)]
#[command(name = "brickset", about = "Size a replicated volume into brick sets")]
struct Args {
    /// Requested volume size, in KiB
    size: u64,
    /// Replica count; 0 takes the configured default
    #[arg(default_value_t = 0)]
    replica: usize,
}

pub fn main() {
    let args = Args::parse();
    let config = SizingConfig::default();
    let mut durability = VolumeDurability::Replica(ReplicaDurability::new(args.replica));
    match plan_volume(&mut durability, args.size, &config, &mut AnyPlacement) {
        Ok(plan) => println!(
            "{} sets x {} bricks of {} KiB, quorum {}, usable {} KiB",
            plan.layout.set_count,
            plan.bricks_per_set,
            plan.layout.brick_size,
            plan.quorum,
            plan.usable_size
        ),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

#[test]
fn test_args() {
    let args = Args::try_parse_from(["brickset", "1048576", "3"]).unwrap();
    assert_eq!((args.size, args.replica), (1048576, 3));

    let args = Args::try_parse_from(["brickset", "1048576"]).unwrap();
    assert_eq!(args.replica, 0);

    assert!(Args::try_parse_from(["brickset", "1048576", "abc"]).is_err());
    assert!(Args::try_parse_from(["brickset", "10x"]).is_err());
    assert!(Args::try_parse_from(["brickset"]).is_err());
}
