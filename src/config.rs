// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::{BrickBounds, Error};
use serde::{Deserialize, Serialize};

const KIB_PER_GIB: u64 = 1024 * 1024;

/// Provisioner-wide sizing parameters. Owned by the provisioning service and
/// passed in wherever a [crate::Durability] needs bounds or defaults, so
/// different services (and tests) can use different values side by side.
///
/// Sizes are in KiB. Missing fields deserialize to their defaults.
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Smallest brick the provisioner will create.
    pub brick_min_size: u64,
    /// Largest brick the provisioner will create.
    pub brick_max_size: u64,
    /// Replica count used when a volume asks for replication without saying
    /// how much.
    pub default_replica: usize,
    pub default_ec_data: usize,
    pub default_ec_redundancy: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            brick_min_size: KIB_PER_GIB,
            brick_max_size: 4 * 1024 * KIB_PER_GIB,
            default_replica: 2,
            default_ec_data: 4,
            default_ec_redundancy: 2,
        }
    }
}

impl SizingConfig {
    /// A config with the given bounds and default redundancy settings.
    pub fn with_bounds(brick_min_size: u64, brick_max_size: u64) -> Self {
        SizingConfig {
            brick_min_size,
            brick_max_size,
            ..Default::default()
        }
    }

    /// Checks that some brick size can be legal and that normalizing against
    /// these defaults leaves every redundancy count at one or more. A zero
    /// minimum is rejected too: every search must eventually run out of set
    /// counts.
    pub fn validate(&self) -> Result<(), Error> {
        if self.brick_min_size == 0 || self.brick_min_size > self.brick_max_size {
            return Err(Error::InvalidBrickBounds);
        }
        if self.default_replica == 0
            || self.default_ec_data == 0
            || self.default_ec_redundancy == 0
        {
            return Err(Error::InvalidDefaults);
        }
        Ok(())
    }

    pub fn bounds(&self) -> BrickBounds {
        BrickBounds::new(self.brick_min_size, self.brick_max_size)
    }
}

#[test]
fn test_default_config_is_valid() {
    let c = SizingConfig::default();
    assert_eq!(c.validate(), Ok(()));
    assert_eq!(c.bounds(), BrickBounds::new(1 << 20, 1 << 32));
    assert_eq!(c.default_replica, 2);
}

#[test]
fn test_invalid_bounds() {
    assert_eq!(
        SizingConfig::with_bounds(0, 10).validate(),
        Err(Error::InvalidBrickBounds)
    );
    assert_eq!(
        SizingConfig::with_bounds(11, 10).validate(),
        Err(Error::InvalidBrickBounds)
    );
    assert_eq!(SizingConfig::with_bounds(10, 10).validate(), Ok(()));
}

#[test]
fn test_zero_defaults_rejected() {
    let zero_replica = SizingConfig {
        default_replica: 0,
        ..Default::default()
    };
    assert_eq!(zero_replica.validate(), Err(Error::InvalidDefaults));
    let zero_data = SizingConfig {
        default_ec_data: 0,
        ..Default::default()
    };
    assert_eq!(zero_data.validate(), Err(Error::InvalidDefaults));
    let zero_redundancy = SizingConfig {
        default_ec_redundancy: 0,
        ..Default::default()
    };
    assert_eq!(zero_redundancy.validate(), Err(Error::InvalidDefaults));

    let decoded: SizingConfig = serde_json::from_str(r#"{"default_replica": 0}"#).unwrap();
    assert_eq!(decoded.validate(), Err(Error::InvalidDefaults));
}

#[test]
fn test_partial_config_takes_defaults() {
    let c: SizingConfig = serde_json::from_str(r#"{"default_replica": 3}"#).unwrap();
    assert_eq!(c.default_replica, 3);
    assert_eq!(c.brick_min_size, SizingConfig::default().brick_min_size);
    assert_eq!(c.default_ec_data, 4);
}
