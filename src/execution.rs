// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! The request record handed to the execution layer when it creates a
//! volume on the storage daemons. Durability policies fill in only the
//! durability fields; naming, sizing and brick lists belong to the caller.

use serde::{Deserialize, Serialize};

/// Discriminator telling the storage daemons how bricks within a set relate.
#[derive(Clone, Copy, Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityType {
    Distribute,
    Replica,
    Disperse,
}

impl Default for DurabilityType {
    fn default() -> Self {
        DurabilityType::Distribute
    }
}

#[derive(Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub name: String,
    pub size: u64,
    pub bricks: Vec<String>,
    pub durability: DurabilityType,
    pub replica: usize,
    pub data: usize,
    pub redundancy: usize,
}
