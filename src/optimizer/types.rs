use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{FailureKind, NodeId};

/// Capacity optimization parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Occupancy failure share above which a station gets more charging points
    #[validate(range(min = 0.0, max = 1.0))]
    pub occupancy_threshold: f64,

    /// Distance failure share above which new stations are placed nearby
    #[validate(range(min = 0.0, max = 1.0))]
    pub distance_threshold: f64,

    /// New stations are never placed closer than this (m)
    #[validate(range(min = 0.0))]
    pub min_distance: f64,

    /// Random picks per placement round
    #[validate(range(min = 1))]
    pub trials: u32,

    /// Charging points of a newly placed station
    pub new_station_capacity: u32,

    /// Simulate → optimize rounds run by the binary
    pub iterations: u32,

    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            occupancy_threshold: 0.5,
            distance_threshold: 0.5,
            min_distance: 150.0, // meters
            trials: 1000,
            new_station_capacity: 2,
            iterations: 1,
            random_seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn threshold(&self, kind: FailureKind) -> f64 {
        match kind {
            FailureKind::Occupancy => self.occupancy_threshold,
            FailureKind::Distance => self.distance_threshold,
        }
    }
}

/// One modification of the capacity map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CapacityChange {
    /// More charging points at an existing station
    Expanded {
        station: NodeId,
        from: u32,
        to: u32,
        failure_ratio: f64,
    },
    /// New station near one that turned drivers away for distance
    Placed {
        node: NodeId,
        capacity: u32,
        parent: NodeId,
        mean_distance: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Stations found in both the capacity map and the trajectory
    pub stations_examined: usize,
    pub changes: Vec<CapacityChange>,
}

impl OptimizationReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Charging points added to existing stations
    pub fn added_points(&self) -> u32 {
        self.changes
            .iter()
            .map(|change| match change {
                CapacityChange::Expanded { from, to, .. } => to - from,
                CapacityChange::Placed { .. } => 0,
            })
            .sum()
    }

    pub fn placed(&self) -> Vec<NodeId> {
        self.changes
            .iter()
            .filter_map(|change| match change {
                CapacityChange::Placed { node, .. } => Some(*node),
                CapacityChange::Expanded { .. } => None,
            })
            .collect()
    }
}
