use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{CapacityMap, NodeId, UserId};

/// Charging station with per-user-type slot occupancy.
///
/// Invariant: `total_occupied() <= capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    node: NodeId,
    capacity: u32,
    occupied: Vec<u32>,
}

impl Station {
    pub fn new(node: NodeId, capacity: u32, num_users: usize) -> Self {
        Self {
            node,
            capacity,
            occupied: vec![0; num_users],
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn total_occupied(&self) -> u32 {
        self.occupied.iter().sum()
    }

    pub fn occupied_by(&self, user: UserId) -> u32 {
        self.occupied.get(user).copied().unwrap_or(0)
    }

    pub fn free_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.total_occupied())
    }

    pub fn is_full(&self) -> bool {
        self.total_occupied() >= self.capacity
    }

    /// Take one slot for `user`. Returns false (no change) when the station is
    /// full or the user type is unknown.
    pub fn occupy(&mut self, user: UserId) -> bool {
        if self.is_full() {
            return false;
        }
        match self.occupied.get_mut(user) {
            Some(slots) => {
                *slots += 1;
                true
            }
            None => false,
        }
    }

    /// Release up to `count` slots held by `user`, returning how many were freed
    pub fn vacate(&mut self, user: UserId, count: u32) -> u32 {
        match self.occupied.get_mut(user) {
            Some(slots) => {
                let freed = count.min(*slots);
                *slots -= freed;
                freed
            }
            None => 0,
        }
    }
}

/// All stations of a run, ordered by node id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationTable {
    stations: BTreeMap<NodeId, Station>,
}

impl StationTable {
    pub fn from_capacity(capacity: &CapacityMap, num_users: usize) -> Self {
        Self {
            stations: capacity
                .iter()
                .map(|(node, cap)| (*node, Station::new(*node, *cap, num_users)))
                .collect(),
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&Station> {
        self.stations.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Station> {
        self.stations.get_mut(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Station> {
        self.stations.values_mut()
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.stations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn total_occupied(&self) -> u32 {
        self.iter().map(Station::total_occupied).sum()
    }

    pub fn total_capacity(&self) -> u32 {
        self.iter().map(Station::capacity).sum()
    }

    pub fn capacity_map(&self) -> CapacityMap {
        self.iter().map(|s| (s.node(), s.capacity())).collect()
    }
}
