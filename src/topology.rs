//! # Topology Provider
//!
//! The simulation only needs four questions answered about the street network:
//! which nodes exist, which station is nearest to a node (and how far the walk
//! is), which nodes lie within a radius, and what charging capacity is installed.
//!
//! [`PlanarTopology`] answers them for nodes placed on a plane with walking
//! distances measured along axis-aligned streets (Manhattan metric).

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{CapacityMap, NodeId};

/// Street network seen by the simulation
#[cfg_attr(test, mockall::automock)]
pub trait Topology {
    /// Every node that can be a trip destination
    fn nodes(&self) -> Vec<NodeId>;

    /// Nearest of `stations` to `node` and the walking distance to it (m)
    fn nearest_station(&self, node: NodeId, stations: &[NodeId]) -> Option<(NodeId, f64)>;

    /// Nodes within `distance` (m) of `node`, the node itself included
    fn radius(&self, node: NodeId, distance: f64) -> Vec<NodeId>;

    /// Installed charging points per station node
    fn charging_stations(&self) -> CapacityMap;
}

impl<T: Topology + ?Sized> Topology for &T {
    fn nodes(&self) -> Vec<NodeId> {
        (**self).nodes()
    }

    fn nearest_station(&self, node: NodeId, stations: &[NodeId]) -> Option<(NodeId, f64)> {
        (**self).nearest_station(node, stations)
    }

    fn radius(&self, node: NodeId, distance: f64) -> Vec<NodeId> {
        (**self).radius(node, distance)
    }

    fn charging_stations(&self) -> CapacityMap {
        (**self).charging_stations()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Walking distance along a rectangular street grid
    pub fn manhattan(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Nodes with planar coordinates plus the installed stations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanarTopology {
    positions: BTreeMap<NodeId, Point>,
    stations: CapacityMap,
}

impl PlanarTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// `columns` × `rows` street grid with `spacing` meters between crossings.
    /// Node ids run row by row: `row * columns + column`.
    pub fn grid(columns: usize, rows: usize, spacing: f64) -> Self {
        let positions = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (row, column)))
            .map(|(row, column)| {
                (
                    (row * columns + column) as NodeId,
                    Point::new(column as f64 * spacing, row as f64 * spacing),
                )
            })
            .collect();
        Self {
            positions,
            stations: CapacityMap::new(),
        }
    }

    pub fn with_node(mut self, node: NodeId, x: f64, y: f64) -> Self {
        self.insert_node(node, Point::new(x, y));
        self
    }

    pub fn with_station(mut self, node: NodeId, capacity: u32) -> Self {
        self.insert_station(node, capacity);
        self
    }

    pub fn insert_node(&mut self, node: NodeId, position: Point) -> Option<Point> {
        self.positions.insert(node, position)
    }

    pub fn insert_station(&mut self, node: NodeId, capacity: u32) -> Option<u32> {
        self.stations.insert(node, capacity)
    }

    pub fn set_stations(&mut self, stations: CapacityMap) {
        self.stations = stations;
    }

    pub fn position(&self, node: NodeId) -> Option<Point> {
        self.positions.get(&node).copied()
    }

    pub fn distance(&self, from: NodeId, to: NodeId) -> Option<f64> {
        Some(self.position(from)?.manhattan(&self.position(to)?))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Topology for PlanarTopology {
    fn nodes(&self) -> Vec<NodeId> {
        self.positions.keys().copied().collect()
    }

    fn nearest_station(&self, node: NodeId, stations: &[NodeId]) -> Option<(NodeId, f64)> {
        stations
            .iter()
            .filter_map(|station| Some((*station, self.distance(node, *station)?)))
            .min_by_key(|(station, distance)| (OrderedFloat(*distance), *station))
    }

    fn radius(&self, node: NodeId, distance: f64) -> Vec<NodeId> {
        let Some(origin) = self.position(node) else {
            return Vec::new();
        };
        self.positions
            .iter()
            .filter(|(_, position)| origin.manhattan(position) <= distance)
            .map(|(id, _)| *id)
            .collect()
    }

    fn charging_stations(&self) -> CapacityMap {
        self.stations.clone()
    }
}
