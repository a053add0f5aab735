use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::probability::ProbabilityMatrix;
use super::types::NodeId;
use crate::topology::Topology;

/// A demand source (shops, offices, venues) attracting drivers to nearby nodes.
///
/// `probability` is an hourly attraction weight, not a leave probability. Nodes
/// covered by several POIs add their weights up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub tags: Vec<String>,
    pub probability: ProbabilityMatrix,
    pub nodes: BTreeSet<NodeId>,
    /// Longest walk (m) a visitor accepts between the charger and this POI
    pub max_distance: f64,
}

impl PointOfInterest {
    pub fn new(
        name: impl Into<String>,
        probability: ProbabilityMatrix,
        nodes: impl IntoIterator<Item = NodeId>,
        max_distance: f64,
    ) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            probability,
            nodes: nodes.into_iter().collect(),
            max_distance,
        }
    }

    /// POI covering every node within `radius` of any of the `centers`
    pub fn around<T: Topology + ?Sized>(
        topology: &T,
        name: impl Into<String>,
        centers: &[NodeId],
        radius: f64,
        probability: ProbabilityMatrix,
        max_distance: f64,
    ) -> Self {
        let nodes: BTreeSet<NodeId> = centers
            .iter()
            .flat_map(|center| topology.radius(*center, radius))
            .chain(centers.iter().copied())
            .collect();
        Self::new(name, probability, nodes, max_distance)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn covers(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn p_hour(&self, day: usize, hour: usize) -> f64 {
        self.probability.get(day, hour)
    }
}
