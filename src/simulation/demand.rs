//! # Destination Demand
//!
//! Merges the points of interest into one attraction table per topology node.
//! Nodes covered by several POIs get the cell-wise sum of their tables and the
//! mean of their walking limits; uncovered nodes fall back to the defaults.
//! An optional normalization rescales every table by the peak observed in a
//! week, a day or a single hour.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::domain::{NodeId, PointOfInterest, ProbabilityMatrix, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::error::ConfigError;

/// Scope of the peak that node tables are divided by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    #[default]
    #[serde(alias = "")]
    None,
    /// Peak of the whole week
    Week,
    /// Peak of the same day
    Day,
    /// Peak of the same (day, hour) cell
    Hour,
}

impl FromStr for NormalizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(NormalizationMode::None),
            "week" => Ok(NormalizationMode::Week),
            "day" => Ok(NormalizationMode::Day),
            "hour" => Ok(NormalizationMode::Hour),
            other => Err(ConfigError::UnknownNormalization(other.to_string())),
        }
    }
}

/// Merged demand of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDemand {
    pub probability: ProbabilityMatrix,
    /// Mean walking limit of the covering POIs (m)
    pub max_distance: f64,
    /// Number of covering POIs; 0 for default-filled nodes
    pub coverage: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DemandModel {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, NodeDemand>,
}

impl DemandModel {
    pub fn build<'a, I>(
        pois: I,
        topology_nodes: &[NodeId],
        default_probability: &ProbabilityMatrix,
        default_max_distance: f64,
        mode: NormalizationMode,
    ) -> Self
    where
        I: IntoIterator<Item = &'a PointOfInterest>,
    {
        let mut order = Vec::new();
        let mut nodes: HashMap<NodeId, NodeDemand> = HashMap::new();
        let mut distance_totals: HashMap<NodeId, f64> = HashMap::new();
        let mut peak = ProbabilityMatrix::filled(0.0);

        for poi in pois {
            for &node in &poi.nodes {
                let demand = match nodes.entry(node) {
                    Entry::Occupied(entry) => {
                        let demand = entry.into_mut();
                        demand.probability = demand.probability.sum(&poi.probability);
                        demand.coverage += 1;
                        demand
                    }
                    Entry::Vacant(entry) => {
                        order.push(node);
                        entry.insert(NodeDemand {
                            probability: poi.probability.clone(),
                            max_distance: 0.0,
                            coverage: 1,
                        })
                    }
                };
                peak = peak.zip_with(&demand.probability, f64::max);
                *distance_totals.entry(node).or_insert(0.0) += poi.max_distance;
            }
        }

        for (node, total) in distance_totals {
            if let Some(demand) = nodes.get_mut(&node) {
                demand.max_distance = total / demand.coverage as f64;
            }
        }

        let covered = order.len();
        for &node in topology_nodes {
            if !nodes.contains_key(&node) {
                order.push(node);
                nodes.insert(
                    node,
                    NodeDemand {
                        probability: default_probability.clone(),
                        max_distance: default_max_distance,
                        coverage: 0,
                    },
                );
            }
        }

        if mode != NormalizationMode::None {
            let divisor = match mode {
                NormalizationMode::Week => ProbabilityMatrix::filled(peak.max_value()),
                NormalizationMode::Day => {
                    let mut divisor = ProbabilityMatrix::filled(0.0);
                    for day in 0..DAYS_PER_WEEK {
                        divisor.set_day(day, [peak.day_max(day); HOURS_PER_DAY]);
                    }
                    divisor
                }
                NormalizationMode::Hour | NormalizationMode::None => peak,
            };
            for demand in nodes.values_mut() {
                demand.probability = demand
                    .probability
                    .zip_with(&divisor, |value, max| if max > 0.0 { value / max } else { 0.0 });
            }
        }

        debug!(
            covered,
            defaulted = order.len() - covered,
            normalization = ?mode,
            "Built demand model"
        );

        Self { order, nodes }
    }

    /// Node ids in discovery order
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeDemand> {
        self.nodes.get(&node)
    }

    /// Attraction of `node`; 0 for nodes outside the model
    pub fn probability(&self, node: NodeId, day: usize, hour: usize) -> f64 {
        self.get(node).map_or(0.0, |demand| demand.probability.get(day, hour))
    }

    pub fn max_distance(&self, node: NodeId) -> Option<f64> {
        self.get(node).map(|demand| demand.max_distance)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
