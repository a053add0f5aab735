//! Capacity recommendations from the station failure statistics of a finished run.
//!
//! Stations that turn away too many drivers because they are full get extra
//! charging points, one per average daily occupancy failure. Stations whose
//! visitors give up because the walk is too long get new stations placed in
//! the ring between the minimum placement distance and the mean failing walk.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::types::{CapacityChange, OptimizationReport, OptimizerConfig};
use crate::domain::{CapacityMap, FailureKind, NodeId};
use crate::simulation::{NodeSummary, TrajectoryBundle, TrajectoryError};
use crate::topology::Topology;

pub struct CapacityOptimizer {
    config: OptimizerConfig,
    rng: StdRng,
}

impl CapacityOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Update `capacity` in place from the station statistics of `bundle`
    pub fn optimize<T: Topology + ?Sized>(
        &mut self,
        bundle: &TrajectoryBundle,
        topology: &T,
        capacity: &mut CapacityMap,
    ) -> Result<OptimizationReport, TrajectoryError> {
        let store = &bundle.stations;
        let periods = f64::from(bundle.metadata.weeks) * store.num_days() as f64;
        let counts = store.extract_all(false)?;
        let distances = bundle
            .distances
            .as_ref()
            .map(|distances| distances.extract_all(false))
            .transpose()?;

        if capacity.len() != store.num_nodes() {
            warn!(
                capacities = capacity.len(),
                stations = store.num_nodes(),
                "Capacity map and trajectory disagree on the number of stations; missing ones are ignored"
            );
        }

        let mut report = OptimizationReport::default();
        let total = counts.len();

        for (position, (&station, summary)) in counts.iter().enumerate() {
            if capacity.contains_key(&station) {
                report.stations_examined += 1;

                if let Some(change) = self.expand(station, summary, periods, capacity) {
                    report.changes.push(change);
                }

                let ratio = failure_ratio(summary, FailureKind::Distance);
                if ratio > self.config.distance_threshold {
                    match distances.as_ref().and_then(|distances| distances.get(&station)) {
                        Some(walked) => {
                            let placed = self.place(station, summary, walked, periods, topology, capacity);
                            report.changes.extend(placed);
                        }
                        None => debug!(station, "No distance statistics, skipping placement"),
                    }
                }
            }

            debug!(station, done = position + 1, of = total, "Optimized station");
        }

        info!(
            examined = report.stations_examined,
            added_points = report.added_points(),
            placed = report.placed().len(),
            "Capacity optimization finished"
        );

        Ok(report)
    }

    fn expand(
        &self,
        station: NodeId,
        summary: &NodeSummary,
        periods: f64,
        capacity: &mut CapacityMap,
    ) -> Option<CapacityChange> {
        let ratio = failure_ratio(summary, FailureKind::Occupancy);
        if ratio <= self.config.occupancy_threshold || periods <= 0.0 {
            return None;
        }

        let extra = (summary.failure(FailureKind::Occupancy) / periods).floor() as u32;
        let current = capacity.get_mut(&station)?;
        let from = *current;
        *current += extra;
        debug!(station, from, to = *current, ratio, "Expanded station");

        Some(CapacityChange::Expanded {
            station,
            from,
            to: *current,
            failure_ratio: ratio,
        })
    }

    fn place<T: Topology + ?Sized>(
        &mut self,
        station: NodeId,
        summary: &NodeSummary,
        walked: &NodeSummary,
        periods: f64,
        topology: &T,
        capacity: &mut CapacityMap,
    ) -> Vec<CapacityChange> {
        let failures = summary.failure(FailureKind::Distance);
        let mean_distance = if failures > 0.0 {
            walked.failure(FailureKind::Distance) / failures
        } else {
            0.0
        };
        let min_distance = self.config.min_distance;
        if mean_distance <= min_distance || periods <= 0.0 {
            return Vec::new();
        }

        let near = topology.radius(station, min_distance);
        let candidates: Vec<NodeId> = topology
            .radius(station, mean_distance)
            .into_iter()
            .filter(|node| !near.contains(node))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let rounds = (failures / periods / 2.0).floor() as u32;
        let mut placed = Vec::new();
        for _ in 0..rounds {
            for _ in 0..self.config.trials {
                let Some(&node) = candidates.choose(&mut self.rng) else {
                    break;
                };
                if !capacity.contains_key(&node) {
                    capacity.insert(node, self.config.new_station_capacity);
                    debug!(station, node, mean_distance, "Placed station");
                    placed.push(CapacityChange::Placed {
                        node,
                        capacity: self.config.new_station_capacity,
                        parent: station,
                        mean_distance,
                    });
                    break;
                }
            }
        }
        placed
    }
}

/// Share of `kind` among successes and `kind` failures; 0 without failures
fn failure_ratio(summary: &NodeSummary, kind: FailureKind) -> f64 {
    let failures = summary.failure(kind);
    if failures > 0.0 {
        failures / (failures + summary.success)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{RunMetadata, TrajectoryStore};
    use crate::topology::MockTopology;

    const KINDS: [FailureKind; 2] = [FailureKind::Occupancy, FailureKind::Distance];

    fn store(days: usize, stations: &[NodeId]) -> TrajectoryStore {
        TrajectoryStore::with_dimensions(days, 1, 0, 1, KINDS.to_vec(), Some(stations.to_vec()))
    }

    fn bundle(stations: TrajectoryStore, distances: Option<TrajectoryStore>) -> TrajectoryBundle {
        let metadata = RunMetadata::new(1, 0, 10, None, CapacityMap::new(), vec!["all".to_string()]);
        let nodes = store(stations.num_days(), &[]);
        TrajectoryBundle::new(metadata, nodes, stations, distances)
    }

    fn seeded() -> CapacityOptimizer {
        CapacityOptimizer::new(OptimizerConfig {
            random_seed: Some(3),
            ..Default::default()
        })
    }

    fn idle_topology() -> MockTopology {
        let mut topology = MockTopology::new();
        topology.expect_radius().never();
        topology
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut stations = store(1, &[1]);
        stations.set_success(0, 0, 1, 0, 10.0).unwrap();
        stations.set_fail(0, 0, 1, 0, FailureKind::Occupancy, 10.0).unwrap();

        let mut capacity: CapacityMap = [(1, 2)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, None), &idle_topology(), &mut capacity)
            .unwrap();
        assert_eq!(capacity[&1], 2);
        assert!(report.is_empty());
        assert_eq!(report.stations_examined, 1);
    }

    #[test]
    fn test_occupancy_failures_expand_capacity() {
        let mut stations = store(7, &[1, 2]);
        stations.set_success(0, 0, 1, 0, 10.0).unwrap();
        stations.set_fail(2, 0, 1, 0, FailureKind::Occupancy, 30.0).unwrap();
        stations.set_success(0, 0, 2, 0, 10.0).unwrap();

        let mut capacity: CapacityMap = [(1, 2), (2, 1)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, None), &idle_topology(), &mut capacity)
            .unwrap();

        // 30 failures over 7 days → 4 extra points
        assert_eq!(capacity[&1], 6);
        assert_eq!(capacity[&2], 1);
        assert_eq!(report.added_points(), 4);
        assert_eq!(
            report.changes,
            vec![CapacityChange::Expanded {
                station: 1,
                from: 2,
                to: 6,
                failure_ratio: 0.75,
            }]
        );
    }

    #[test]
    fn test_distance_failures_place_new_stations() {
        let mut stations = store(1, &[1]);
        stations.set_success(0, 0, 1, 0, 2.0).unwrap();
        stations.set_fail(0, 0, 1, 0, FailureKind::Distance, 10.0).unwrap();
        let mut walked = store(1, &[1]);
        walked.set_fail(0, 0, 1, 0, FailureKind::Distance, 4000.0).unwrap();

        let mut topology = MockTopology::new();
        topology
            .expect_radius()
            .withf(|node, distance| *node == 1 && *distance == 400.0)
            .returning(|_, _| vec![1, 2, 3, 4, 5]);
        topology
            .expect_radius()
            .withf(|node, distance| *node == 1 && *distance == 150.0)
            .returning(|_, _| vec![1, 2]);

        let mut capacity: CapacityMap = [(1, 2)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, Some(walked)), &topology, &mut capacity)
            .unwrap();

        let expected: CapacityMap = [(1, 2), (3, 2), (4, 2), (5, 2)].into_iter().collect();
        assert_eq!(capacity, expected);
        let mut placed = report.placed();
        placed.sort_unstable();
        assert_eq!(placed, vec![3, 4, 5]);
    }

    #[test]
    fn test_short_walks_do_not_place() {
        let mut stations = store(1, &[1]);
        stations.set_fail(0, 0, 1, 0, FailureKind::Distance, 4.0).unwrap();
        let mut walked = store(1, &[1]);
        walked.set_fail(0, 0, 1, 0, FailureKind::Distance, 400.0).unwrap();

        let mut capacity: CapacityMap = [(1, 2)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, Some(walked)), &idle_topology(), &mut capacity)
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(capacity.len(), 1);
    }

    #[test]
    fn test_missing_distance_store_skips_placement() {
        let mut stations = store(1, &[1]);
        stations.set_fail(0, 0, 1, 0, FailureKind::Distance, 10.0).unwrap();

        let mut capacity: CapacityMap = [(1, 2)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, None), &idle_topology(), &mut capacity)
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_stations_missing_from_map_are_ignored() {
        let mut stations = store(1, &[1, 2]);
        stations.set_fail(0, 0, 2, 0, FailureKind::Occupancy, 10.0).unwrap();

        let mut capacity: CapacityMap = [(1, 2), (9, 1)].into_iter().collect();
        let report = seeded()
            .optimize(&bundle(stations, None), &idle_topology(), &mut capacity)
            .unwrap();
        assert_eq!(report.stations_examined, 1);
        assert!(!capacity.contains_key(&2));
        assert_eq!(capacity[&9], 1);
    }
}
