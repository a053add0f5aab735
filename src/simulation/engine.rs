//! # Monte Carlo Occupancy Engine
//!
//! Simulates one hour at a time how drivers pick a destination, walk from the
//! nearest charging station, and occupy or give up a charging point.
//!
//! ## Phases
//!
//! 1. **Preparation**: validate the configuration, build the demand model, the
//!    station table and the trajectory stores
//! 2. **Equilibration**: simulate weeks without recording, so stations start the
//!    recorded period in a realistic state
//! 3. **Production**: simulate weeks and record every outcome
//! 4. **Finished**: the bundle is final
//!
//! ## Hourly step
//!
//! For each arriving driver a user type is drawn (weighted by participation,
//! accepted with the type's hourly activity), then a destination node (accepted
//! with its demand). The nearest station either has a free point, is full
//! (`occupancy` failure) or is further away than the destination tolerates
//! (`distance` failure). Afterwards every occupied point is released with the
//! complement of its user type's activity probability.
//!
//! A single seeded [`StdRng`] drives every draw, so seeded runs are repeatable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::ops::AddAssign;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use validator::Validate;

use super::bundle::{RunMetadata, TrajectoryBundle};
use super::demand::{DemandModel, NormalizationMode};
use super::sampling::{rejection_sample, Sample};
use super::trajectory::TrajectoryStore;
use crate::domain::{
    CapacityMap, DriverSchedule, FailureKind, NodeId, Outcome, PointOfInterest, ProbabilityMatrix,
    StationTable, UserId, UserRegistry, UserType, WeeklyInput, DAYS_PER_WEEK, HOURS_PER_DAY,
};
use crate::error::{ConfigError, SimulationError};
use crate::topology::Topology;

/// Run parameters
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct SimulationConfig {
    /// Recorded weeks
    pub weeks: u32,

    /// Unrecorded warm-up weeks before recording starts
    pub equilibration_weeks: u32,

    /// Upper bound of rejection-sampling trials per draw
    #[validate(range(min = 1))]
    pub trials: u32,

    /// Drivers arriving per hour (scalar, hour map, day map or full table)
    pub drivers: Option<WeeklyInput<u32>>,

    pub normalization: NormalizationMode,

    /// Demand of nodes no POI covers
    pub default_probability: WeeklyInput<f64>,

    /// Walking limit (m) of nodes no POI covers
    #[validate(range(min = 0.0))]
    pub default_max_distance: f64,

    /// Keep the per-station walking distance store
    pub record_distances: bool,

    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,

    /// Save the bundle here when the run finishes
    pub output: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            weeks: 1,
            equilibration_weeks: 4,
            trials: 100,
            drivers: None,
            normalization: NormalizationMode::None,
            default_probability: WeeklyInput::constant(0.1),
            default_max_distance: 150.0, // meters
            record_distances: true,
            random_seed: None,
            output: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preparation,
    Equilibration,
    Production,
    Finished,
}

/// Tally of one simulated hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourSummary {
    pub arrivals: u32,
    /// Drivers that found no user type, destination or station
    pub dropped: u32,
    pub successes: u32,
    pub occupancy_failures: u32,
    pub distance_failures: u32,
    pub departures: u32,
}

impl HourSummary {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Failure(FailureKind::Occupancy) => self.occupancy_failures += 1,
            Outcome::Failure(FailureKind::Distance) => self.distance_failures += 1,
        }
    }
}

impl AddAssign for HourSummary {
    fn add_assign(&mut self, other: Self) {
        self.arrivals += other.arrivals;
        self.dropped += other.dropped;
        self.successes += other.successes;
        self.occupancy_failures += other.occupancy_failures;
        self.distance_failures += other.distance_failures;
        self.departures += other.departures;
    }
}

/// Holds everything a run is built from: topology, user types, POIs and the
/// run parameters
pub struct MonteCarloEngine<T: Topology> {
    topology: T,
    config: SimulationConfig,
    users: UserRegistry,
    pois: Vec<PointOfInterest>,
}

impl<T: Topology> MonteCarloEngine<T> {
    pub fn new(topology: T, config: SimulationConfig) -> Self {
        Self {
            topology,
            config,
            users: UserRegistry::new(),
            pois: Vec::new(),
        }
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut T {
        &mut self.topology
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn add_user(&mut self, user: UserType, percent: u32) -> Result<UserId, ConfigError> {
        self.users.add(user, percent)
    }

    pub fn add_user_percentage(&mut self, user: UserType, percent: f64) -> Result<UserId, ConfigError> {
        self.users.add_percentage(user, percent)
    }

    pub fn add_poi(&mut self, poi: PointOfInterest) {
        self.pois.push(poi);
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    /// Prepare a run against the capacity installed in the topology
    pub fn prepare(&self) -> Result<Simulation<'_, T>, ConfigError> {
        self.prepare_with_capacity(self.topology.charging_stations())
    }

    /// Prepare a run against an explicit capacity map
    pub fn prepare_with_capacity(&self, capacity: CapacityMap) -> Result<Simulation<'_, T>, ConfigError> {
        let (drivers, default_probability, topology_nodes) =
            self.validate(&capacity).map_err(|error| {
                warn!(%error, "Simulation preparation failed");
                error
            })?;

        let demand = DemandModel::build(
            &self.pois,
            &topology_nodes,
            &default_probability,
            self.config.default_max_distance,
            self.config.normalization,
        );

        let failures = vec![FailureKind::Occupancy, FailureKind::Distance];
        let num_users = self.users.len();
        let nodes = TrajectoryStore::for_nodes(demand.nodes().iter().copied(), num_users, failures.clone());
        let stations = TrajectoryStore::for_nodes(capacity.keys().copied(), num_users, failures.clone());
        let distances = self
            .config
            .record_distances
            .then(|| TrajectoryStore::for_nodes(capacity.keys().copied(), num_users, failures));

        let metadata = RunMetadata::new(
            self.config.weeks,
            self.config.equilibration_weeks,
            self.config.trials,
            self.config.random_seed,
            capacity.clone(),
            self.users.names(),
        );

        let rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            run = %metadata.id,
            users = num_users,
            pois = self.pois.len(),
            nodes = demand.len(),
            stations = capacity.len(),
            charging_points = capacity.values().sum::<u32>(),
            "Prepared simulation"
        );

        Ok(Simulation {
            engine: self,
            phase: Phase::Preparation,
            drivers,
            lottery: self.users.lottery(),
            station_nodes: capacity.keys().copied().collect(),
            stations: StationTable::from_capacity(&capacity, num_users),
            bundle: TrajectoryBundle::new(metadata, nodes, stations, distances),
            demand,
            rng,
            weeks_completed: 0,
        })
    }

    fn validate(
        &self,
        capacity: &CapacityMap,
    ) -> Result<(DriverSchedule, ProbabilityMatrix, Vec<NodeId>), ConfigError> {
        self.users.validate()?;

        let drivers = self
            .config
            .drivers
            .as_ref()
            .ok_or(ConfigError::MissingDrivers)
            .and_then(DriverSchedule::from_input)?;

        if self.config.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }

        let default_probability = ProbabilityMatrix::probability(&self.config.default_probability)?;

        if capacity.is_empty() {
            return Err(ConfigError::MissingCapacity);
        }

        let topology_nodes = self.topology.nodes();
        if topology_nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        Ok((drivers, default_probability, topology_nodes))
    }

    /// Equilibrate, produce and finish a run against the installed capacity
    pub fn run(&self) -> Result<TrajectoryBundle, SimulationError> {
        self.run_with_capacity(self.topology.charging_stations())
    }

    pub fn run_with_capacity(&self, capacity: CapacityMap) -> Result<TrajectoryBundle, SimulationError> {
        let mut simulation = self.prepare_with_capacity(capacity)?;
        simulation.equilibrate(self.config.equilibration_weeks)?;
        simulation.produce(self.config.weeks)?;
        simulation.finish();

        let bundle = simulation.into_bundle();
        if let Some(path) = &self.config.output {
            bundle.save(path)?;
        }
        Ok(bundle)
    }
}

/// State of one run. Owns the stations, the demand model, the random stream and
/// the trajectory bundle being filled.
pub struct Simulation<'a, T: Topology> {
    engine: &'a MonteCarloEngine<T>,
    phase: Phase,
    drivers: DriverSchedule,
    lottery: Vec<UserId>,
    station_nodes: Vec<NodeId>,
    stations: StationTable,
    demand: DemandModel,
    bundle: TrajectoryBundle,
    rng: StdRng,
    weeks_completed: u32,
}

impl<'a, T: Topology> Simulation<'a, T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    pub fn demand(&self) -> &DemandModel {
        &self.demand
    }

    pub fn drivers(&self) -> &DriverSchedule {
        &self.drivers
    }

    pub fn bundle(&self) -> &TrajectoryBundle {
        &self.bundle
    }

    /// Weeks simulated so far, both phases included
    pub fn weeks_completed(&self) -> u32 {
        self.weeks_completed
    }

    /// Run unrecorded weeks
    pub fn equilibrate(&mut self, weeks: u32) -> Result<(), SimulationError> {
        self.enter(Phase::Equilibration)?;
        info!(weeks, "Equilibration started");
        for _ in 0..weeks {
            self.run_week()?;
        }
        Ok(())
    }

    /// Switch to recording without simulating anything yet
    pub fn begin_production(&mut self) -> Result<(), SimulationError> {
        self.enter(Phase::Production)
    }

    /// Run recorded weeks
    pub fn produce(&mut self, weeks: u32) -> Result<(), SimulationError> {
        self.enter(Phase::Production)?;
        info!(weeks, "Production started");
        for week in 0..weeks {
            self.run_week()?;
            info!(week = week + 1, of = weeks, "Production week finished");
        }
        Ok(())
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
        info!(
            run = %self.bundle.metadata.id,
            weeks = self.weeks_completed,
            occupied = self.stations.total_occupied(),
            "Simulation finished"
        );
    }

    pub fn into_bundle(self) -> TrajectoryBundle {
        self.bundle
    }

    fn enter(&mut self, phase: Phase) -> Result<(), SimulationError> {
        let allowed = match phase {
            Phase::Equilibration => matches!(self.phase, Phase::Preparation | Phase::Equilibration),
            Phase::Production => !matches!(self.phase, Phase::Finished),
            Phase::Preparation | Phase::Finished => false,
        };
        if !allowed {
            return Err(SimulationError::InvalidPhase {
                current: self.phase,
                requested: phase,
            });
        }
        self.phase = phase;
        Ok(())
    }

    fn run_week(&mut self) -> Result<(), SimulationError> {
        for day in 0..DAYS_PER_WEEK {
            let mut totals = HourSummary::default();
            for hour in 0..HOURS_PER_DAY {
                totals += self.step_hour(day, hour)?;
            }
            debug!(
                phase = ?self.phase,
                week = self.weeks_completed,
                day,
                arrivals = totals.arrivals,
                successes = totals.successes,
                occupancy_failures = totals.occupancy_failures,
                distance_failures = totals.distance_failures,
                dropped = totals.dropped,
                occupied = self.stations.total_occupied(),
                "Simulated day"
            );
        }
        self.weeks_completed += 1;
        Ok(())
    }

    /// Simulate one hour: arrivals first, then departures. Outcomes are recorded
    /// only during production.
    pub fn step_hour(&mut self, day: usize, hour: usize) -> Result<HourSummary, SimulationError> {
        if matches!(self.phase, Phase::Finished) {
            return Err(SimulationError::InvalidPhase {
                current: self.phase,
                requested: self.phase,
            });
        }
        if day >= DAYS_PER_WEEK || hour >= HOURS_PER_DAY {
            return Err(SimulationError::SlotOutOfRange { day, hour });
        }

        let engine = self.engine;
        let users = &engine.users;
        let trials = engine.config.trials;
        let recording = self.phase == Phase::Production;
        let arrivals = self.drivers.get(day, hour);
        let mut summary = HourSummary {
            arrivals,
            ..Default::default()
        };

        for _ in 0..arrivals {
            let lottery = &self.lottery;
            // A rejected user type is redrawn from the lottery too, against the same r
            let user = rejection_sample(
                trials,
                &mut self.rng,
                |rng| lottery[rng.gen_range(0..lottery.len())],
                |user| users.p_hour(*user, day, hour),
            );
            let Sample::Accepted(user) = user else {
                summary.dropped += 1;
                continue;
            };

            let demand = &self.demand;
            let candidates = demand.nodes();
            let node = rejection_sample(
                trials,
                &mut self.rng,
                |rng| candidates[rng.gen_range(0..candidates.len())],
                |node| demand.probability(*node, day, hour),
            );
            let Sample::Accepted(node) = node else {
                summary.dropped += 1;
                continue;
            };

            let Some((station_node, distance)) = engine.topology.nearest_station(node, &self.station_nodes)
            else {
                debug!(node, "No reachable station");
                summary.dropped += 1;
                continue;
            };
            let Some(station) = self.stations.get_mut(station_node) else {
                debug!(node, station = station_node, "Nearest station is not part of the run");
                summary.dropped += 1;
                continue;
            };

            let max_distance = demand
                .max_distance(node)
                .unwrap_or(engine.config.default_max_distance);
            let outcome = if station.is_full() {
                Outcome::Failure(FailureKind::Occupancy)
            } else if distance > max_distance {
                Outcome::Failure(FailureKind::Distance)
            } else {
                station.occupy(user);
                Outcome::Success
            };
            summary.count(outcome);

            if recording {
                self.bundle
                    .record(day, hour, node, station_node, user, outcome, distance)?;
            }
        }

        for station in self.stations.iter_mut() {
            for user in 0..users.len() {
                let leave = 1.0 - users.p_hour(user, day, hour);
                let leaving = (0..station.occupied_by(user))
                    .filter(|_| self.rng.gen::<f64>() < leave)
                    .count() as u32;
                summary.departures += station.vacate(user, leaving);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{MockTopology, PlanarTopology};

    /// Street of 4 nodes, 100 m apart, one station at node 0
    fn street() -> PlanarTopology {
        PlanarTopology::grid(4, 1, 100.0).with_station(0, 2)
    }

    fn config(drivers: u32) -> SimulationConfig {
        SimulationConfig {
            weeks: 1,
            equilibration_weeks: 1,
            trials: 10,
            drivers: Some(WeeklyInput::constant(drivers)),
            default_max_distance: 1000.0,
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn engine(drivers: u32, p_user: f64) -> MonteCarloEngine<PlanarTopology> {
        let mut engine = MonteCarloEngine::new(street(), config(drivers));
        engine
            .add_user(UserType::new("resident", ProbabilityMatrix::filled(p_user)), 100)
            .unwrap();
        engine
    }

    #[test]
    fn test_preparation_checks_participation_first() {
        let mut engine = MonteCarloEngine::new(street(), SimulationConfig::default());
        engine
            .add_user(UserType::new("resident", ProbabilityMatrix::filled(0.5)), 60)
            .unwrap();
        assert_eq!(
            engine.prepare().err(),
            Some(ConfigError::IncompleteParticipation(60))
        );
    }

    #[test]
    fn test_preparation_errors_in_order() {
        let mut engine = engine(1, 0.5);
        engine.config_mut().drivers = None;
        assert_eq!(engine.prepare().err(), Some(ConfigError::MissingDrivers));

        engine.config_mut().drivers = Some(WeeklyInput::keyed([(0, 1), (1, 2)]));
        assert!(matches!(engine.prepare().err(), Some(ConfigError::InvalidShape(_))));

        engine.config_mut().drivers = Some(WeeklyInput::constant(1));
        engine.config_mut().trials = 0;
        assert_eq!(engine.prepare().err(), Some(ConfigError::ZeroTrials));

        engine.config_mut().trials = 5;
        engine.config_mut().default_probability = WeeklyInput::constant(f64::NAN);
        assert!(matches!(
            engine.prepare().err(),
            Some(ConfigError::InvalidProbability { .. })
        ));

        engine.config_mut().default_probability = WeeklyInput::constant(0.1);
        assert_eq!(
            engine.prepare_with_capacity(CapacityMap::new()).err(),
            Some(ConfigError::MissingCapacity)
        );
        assert!(engine.prepare().is_ok());
    }

    #[test]
    fn test_empty_topology_is_rejected() {
        let mut topology = MockTopology::new();
        topology.expect_nodes().returning(Vec::new);
        topology
            .expect_charging_stations()
            .returning(|| [(0, 1)].into_iter().collect());

        let mut engine = MonteCarloEngine::new(topology, config(1));
        engine
            .add_user(UserType::new("resident", ProbabilityMatrix::filled(0.5)), 100)
            .unwrap();
        assert_eq!(engine.prepare().err(), Some(ConfigError::NoNodes));
    }

    #[test]
    fn test_occupancy_never_exceeds_capacity() {
        let engine = engine(5, 0.9);
        let mut simulation = engine.prepare().unwrap();
        simulation.begin_production().unwrap();

        for day in 0..DAYS_PER_WEEK {
            for hour in 0..HOURS_PER_DAY {
                let summary = simulation.step_hour(day, hour).unwrap();
                assert_eq!(summary.arrivals, 5);
                assert_eq!(
                    summary.arrivals,
                    summary.dropped + summary.successes + summary.occupancy_failures + summary.distance_failures
                );
                for station in simulation.stations().iter() {
                    assert!(station.total_occupied() <= station.capacity());
                }
            }
        }
    }

    #[test]
    fn test_equilibration_is_not_recorded() {
        let engine = engine(3, 0.8);
        let mut simulation = engine.prepare().unwrap();
        simulation.equilibrate(1).unwrap();
        assert_eq!(simulation.phase(), Phase::Equilibration);
        let totals = simulation.bundle().nodes.extract_all(false).unwrap();
        assert!(totals.values().all(|summary| summary.total() == 0.0));

        simulation.produce(1).unwrap();
        assert_eq!(simulation.weeks_completed(), 2);
        let totals = simulation.bundle().stations.extract_all(false).unwrap();
        assert!(totals[&0].total() > 0.0);
    }

    #[test]
    fn test_phase_order_is_enforced() {
        let engine = engine(1, 0.5);
        let mut simulation = engine.prepare().unwrap();
        assert_eq!(simulation.phase(), Phase::Preparation);
        simulation.begin_production().unwrap();
        assert!(matches!(
            simulation.equilibrate(1),
            Err(SimulationError::InvalidPhase { .. })
        ));
        simulation.finish();
        assert_eq!(simulation.phase(), Phase::Finished);
        assert!(simulation.step_hour(0, 0).is_err());
    }

    /// Single node with a station that has room for all six drivers of hour 0
    fn departure_engine() -> MonteCarloEngine<PlanarTopology> {
        let topology = PlanarTopology::grid(1, 1, 100.0).with_station(0, 10);
        let config = SimulationConfig {
            drivers: Some(WeeklyInput::hourly(std::array::from_fn(|hour| if hour == 0 { 6 } else { 0 }))),
            default_probability: WeeklyInput::constant(0.0),
            ..config(0)
        };
        let mut engine = MonteCarloEngine::new(topology, config);
        engine.add_poi(PointOfInterest::new("depot", ProbabilityMatrix::filled(1.0), [0], 150.0));
        engine
    }

    /// Active at hour 0, inactive from hour 1 on
    fn leaves_after_midnight() -> ProbabilityMatrix {
        let mut probability = ProbabilityMatrix::filled(0.0);
        for day in 0..DAYS_PER_WEEK {
            probability.set(day, 0, 1.0);
        }
        probability
    }

    #[test]
    fn test_inactive_hour_vacates_every_slot() {
        let mut engine = departure_engine();
        engine
            .add_user(UserType::new("night", leaves_after_midnight()), 100)
            .unwrap();
        let mut simulation = engine.prepare().unwrap();

        let first = simulation.step_hour(0, 0).unwrap();
        assert_eq!(first.departures, 0);
        let parked = simulation.stations().total_occupied();
        assert_eq!(parked, 6);
        assert_eq!(first.successes, 6);

        let second = simulation.step_hour(0, 1).unwrap();
        assert_eq!(second.arrivals, 0);
        assert_eq!(second.departures, parked);
        assert_eq!(simulation.stations().total_occupied(), 0);
    }

    #[test]
    fn test_departures_follow_each_user_type() {
        let mut engine = departure_engine();
        engine
            .add_user(UserType::new("steady", ProbabilityMatrix::filled(1.0)), 50)
            .unwrap();
        engine
            .add_user(UserType::new("night", leaves_after_midnight()), 50)
            .unwrap();
        let mut simulation = engine.prepare().unwrap();

        simulation.step_hour(0, 0).unwrap();
        let station = simulation.stations().get(0).unwrap();
        let (steady, night) = (station.occupied_by(0), station.occupied_by(1));
        assert_eq!(steady + night, 6);

        let summary = simulation.step_hour(0, 1).unwrap();
        let station = simulation.stations().get(0).unwrap();
        assert_eq!(summary.departures, night);
        assert_eq!(station.occupied_by(0), steady);
        assert_eq!(station.occupied_by(1), 0);
    }

    #[test]
    fn test_out_of_range_hour_is_an_error() {
        let engine = engine(1, 0.5);
        let mut simulation = engine.prepare().unwrap();
        assert!(matches!(
            simulation.step_hour(7, 0),
            Err(SimulationError::SlotOutOfRange { day: 7, hour: 0 })
        ));
        assert!(matches!(
            simulation.step_hour(0, 24),
            Err(SimulationError::SlotOutOfRange { day: 0, hour: 24 })
        ));
    }

    #[test]
    fn test_inactive_users_are_dropped() {
        // r is drawn from [0, 1), so a negative activity never accepts
        let engine = engine(2, -1.0);
        let mut simulation = engine.prepare().unwrap();
        let summary = simulation.step_hour(0, 0).unwrap();
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.successes, 0);
    }

    #[test]
    fn test_distance_failures_use_node_limit() {
        let mut engine = engine(4, 1.0);
        engine.config_mut().default_max_distance = 150.0;
        engine.config_mut().default_probability = WeeklyInput::constant(0.0);
        // Only node 3 (300 m from the station) attracts anyone
        engine.add_poi(PointOfInterest::new("stadium", ProbabilityMatrix::filled(1.0), [3], 250.0));

        let mut simulation = engine.prepare().unwrap();
        simulation.begin_production().unwrap();
        let summary = simulation.step_hour(2, 18).unwrap();
        assert_eq!(summary.distance_failures + summary.dropped, 4);
        assert_eq!(summary.successes, 0);

        let recorded = simulation.bundle().nodes.extract_all(false).unwrap();
        assert_eq!(
            recorded[&3].failure(FailureKind::Distance),
            f64::from(summary.distance_failures)
        );
        let distances = simulation.bundle().distances.as_ref().unwrap();
        assert_eq!(
            distances.get_fail(2, 18, 0, 0, FailureKind::Distance).unwrap(),
            300.0 * f64::from(summary.distance_failures)
        );
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let engine = engine(4, 0.6);
        let first = engine.run().unwrap();
        let second = engine.run().unwrap();
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.stations, second.stations);
        assert_ne!(first.metadata.id, second.metadata.id);
    }

    #[test]
    fn test_run_saves_bundle() {
        let mut engine = engine(2, 0.5);
        let path = std::env::temp_dir().join(format!("chargesim-engine-{}.bin", uuid::Uuid::new_v4()));
        engine.config_mut().output = Some(path.clone());

        let bundle = engine.run().unwrap();
        let loaded = TrajectoryBundle::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.metadata.id, bundle.metadata.id);
        assert_eq!(loaded.metadata.weeks, 1);
    }
}
