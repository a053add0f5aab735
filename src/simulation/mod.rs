//! # Occupancy Simulation Module
//!
//! Discrete-time Monte Carlo simulation of charging station occupancy.
//!
//! ## Components
//!
//! - **DemandModel**: Per-node destination attraction merged from points of interest
//! - **TrajectoryStore**: Dense success/failure statistics per day, hour, node and user type
//! - **MonteCarloEngine**: Preparation, equilibration and production of a run
//! - **TrajectoryBundle**: Finished output of a run, persisted with bincode
//!
//! ## Usage
//!
//! ```rust
//! use chargesim::domain::{ProbabilityMatrix, UserType, WeeklyInput};
//! use chargesim::simulation::{MonteCarloEngine, SimulationConfig};
//! use chargesim::topology::PlanarTopology;
//!
//! let topology = PlanarTopology::grid(3, 3, 100.0).with_station(4, 2);
//! let config = SimulationConfig {
//!     drivers: Some(WeeklyInput::constant(2)),
//!     equilibration_weeks: 1,
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut engine = MonteCarloEngine::new(topology, config);
//! engine.add_user(UserType::new("resident", ProbabilityMatrix::filled(0.7)), 100).unwrap();
//!
//! let bundle = engine.run().unwrap();
//! assert_eq!(bundle.stations.node_keys(), &[4]);
//! ```

pub mod bundle;
pub mod demand;
pub mod engine;
pub mod sampling;
pub mod trajectory;

pub use bundle::{RunMetadata, TrajectoryBundle};
pub use demand::{DemandModel, NodeDemand, NormalizationMode};
pub use engine::{HourSummary, MonteCarloEngine, Phase, Simulation, SimulationConfig};
pub use sampling::{rejection_sample, Sample};
pub use trajectory::{NodeSummary, TrajectoryError, TrajectoryStore};
