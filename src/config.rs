use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use validator::Validate;

use crate::domain::{CapacityMap, NodeId, PointOfInterest, ProbabilityMatrix, UserType, WeeklyInput};
use crate::error::ConfigError;
use crate::optimizer::OptimizerConfig;
use crate::simulation::{MonteCarloEngine, SimulationConfig};
use crate::topology::PlanarTopology;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub simulation: SimulationConfig,
    #[validate(nested)]
    pub optimizer: OptimizerConfig,
    #[validate(nested)]
    pub topology: TopologyConfig,
    pub users: Vec<UserConfig>,
    pub pois: Vec<PoiConfig>,
}

/// Street grid and installed stations
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct TopologyConfig {
    #[validate(range(min = 1))]
    pub columns: usize,
    #[validate(range(min = 1))]
    pub rows: usize,
    /// Distance between neighbouring crossings (m)
    #[validate(range(min = 0.0))]
    pub spacing: f64,
    pub stations: Vec<StationConfig>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 10,
            spacing: 100.0,
            stations: Vec::new(),
        }
    }
}

impl TopologyConfig {
    pub fn capacity(&self) -> CapacityMap {
        self.stations.iter().map(|s| (s.node, s.capacity)).collect()
    }

    pub fn build(&self) -> PlanarTopology {
        let mut topology = PlanarTopology::grid(self.columns, self.rows, self.spacing);
        topology.set_stations(self.capacity());
        topology
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub node: NodeId,
    pub capacity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub name: String,
    /// Share of all drivers in whole percent
    pub percent: f64,
    pub probability: WeeklyInput<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoiConfig {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Nodes the POI is located at
    pub centers: Vec<NodeId>,
    /// Nodes within this distance of a center are covered too (m)
    #[serde(default)]
    pub radius: f64,
    pub probability: WeeklyInput<f64>,
    pub max_distance: f64,
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CHARGESIM__").split("__"))
    }

    pub fn load() -> Result<Self> {
        let config: Config = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Engine with the configured topology, user types and POIs
    pub fn engine(&self) -> Result<MonteCarloEngine<PlanarTopology>, ConfigError> {
        let mut engine = MonteCarloEngine::new(self.topology.build(), self.simulation.clone());

        for user in &self.users {
            let probability = ProbabilityMatrix::probability(&user.probability)?;
            engine.add_user_percentage(UserType::new(&user.name, probability), user.percent)?;
        }

        for poi in &self.pois {
            let probability = ProbabilityMatrix::probability(&poi.probability)?;
            let built = PointOfInterest::around(
                engine.topology(),
                &poi.name,
                &poi.centers,
                poi.radius,
                probability,
                poi.max_distance,
            )
            .with_tags(poi.tags.iter().cloned());
            engine.add_poi(built);
        }

        Ok(engine)
    }
}
