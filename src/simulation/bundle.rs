//! Finished output of a simulation run, and its on-disk form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::trajectory::{TrajectoryError, TrajectoryStore};
use crate::domain::{CapacityMap, NodeId, Outcome, UserId};
use crate::error::SimulationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Recorded (production) weeks
    pub weeks: u32,
    pub equilibration_weeks: u32,
    pub trials: u32,
    pub seed: Option<u64>,
    /// Capacity the run started with
    pub capacity: CapacityMap,
    /// User type names in registration order
    pub users: Vec<String>,
}

impl RunMetadata {
    pub fn new(
        weeks: u32,
        equilibration_weeks: u32,
        trials: u32,
        seed: Option<u64>,
        capacity: CapacityMap,
        users: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            weeks,
            equilibration_weeks,
            trials,
            seed,
            capacity,
            users,
        }
    }
}

/// Trajectory stores of a run plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryBundle {
    pub metadata: RunMetadata,
    /// Outcomes keyed by destination node
    pub nodes: TrajectoryStore,
    /// Outcomes keyed by the station that served (or turned away) the driver
    pub stations: TrajectoryStore,
    /// Walking distances keyed by station, summed per outcome
    pub distances: Option<TrajectoryStore>,
}

impl TrajectoryBundle {
    pub fn new(
        metadata: RunMetadata,
        nodes: TrajectoryStore,
        stations: TrajectoryStore,
        distances: Option<TrajectoryStore>,
    ) -> Self {
        Self {
            metadata,
            nodes,
            stations,
            distances,
        }
    }

    /// Record one driver event in every store
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        station: NodeId,
        user: UserId,
        outcome: Outcome,
        distance: f64,
    ) -> Result<(), TrajectoryError> {
        self.nodes.accumulate(day, hour, node, user, outcome, 1.0)?;
        self.stations.accumulate(day, hour, station, user, outcome, 1.0)?;
        if let Some(distances) = self.distances.as_mut() {
            distances.accumulate(day, hour, station, user, outcome, distance)?;
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimulationError> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        info!(path = %path.display(), run = %self.metadata.id, "Saved trajectory bundle");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(bincode::deserialize_from(reader)?)
    }
}
