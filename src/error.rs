use thiserror::Error;

use crate::simulation::engine::Phase;
use crate::simulation::trajectory::TrajectoryError;

/// Configuration errors, detected before a run starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Weekly input cannot be empty")]
    EmptyInput,
    #[error("Invalid weekly input shape: {0}")]
    InvalidShape(String),
    #[error("Weekly input is missing {slot} {index}")]
    MissingSlot { slot: &'static str, index: usize },
    #[error("Weekly input {slot} index {index} out of range (expected < {limit})")]
    SlotOutOfRange {
        slot: &'static str,
        index: usize,
        limit: usize,
    },
    #[error("Invalid probability {value} at day {day}, hour {hour}")]
    InvalidProbability { day: usize, hour: usize, value: f64 },
    #[error("Participation must be a whole percentage, got {0}")]
    FractionalParticipation(f64),
    #[error("Total participation cannot exceed 100%: {total}% registered, {requested}% requested")]
    ParticipationOverflow { total: u32, requested: u32 },
    #[error("User participation adds up to {0}%, expected 100%")]
    IncompleteParticipation(u32),
    #[error("Unknown normalization mode: {0}")]
    UnknownNormalization(String),
    #[error("No driver schedule configured")]
    MissingDrivers,
    #[error("No charging station capacities available")]
    MissingCapacity,
    #[error("Topology provides no nodes")]
    NoNodes,
    #[error("Trial limit must be at least 1")]
    ZeroTrials,
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ConfigError::Validation(errors.to_string())
    }
}

/// Errors surfaced by a simulation run
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Cannot move simulation from {current:?} to {requested:?}")]
    InvalidPhase { current: Phase, requested: Phase },
    #[error("Hour slot out of range: day {day}, hour {hour}")]
    SlotOutOfRange { day: usize, hour: usize },
}
