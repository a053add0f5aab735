//! Charging station occupancy simulation.
//!
//! A Monte Carlo model of drivers choosing destinations and charging stations
//! hour by hour, followed by capacity recommendations derived from the recorded
//! failures.

pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod simulation;
pub mod telemetry;
pub mod topology;
