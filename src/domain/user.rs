use serde::{Deserialize, Serialize};
use tracing::warn;

use super::probability::ProbabilityMatrix;
use super::types::UserId;
use crate::error::ConfigError;

/// Registry weights must add up to this before a run may start
pub const FULL_PARTICIPATION: u32 = 100;

/// A class of drivers sharing one hourly activity profile.
///
/// `probability` is the chance that a member starts a trip in a given hour; its
/// complement is the chance that a parked member leaves the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserType {
    pub name: String,
    pub probability: ProbabilityMatrix,
}

impl UserType {
    pub fn new(name: impl Into<String>, probability: ProbabilityMatrix) -> Self {
        Self {
            name: name.into(),
            probability,
        }
    }

    pub fn p_hour(&self, day: usize, hour: usize) -> f64 {
        self.probability.get(day, hour)
    }
}

#[derive(Debug, Clone)]
struct Registration {
    user: UserType,
    percent: u32,
}

/// User types taking part in a simulation, with their share of drivers
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    registrations: Vec<Registration>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user type with a whole-percent share of all drivers.
    ///
    /// Rejected registrations leave the registry untouched.
    pub fn add(&mut self, user: UserType, percent: u32) -> Result<UserId, ConfigError> {
        let total = self.total_percent();
        if total
            .checked_add(percent)
            .map_or(true, |sum| sum > FULL_PARTICIPATION)
        {
            warn!(
                user = %user.name,
                total,
                requested = percent,
                "Rejected user type: participation would exceed 100%"
            );
            return Err(ConfigError::ParticipationOverflow {
                total,
                requested: percent,
            });
        }

        self.registrations.push(Registration { user, percent });
        Ok(self.registrations.len() - 1)
    }

    /// Same as [`UserRegistry::add`] for shares read from loosely typed input
    pub fn add_percentage(&mut self, user: UserType, percent: f64) -> Result<UserId, ConfigError> {
        if !percent.is_finite() || percent < 0.0 || percent.fract() != 0.0 {
            warn!(user = %user.name, percent, "Rejected user type: share must be a whole percentage");
            return Err(ConfigError::FractionalParticipation(percent));
        }
        if percent > f64::from(FULL_PARTICIPATION) {
            warn!(user = %user.name, percent, "Rejected user type: participation would exceed 100%");
            return Err(ConfigError::ParticipationOverflow {
                total: self.total_percent(),
                requested: percent as u32,
            });
        }
        self.add(user, percent as u32)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn get(&self, id: UserId) -> Option<&UserType> {
        self.registrations.get(id).map(|r| &r.user)
    }

    pub fn percent(&self, id: UserId) -> Option<u32> {
        self.registrations.get(id).map(|r| r.percent)
    }

    pub fn total_percent(&self) -> u32 {
        self.registrations
            .iter()
            .fold(0u32, |total, r| total.saturating_add(r.percent))
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, &UserType)> {
        self.registrations.iter().map(|r| &r.user).enumerate()
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|(_, user)| user.name.clone()).collect()
    }

    /// Activity probability of a registered user type; 0 for unknown ids
    pub fn p_hour(&self, id: UserId, day: usize, hour: usize) -> f64 {
        self.get(id).map_or(0.0, |user| user.p_hour(day, hour))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.total_percent() {
            FULL_PARTICIPATION => Ok(()),
            total => Err(ConfigError::IncompleteParticipation(total)),
        }
    }

    /// Every user id repeated once per percentage point, so a uniform pick from
    /// the list is a draw weighted by participation.
    pub fn lottery(&self) -> Vec<UserId> {
        self.registrations
            .iter()
            .enumerate()
            .flat_map(|(id, r)| std::iter::repeat(id).take(r.percent as usize))
            .collect()
    }
}
