use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ============================================================================
// Identifiers
// ============================================================================

/// External identifier of a topology node (street graph vertex or station site)
pub type NodeId = u64;

/// Dense index of a registered user type (registration order)
pub type UserId = usize;

/// Station node id → number of charging points
pub type CapacityMap = BTreeMap<NodeId, u32>;

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;

// ============================================================================
// Outcomes
// ============================================================================

/// Reason a driver event could not start a charging session
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FailureKind {
    /// Every charging point at the nearest station was taken
    Occupancy,
    /// Walk from the destination to the station was too long
    Distance,
}

/// Result of a single driver event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure(FailureKind),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(kind) => Some(*kind),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure(kind) => write!(f, "fail:{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_failure_kind_names() {
        assert_eq!(FailureKind::Occupancy.to_string(), "occupancy");
        assert_eq!(FailureKind::from_str("distance").unwrap(), FailureKind::Distance);
        assert!(FailureKind::from_str("weather").is_err());
        assert_eq!(FailureKind::iter().count(), 2);
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(Outcome::Success.is_success());
        assert_eq!(Outcome::Success.failure(), None);
        assert_eq!(
            Outcome::Failure(FailureKind::Distance).failure(),
            Some(FailureKind::Distance)
        );
        assert_eq!(Outcome::Failure(FailureKind::Occupancy).to_string(), "fail:occupancy");
    }
}
