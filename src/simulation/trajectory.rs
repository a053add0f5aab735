//! # Trajectory Store
//!
//! Dense statistics of a simulation run: for every (day, hour, node, user type)
//! one success cell and one cell per failure kind. Cells are plain `f64`
//! accumulators, so the same layout counts events or sums walking distances,
//! depending on which operations the owner calls.
//!
//! The five dimensions live in one flat buffer. Offsets are computed by a single
//! private function, day-major, then hour, node, outcome block and user:
//!
//! ```text
//! ((day * hours + hour) * nodes + node) * users * (1 + failures)
//!     + block(outcome) * users + user
//! ```
//!
//! with `block(success) = 0` and `block(kind) = 1 + position(kind)`.

use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::domain::{FailureKind, NodeId, Outcome, UserId, DAYS_PER_WEEK, HOURS_PER_DAY};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("Unknown node id {0}")]
    UnknownNode(NodeId),
    #[error("Failure kind '{0}' is not tracked by this store")]
    UnknownFailure(FailureKind),
    #[error("{dimension} index {index} out of range (size {size})")]
    OutOfRange {
        dimension: &'static str,
        index: usize,
        size: usize,
    },
}

/// Totals of one node over an extraction window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSummary {
    pub success: f64,
    pub fail: BTreeMap<FailureKind, f64>,
}

impl NodeSummary {
    pub fn failure(&self, kind: FailureKind) -> f64 {
        self.fail.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn total_failures(&self) -> f64 {
        self.fail.values().sum()
    }

    pub fn total(&self) -> f64 {
        self.success + self.total_failures()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStore {
    num_days: usize,
    num_hours: usize,
    num_nodes: usize,
    num_users: usize,
    failures: Vec<FailureKind>,
    /// Dense index → external node id
    node_keys: Vec<NodeId>,
    /// External node id → dense index; empty when ids are already dense
    node_index: HashMap<NodeId, usize>,
    cells: Vec<f64>,
}

impl TrajectoryStore {
    /// One week of hourly cells for dense node ids `0..num_nodes`
    pub fn new(num_nodes: usize, num_users: usize, failures: Vec<FailureKind>) -> Self {
        Self::with_dimensions(DAYS_PER_WEEK, HOURS_PER_DAY, num_nodes, num_users, failures, None)
    }

    /// One week of hourly cells for arbitrary node ids. Duplicate ids keep their
    /// first position.
    pub fn for_nodes<I>(nodes: I, num_users: usize, failures: Vec<FailureKind>) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let keys: Vec<NodeId> = nodes.into_iter().unique().collect();
        Self::with_dimensions(
            DAYS_PER_WEEK,
            HOURS_PER_DAY,
            keys.len(),
            num_users,
            failures,
            Some(keys),
        )
    }

    /// Fully specified allocation. When `node_keys` is given it defines the node
    /// dimension and `num_nodes` is ignored.
    pub fn with_dimensions(
        num_days: usize,
        num_hours: usize,
        num_nodes: usize,
        num_users: usize,
        failures: Vec<FailureKind>,
        node_keys: Option<Vec<NodeId>>,
    ) -> Self {
        let (node_keys, node_index, num_nodes) = match node_keys {
            Some(keys) => {
                let index = keys.iter().enumerate().map(|(i, node)| (*node, i)).collect();
                let len = keys.len();
                (keys, index, len)
            }
            None => ((0..num_nodes as NodeId).collect(), HashMap::new(), num_nodes),
        };
        let size = num_days * num_hours * num_nodes * num_users * (1 + failures.len());
        Self {
            num_days,
            num_hours,
            num_nodes,
            num_users,
            failures,
            node_keys,
            node_index,
            cells: vec![0.0; size],
        }
    }

    pub fn num_days(&self) -> usize {
        self.num_days
    }

    pub fn num_hours(&self) -> usize {
        self.num_hours
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn failures(&self) -> &[FailureKind] {
        &self.failures
    }

    pub fn node_keys(&self) -> &[NodeId] {
        &self.node_keys
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn dense_node(&self, node: NodeId) -> Result<usize, TrajectoryError> {
        if self.node_index.is_empty() {
            usize::try_from(node)
                .ok()
                .filter(|dense| *dense < self.num_nodes)
                .ok_or(TrajectoryError::UnknownNode(node))
        } else {
            self.node_index
                .get(&node)
                .copied()
                .ok_or(TrajectoryError::UnknownNode(node))
        }
    }

    fn block(&self, outcome: Outcome) -> Result<usize, TrajectoryError> {
        match outcome {
            Outcome::Success => Ok(0),
            Outcome::Failure(kind) => self
                .failures
                .iter()
                .position(|tracked| *tracked == kind)
                .map(|position| position + 1)
                .ok_or(TrajectoryError::UnknownFailure(kind)),
        }
    }

    pub(crate) fn index(
        &self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        outcome: Outcome,
    ) -> Result<usize, TrajectoryError> {
        check("day", day, self.num_days)?;
        check("hour", hour, self.num_hours)?;
        check("user", user, self.num_users)?;
        let node = self.dense_node(node)?;
        let block = self.block(outcome)?;
        let stride = self.num_users * (1 + self.failures.len());

        Ok(((day * self.num_hours + hour) * self.num_nodes + node) * stride
            + block * self.num_users
            + user)
    }

    fn cell_mut(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        outcome: Outcome,
    ) -> Result<&mut f64, TrajectoryError> {
        let index = self.index(day, hour, node, user, outcome)?;
        Ok(&mut self.cells[index])
    }

    /// Add `amount` to the cell of `outcome`
    pub fn accumulate(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        outcome: Outcome,
        amount: f64,
    ) -> Result<(), TrajectoryError> {
        *self.cell_mut(day, hour, node, user, outcome)? += amount;
        Ok(())
    }

    pub fn get(
        &self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        outcome: Outcome,
    ) -> Result<f64, TrajectoryError> {
        Ok(self.cells[self.index(day, hour, node, user, outcome)?])
    }

    pub fn set(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        outcome: Outcome,
        value: f64,
    ) -> Result<(), TrajectoryError> {
        *self.cell_mut(day, hour, node, user, outcome)? = value;
        Ok(())
    }

    pub fn add_success(&mut self, day: usize, hour: usize, node: NodeId, user: UserId) -> Result<(), TrajectoryError> {
        self.accumulate(day, hour, node, user, Outcome::Success, 1.0)
    }

    pub fn add_success_distance(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        distance: f64,
    ) -> Result<(), TrajectoryError> {
        self.accumulate(day, hour, node, user, Outcome::Success, distance)
    }

    pub fn add_fail(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        kind: FailureKind,
    ) -> Result<(), TrajectoryError> {
        self.accumulate(day, hour, node, user, Outcome::Failure(kind), 1.0)
    }

    pub fn add_fail_distance(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        kind: FailureKind,
        distance: f64,
    ) -> Result<(), TrajectoryError> {
        self.accumulate(day, hour, node, user, Outcome::Failure(kind), distance)
    }

    pub fn get_success(&self, day: usize, hour: usize, node: NodeId, user: UserId) -> Result<f64, TrajectoryError> {
        self.get(day, hour, node, user, Outcome::Success)
    }

    pub fn get_fail(
        &self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        kind: FailureKind,
    ) -> Result<f64, TrajectoryError> {
        self.get(day, hour, node, user, Outcome::Failure(kind))
    }

    pub fn set_success(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        value: f64,
    ) -> Result<(), TrajectoryError> {
        self.set(day, hour, node, user, Outcome::Success, value)
    }

    pub fn set_fail(
        &mut self,
        day: usize,
        hour: usize,
        node: NodeId,
        user: UserId,
        kind: FailureKind,
        value: f64,
    ) -> Result<(), TrajectoryError> {
        self.set(day, hour, node, user, Outcome::Failure(kind), value)
    }

    /// Sum successes and failures of every node over the given days, hours and
    /// user types. With `normalize`, values become shares of the node's total
    /// (all zero for a node without events).
    pub fn extract(
        &self,
        days: &[usize],
        hours: &[usize],
        users: &[UserId],
        normalize: bool,
    ) -> Result<BTreeMap<NodeId, NodeSummary>, TrajectoryError> {
        let mut nodes = BTreeMap::new();

        for &node in &self.node_keys {
            let mut summary = NodeSummary {
                success: 0.0,
                fail: self.failures.iter().map(|kind| (*kind, 0.0)).collect(),
            };

            for (&day, &hour, &user) in iproduct!(days, hours, users) {
                summary.success += self.get_success(day, hour, node, user)?;
                for &kind in &self.failures {
                    *summary.fail.entry(kind).or_insert(0.0) += self.get_fail(day, hour, node, user, kind)?;
                }
            }

            if normalize {
                let total = summary.total();
                let share = |value: f64| if total > 0.0 { value / total } else { 0.0 };
                summary.success = share(summary.success);
                for value in summary.fail.values_mut() {
                    *value = share(*value);
                }
            }

            nodes.insert(node, summary);
        }

        Ok(nodes)
    }

    /// [`TrajectoryStore::extract`] over every day, hour and user type
    pub fn extract_all(&self, normalize: bool) -> Result<BTreeMap<NodeId, NodeSummary>, TrajectoryError> {
        let days: Vec<usize> = (0..self.num_days).collect();
        let hours: Vec<usize> = (0..self.num_hours).collect();
        let users: Vec<UserId> = (0..self.num_users).collect();
        self.extract(&days, &hours, &users, normalize)
    }
}

fn check(dimension: &'static str, index: usize, size: usize) -> Result<(), TrajectoryError> {
    if index < size {
        Ok(())
    } else {
        Err(TrajectoryError::OutOfRange {
            dimension,
            index,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const KINDS: [FailureKind; 2] = [FailureKind::Occupancy, FailureKind::Distance];

    fn outcomes(store: &TrajectoryStore) -> Vec<Outcome> {
        std::iter::once(Outcome::Success)
            .chain(store.failures().iter().map(|kind| Outcome::Failure(*kind)))
            .collect()
    }

    proptest! {
        #[test]
        fn index_is_injective_and_in_bounds(
            days in 1usize..4,
            hours in 1usize..5,
            nodes in 1usize..5,
            users in 1usize..4,
            kinds in 0usize..=2,
        ) {
            let store = TrajectoryStore::with_dimensions(days, hours, nodes, users, KINDS[..kinds].to_vec(), None);
            let mut seen = HashSet::new();
            for (day, hour, node, user) in iproduct!(0..days, 0..hours, 0..nodes, 0..users) {
                for outcome in outcomes(&store) {
                    let index = store.index(day, hour, node as NodeId, user, outcome).unwrap();
                    prop_assert!(index < store.len());
                    prop_assert!(seen.insert(index));
                }
            }
            prop_assert_eq!(seen.len(), store.len());
        }
    }

    #[test]
    fn test_index_layout() {
        let store = TrajectoryStore::new(3, 2, KINDS.to_vec());
        // stride = 2 users * 3 blocks
        assert_eq!(store.index(0, 0, 0, 0, Outcome::Success).unwrap(), 0);
        assert_eq!(store.index(0, 0, 0, 1, Outcome::Success).unwrap(), 1);
        assert_eq!(store.index(0, 0, 0, 0, Outcome::Failure(FailureKind::Occupancy)).unwrap(), 2);
        assert_eq!(store.index(0, 0, 0, 1, Outcome::Failure(FailureKind::Distance)).unwrap(), 5);
        assert_eq!(store.index(0, 0, 1, 0, Outcome::Success).unwrap(), 6);
        assert_eq!(store.index(0, 1, 0, 0, Outcome::Success).unwrap(), 18);
        assert_eq!(store.index(1, 0, 0, 0, Outcome::Success).unwrap(), 24 * 18);
        assert_eq!(store.len(), 7 * 24 * 18);
    }

    #[test]
    fn test_accumulate_and_read_agree() {
        let mut store = TrajectoryStore::for_nodes([501, 77, 9000], 2, KINDS.to_vec());
        store.add_success(2, 13, 77, 1).unwrap();
        store.add_success(2, 13, 77, 1).unwrap();
        store.add_fail(2, 13, 77, 1, FailureKind::Distance).unwrap();
        store.add_fail_distance(2, 13, 77, 1, FailureKind::Distance, 120.5).unwrap();
        store.add_success_distance(0, 0, 9000, 0, 80.0).unwrap();

        assert_eq!(store.get_success(2, 13, 77, 1).unwrap(), 2.0);
        assert_eq!(store.get_fail(2, 13, 77, 1, FailureKind::Distance).unwrap(), 121.5);
        assert_eq!(store.get_fail(2, 13, 77, 1, FailureKind::Occupancy).unwrap(), 0.0);
        assert_eq!(store.get_success(0, 0, 9000, 0).unwrap(), 80.0);
        assert_eq!(store.get_success(2, 13, 501, 1).unwrap(), 0.0);

        store.set_success(2, 13, 77, 1, 42.0).unwrap();
        assert_eq!(store.get_success(2, 13, 77, 1).unwrap(), 42.0);
        store.set_fail(1, 1, 501, 0, FailureKind::Occupancy, 3.0).unwrap();
        assert_eq!(store.get_fail(1, 1, 501, 0, FailureKind::Occupancy).unwrap(), 3.0);
    }

    #[test]
    fn test_invalid_keys_are_reported() {
        let mut store = TrajectoryStore::for_nodes([10, 20], 1, vec![FailureKind::Occupancy]);
        assert_eq!(store.add_success(0, 0, 30, 0), Err(TrajectoryError::UnknownNode(30)));
        assert_eq!(
            store.add_fail(0, 0, 10, 0, FailureKind::Distance),
            Err(TrajectoryError::UnknownFailure(FailureKind::Distance))
        );
        assert_eq!(
            store.get_success(7, 0, 10, 0),
            Err(TrajectoryError::OutOfRange {
                dimension: "day",
                index: 7,
                size: 7
            })
        );
        assert!(store.get_success(0, 0, 10, 1).is_err());

        let deduped = TrajectoryStore::for_nodes([4, 8, 4, 2, 8], 1, Vec::new());
        assert_eq!(deduped.node_keys(), &[4, 8, 2]);
        assert_eq!(deduped.num_nodes(), 3);

        let dense = TrajectoryStore::new(2, 1, Vec::new());
        assert_eq!(dense.get_success(0, 0, 2, 0), Err(TrajectoryError::UnknownNode(2)));
        assert_eq!(dense.node_keys(), &[0, 1]);
    }

    #[test]
    fn test_extract_sums_selected_window() {
        let mut store = TrajectoryStore::for_nodes([5, 6], 2, KINDS.to_vec());
        store.add_success(0, 8, 5, 0).unwrap();
        store.add_success(1, 8, 5, 1).unwrap();
        store.add_fail(1, 9, 5, 0, FailureKind::Occupancy).unwrap();
        store.add_fail(3, 9, 5, 0, FailureKind::Occupancy).unwrap();

        let all = store.extract_all(false).unwrap();
        assert_eq!(all[&5].success, 2.0);
        assert_eq!(all[&5].failure(FailureKind::Occupancy), 2.0);
        assert_eq!(all[&5].failure(FailureKind::Distance), 0.0);
        assert_eq!(all[&6].total(), 0.0);

        let monday_user0 = store.extract(&[0, 1], &[8, 9], &[0], false).unwrap();
        assert_eq!(monday_user0[&5].success, 1.0);
        assert_eq!(monday_user0[&5].failure(FailureKind::Occupancy), 1.0);
    }

    #[test]
    fn test_normalized_extract_sums_to_one() {
        let mut store = TrajectoryStore::for_nodes([5, 6], 1, KINDS.to_vec());
        for _ in 0..3 {
            store.add_success(4, 17, 5, 0).unwrap();
        }
        store.add_fail(4, 17, 5, 0, FailureKind::Occupancy).unwrap();

        let shares = store.extract_all(true).unwrap();
        let active = &shares[&5];
        assert!((active.total() - 1.0).abs() < 1e-12);
        assert!((active.success - 0.75).abs() < 1e-12);
        assert!((active.failure(FailureKind::Occupancy) - 0.25).abs() < 1e-12);

        let idle = &shares[&6];
        assert_eq!(idle.success, 0.0);
        assert!(idle.fail.values().all(|value| *value == 0.0));
    }
}
