//! Cluster partition types and algorithms

pub mod dbscan;
pub mod stability;

use crate::metrics::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Reserved label for nodes assigned to no group
pub const NOISE_LABEL: i32 = -1;

/// One invocation's node-to-group assignment.
///
/// Backed by an ordered map so iteration, serialization, and comparisons are
/// deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPartition {
    assignments: BTreeMap<NodeId, i32>,
}

impl GroupPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip ids and labels into a partition; both slices are aligned by the
    /// batch ordering used for clustering
    pub fn from_labels(ids: &[NodeId], labels: &[i32]) -> Self {
        Self {
            assignments: ids.iter().copied().zip(labels.iter().copied()).collect(),
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<i32> {
        self.assignments.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &i32)> {
        self.assignments.iter()
    }

    /// Group the partition by label, noise included as its own group
    pub fn groups(&self) -> BTreeMap<i32, BTreeSet<NodeId>> {
        let mut groups: BTreeMap<i32, BTreeSet<NodeId>> = BTreeMap::new();
        for (&id, &label) in &self.assignments {
            groups.entry(label).or_default().insert(id);
        }
        groups
    }

    /// Number of distinct non-noise groups
    pub fn group_count(&self) -> usize {
        self.groups().keys().filter(|&&label| label != NOISE_LABEL).count()
    }

    /// Number of nodes carrying the noise label
    pub fn noise_count(&self) -> usize {
        self.assignments
            .values()
            .filter(|&&label| label == NOISE_LABEL)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_groups_by_label() {
        let ids = [
            NodeId::Numeric(0),
            NodeId::Numeric(1),
            NodeId::Numeric(2),
            NodeId::Letter('A'),
        ];
        let labels = [0, 0, NOISE_LABEL, 1];
        let partition = GroupPartition::from_labels(&ids, &labels);

        let groups = partition.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&0].len(), 2);
        assert_eq!(groups[&NOISE_LABEL].len(), 1);
        assert_eq!(partition.group_count(), 2);
        assert_eq!(partition.noise_count(), 1);
    }

    #[test]
    fn test_partition_serializes_with_string_keys() {
        let partition = GroupPartition::from_labels(&[NodeId::Letter('A')], &[0]);
        let json = serde_json::to_string(&partition).unwrap();
        assert!(json.contains("\"A\":0"), "got {}", json);

        let back: GroupPartition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, partition);
    }
}
