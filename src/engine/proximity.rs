//! Simplified proximity-threshold grouping
//!
//! The lightweight strategy variant: greedy seed-and-sweep over a metric
//! similarity score. No datasets, no adaptive state; useful when the full
//! density engine is overkill or its inputs are unavailable.

use super::{GroupingResult, GroupingStrategy};
use crate::cluster::GroupPartition;
use crate::metrics::{MetricsSnapshot, NodeId, NodeMetrics};

pub struct ProximityGroupingEngine {
    /// Maximum members per group
    pub max_group_size: usize,

    /// Similarity score above which two nodes share a group
    pub similarity_threshold: f64,
}

impl Default for ProximityGroupingEngine {
    fn default() -> Self {
        Self {
            max_group_size: 4,
            similarity_threshold: -2.0,
        }
    }
}

impl ProximityGroupingEngine {
    pub fn new(max_group_size: usize, similarity_threshold: f64) -> Self {
        Self {
            max_group_size,
            similarity_threshold,
        }
    }

    /// Similarity score between two nodes; higher is more similar. Weighs
    /// density, link loss, centrality, and geographic distance when both
    /// nodes report a position.
    fn similarity(a: &NodeMetrics, b: &NodeMetrics) -> f64 {
        let mut score = 0.0;
        score -= (a.vehicle_density - b.vehicle_density).abs() / 10.0;
        score -= (a.avg_link_loss - b.avg_link_loss).abs() * 5.0;
        score -= (a.degree_centrality - b.degree_centrality).abs() * 3.0;

        if let (Some(pa), Some(pb)) = (a.position, b.position) {
            let distance_km = pa.distance_m(&pb) / 1000.0;
            score -= distance_km * 2.0;
        }

        score
    }
}

impl GroupingStrategy for ProximityGroupingEngine {
    fn form_groups(
        &mut self,
        metrics: &MetricsSnapshot,
        _current_time: Option<f64>,
    ) -> GroupingResult {
        if metrics.is_empty() {
            return GroupingResult::default();
        }

        let mut remaining: Vec<NodeId> = metrics.keys().copied().collect();
        remaining.sort();

        let mut ids = Vec::with_capacity(remaining.len());
        let mut labels = Vec::with_capacity(remaining.len());
        let mut group_id = 0;

        while !remaining.is_empty() {
            // Seed a new group with the first remaining node, then sweep the
            // rest for similar ones until the group is full
            let seed = remaining.remove(0);
            let mut group = vec![seed];

            let mut i = 0;
            while i < remaining.len() {
                if group.len() >= self.max_group_size {
                    break;
                }
                let candidate = remaining[i];
                if Self::similarity(&metrics[&seed], &metrics[&candidate])
                    > self.similarity_threshold
                {
                    group.push(candidate);
                    remaining.remove(i);
                } else {
                    i += 1;
                }
            }

            for id in group {
                ids.push(id);
                labels.push(group_id);
            }
            group_id += 1;
        }

        GroupingResult {
            partition: GroupPartition::from_labels(&ids, &labels),
            locations: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn node(density: f64, loss: f64, centrality: f64) -> NodeMetrics {
        NodeMetrics {
            vehicle_density: density,
            avg_link_loss: loss,
            degree_centrality: centrality,
            position: None,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let mut engine = ProximityGroupingEngine::default();
        assert!(engine.form_groups(&HashMap::new(), None).partition.is_empty());
    }

    #[test]
    fn test_similar_nodes_share_a_group() {
        let snapshot = HashMap::from([
            (NodeId::Numeric(0), node(10.0, 0.2, 0.7)),
            (NodeId::Numeric(1), node(11.0, 0.22, 0.68)),
            (NodeId::Numeric(2), node(80.0, 0.9, 0.1)),
        ]);

        let mut engine = ProximityGroupingEngine::default();
        let partition = engine.form_groups(&snapshot, None).partition;

        assert_eq!(
            partition.get(&NodeId::Numeric(0)),
            partition.get(&NodeId::Numeric(1))
        );
        assert_ne!(
            partition.get(&NodeId::Numeric(0)),
            partition.get(&NodeId::Numeric(2))
        );
    }

    #[test]
    fn test_group_size_cap() {
        let snapshot: MetricsSnapshot = (0..6)
            .map(|i| (NodeId::Numeric(i), node(10.0, 0.2, 0.7)))
            .collect();

        let mut engine = ProximityGroupingEngine::default();
        let partition = engine.form_groups(&snapshot, None).partition;

        let groups = partition.groups();
        assert_eq!(groups.len(), 2);
        // Identical nodes fill the first group to the cap, overflow seeds the
        // next one
        assert_eq!(groups[&0].len(), 4);
        assert_eq!(groups[&1].len(), 2);
    }

    #[test]
    fn test_deterministic_for_same_snapshot() {
        let snapshot: MetricsSnapshot = (0..5)
            .map(|i| (NodeId::Numeric(i), node(10.0 + i as f64, 0.2, 0.7)))
            .collect();

        let mut engine = ProximityGroupingEngine::default();
        let first = engine.form_groups(&snapshot, None).partition;
        let second = engine.form_groups(&snapshot, None).partition;
        assert_eq!(first, second);
    }
}
