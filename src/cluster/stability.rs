//! Temporal stability tracking and group transfer weights
//!
//! Grouping is meant to be sticky across invocations: when membership churns
//! heavily between consecutive partitions, the clustering radius is tightened
//! so later passes form smaller, steadier groups. The radius only ever
//! shrinks; there is no automatic re-growth path.

use super::{GroupPartition, NOISE_LABEL};
use crate::metrics::NodeId;
use statrs::statistics::Statistics;
use std::collections::BTreeSet;

/// Jaccard similarity of two member sets, 0.0 when either is empty
pub fn jaccard(a: &BTreeSet<NodeId>, b: &BTreeSet<NodeId>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Clustering radius plus the single retained previous partition.
///
/// Mutated only by `observe` after a clustering pass; the radius stays
/// positive and never grows.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    eps: f64,
    previous: Option<GroupPartition>,
}

impl AdaptiveState {
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            previous: None,
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn previous(&self) -> Option<&GroupPartition> {
        self.previous.as_ref()
    }

    /// Stability of a new partition against the retained previous one: every
    /// non-noise new group takes its best Jaccard similarity against all
    /// previous groups (noise group included on that side), and the maxima
    /// are averaged. None when there is nothing to compare.
    pub fn stability_score(&self, partition: &GroupPartition) -> Option<f64> {
        let previous = self.previous.as_ref()?;
        let prev_groups = previous.groups();

        let scores: Vec<f64> = partition
            .groups()
            .iter()
            .filter(|(&label, _)| label != NOISE_LABEL)
            .map(|(_, members)| {
                prev_groups
                    .values()
                    .map(|prev| jaccard(members, prev))
                    .fold(0.0, f64::max)
            })
            .collect();

        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().mean())
        }
    }

    /// Fold a new partition into the state: tighten the radius when group
    /// membership churned, then retain the partition for the next pass
    pub fn observe(&mut self, partition: &GroupPartition, threshold: f64, decay: f64) {
        if let Some(score) = self.stability_score(partition) {
            if score < threshold {
                let next = self.eps * decay;
                log::info!(
                    "stability {:.3} below {:.2}, tightening radius {:.4} -> {:.4}",
                    score,
                    threshold,
                    self.eps,
                    next
                );
                self.eps = next;
            }
        }
        self.previous = Some(partition.clone());
    }
}

/// Blending weight in [0.3, 1.0] for a node moving between groups across
/// invocations, derived from how much the two groups overlapped in the
/// previous partition. Defaults to 0.5 when no previous partition exists.
pub fn transfer_weight(old_label: i32, new_label: i32, previous: Option<&GroupPartition>) -> f64 {
    let previous = match previous {
        Some(partition) => partition,
        None => return 0.5,
    };

    let groups = previous.groups();
    let empty = BTreeSet::new();
    let old_members = groups.get(&old_label).unwrap_or(&empty);
    let new_members = groups.get(&new_label).unwrap_or(&empty);

    0.3 + 0.7 * jaccard(old_members, new_members)
}
