//! Grouping strategies over live metric snapshots
//!
//! Two strategy variants sit behind one interface: the density clustering
//! engine with dataset overlays and adaptive radius (the core), and a
//! lightweight proximity-threshold fallback.

pub mod proximity;

pub use proximity::ProximityGroupingEngine;

use crate::cluster::stability::{transfer_weight, AdaptiveState};
use crate::cluster::{dbscan, GroupPartition};
use crate::config::GroupingConfig;
use crate::data::{DistanceMatrix, LocationMapping, PdrSeries};
use crate::features::{self, FeatureContext};
use crate::metrics::{MetricsSnapshot, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

/// A grouping pass over one metric snapshot
pub trait GroupingStrategy {
    fn form_groups(
        &mut self,
        metrics: &MetricsSnapshot,
        current_time: Option<f64>,
    ) -> GroupingResult;
}

/// Assignments produced by one pass, annotated with location names for the
/// nodes a loaded mapping knows about
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupingResult {
    pub partition: GroupPartition,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub locations: BTreeMap<NodeId, String>,
}

/// Visualization-friendly view: group label to member list, with a parallel
/// location list per group when a mapping is loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupView {
    pub members: BTreeMap<i32, Vec<NodeId>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub locations: BTreeMap<i32, Vec<String>>,
}

/// Group a partition for display, resolving member locations through the
/// mapping with an `Unknown_<id>` fallback
pub fn group_view(partition: &GroupPartition, locations: &LocationMapping) -> GroupView {
    let mut members: BTreeMap<i32, Vec<NodeId>> = BTreeMap::new();
    for (id, label) in partition.iter() {
        members.entry(*label).or_default().push(*id);
    }

    let mut location_lists = BTreeMap::new();
    if !locations.is_empty() {
        for (label, ids) in &members {
            let names = ids
                .iter()
                .map(|id| {
                    locations
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| format!("Unknown_{}", id))
                })
                .collect();
            location_lists.insert(*label, names);
        }
    }

    GroupView {
        members,
        locations: location_lists,
    }
}

/// The core dynamic grouping engine: feature synthesis over the snapshot,
/// density clustering at the current adaptive radius, and stability tracking
/// across invocations.
pub struct DensityGroupingEngine {
    config: GroupingConfig,
    state: AdaptiveState,
    distance_matrix: Option<DistanceMatrix>,
    locations: LocationMapping,
    pdr: Option<PdrSeries>,
}

impl DensityGroupingEngine {
    pub fn new(config: GroupingConfig) -> Self {
        let state = AdaptiveState::new(config.eps);
        Self {
            config,
            state,
            distance_matrix: None,
            locations: LocationMapping::new(),
            pdr: None,
        }
    }

    /// Install the routing overlay, fully replacing any prior one
    pub fn set_distance_overlay(&mut self, matrix: DistanceMatrix, locations: LocationMapping) {
        log::info!("Installed distance overlay with {} rows", matrix.len());
        self.distance_matrix = Some(matrix);
        self.locations = locations;
    }

    /// Install the PDR overlay, fully replacing any prior one
    pub fn set_pdr_overlay(&mut self, series: PdrSeries) {
        log::info!("Installed PDR overlay spanning {:.1} s", series.max_time());
        self.pdr = Some(series);
    }

    /// Current clustering radius
    pub fn radius(&self) -> f64 {
        self.state.eps()
    }

    pub fn locations(&self) -> &LocationMapping {
        &self.locations
    }

    /// Blending weight for a node moving between the two groups, judged
    /// against the previous partition
    pub fn group_transfer_weight(&self, old_label: i32, new_label: i32) -> f64 {
        transfer_weight(old_label, new_label, self.state.previous())
    }

    /// Group view with location names resolved through the loaded mapping
    pub fn visualize_groups(&self, partition: &GroupPartition) -> GroupView {
        group_view(partition, &self.locations)
    }
}

impl GroupingStrategy for DensityGroupingEngine {
    fn form_groups(
        &mut self,
        metrics: &MetricsSnapshot,
        current_time: Option<f64>,
    ) -> GroupingResult {
        // An empty snapshot is not an error and leaves the state untouched
        if metrics.is_empty() {
            return GroupingResult::default();
        }

        let mut ids: Vec<NodeId> = metrics.keys().copied().collect();
        ids.sort();

        let ctx = FeatureContext {
            distance_matrix: self.distance_matrix.as_ref(),
            pdr: self.pdr.as_ref(),
            distance_norm: self.config.distance_norm,
        };
        let raw = features::feature_matrix(&ids, metrics, &ctx, current_time);
        let normalized = features::normalize_features(raw);

        let labels = dbscan::dbscan(&normalized, self.state.eps(), self.config.min_samples);
        let partition = GroupPartition::from_labels(&ids, &labels);
        log::debug!(
            "clustered {} nodes into {} groups ({} noise) at radius {:.4}",
            ids.len(),
            partition.group_count(),
            partition.noise_count(),
            self.state.eps()
        );

        self.state.observe(
            &partition,
            self.config.stability_threshold,
            self.config.eps_decay,
        );

        let locations: BTreeMap<NodeId, String> = ids
            .iter()
            .filter_map(|id| self.locations.get(id).map(|name| (*id, name.clone())))
            .collect();

        GroupingResult {
            partition,
            locations,
        }
    }
}
