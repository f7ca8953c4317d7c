//! Feature synthesis from heterogeneous metric sources
//!
//! Each node contributes `[vehicle_density, avg_link_loss,
//! degree_centrality]`, extended with a normalized mean-distance dimension
//! when the routing dataset is loaded and with a PDR-adjusted link-loss value
//! when the PDR series and a simulation time are available. Every per-node
//! resolution failure degrades to a neutral value; one bad node never blocks
//! grouping of the rest.

use crate::data::{DistanceMatrix, PdrSeries};
use crate::metrics::{NodeId, NodeMetrics};
use ndarray::{Array2, Axis};
use std::collections::HashMap;

/// Overlay handles and constants needed to build one batch of features
pub struct FeatureContext<'a> {
    /// Distance overlay; its presence adds the fourth feature dimension
    pub distance_matrix: Option<&'a DistanceMatrix>,

    /// PDR overlay; applied only when a current time is supplied
    pub pdr: Option<&'a PdrSeries>,

    /// Divisor for the mean-distance feature
    pub distance_norm: f64,
}

/// Mean distance from `id` to every other resolvable node in the batch.
///
/// None means the node's own row could not be resolved (the defaulted-value
/// case the caller logs); a batch with no resolvable peers yields 0.0.
fn mean_batch_distance(id: &NodeId, batch: &[NodeId], matrix: &DistanceMatrix) -> Option<f64> {
    let row = id.matrix_index().filter(|&r| r < matrix.len())?;

    let mut sum = 0.0;
    let mut count = 0usize;
    for other in batch {
        if other == id {
            continue;
        }
        if let Some(col) = other.matrix_index().filter(|&c| c < matrix.len()) {
            if let Some(d) = matrix.get(row, col) {
                sum += d;
                count += 1;
            }
        }
    }

    if count == 0 {
        Some(0.0)
    } else {
        Some(sum / count as f64)
    }
}

/// Build one node's feature vector
pub fn feature_vector(
    id: &NodeId,
    metrics: &NodeMetrics,
    batch: &[NodeId],
    ctx: &FeatureContext,
    current_time: Option<f64>,
) -> Vec<f64> {
    let mut features = vec![
        metrics.vehicle_density,
        metrics.avg_link_loss,
        metrics.degree_centrality,
    ];

    if let Some(matrix) = ctx.distance_matrix {
        let normalized = match mean_batch_distance(id, batch, matrix) {
            Some(d) => d / ctx.distance_norm,
            None => {
                log::debug!(
                    "node {} resolves to no distance row, defaulting distance feature",
                    id
                );
                0.0
            }
        };
        features.push(normalized);
    }

    if let (Some(series), Some(time)) = (ctx.pdr, current_time) {
        // High delivery ratio suppresses the link-loss signal
        let pdr = series.interpolate(time);
        features[1] = metrics.avg_link_loss * (1.0 - pdr);
    }

    features
}

/// Build the feature matrix for a batch, one row per id in the given order.
///
/// Ids missing from the metric map get an all-default record.
pub fn feature_matrix(
    ids: &[NodeId],
    metrics: &HashMap<NodeId, NodeMetrics>,
    ctx: &FeatureContext,
    current_time: Option<f64>,
) -> Array2<f64> {
    let width = if ctx.distance_matrix.is_some() { 4 } else { 3 };
    let default = NodeMetrics::default();

    let mut matrix = Array2::zeros((ids.len(), width));
    for (i, id) in ids.iter().enumerate() {
        let node_metrics = metrics.get(id).unwrap_or(&default);
        let row = feature_vector(id, node_metrics, ids, ctx, current_time);
        for (j, value) in row.into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }

    matrix
}

/// Rescale every dimension to zero mean and unit standard deviation across
/// the batch. A dimension with zero spread keeps divisor 1.0, so all its
/// centered values stay exactly zero.
pub fn normalize_features(mut features: Array2<f64>) -> Array2<f64> {
    if features.nrows() == 0 {
        return features;
    }

    let mean = match features.mean_axis(Axis(0)) {
        Some(mean) => mean,
        None => return features,
    };
    let mut std = features.std_axis(Axis(0), 0.0);
    std.mapv_inplace(|s| if s == 0.0 { 1.0 } else { s });

    for mut row in features.axis_iter_mut(Axis(0)) {
        row -= &mean;
        row /= &std;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DistanceRow;

    fn ctx<'a>(
        matrix: Option<&'a DistanceMatrix>,
        pdr: Option<&'a PdrSeries>,
    ) -> FeatureContext<'a> {
        FeatureContext {
            distance_matrix: matrix,
            pdr,
            distance_norm: 20.0,
        }
    }

    fn three_node_matrix() -> DistanceMatrix {
        let rows = vec![
            DistanceRow {
                id: NodeId::Letter('A'),
                location: "A".to_string(),
                distances: vec![0.0, 10.0, 20.0],
            },
            DistanceRow {
                id: NodeId::Letter('B'),
                location: "B".to_string(),
                distances: vec![10.0, 0.0, 30.0],
            },
            DistanceRow {
                id: NodeId::Letter('C'),
                location: "C".to_string(),
                distances: vec![20.0, 30.0, 0.0],
            },
        ];
        DistanceMatrix::from_rows(&rows).unwrap().0
    }

    fn metrics(density: f64, loss: f64, centrality: f64) -> NodeMetrics {
        NodeMetrics {
            vehicle_density: density,
            avg_link_loss: loss,
            degree_centrality: centrality,
            position: None,
        }
    }

    #[test]
    fn test_base_vector_without_overlays() {
        let v = feature_vector(
            &NodeId::Numeric(0),
            &metrics(12.0, 0.25, 0.6),
            &[NodeId::Numeric(0)],
            &ctx(None, None),
            None,
        );
        assert_eq!(v, vec![12.0, 0.25, 0.6]);
    }

    #[test]
    fn test_distance_dimension_appended_and_normalized() {
        let matrix = three_node_matrix();
        let batch = [NodeId::Letter('A'), NodeId::Letter('B'), NodeId::Letter('C')];
        let v = feature_vector(
            &NodeId::Letter('A'),
            &metrics(10.0, 0.2, 0.7),
            &batch,
            &ctx(Some(&matrix), None),
            None,
        );
        // mean(10, 20) / 20
        assert_eq!(v.len(), 4);
        assert!((v[3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unresolvable_row_defaults_to_zero() {
        let matrix = three_node_matrix();
        let batch = [NodeId::Letter('A'), NodeId::Letter('D')];
        // 'D' maps to row 3 of a 3-row matrix
        let v = feature_vector(
            &NodeId::Letter('D'),
            &metrics(10.0, 0.2, 0.7),
            &batch,
            &ctx(Some(&matrix), None),
            None,
        );
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn test_no_resolvable_peers_defaults_to_zero() {
        let matrix = three_node_matrix();
        // 'A' resolves but its only peers fall outside the matrix
        let batch = [NodeId::Letter('A'), NodeId::Letter('D'), NodeId::Letter('E')];
        let v = feature_vector(
            &NodeId::Letter('A'),
            &metrics(10.0, 0.2, 0.7),
            &batch,
            &ctx(Some(&matrix), None),
            None,
        );
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn test_pdr_replaces_link_loss_dimension() {
        let series = PdrSeries::from_rows(&[(0.0, 0.5), (10.0, 0.5)]).unwrap();
        let v = feature_vector(
            &NodeId::Numeric(0),
            &metrics(10.0, 0.4, 0.7),
            &[NodeId::Numeric(0)],
            &ctx(None, Some(&series)),
            Some(3.0),
        );
        // link_loss * (1 - pdr), still three dimensions
        assert_eq!(v.len(), 3);
        assert!((v[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_pdr_ignored_without_current_time() {
        let series = PdrSeries::from_rows(&[(0.0, 0.5), (10.0, 0.5)]).unwrap();
        let v = feature_vector(
            &NodeId::Numeric(0),
            &metrics(10.0, 0.4, 0.7),
            &[NodeId::Numeric(0)],
            &ctx(None, Some(&series)),
            None,
        );
        assert_eq!(v[1], 0.4);
    }

    #[test]
    fn test_missing_record_degrades_to_defaults() {
        let ids = [NodeId::Numeric(0), NodeId::Numeric(1)];
        let map = HashMap::from([(NodeId::Numeric(0), metrics(10.0, 0.2, 0.7))]);
        let matrix = feature_matrix(&ids, &map, &ctx(None, None), None);
        assert_eq!(matrix.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalizer_zero_mean_unit_std() {
        let features = ndarray::arr2(&[
            [10.0, 0.2, 0.7],
            [12.0, 0.25, 0.6],
            [14.0, 0.3, 0.5],
            [16.0, 0.35, 0.4],
            [18.0, 0.4, 0.3],
        ]);
        let normalized = normalize_features(features);

        for dim in 0..3 {
            let column = normalized.column(dim);
            let mean: f64 = column.iter().sum::<f64>() / column.len() as f64;
            let var: f64 =
                column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / column.len() as f64;
            assert!(mean.abs() < 1e-12, "dim {} mean {}", dim, mean);
            assert!((var.sqrt() - 1.0).abs() < 1e-12, "dim {} std {}", dim, var.sqrt());
        }
    }

    #[test]
    fn test_normalizer_zero_spread_dimension() {
        let features = ndarray::arr2(&[[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]]);
        let normalized = normalize_features(features);
        for v in normalized.column(0) {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn test_normalizer_empty_batch() {
        let features = Array2::<f64>::zeros((0, 3));
        let normalized = normalize_features(features);
        assert_eq!(normalized.nrows(), 0);
    }
}
