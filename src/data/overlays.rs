//! In-memory shapes of the historical-context datasets
//!
//! Both overlays are loaded once, are read-only afterward, and are fully
//! replaced on reload. They enrich the feature vectors when present; the
//! engine runs fine without them.

use crate::metrics::{NodeId, ParseNodeIdError};
use ndarray::Array2;
use std::collections::HashMap;
use thiserror::Error;

/// Failure while loading or assembling a dataset overlay.
///
/// This is the one error class that propagates to the caller: dataset
/// problems are configuration-time problems, not per-request ones.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {0}")]
    FileNotFound(String),

    #[error("required column missing: {0}")]
    MissingColumn(String),

    #[error("dataset is empty")]
    Empty,

    #[error("distance row for {id} has {got} entries, expected {expected}")]
    RaggedRow {
        id: NodeId,
        got: usize,
        expected: usize,
    },

    #[error("PDR series times must be strictly increasing")]
    NonMonotonic,

    #[error("PDR series spans no time")]
    EmptySpan,

    #[error("invalid node id in dataset: {0}")]
    BadNodeId(#[from] ParseNodeIdError),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Node id to human-readable location name
pub type LocationMapping = HashMap<NodeId, String>;

/// One row of the routing dataset: a node, its location name, and its
/// distance to every node in the dataset (self included)
#[derive(Debug, Clone)]
pub struct DistanceRow {
    pub id: NodeId,
    pub location: String,
    pub distances: Vec<f64>,
}

/// Symmetric inter-node distance table indexed by matrix row.
///
/// Rows are addressed through `NodeId::matrix_index`; lookups outside the
/// table return None and the caller degrades to a neutral feature.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    inner: Array2<f64>,
}

impl DistanceMatrix {
    /// Build the matrix and location mapping from loader rows, averaging any
    /// asymmetric pair into a symmetric one
    pub fn from_rows(rows: &[DistanceRow]) -> Result<(Self, LocationMapping), DatasetError> {
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        let n = rows.len();
        let mut inner = Array2::zeros((n, n));
        let mut locations = LocationMapping::with_capacity(n);

        for (i, row) in rows.iter().enumerate() {
            if row.distances.len() != n {
                return Err(DatasetError::RaggedRow {
                    id: row.id,
                    got: row.distances.len(),
                    expected: n,
                });
            }
            for (j, &d) in row.distances.iter().enumerate() {
                inner[[i, j]] = d;
            }
            locations.insert(row.id, row.location.clone());
        }

        // Symmetrize: undirected distances, averaged where the file disagrees
        for i in 0..n {
            for j in (i + 1)..n {
                let avg = (inner[[i, j]] + inner[[j, i]]) / 2.0;
                inner[[i, j]] = avg;
                inner[[j, i]] = avg;
            }
        }

        Ok((Self { inner }, locations))
    }

    /// Number of rows (== columns)
    pub fn len(&self) -> usize {
        self.inner.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance between two rows, None when either index is out of range
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.inner.get([i, j]).copied()
    }
}

/// Packet-delivery-ratio over time, queried by linear interpolation.
///
/// Query times wrap modulo the series' span, so a long-running simulation
/// keeps cycling through the recorded trace.
#[derive(Debug, Clone, PartialEq)]
pub struct PdrSeries {
    points: Vec<(f64, f64)>,
}

impl PdrSeries {
    /// Build a series from (time_offset, pdr) pairs; times must be strictly
    /// increasing and span a positive interval
    pub fn from_rows(rows: &[(f64, f64)]) -> Result<Self, DatasetError> {
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        if rows.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(DatasetError::NonMonotonic);
        }
        if rows[rows.len() - 1].0 <= 0.0 {
            return Err(DatasetError::EmptySpan);
        }

        Ok(Self {
            points: rows.to_vec(),
        })
    }

    /// Largest time offset in the series
    pub fn max_time(&self) -> f64 {
        self.points[self.points.len() - 1].0
    }

    /// PDR at the given time, wrapped into the series span and clamped at
    /// the series ends
    pub fn interpolate(&self, time: f64) -> f64 {
        let span = self.max_time();
        let mut t = time % span;
        if t < 0.0 {
            t += span;
        }

        let idx = self.points.partition_point(|&(pt, _)| pt < t);
        if idx == 0 {
            return self.points[0].1;
        }
        if idx >= self.points.len() {
            return self.points[self.points.len() - 1].1;
        }

        let (t0, v0) = self.points[idx - 1];
        let (t1, v1) = self.points[idx];
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<DistanceRow> {
        vec![
            DistanceRow {
                id: NodeId::Letter('A'),
                location: "Connaught Place".to_string(),
                distances: vec![0.0, 4.0, 8.0],
            },
            DistanceRow {
                id: NodeId::Letter('B'),
                location: "Karol Bagh".to_string(),
                distances: vec![6.0, 0.0, 3.0],
            },
            DistanceRow {
                id: NodeId::Letter('C'),
                location: "Saket".to_string(),
                distances: vec![8.0, 3.0, 0.0],
            },
        ]
    }

    #[test]
    fn test_distance_matrix_symmetrized() {
        let (matrix, _) = DistanceMatrix::from_rows(&sample_rows()).unwrap();
        // Asymmetric A-B pair (4 vs 6) averages to 5
        assert_eq!(matrix.get(0, 1), Some(5.0));
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_distance_matrix_out_of_range_lookup() {
        let (matrix, _) = DistanceMatrix::from_rows(&sample_rows()).unwrap();
        assert_eq!(matrix.get(0, 3), None);
        assert_eq!(matrix.get(3, 0), None);
    }

    #[test]
    fn test_location_mapping_built_from_rows() {
        let (_, locations) = DistanceMatrix::from_rows(&sample_rows()).unwrap();
        assert_eq!(
            locations.get(&NodeId::Letter('B')).map(String::as_str),
            Some("Karol Bagh")
        );
    }

    #[test]
    fn test_distance_matrix_rejects_ragged_rows() {
        let mut rows = sample_rows();
        rows[1].distances.pop();
        assert!(matches!(
            DistanceMatrix::from_rows(&rows),
            Err(DatasetError::RaggedRow { .. })
        ));
    }

    #[test]
    fn test_distance_matrix_rejects_empty() {
        assert!(matches!(
            DistanceMatrix::from_rows(&[]),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_pdr_interpolation_midpoint() {
        let series = PdrSeries::from_rows(&[(0.0, 0.8), (10.0, 0.6)]).unwrap();
        assert!((series.interpolate(5.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_pdr_interpolation_exact_point() {
        let series = PdrSeries::from_rows(&[(0.0, 0.8), (10.0, 0.6), (20.0, 0.9)]).unwrap();
        assert!((series.interpolate(10.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_pdr_interpolation_wraps_modulo_span() {
        let series = PdrSeries::from_rows(&[(0.0, 0.8), (10.0, 0.6), (20.0, 0.9)]).unwrap();
        // 25 wraps to 5
        assert!((series.interpolate(25.0) - series.interpolate(5.0)).abs() < 1e-12);
        // An exact multiple of the span lands on the first point
        assert!((series.interpolate(20.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_pdr_clamps_before_first_point() {
        let series = PdrSeries::from_rows(&[(2.0, 0.5), (10.0, 0.9)]).unwrap();
        assert!((series.interpolate(1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pdr_rejects_bad_series() {
        assert!(matches!(PdrSeries::from_rows(&[]), Err(DatasetError::Empty)));
        assert!(matches!(
            PdrSeries::from_rows(&[(0.0, 0.5), (0.0, 0.6)]),
            Err(DatasetError::NonMonotonic)
        ));
        assert!(matches!(
            PdrSeries::from_rows(&[(0.0, 0.5)]),
            Err(DatasetError::EmptySpan)
        ));
    }
}
