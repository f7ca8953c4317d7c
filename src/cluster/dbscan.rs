//! Density-based cluster assignment
//!
//! A pure function of the feature batch and the current radius: two vectors
//! are neighbors when their Euclidean distance is within eps, core points
//! have at least min_samples neighbors (self included), clusters connect
//! core points transitively, border points attach to their first core
//! neighbor in input order, and everything else is noise. Traversal order is
//! fixed to the input order so identical input always yields identical
//! labels.

use super::NOISE_LABEL;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use std::collections::HashMap;

/// Batch size above which neighbor lists are computed in parallel
const PARALLEL_THRESHOLD: usize = 1000;

/// Union-Find over batch indices for merging core-point neighborhoods
pub struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Find the root of the set containing x, halving paths on the way
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Union the sets containing x and y, smaller set under the larger
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }

        if self.size[root_x] < self.size[root_y] {
            self.parent[root_x] = root_y;
            self.size[root_y] += self.size[root_x];
        } else {
            self.parent[root_y] = root_x;
            self.size[root_x] += self.size[root_y];
        }
    }
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn neighbor_list(features: &Array2<f64>, i: usize, eps: f64) -> Vec<usize> {
    let row = features.row(i);
    (0..features.nrows())
        .filter(|&j| euclidean(row, features.row(j)) <= eps)
        .collect()
}

/// Assign a group label (or NOISE_LABEL) to every row of the feature batch
pub fn dbscan(features: &Array2<f64>, eps: f64, min_samples: usize) -> Vec<i32> {
    let n = features.nrows();
    if n == 0 {
        return Vec::new();
    }

    // Neighborhoods include the point itself. Small batches stay sequential;
    // the parallel path produces the same lists in the same order.
    let neighbors: Vec<Vec<usize>> = if n < PARALLEL_THRESHOLD {
        (0..n).map(|i| neighbor_list(features, i, eps)).collect()
    } else {
        (0..n)
            .into_par_iter()
            .map(|i| neighbor_list(features, i, eps))
            .collect()
    };

    let core: Vec<bool> = neighbors.iter().map(|nb| nb.len() >= min_samples).collect();

    // Merge mutually reachable core points
    let mut sets = DisjointSets::new(n);
    for i in 0..n {
        if !core[i] {
            continue;
        }
        for &j in &neighbors[i] {
            if core[j] {
                sets.union(i, j);
            }
        }
    }

    // Issue labels to core components in first-seen input order
    let mut labels = vec![NOISE_LABEL; n];
    let mut root_labels: HashMap<usize, i32> = HashMap::new();
    let mut next_label = 0;
    for i in 0..n {
        if core[i] {
            let root = sets.find(i);
            let label = *root_labels.entry(root).or_insert_with(|| {
                let label = next_label;
                next_label += 1;
                label
            });
            labels[i] = label;
        }
    }

    // Border points join their first core neighbor; the rest stay noise
    for i in 0..n {
        if core[i] {
            continue;
        }
        if let Some(&j) = neighbors[i].iter().find(|&&j| core[j]) {
            labels[i] = labels[j];
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_empty_batch_yields_empty_partition() {
        let features = Array2::<f64>::zeros((0, 3));
        assert!(dbscan(&features, 0.5, 3).is_empty());
    }

    #[test]
    fn test_two_dense_blobs() {
        let features = arr2(&[
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
        ]);
        let labels = dbscan(&features, 0.5, 3);
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_sparse_points_are_noise() {
        let features = arr2(&[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]]);
        let labels = dbscan(&features, 1.0, 3);
        assert_eq!(labels, vec![NOISE_LABEL; 4]);
    }

    #[test]
    fn test_border_point_attaches_to_first_core_neighbor() {
        // Only the second point has all four blob members in range; the
        // others ride along as border points. The last point reaches nothing.
        let features = arr2(&[
            [0.0, 0.0],
            [0.2, 0.0],
            [0.1, 0.2],
            [0.6, 0.0],
            [2.0, 0.0],
        ]);
        let labels = dbscan(&features, 0.5, 4);
        assert_eq!(labels, vec![0, 0, 0, 0, NOISE_LABEL]);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let features = arr2(&[
            [0.0, 0.0],
            [0.3, 0.1],
            [0.1, 0.3],
            [4.0, 4.0],
            [4.2, 4.1],
            [4.1, 4.3],
            [9.0, 9.0],
        ]);
        let first = dbscan(&features, 0.6, 3);
        let second = dbscan(&features, 0.6, 3);
        assert_eq!(first, second);
        // Labels come out in input order
        assert_eq!(first[0], 0);
        assert_eq!(first[3], 1);
        assert_eq!(first[6], NOISE_LABEL);
    }

    #[test]
    fn test_min_samples_one_makes_every_point_core() {
        let features = arr2(&[[0.0, 0.0], [10.0, 10.0]]);
        let labels = dbscan(&features, 0.5, 1);
        assert_eq!(labels, vec![0, 1]);
    }
}
