//! Deterministic mock metric feed
//!
//! Stands in for the live transport when no real feed is around: per-node
//! sinusoidal metrics over a 60 s cycle, positions drifting around a base
//! coordinate, and degree centrality derived from the radio topology those
//! positions imply.

use crate::metrics::{MetricsSnapshot, NodeId, NodeMetrics, Position};
use petgraph::graph::UnGraph;
use std::f64::consts::PI;

/// Default communication range between units, in meters
pub const DEFAULT_LINK_RANGE_M: f64 = 1_500.0;

/// Base deployment coordinate (Delhi)
pub const BASE_LAT: f64 = 28.6139;
pub const BASE_LON: f64 = 77.2090;

pub struct MockMetricsGenerator {
    pub node_count: usize,
    pub base: Position,
    pub link_range_m: f64,
}

impl MockMetricsGenerator {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            base: Position {
                lat: BASE_LAT,
                lon: BASE_LON,
            },
            link_range_m: DEFAULT_LINK_RANGE_M,
        }
    }

    /// Snapshot of all nodes at the given elapsed simulation time
    pub fn metrics_at(&self, elapsed_secs: f64) -> MetricsSnapshot {
        let cycle = elapsed_secs.rem_euclid(60.0) / 60.0;

        let positions: Vec<Position> = (0..self.node_count)
            .map(|i| {
                let i_f = i as f64;
                Position {
                    lat: self.base.lat + i_f * 0.005 + (cycle * 2.0 * PI + i_f).sin() * 0.002,
                    lon: self.base.lon + i_f * 0.005 + (cycle * 2.0 * PI + i_f).cos() * 0.002,
                }
            })
            .collect();

        let centralities = degree_centralities(&positions, self.link_range_m);

        let mut snapshot = MetricsSnapshot::with_capacity(self.node_count);
        for (i, position) in positions.iter().enumerate() {
            let i_f = i as f64;

            // Density swells and ebbs over the cycle
            let density_variation = (cycle * 2.0 * PI).sin() * 10.0;
            let vehicle_density = (10.0 + i_f * 2.0 + density_variation).round().max(0.0);

            // Link loss tracks density with a faster ripple on top
            let link_loss_base = (vehicle_density / 50.0).clamp(0.1, 0.8);
            let link_loss_variation = (cycle * 4.0 * PI).sin() * 0.1;
            let avg_link_loss = (link_loss_base + link_loss_variation).clamp(0.0, 1.0);

            snapshot.insert(
                NodeId::Numeric(i as u32),
                NodeMetrics {
                    vehicle_density,
                    avg_link_loss,
                    degree_centrality: centralities[i],
                    position: Some(*position),
                },
            );
        }

        snapshot
    }
}

/// Degree centrality of each node in the proximity link graph: nodes within
/// communication range are linked, centrality is degree over (n - 1)
fn degree_centralities(positions: &[Position], range_m: f64) -> Vec<f64> {
    let n = positions.len();
    if n <= 1 {
        return vec![0.0; n];
    }

    let mut graph = UnGraph::<usize, f64>::new_undirected();
    let nodes: Vec<_> = (0..n).map(|i| graph.add_node(i)).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = positions[i].distance_m(&positions[j]);
            if d <= range_m {
                graph.add_edge(nodes[i], nodes[j], d);
            }
        }
    }

    (0..n)
        .map(|i| graph.neighbors(nodes[i]).count() as f64 / (n as f64 - 1.0))
        .collect()
}

/// The fixed metric ramp used by tests and quick demos
pub fn ramp_metrics(node_count: usize) -> MetricsSnapshot {
    (0..node_count)
        .map(|i| {
            let i_f = i as f64;
            (
                NodeId::Numeric(i as u32),
                NodeMetrics {
                    vehicle_density: 10.0 + i_f * 2.0,
                    avg_link_loss: 0.2 + i_f * 0.05,
                    degree_centrality: 0.7 - i_f * 0.1,
                    position: Some(Position {
                        lat: BASE_LAT + i_f * 0.005,
                        lon: BASE_LON + i_f * 0.005,
                    }),
                },
            )
        })
        .collect()
}
