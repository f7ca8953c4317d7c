//! Node identity and live metric snapshots

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error raised when an incoming node identifier cannot be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseNodeIdError {
    #[error("empty node id")]
    Empty,

    #[error("numeric node id out of range: {0}")]
    NumericOverflow(String),

    #[error("unrecognized node id: {0}")]
    Unrecognized(String),
}

/// Identifier of a roadside unit.
///
/// The metric feed uses two id schemes side by side: plain numerals ("0",
/// "17") and single letters ("A", "D"). Both resolve to a row of the distance
/// matrix; numerals map directly, letters map by their offset from 'A'. The
/// scheme is decided once at ingestion, not re-sniffed per access.
///
/// The derived ordering (numeric ids before letter ids) is the stable node
/// ordering used for every clustering batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Numeric(u32),
    Letter(char),
}

impl NodeId {
    /// Resolve the distance-matrix row index for this id.
    ///
    /// Returns None when the id has no valid row (e.g. a lowercase letter,
    /// which lands below 'A'). Bounds against the actual matrix are checked
    /// by the caller.
    pub fn matrix_index(&self) -> Option<usize> {
        match self {
            NodeId::Numeric(n) => Some(*n as usize),
            NodeId::Letter(c) => {
                let offset = (*c as i64) - ('A' as i64);
                if offset >= 0 {
                    Some(offset as usize)
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Numeric(n) => write!(f, "{}", n),
            NodeId::Letter(c) => write!(f, "{}", c),
        }
    }
}

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseNodeIdError::Empty);
        }

        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u32>()
                .map(NodeId::Numeric)
                .map_err(|_| ParseNodeIdError::NumericOverflow(s.to_string()));
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(NodeId::Letter(c)),
            _ => Err(ParseNodeIdError::Unrecognized(s.to_string())),
        }
    }
}

// Node ids key JSON objects in results output, so they serialize as their
// display string rather than as an enum variant.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Geographic position of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    /// Ground distance in meters between two positions (equirectangular
    /// approximation, adequate at RSU deployment scales)
    pub fn distance_m(&self, other: &Position) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let mid_lat = ((self.lat + other.lat) / 2.0).to_radians();
        let x = dlon * mid_lat.cos();

        EARTH_RADIUS_M * (x * x + dlat * dlat).sqrt()
    }
}

/// One node's metric record for the current update cycle.
///
/// Fields default to zero when missing so a malformed record degrades to a
/// neutral feature vector instead of failing the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Vehicles currently observed by the unit
    #[serde(default)]
    pub vehicle_density: f64,

    /// Average link-loss rate in [0, 1]
    #[serde(default)]
    pub avg_link_loss: f64,

    /// Degree centrality of the unit in the radio topology, in [0, 1]
    #[serde(default)]
    pub degree_centrality: f64,

    /// Geographic position, if reported
    #[serde(default)]
    pub position: Option<Position>,
}

/// Latest known metrics per node
pub type MetricsSnapshot = HashMap<NodeId, NodeMetrics>;

/// Shared snapshot store bridging the ingestion side and the engine.
///
/// Writers replace the whole snapshot (or copy-on-write one node's record);
/// readers take an Arc to a frozen map. A grouping pass therefore always sees
/// a single point-in-time view, never a half-updated one.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<Arc<MetricsSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire snapshot
    pub fn publish(&self, snapshot: MetricsSnapshot) {
        *self.inner.write().unwrap() = Arc::new(snapshot);
    }

    /// Replace a single node's record, leaving previously handed-out
    /// snapshots untouched
    pub fn update(&self, id: NodeId, metrics: NodeMetrics) {
        let mut guard = self.inner.write().unwrap();
        let mut next = (**guard).clone();
        next.insert(id, metrics);
        *guard = Arc::new(next);
    }

    /// Point-in-time view of the current snapshot
    pub fn snapshot(&self) -> Arc<MetricsSnapshot> {
        Arc::clone(&self.inner.read().unwrap())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
