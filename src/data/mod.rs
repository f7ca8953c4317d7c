//! Dataset overlays and their loaders

pub mod overlays;
pub mod csv;

pub use overlays::{DatasetError, DistanceMatrix, DistanceRow, LocationMapping, PdrSeries};
