//! CSV loading for the dataset overlays
//!
//! Owns only the mechanics of getting the two original dataset files into
//! the in-memory shapes in `overlays`; those shapes are the contract the
//! engine consumes.

use crate::data::overlays::{DatasetError, DistanceMatrix, DistanceRow, LocationMapping, PdrSeries};
use crate::metrics::NodeId;
use polars::prelude::*;

fn read_csv(path: &str) -> Result<DataFrame, DatasetError> {
    if !std::path::Path::new(path).exists() {
        return Err(DatasetError::FileNotFound(path.to_string()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;

    Ok(df)
}

/// Load the vehicle routing dataset: `Notation`, `Location`, and one
/// `Distance from <place>` column per node
pub fn load_distance_dataset(path: &str) -> Result<(DistanceMatrix, LocationMapping), DatasetError> {
    log::info!("Reading routing dataset: {}", path);

    let df = read_csv(path)?;

    let notation = df
        .column("Notation")
        .map_err(|_| DatasetError::MissingColumn("Notation".to_string()))?
        .str()?;
    let location = df
        .column("Location")
        .map_err(|_| DatasetError::MissingColumn("Location".to_string()))?
        .str()?;

    // Distance columns, in file order
    let distance_names: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| name.contains("Distance from"))
        .map(|name| name.to_string())
        .collect();
    if distance_names.is_empty() {
        return Err(DatasetError::MissingColumn("Distance from *".to_string()));
    }

    let mut distance_cols = Vec::with_capacity(distance_names.len());
    for name in &distance_names {
        distance_cols.push(df.column(name)?.cast(&DataType::Float64)?);
    }

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let id: NodeId = notation.get(i).unwrap_or_default().trim().parse()?;
        let loc = location.get(i).unwrap_or_default().trim().to_string();

        let mut distances = Vec::with_capacity(distance_cols.len());
        for col in &distance_cols {
            distances.push(col.f64()?.get(i).unwrap_or(0.0));
        }

        rows.push(DistanceRow {
            id,
            location: loc,
            distances,
        });
    }

    let (matrix, locations) = DistanceMatrix::from_rows(&rows)?;
    log::info!("Loaded routing dataset with {} locations", locations.len());

    Ok((matrix, locations))
}

/// Load the PDR time-series dataset: `Time (s)` and `PDR` columns
pub fn load_pdr_dataset(path: &str) -> Result<PdrSeries, DatasetError> {
    log::info!("Reading PDR dataset: {}", path);

    let df = read_csv(path)?;

    let time = df
        .column("Time (s)")
        .map_err(|_| DatasetError::MissingColumn("Time (s)".to_string()))?
        .cast(&DataType::Float64)?;
    let pdr = df
        .column("PDR")
        .map_err(|_| DatasetError::MissingColumn("PDR".to_string()))?
        .cast(&DataType::Float64)?;

    let time_ca = time.f64()?;
    let pdr_ca = pdr.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(t), Some(p)) = (time_ca.get(i), pdr_ca.get(i)) {
            rows.push((t, p));
        }
    }
    rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let series = PdrSeries::from_rows(&rows)?;
    log::info!("Loaded PDR dataset with {} time points", rows.len());

    Ok(series)
}
