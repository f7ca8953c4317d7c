//! Results persistence module

use anyhow::Result;
use crate::engine::{GroupingResult, GroupView};
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// One grouping invocation as recorded by the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct GroupingRound {
    /// Sequence number of the invocation
    pub index: usize,

    /// Simulation time the snapshot was taken at
    pub sim_time: f64,

    /// Assignments and location annotations
    pub result: GroupingResult,

    /// Group-to-members view of the same partition
    pub view: GroupView,
}

/// Save recorded rounds to the specified directory
pub fn save_results(
    rounds: &[GroupingRound],
    final_radius: Option<f64>,
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving {} grouping rounds to {}", rounds.len(), output_dir);

    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    save_summary(rounds, final_radius, output_dir)?;
    save_rounds(rounds, output_dir)?;
    save_round_stats(rounds, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

/// Save summary information
fn save_summary(
    rounds: &[GroupingRound],
    final_radius: Option<f64>,
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving summary information");

    let path = Path::new(output_dir).join("summary.json");
    let mut file = File::create(path)?;

    let group_counts: Vec<usize> = rounds
        .iter()
        .map(|round| round.result.partition.group_count())
        .collect();
    let (min_groups, max_groups) = match group_counts.iter().minmax() {
        MinMaxResult::NoElements => (0, 0),
        MinMaxResult::OneElement(&count) => (count, count),
        MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
    };

    let last = rounds.last();
    let summary = json!({
        "round_count": rounds.len(),
        "node_count": last.map_or(0, |round| round.result.partition.len()),
        "final_group_count": last.map_or(0, |round| round.result.partition.group_count()),
        "final_noise_count": last.map_or(0, |round| round.result.partition.noise_count()),
        "min_group_count": min_groups,
        "max_group_count": max_groups,
        "final_radius": final_radius,
    });

    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}

/// Save each round's assignments and group view
fn save_rounds(rounds: &[GroupingRound], output_dir: &str) -> Result<()> {
    log::info!("Saving individual round information");

    let rounds_dir = Path::new(output_dir).join("rounds");
    fs::create_dir_all(&rounds_dir)?;

    for round in rounds {
        let path = rounds_dir.join(format!("round_{:03}.json", round.index));
        let mut file = File::create(path)?;
        file.write_all(to_string_pretty(round)?.as_bytes())?;
    }

    Ok(())
}

/// Save per-round statistics as CSV for external plotting
fn save_round_stats(rounds: &[GroupingRound], output_dir: &str) -> Result<()> {
    log::info!("Saving round statistics");

    let path = Path::new(output_dir).join("round_stats.csv");
    let mut file = File::create(path)?;

    writeln!(file, "round,sim_time,groups,noise")?;
    for round in rounds {
        writeln!(
            file,
            "{},{},{},{}",
            round.index,
            round.sim_time,
            round.result.partition.group_count(),
            round.result.partition.noise_count()
        )?;
    }

    Ok(())
}
