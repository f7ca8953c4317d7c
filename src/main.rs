use anyhow::{anyhow, Result};
use clap::Parser;

use rsu_group_analyzer::config::GroupingConfig;
use rsu_group_analyzer::data::csv::{load_distance_dataset, load_pdr_dataset};
use rsu_group_analyzer::data::LocationMapping;
use rsu_group_analyzer::engine::{
    group_view, DensityGroupingEngine, GroupingStrategy, ProximityGroupingEngine,
};
use rsu_group_analyzer::metrics::SnapshotStore;
use rsu_group_analyzer::sim::MockMetricsGenerator;
use rsu_group_analyzer::storage::{self, GroupingRound};

#[derive(Parser, Debug)]
#[clap(
    name = "rsu-group-analyzer",
    about = "Dynamic grouping of roadside units from live network metrics"
)]
struct Cli {
    /// Path to the vehicle routing dataset CSV
    #[clap(long)]
    distance_dataset: Option<String>,

    /// Path to the PDR-over-time dataset CSV
    #[clap(long)]
    pdr_dataset: Option<String>,

    /// Output directory for results
    #[clap(long, default_value = "group_results")]
    output_dir: String,

    /// Number of simulated roadside units
    #[clap(long, default_value = "5")]
    nodes: usize,

    /// Number of grouping rounds to run
    #[clap(long, default_value = "10")]
    rounds: usize,

    /// Simulated seconds between rounds
    #[clap(long, default_value = "2.0")]
    interval: f64,

    /// Initial clustering radius
    #[clap(long, default_value = "0.5")]
    eps: f64,

    /// Minimum neighbors (including self) for a core point
    #[clap(long, default_value = "3")]
    min_samples: usize,

    /// Grouping strategy: density or proximity
    #[clap(long, default_value = "density")]
    strategy: String,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Starting dynamic grouping run");
    log::info!("Strategy: {}", args.strategy);
    log::info!("Output: {}", args.output_dir);

    // Create output directory
    std::fs::create_dir_all(&args.output_dir)?;

    // 1. Metric feed: deterministic mock metrics published through the
    //    shared snapshot store
    let generator = MockMetricsGenerator::new(args.nodes);
    let store = SnapshotStore::new();

    // 2. Run the grouping rounds with the selected strategy
    let (rounds, final_radius) = match args.strategy.as_str() {
        "density" => {
            let config = GroupingConfig {
                eps: args.eps,
                min_samples: args.min_samples,
                ..GroupingConfig::default()
            };
            let mut engine = DensityGroupingEngine::new(config);

            // Overlays are optional: a load failure downgrades the feature
            // set instead of aborting the run
            if let Some(path) = &args.distance_dataset {
                match load_distance_dataset(path) {
                    Ok((matrix, locations)) => engine.set_distance_overlay(matrix, locations),
                    Err(e) => log::warn!("Continuing without distance overlay: {}", e),
                }
            }
            if let Some(path) = &args.pdr_dataset {
                match load_pdr_dataset(path) {
                    Ok(series) => engine.set_pdr_overlay(series),
                    Err(e) => log::warn!("Continuing without PDR overlay: {}", e),
                }
            }

            let rounds = run_rounds(&mut engine, &generator, &store, args.rounds, args.interval);
            log::info!("Final clustering radius: {:.4}", engine.radius());
            (rounds, Some(engine.radius()))
        }
        "proximity" => {
            let mut engine = ProximityGroupingEngine::default();
            let rounds = run_rounds(&mut engine, &generator, &store, args.rounds, args.interval);
            (rounds, None)
        }
        other => return Err(anyhow!("unknown strategy: {}", other)),
    };

    // 3. Save results
    storage::save_results(&rounds, final_radius, &args.output_dir)?;

    log::info!("Run complete. Results saved to {}", args.output_dir);

    Ok(())
}

/// Publish a fresh snapshot and run one grouping pass per round
fn run_rounds(
    strategy: &mut dyn GroupingStrategy,
    generator: &MockMetricsGenerator,
    store: &SnapshotStore,
    rounds: usize,
    interval: f64,
) -> Vec<GroupingRound> {
    let mut recorded = Vec::with_capacity(rounds);

    for index in 0..rounds {
        let sim_time = index as f64 * interval;
        store.publish(generator.metrics_at(sim_time));

        let snapshot = store.snapshot();
        let result = strategy.form_groups(&snapshot, Some(sim_time));

        let mapping: LocationMapping = result
            .locations
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        let view = group_view(&result.partition, &mapping);

        log::info!(
            "Round {}: {} groups, {} noise nodes",
            index,
            result.partition.group_count(),
            result.partition.noise_count()
        );

        recorded.push(GroupingRound {
            index,
            sim_time,
            result,
            view,
        });
    }

    recorded
}
