use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gutflora::{
    engine::{EngineBuilder, EngineSettings},
    history::History,
    log::CsvLog,
    scenario::ScenarioLoader,
    search::RandomSearch,
    snapshot::SnapshotWriter,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Host and gut colony simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario and write the per-tick log
    Run {
        /// Path to the scenario YAML file
        #[arg(long, default_value = "scenarios/two_colonies.yaml")]
        scenario: PathBuf,

        /// Override tick count (uses scenario default when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// CSV log destination
        #[arg(long, default_value = "run.csv")]
        log: PathBuf,

        /// Override snapshot interval in ticks
        #[arg(long)]
        snapshot_interval: Option<u64>,

        /// Directory for snapshots
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,

        /// Save the host's trained approximator here after the run
        #[arg(long)]
        save_model: Option<PathBuf>,

        /// Window size for the food choice summary
        #[arg(long, default_value_t = 10)]
        food_window: usize,
    },
    /// Random search over the host's hyper-parameters
    Search {
        #[arg(long, default_value = "scenarios/two_colonies.yaml")]
        scenario: PathBuf,

        #[arg(long, default_value_t = 7)]
        trials: usize,

        /// Ticks per trial (uses scenario default when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Serve the web front-end, optionally simulating a scenario behind it
    Serve {
        #[arg(long)]
        scenario: Option<PathBuf>,

        #[arg(long)]
        ticks: Option<u64>,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");

    match cli.command {
        Command::Run {
            scenario,
            ticks,
            log,
            snapshot_interval,
            snapshot_dir,
            save_model,
            food_window,
        } => {
            let scenario = loader.load(&scenario)?;
            let mut ecosystem = scenario.build_ecosystem()?;
            let ticks = scenario.ticks(ticks);
            let snapshot_interval = snapshot_interval.unwrap_or(scenario.snapshot_interval_ticks);

            let csv = CsvLog::create(&log, &ecosystem)
                .with_context(|| format!("Failed to create log {}", log.display()))?;
            let mut engine = EngineBuilder::new(EngineSettings {
                scenario_name: scenario.name.clone(),
            })
            .with_sink(csv)
            .with_sink(SnapshotWriter::new(
                &snapshot_dir,
                snapshot_interval,
                &scenario.name,
            ))
            .build();

            let mut history = History::new();
            let summary =
                engine.run_with_hook(&mut ecosystem, ticks, |record| history.push(record.clone()))?;

            if let Some(path) = save_model {
                ecosystem.host().learner().policy().save(&path)?;
                info!(path = %path.display(), "host model saved");
            }

            println!(
                "Scenario '{}' completed for {} ticks. Meals: {}, cumulative host reward: {:.4}",
                scenario.name, summary.ticks, summary.meals, summary.cumulative_host_reward
            );
            for (id, population) in &summary.final_populations {
                println!("  colony {id}: population {population:.4}");
            }
            let food_count = scenario.foods.len();
            for (window, counts) in history
                .food_choices_per_window(food_window, food_count)
                .iter()
                .enumerate()
            {
                info!(window, ?counts, "food choices");
            }
        }
        Command::Search {
            scenario,
            trials,
            ticks,
            seed,
        } => {
            let scenario = loader.load(&scenario)?;
            let search = RandomSearch::new(trials, scenario.ticks(ticks), seed);
            let report = search.run(&scenario)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve {
            scenario,
            ticks,
            host,
            port,
        } => {
            let scenario = scenario.map(|path| loader.load(&path)).transpose()?;
            let ticks = scenario
                .as_ref()
                .map(|scenario| scenario.ticks(ticks))
                .unwrap_or(0);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                scenario,
                ticks,
                host,
                port,
            }))?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
