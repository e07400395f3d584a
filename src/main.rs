//! Hospital ML - Command-line entry point
//!
//! Batch jobs (dataset generation, training) and one-off predictions
//! against the trained bundles.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use hospital_ml_core::api::commands;
use hospital_ml_core::constants;
use hospital_ml_core::logic::config::PipelineConfig;

/// Clinical prediction pipeline
#[derive(Parser, Debug)]
#[command(name = "hospital-ml", version, about = "Hospital ML - datasets, training and predictions")]
struct Args {
    /// Data root (overrides HOSPITAL_ML_DATA_DIR)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the disease, risk and no-show datasets
    Generate {
        /// Generator seed
        #[arg(long)]
        seed: Option<u64>,

        /// Rows per dataset
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Train every model from the generated datasets
    Train {
        /// Split and estimator seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict for one subject
    Predict {
        /// Task name (disease, risk, noshow)
        #[arg(short, long)]
        task: String,

        /// JSON object of named fields, or @path to read it from a file
        #[arg(short, long)]
        input: String,

        /// Patient or appointment id echoed in the result
        #[arg(short, long, default_value = "cli")]
        subject: String,
    },

    /// Show feature layouts
    Schema {
        /// Restrict to one task
        #[arg(short, long)]
        task: Option<String>,
    },

    /// List trained bundles
    Models,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading input file {}", path)),
        None => Ok(input.to_string()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match args.data_dir {
        Some(root) => PipelineConfig::in_dir(root),
        None => PipelineConfig::from_env(),
    };

    log::info!("{} v{} starting", constants::APP_NAME, constants::APP_VERSION);
    log::debug!("Datasets: {}, artifacts: {}", config.dataset_dir.display(), config.artifact_dir.display());

    match args.command {
        Command::Generate { seed, samples } => {
            config = config.with_seed(seed).with_samples(samples);
            let summaries = commands::generate_datasets(&config).map_err(|e| anyhow!(e))?;
            print_json(&summaries)
        }
        Command::Train { seed } => {
            let summaries = commands::train_models(&config, seed).map_err(|e| anyhow!(e))?;
            for summary in &summaries {
                log::info!("{} -> {}", summary.headline, summary.bundle_path.display());
            }
            print_json(&summaries)
        }
        Command::Predict { task, input, subject } => {
            let json = read_input(&input)?;
            let result = commands::predict(&config, &task, &subject, &json).map_err(|e| anyhow!(e))?;
            print_json(&result)
        }
        Command::Schema { task } => {
            let layouts = commands::schema_info(task.as_deref()).map_err(|e| anyhow!(e))?;
            print_json(&layouts)
        }
        Command::Models => {
            let headers = commands::list_models(&config).map_err(|e| anyhow!(e))?;
            print_json(&headers)
        }
    }
}
