//! PCB Defect Classification CLI
//!
//! Entry point for training, testing, and running single-image predictions
//! on YOLO-format PCB defect datasets with the Burn framework.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use pcb_classify::backend::TrainingBackend;
use pcb_classify::dataset::config::{ClassCatalog, DatasetConfig};
use pcb_classify::training::init::BackendInitializer;
use pcb_classify::training::orchestrator::{Orchestrator, RuntimeOptions, TestOutcome};
use pcb_classify::training::profile::HardwareProfile;
use pcb_classify::utils::logging::{init_logging, LogConfig};
use pcb_classify::DEFAULT_DATASET_ROOT;

/// PCB Defect Classification
///
/// Trains an image classifier on a YOLO-format PCB defect dataset and serves
/// predictions from saved model artifacts.
#[derive(Parser, Debug)]
#[command(name = "pcb_classify")]
#[command(version)]
#[command(about = "PCB defect classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a model and save the artifact
    Train {
        /// Dataset root directory (contains data.yaml)
        #[arg(short, long, default_value = DEFAULT_DATASET_ROOT)]
        dataset_root: String,

        /// Output directory for model artifacts
        #[arg(short, long, default_value = "output/models")]
        output_dir: String,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Skip evaluation on the test split after training
        #[arg(long, default_value = "false")]
        skip_test: bool,
    },

    /// Evaluate a saved model on the test split
    Test {
        /// Dataset root directory (contains data.yaml)
        #[arg(short, long, default_value = DEFAULT_DATASET_ROOT)]
        dataset_root: String,

        /// Path to a saved model artifact directory
        #[arg(short, long)]
        model: String,
    },

    /// Classify a single image with a saved model
    Predict {
        /// Path to the input image
        #[arg(short, long)]
        input: String,

        /// Path to a saved model artifact directory
        #[arg(short, long)]
        model: String,

        /// Dataset root directory (contains data.yaml)
        #[arg(short, long, default_value = DEFAULT_DATASET_ROOT)]
        dataset_root: String,
    },

    /// Show dataset statistics
    Stats {
        /// Dataset root directory (contains data.yaml)
        #[arg(short, long, default_value = DEFAULT_DATASET_ROOT)]
        dataset_root: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Train {
            dataset_root,
            output_dir,
            seed,
            skip_test,
        } => cmd_train(&dataset_root, &output_dir, seed, skip_test),

        Commands::Test {
            dataset_root,
            model,
        } => cmd_test(&dataset_root, &model),

        Commands::Predict {
            input,
            model,
            dataset_root,
        } => cmd_predict(&input, &model, &dataset_root),

        Commands::Stats { dataset_root } => cmd_stats(&dataset_root),
    }
}

fn build_orchestrator(
    dataset_root: &str,
    output_dir: &str,
    seed: u64,
) -> Result<Orchestrator<TrainingBackend>> {
    let root = PathBuf::from(dataset_root);
    let config = DatasetConfig::load(&root.join("data.yaml"))?;
    let initializer = BackendInitializer::new(HardwareProfile::detect());
    let options = RuntimeOptions {
        seed,
        dataset_root: root,
        output_dir: PathBuf::from(output_dir),
    };
    Ok(Orchestrator::new(config, options, initializer))
}

fn cmd_train(dataset_root: &str, output_dir: &str, seed: u64, skip_test: bool) -> Result<()> {
    println!("{}", "Training PCB defect classifier...".green().bold());

    let orchestrator = build_orchestrator(dataset_root, output_dir, seed)?;
    let catalog = ClassCatalog::pcb_defects();

    let outcome = orchestrator.train()?;

    if let Some(report) = &outcome.validation_report {
        println!();
        println!("{}", "Validation results".cyan().bold());
        println!("{}", report.render(&catalog));
    }

    // A failed save leaves the fitted model usable; keep going so the test
    // evaluation still runs.
    match orchestrator.save(&outcome.model) {
        Ok(artifact_dir) => {
            println!("Model saved to {}", artifact_dir.display().to_string().cyan());
        }
        Err(e) => {
            println!("{} {}", "Model not saved:".red(), e);
        }
    }

    if !skip_test {
        match orchestrator.test(&outcome.model)? {
            TestOutcome::NoData => {
                println!("{}", "No test data available".yellow());
            }
            TestOutcome::Report(report) => {
                println!();
                println!("{}", "Test results".cyan().bold());
                println!("{}", report.render(&catalog));
            }
        }
    }

    println!("{}", "Training complete".green().bold());
    Ok(())
}

fn cmd_test(dataset_root: &str, model_dir: &str) -> Result<()> {
    let orchestrator = build_orchestrator(dataset_root, "output", 42)?;
    let model = orchestrator.load(Path::new(model_dir))?;

    match orchestrator.test(&model)? {
        TestOutcome::NoData => {
            println!("{}", "No test data available".yellow());
        }
        TestOutcome::Report(report) => {
            let catalog = ClassCatalog::pcb_defects();
            println!("{}", "Test results".cyan().bold());
            println!("{}", report.render(&catalog));
        }
    }
    Ok(())
}

fn cmd_predict(input: &str, model_dir: &str, dataset_root: &str) -> Result<()> {
    let orchestrator = build_orchestrator(dataset_root, "output", 42)?;
    let model = orchestrator.load(Path::new(model_dir))?;

    let result = orchestrator.predict_one(&model, Path::new(input))?;
    let catalog = ClassCatalog::pcb_defects();

    println!("{}", result.formatted(&catalog).green());
    Ok(())
}

fn cmd_stats(dataset_root: &str) -> Result<()> {
    info!("Computing dataset statistics for {}", dataset_root);

    let orchestrator = build_orchestrator(dataset_root, "output", 42)?;
    let config = orchestrator.config().clone();

    println!("{}", "Dataset statistics".cyan().bold());
    println!("  Classes: {}", config.nc);

    for split in ["train", "val", "test"] {
        let set = orchestrator.scan_split(split);
        println!();
        println!("  {} split: {} samples", split.yellow(), set.len());
        for (name, count) in set.class_distribution(&config.names) {
            println!("    {:<24} {}", name, count);
        }
    }

    Ok(())
}
