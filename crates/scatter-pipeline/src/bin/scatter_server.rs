//! `scatter-server server <config_file>` — loads a config, wires up the
//! detector model, and runs the pipeline to completion.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use scatter_config::ConfigFile;
use scatter_detect::BlobDetector;
use scatter_pipeline::coordinator;
use scatter_pipeline::detector_stage::DetectorStage;

#[derive(Parser)]
#[command(name = "scatter-server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline against a config file until it finishes.
    Server { config_file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Command::Server { config_file } = cli.command;

    let config_dir = config_file.parent().unwrap_or_else(|| std::path::Path::new(".")).to_path_buf();
    let config_file = match ConfigFile::load(config_file.clone()) {
        Ok(cf) => cf,
        Err(err) => {
            eprintln!("failed to load config {}: {err}", config_file.display());
            return ExitCode::from(1);
        }
    };
    let cfg = config_file.config;

    if !cfg.cluster.use_cuda {
        // SAFETY: single-threaded at this point, before any worker spawns.
        unsafe { std::env::remove_var("CUDA_VISIBLE_DEVICES") };
    }

    if let Err(err) = scatter_pipeline::logging::init(&cfg.log, cfg.log_filename().as_deref()) {
        eprintln!("failed to set up logging: {err}");
        return ExitCode::from(2);
    }

    let weights_path = config_dir.join(format!("{}.weights", cfg.model.name));

    let model = match BlobDetector::load(&weights_path, cfg.post_processing.nms_level, cfg.post_processing.score_level) {
        Ok(model) => model,
        Err(err) => {
            tracing::error!(%err, "model did not load, stopping the server");
            return ExitCode::from(2);
        }
    };
    let detector = DetectorStage::new(Box::new(model), &cfg);

    let summary = match coordinator::run(&cfg, detector, num_cpus::get()) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(%err, "pipeline run failed");
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        found = summary.num_found_batches,
        saved = summary.num_saved_batches,
        timed_out = summary.timed_out,
        "pipeline finished"
    );

    if summary.error_occurred {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
