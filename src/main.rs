use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pipeline_preflight::config::Config;
use pipeline_preflight::constants::DEFAULT_INPUT_EXTENSION;
use pipeline_preflight::logging;
use pipeline_preflight::pipeline::{PipelinePlan, Preflight};
use pipeline_preflight::storage::StorageFactory;
use pipeline_preflight::{Extension, PathRole, PathValidator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "preflight")]
#[command(about = "Validate storage paths before submitting the preprocessing pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory for rotated JSON logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single path and print its descriptor as JSON
    Validate {
        path: String,
        /// Extension matching files must carry, without the dot
        #[arg(long, default_value = DEFAULT_INPUT_EXTENSION)]
        extension: String,
        /// Count files in nested directories too
        #[arg(long)]
        recursive: bool,
        /// Treat the path as an output location
        #[arg(long)]
        destination: bool,
        /// Optional config file for storage settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the protocol paths must be served by
        #[arg(long)]
        expected_protocol: Option<String>,
    },
    /// Check every pipeline path, then emit the run plan
    Check {
        #[arg(long)]
        config: PathBuf,
        /// Write the plan here instead of stdout
        #[arg(long)]
        plan_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    match cli.command {
        Commands::Validate {
            path,
            extension,
            recursive,
            destination,
            config,
            expected_protocol,
        } => {
            let mut config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            if let Some(protocol) = expected_protocol {
                config.storage.expected_protocol = protocol;
            }

            let extension = Extension::new(extension)?;
            let role = if destination {
                PathRole::Destination
            } else {
                PathRole::Source
            };

            let factory = StorageFactory::new(&config.storage);
            let validator = PathValidator::for_path(&path, &factory, &config.storage)?;
            let descriptor = validator
                .validate(&path, &extension, recursive, role)
                .await
                .with_context(|| format!("storage backend failed while checking {}", path))?;

            let output = serde_json::json!({
                "path": descriptor.path(),
                "role": descriptor.role(),
                "status": descriptor.status(),
                "is_valid": descriptor.is_valid(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);

            if !descriptor.is_valid() {
                bail!("{}", descriptor);
            }
        }
        Commands::Check { config, plan_out } => {
            let config = Config::load(&config)?;
            let factory = Arc::new(StorageFactory::new(&config.storage));
            let preflight = Preflight::new(factory, config.storage.clone());

            info!("Running preflight for {}", config.pipeline.name);
            let report = preflight.run(&config.pipeline).await?;
            for descriptor in &report.paths {
                eprintln!("  {}", descriptor);
            }
            if let Err(e) = report.ensure_ready() {
                error!("Preflight failed: {}", e);
                return Err(e.into());
            }

            let plan = PipelinePlan::build(&config.pipeline, &config.resources)?;
            let rendered = plan.to_json_pretty()?;
            match plan_out {
                Some(out) => {
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("failed to write plan to {}", out.display()))?;
                    info!("Plan {} written to {}", plan.run_id, out.display());
                }
                None => println!("{}", rendered),
            }
        }
    }
    Ok(())
}
