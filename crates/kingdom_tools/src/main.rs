//! Kingdom Idle - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kingdom_tools::simulate::{run_simulation, SimulationOptions, Strategy};
use kingdom_tools::{inspect, validate, ToolError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kingdom-tools")]
#[command(about = "Development tools for Kingdom Idle")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate content files
    Validate {
        /// Path to a content file or a directory of them
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Run a headless session and print a JSON report
    Simulate {
        /// Simulated seconds
        #[arg(long, default_value_t = 600.0)]
        seconds: f64,
        /// Step length in seconds
        #[arg(long, default_value_t = 0.1)]
        dt: f64,
        /// RNG seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Content file (default: built-in)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Scripted player
        #[arg(long, value_enum, default_value_t = Strategy::Idle)]
        strategy: Strategy,
    },
    /// Summarize an exported or JSON save
    Inspect {
        /// Save file
        save: PathBuf,
        /// Content file (default: built-in)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn run(command: Commands) -> Result<(), ToolError> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating content in: {}", path.display());
            let count = validate::validate_data_directory(&path)?;
            tracing::info!("Validation passed ({count} files)");
        }
        Commands::Simulate {
            seconds,
            dt,
            seed,
            config,
            strategy,
        } => {
            let config = validate::load_config(config.as_deref())?;
            let options = SimulationOptions {
                seconds,
                dt,
                seed,
                strategy,
            };
            let report = run_simulation(&config, &options)?;
            println!("{}", report.to_json()?);
        }
        Commands::Inspect { save, config } => {
            let config = validate::load_config(config.as_deref())?;
            let summary = inspect::inspect_file(&config, &save)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
