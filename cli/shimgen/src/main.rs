//! shimgen CLI: generate native shims and safe Rust wrappers from
//! declaration files.

mod commands;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shimgen_core::GeneratorConfig;
use tracing_subscriber::EnvFilter;

/// Configuration file picked up from the working directory.
const CONFIG_FILE: &str = "shimgen.toml";

#[derive(Parser)]
#[command(name = "shimgen", version, about = "Binding generator for native C++ libraries")]
struct Cli {
    /// Configuration file (default: ./shimgen.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every declaration as it is ingested and emitted
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate artifacts for one module, or for every file of a directory
    Generate {
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        /// Module name (required unless --batch is given)
        #[arg(long, required_unless_present = "batch")]
        module: Option<String>,
        /// Generate one module per `*.json` file in this directory
        #[arg(long, conflicts_with_all = ["module", "files"])]
        batch: Option<PathBuf>,
        /// Declaration files, merged in order
        files: Vec<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            out,
            module,
            batch,
            files,
        } => match (batch, module) {
            (Some(dir), _) => commands::generate::run_batch(&config, &dir, &out),
            (None, Some(module)) => commands::generate::run(&config, &module, &files, &out),
            (None, None) => anyhow::bail!("either --module or --batch is required"),
        },
        Commands::Config => commands::config::run(&config),
    }
}

/// Load the explicit configuration file, else `shimgen.toml` in `cwd`, else
/// the built-in defaults.
fn load_config(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<GeneratorConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = cwd.join(CONFIG_FILE);
            if !candidate.is_file() {
                tracing::debug!("no {CONFIG_FILE} found, using built-in configuration");
                return Ok(GeneratorConfig::default());
            }
            candidate
        }
    };
    GeneratorConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}
