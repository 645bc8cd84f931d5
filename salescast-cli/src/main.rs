//! Salescast CLI: prepare a sales dataset for monthly forecasting.
//!
//! Commands:
//! - `run`: load, clean, derive features, aggregate monthly and save outputs
//! - `inspect`: load and clean a file, then print its column summary and head

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use salescast_core::{clean, load_table, LogProgress, TableSummary};
use salescast_runner::{run_from_config, save_outputs, OutputFormat, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "salescast",
    about = "Salescast CLI: sales data preparation for time-series modeling"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the featured table and monthly aggregate.
    Run {
        /// Input CSV. Overrides the config file and candidate search.
        #[arg(long, env = "SALESCAST_INPUT")]
        input: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Defaults to the config value (./data).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Output format for both tables.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Print this many rows of the featured table after the run.
        #[arg(long, default_value_t = 5)]
        preview: usize,

        /// Skip writing manifest.json.
        #[arg(long, default_value_t = false)]
        no_manifest: bool,
    },
    /// Load and clean a file, then print a column summary and the first rows.
    Inspect {
        /// Input CSV.
        path: PathBuf,

        /// Number of rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,

        /// Path to a TOML config file (only `[input] encodings` is used).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            config,
            output_dir,
            format,
            preview,
            no_manifest,
        } => run_cmd(input, config, output_dir, format, preview, no_manifest),
        Commands::Inspect { path, rows, config } => inspect_cmd(path, rows, config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(&p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_cmd(
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<FormatArg>,
    preview: usize,
    no_manifest: bool,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    if let Some(format) = format {
        config.output.format = format.into();
    }
    if no_manifest {
        config.output.manifest = false;
    }

    let progress = LogProgress;
    let output = run_from_config(&config, input.as_deref(), &progress)?;
    let saved = save_outputs(&output, &config.output, &progress)?;

    if preview > 0 {
        println!("{}", output.featured.head(Some(preview)));
        println!();
    }
    print!("{}", TableSummary::of(&output.featured));
    println!();
    println!(
        "Monthly aggregate: {} months, total sales {:.2}",
        output.monthly.len(),
        output.monthly.total()
    );
    println!("Featured table saved to {}", saved.featured.display());
    println!("Monthly aggregate saved to {}", saved.monthly.display());
    if let Some(manifest) = &saved.manifest {
        println!("Manifest saved to {}", manifest.display());
    }

    Ok(())
}

fn inspect_cmd(path: PathBuf, rows: usize, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let opts = config.load_options()?;

    let raw = load_table(&path, &opts, &LogProgress)?;
    let canonical = clean(raw, &LogProgress)?;

    print!("{}", TableSummary::of(&canonical));
    println!();
    println!("{}", canonical.head(Some(rows)));
    Ok(())
}
