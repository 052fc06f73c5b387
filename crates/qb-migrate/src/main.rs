//! Quickbase app migration CLI.
//!
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use qb_migrate::config::DEFAULT_CONFIG_FILE;
use qb_migrate::pipeline::clear_all;
use qb_migrate::{ui, Config, Job, Pipeline, Store};

#[derive(Parser)]
#[command(name = "qb-migrate")]
#[command(version)]
#[command(about = "Migrate configuration between Quickbase apps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "QBM_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Working directory for intermediate files
    #[arg(short, long, value_name = "DIR", default_value = ".", global = true)]
    workdir: PathBuf,

    /// Dry run mode (don't write to the target app)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the source and target apps
    Config {
        /// Print user tokens in clear text
        #[arg(long)]
        show_tokens: bool,
    },

    /// Write an empty configuration file if none exists
    CreateConfig,

    /// Build the table mapping
    Mapping,

    /// Migrate code pages
    Pages,

    /// Migrate formula fields
    Fields,

    /// Build the mapping, then migrate code pages and formula fields
    Run,

    /// Set the max length of every text field in the target app
    FieldsLength,

    /// Generate custom text rules for the target app
    Rules,

    /// Remove all intermediate files
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Store::new(&cli.workdir);
    let config_path = cli.workdir.join(&cli.config);

    match cli.command {
        Commands::CreateConfig => create_config(&config_path)?,
        Commands::Clear => {
            clear_all(&store)?;
            ui::print_notice("Intermediate files removed");
        }
        Commands::Config { show_tokens } => {
            let pipeline = load_pipeline(&config_path, store, cli.dry_run)?;
            show_apps(&pipeline, show_tokens).await?;
        }
        Commands::Mapping => run_job(&config_path, store, cli.dry_run, Job::Mapping).await?,
        Commands::Pages => run_job(&config_path, store, cli.dry_run, Job::Pages).await?,
        Commands::Fields => run_job(&config_path, store, cli.dry_run, Job::Fields).await?,
        Commands::Run => run_job(&config_path, store, cli.dry_run, Job::Run).await?,
        Commands::FieldsLength => {
            let pipeline = load_pipeline(&config_path, store, cli.dry_run)?;
            let stats = pipeline.normalize_field_lengths().await?;
            ui::print_stats("Fields length", &stats);
        }
        Commands::Rules => {
            let pipeline = load_pipeline(&config_path, store, cli.dry_run)?;
            let stats = pipeline.generate_rules().await?;
            ui::print_stats("Custom text rules", &stats);
        }
    }

    Ok(())
}

fn load_pipeline(config_path: &Path, store: Store, dry_run: bool) -> anyhow::Result<Pipeline> {
    info!("Loading configuration from {:?}", config_path);

    let mut config = Config::load(config_path)?;
    if dry_run {
        config.options.dry_run = true;
    }

    Ok(Pipeline::new(config, store)?)
}

async fn run_job(config_path: &Path, store: Store, dry_run: bool, job: Job) -> anyhow::Result<()> {
    let pipeline = load_pipeline(config_path, store, dry_run)?;
    let stats = pipeline.run(job).await?;
    ui::print_stats(&format!("{job:?}"), &stats);
    Ok(())
}

async fn show_apps(pipeline: &Pipeline, show_tokens: bool) -> anyhow::Result<()> {
    let (source, target) = pipeline.apps().await?;
    let config = pipeline.config();

    let table = ui::apps_table(
        &[
            ("Source", &config.source, &source),
            ("Target", &config.target, &target),
        ],
        show_tokens,
    );
    println!("{table}");
    Ok(())
}

fn create_config(path: &Path) -> anyhow::Result<()> {
    if Config::create_default(path)? {
        println!("✅ Generated configuration: {}", path.display());
        println!("   Fill in the source and target apps, then run: qb-migrate config");
    } else {
        ui::print_notice(&format!("{} already exists, left unchanged", path.display()));
    }
    Ok(())
}
