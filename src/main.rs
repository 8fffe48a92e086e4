//! Contact-Harvester main entry point
//!
//! This is the command-line interface for the contact harvester.

use clap::Parser;
use contact_harvester::config::{load_config_with_hash, load_seeds, Config};
use contact_harvester::crawler::run_harvest;
use contact_harvester::output::{export_csv, load_statistics, log_statistics, print_statistics};
use contact_harvester::storage::{open_storage, rebuild_canonical};
use contact_harvester::IdentifierClassifier;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Contact-Harvester: a bounded crawler for personal contact addresses
///
/// Contact-Harvester crawls institutional websites seed by seed, honoring
/// robots.txt, and collects personal email addresses under the configured
/// domain suffix into an append-only log and a deduplicated table.
#[derive(Parser, Debug)]
#[command(name = "contact-harvester")]
#[command(version)]
#[command(about = "A bounded crawler for personal contact addresses", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed list to use instead of the one named in the configuration
    #[arg(long, value_name = "FILE")]
    seeds: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seeds and show what would be crawled
    #[arg(long, conflicts_with_all = ["stats", "rebuild_only", "export_csv"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "rebuild_only", "export_csv"])]
    stats: bool,

    /// Rebuild the canonical table from the raw log and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_csv"])]
    rebuild_only: bool,

    /// Write the raw and deduplicated tables as CSV files into DIR and exit
    #[arg(long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "rebuild_only"])]
    export_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.rebuild_only {
        handle_rebuild(&config)?;
    } else if let Some(dir) = &cli.export_csv {
        handle_export_csv(&config, dir)?;
    } else {
        let seeds_path = cli
            .seeds
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.seeds_path));
        let seeds = load_seeds(&seeds_path)?;
        tracing::info!("Loaded {} seed(s) from {}", seeds.len(), seeds_path.display());

        if cli.dry_run {
            handle_dry_run(&config, &seeds);
        } else {
            handle_harvest(config, &config_hash, &seeds).await?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("contact_harvester=info,warn"),
            1 => EnvFilter::new("contact_harvester=debug,info"),
            _ => EnvFilter::new("contact_harvester=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated plan
fn handle_dry_run(config: &Config, seeds: &[url::Url]) {
    println!("=== Contact-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pages per seed: {}", config.crawler.max_pages_per_seed);
    println!("  Worker pool: {}", config.crawler.worker_pool_size);
    println!("  Retries: {}", config.crawler.retry_attempts);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Failure threshold: {}",
        config.crawler.max_consecutive_failures
    );
    println!("  Queue ceiling: {}", config.crawler.queue_ceiling());
    println!(
        "  Common-page probes: {}",
        if config.crawler.probe_common_pages { "on" } else { "off" }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtraction:");
    println!("  Domain suffix: .{}", config.extraction.suffix());
    println!(
        "  Rendering: {}",
        if config.render.enabled { "on" } else { "off" }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start harvesting {} seed(s)", seeds.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --rebuild-only mode: re-runs the dedup pass
fn handle_rebuild(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let classifier = IdentifierClassifier::new(config.classifier.clone());
    let summary = rebuild_canonical(&mut storage, &classifier)?;

    println!(
        "✓ Rebuilt canonical table: {} unique identifiers from {} raw rows ({} rejected)",
        summary.canonical_rows, summary.raw_rows, summary.rejected
    );

    Ok(())
}

/// Handles the --export-csv mode: writes both tables as CSV
fn handle_export_csv(config: &Config, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting CSV ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", dir.display());
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let summary = export_csv(&storage, dir)?;

    println!(
        "✓ {} raw rows written to {}",
        summary.raw_rows,
        summary.raw_path.display()
    );
    println!(
        "✓ {} unique identifiers written to {}",
        summary.clean_rows,
        summary.clean_path.display()
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: &str,
    seeds: &[url::Url],
) -> Result<(), Box<dyn std::error::Error>> {
    let database_path = config.output.database_path.clone();

    match run_harvest(config, config_hash, seeds).await {
        Ok(summary) => {
            tracing::info!(
                "Run {} completed: {} seed(s) crawled, {} failed, {} occurrences, {} unique identifiers",
                summary.run_id,
                summary.seeds.len(),
                summary.failed_seeds,
                summary.raw_written,
                summary.rebuild.canonical_rows
            );
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    }

    let storage = open_storage(Path::new(&database_path))?;
    log_statistics(&load_statistics(&storage)?);

    Ok(())
}
