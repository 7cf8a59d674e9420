//! Command-line entry point for incentive distribution runs.
//!
//! `distribute` turns observations into a checksummed batch artifact,
//! `verify` and `checksum` inspect existing artifacts, and `query` prints the
//! subgraph query a run would send.

use clap::{Parser, Subcommand};
use incentive_batch::commands::distribute::{run_distribute, DistributeOptions};
use incentive_batch::source::{FileSource, ObservationSource};
use incentive_batch::{
    calculate_checksum, query::build_query, read_json, verify_checksum, ChecksumVerdict,
    DistributionState, IncentiveError, IncentivesConfig,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "incentives", version, about = "Liquidity incentive batch builder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute distributions and write a checksummed batch.
    Distribute {
        /// Run configuration (JSON).
        #[arg(long)]
        config: PathBuf,
        /// State file; defaults to `distribution_state.json` next to the config.
        #[arg(long)]
        state: Option<PathBuf>,
        /// Directory for the batch artifact.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Recorded observations (JSON) instead of querying the subgraph.
        #[arg(long)]
        observations: Option<PathBuf>,
        /// Pin `createdAt` (milliseconds) for a reproducible checksum.
        #[arg(long)]
        created_at: Option<u64>,
        /// Compute and log without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute the checksum of a batch artifact and compare it.
    Verify {
        /// Batch artifact (JSON).
        batch: PathBuf,
    },
    /// Print the checksum of a batch-shaped JSON file.
    Checksum {
        /// Batch-shaped JSON.
        file: PathBuf,
    },
    /// Print the subgraph query for a configuration.
    Query {
        /// Run configuration (JSON).
        #[arg(long)]
        config: PathBuf,
        /// Cursor; defaults to the one stored next to the config.
        #[arg(long)]
        since: Option<u64>,
    },
}

fn resolve_state_path(config: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| config.with_file_name("distribution_state.json"))
}

#[cfg(feature = "net")]
fn network_source(config: &IncentivesConfig) -> Result<Box<dyn ObservationSource>, IncentiveError> {
    let source =
        incentive_batch::source::SubgraphSource::new(&config.subgraph_url, config.account)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "net"))]
fn network_source(_config: &IncentivesConfig) -> Result<Box<dyn ObservationSource>, IncentiveError> {
    Err(IncentiveError::Config(
        "built without the `net` feature; pass --observations <file>".to_string(),
    ))
}

fn observation_source(
    config: &IncentivesConfig,
    observations: Option<PathBuf>,
) -> Result<Box<dyn ObservationSource>, IncentiveError> {
    match observations {
        Some(path) => Ok(Box::new(FileSource::new(path))),
        None => network_source(config),
    }
}

fn run(cli: Cli) -> Result<bool, IncentiveError> {
    match cli.command {
        Command::Distribute {
            config,
            state,
            output_dir,
            observations,
            created_at,
            dry_run,
        } => {
            let cfg = IncentivesConfig::load(&config)?;
            let source = observation_source(&cfg, observations)?;
            let opts = DistributeOptions {
                state_path: resolve_state_path(&config, state),
                output_dir,
                created_at,
                dry_run,
            };
            let summary = run_distribute(&cfg, source.as_ref(), &opts)?;
            match summary.checksum() {
                Some(checksum) => println!("{checksum}"),
                None => println!("nothing to distribute"),
            }
            if let Some(path) = summary.written {
                println!("{}", path.display());
            }
            Ok(true)
        }
        Command::Verify { batch } => {
            let value: serde_json::Value = read_json(&batch)?;
            match verify_checksum(&value)? {
                ChecksumVerdict::Match(checksum) => {
                    println!("ok {checksum}");
                    Ok(true)
                }
                ChecksumVerdict::Mismatch { stored, recomputed } => {
                    error!(%stored, %recomputed, path = %batch.display(), "checksum mismatch");
                    println!("mismatch stored={stored} recomputed={recomputed}");
                    Ok(false)
                }
            }
        }
        Command::Checksum { file } => {
            let value: serde_json::Value = read_json(&file)?;
            println!("{}", calculate_checksum(&value)?);
            Ok(true)
        }
        Command::Query { config, since } => {
            let cfg = IncentivesConfig::load(&config)?;
            let since = match since {
                Some(since) => since,
                None => DistributionState::load(&resolve_state_path(&config, None))?.since_timestamp,
            };
            info!(since, "building query");
            println!(
                "{}",
                build_query(&cfg.account, &cfg.tokens, since, cfg.max_observations)
            );
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
