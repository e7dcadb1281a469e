use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use discordia_core::{Discord, DiscordConfig, DistanceStrategy, Series};

#[derive(Parser)]
#[command(name = "discordia")]
#[command(about = "Time-series discord discovery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for the parallel profile (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Find the discord of a series read from a file (one sample per line)
    Find {
        /// Path to the input file
        #[arg(long)]
        data: PathBuf,

        /// Sliding window length
        #[arg(long)]
        window: usize,

        /// Distance strategy: "direct", "triangular", or "compact"
        #[arg(long, default_value = "compact")]
        strategy: String,

        /// Also compute the full nearest-neighbor profile in parallel
        #[arg(long, default_value_t = false)]
        profile: bool,
    },

    /// Run the search on a generated signal with an injected anomaly
    Demo {
        /// Series length
        #[arg(long, default_value_t = 1000)]
        len: usize,

        /// Sliding window length
        #[arg(long, default_value_t = 50)]
        window: usize,

        /// Sample index where the anomaly burst starts (defaults to len/2)
        #[arg(long)]
        anomaly_at: Option<usize>,

        /// RNG seed for the background noise
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Distance strategy: "direct", "triangular", or "compact"
        #[arg(long, default_value = "compact")]
        strategy: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct FindOutput {
    n_samples: usize,
    window_len: usize,
    strategy: String,
    discord_loc: Option<usize>,
    discord_neighbor: Option<usize>,
    distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct DemoOutput {
    n_samples: usize,
    window_len: usize,
    strategy: String,
    seed: u64,
    anomaly_at: usize,
    discord_loc: Option<usize>,
    distance: f64,
    recovered: bool,
}

fn parse_strategy(s: &str) -> Result<DistanceStrategy> {
    match s {
        "direct" => Ok(DistanceStrategy::Direct),
        "triangular" => Ok(DistanceStrategy::TriangularMatrix),
        "compact" => Ok(DistanceStrategy::CompactArray),
        other => anyhow::bail!("unknown strategy: {other} (expected direct, triangular, or compact)"),
    }
}

/// Read one sample per line; blank lines and `#` comments are skipped.
fn read_series(path: &Path) -> Result<Series> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut values = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("line {}: not a number: {trimmed:?}", lineno + 1))?;
        values.push(value);
    }

    Series::new(values).context("invalid input series")
}

/// Sine carrier with seeded background noise and a tripled-amplitude burst
/// of one window length starting at `anomaly_at`.
fn synth_series(len: usize, window: usize, anomaly_at: usize, seed: u64) -> Result<Series> {
    ensure!(
        anomaly_at + window <= len,
        "anomaly at {anomaly_at} with window {window} does not fit in {len} samples"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let values: Vec<f64> = (0..len)
        .map(|i| {
            let carrier = (i as f64 * std::f64::consts::TAU / 80.0).sin();
            let v = if (anomaly_at..anomaly_at + window).contains(&i) {
                carrier * 3.0
            } else {
                carrier
            };
            v + rng.gen_range(-0.05..0.05)
        })
        .collect();

    Series::new(values).context("generated series invalid")
}

fn run_search(series: &Series, window: usize, strategy: DistanceStrategy) -> Result<Discord> {
    let config = DiscordConfig::new(window)?.with_strategy(strategy);
    let discord = config.find(series)?;
    info!(
        location = ?discord.location,
        distance = discord.distance.value(),
        "search complete"
    );
    Ok(discord)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Find {
            data,
            window,
            strategy,
            profile,
        } => {
            let parsed = parse_strategy(&strategy)?;
            let series = read_series(&data)?;
            info!(n_samples = series.len(), window, "series loaded");

            let discord = run_search(&series, window, parsed)?;

            let profile_values = if profile {
                let nn = DiscordConfig::new(window)?.profile(&series)?;
                Some(nn.distances.iter().map(|d| d.value()).collect())
            } else {
                None
            };

            let output = FindOutput {
                n_samples: series.len(),
                window_len: window,
                strategy,
                discord_loc: discord.location,
                discord_neighbor: discord.neighbor,
                distance: discord.distance.value(),
                profile: profile_values,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Demo {
            len,
            window,
            anomaly_at,
            seed,
            strategy,
        } => {
            let parsed = parse_strategy(&strategy)?;
            let anomaly_at = anomaly_at.unwrap_or(len / 2);
            let series = synth_series(len, window, anomaly_at, seed)?;
            info!(n_samples = len, window, anomaly_at, "synthetic series generated");

            let discord = run_search(&series, window, parsed)?;

            // The discord window should overlap the injected burst.
            let recovered = discord.location.is_some_and(|loc| {
                loc >= anomaly_at.saturating_sub(window) && loc < anomaly_at + window
            });

            let output = DemoOutput {
                n_samples: len,
                window_len: window,
                strategy,
                seed,
                anomaly_at,
                discord_loc: discord.location,
                distance: discord.distance.value(),
                recovered,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
