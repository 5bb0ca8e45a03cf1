//! causim command-line interface.
//!
//! Run one simulation, compare both clock algorithms on the same input, or
//! sweep the node count on complete graphs.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use causim::clock::AlgorithmKind;
use causim::engine::{audit, run, Mode, RunOutput, SimConfig, Topology};
use causim::input;
use causim::types::SimParams;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "causim")]
#[command(version, about = "Vector clock simulator: naive vs Singhal-Kshemkalyani", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and write the merged event log
    Run {
        /// Input file: "n l a m" header, then 1-based adjacency lines
        #[arg(short, long)]
        input: PathBuf,

        /// Clock algorithm (naive | sk)
        #[arg(long, default_value = "sk")]
        algorithm: AlgorithmKind,

        /// Runner (realtime | lockstep)
        #[arg(long, default_value = "realtime")]
        mode: Mode,

        /// Run seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Log destination (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Re-check causality on the finished logs
        #[arg(long)]
        audit: bool,
    },

    /// Run both algorithms on the same input and print both averages
    Compare {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Runner (realtime | lockstep)
        #[arg(long, default_value = "realtime")]
        mode: Mode,

        /// Run seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Average payload size of both algorithms on complete graphs, as CSV
    Sweep {
        /// Smallest node count
        #[arg(long)]
        from: usize,

        /// Largest node count (inclusive)
        #[arg(long)]
        to: usize,

        /// Mean inter-arrival time in milliseconds
        #[arg(long, default_value_t = 1.0)]
        l: f64,

        /// Send bias; each timeout sends with probability 1 / (1 + a)
        #[arg(long, default_value_t = 1.0)]
        a: f64,

        /// Sends per node
        #[arg(long, default_value_t = 50)]
        m: usize,

        /// Runner (realtime | lockstep)
        #[arg(long, default_value = "realtime")]
        mode: Mode,

        /// Run seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            input,
            algorithm,
            mode,
            seed,
            output,
            audit,
        } => run_once(&input, algorithm, mode, seed, output.as_deref(), audit),
        Commands::Compare { input, mode, seed } => compare(&input, mode, seed),
        Commands::Sweep {
            from,
            to,
            l,
            a,
            m,
            mode,
            seed,
        } => sweep(from, to, SweepParams { l, a, m }, mode, seed),
    }
}

fn load_config(path: &Path, algorithm: AlgorithmKind, seed: u64) -> Result<SimConfig> {
    let spec = input::load(path).with_context(|| format!("loading {}", path.display()))?;
    spec.into_config(algorithm, seed)
        .with_context(|| format!("invalid input {}", path.display()))
}

fn run_once(
    path: &Path,
    algorithm: AlgorithmKind,
    mode: Mode,
    seed: u64,
    output: Option<&Path>,
    check: bool,
) -> Result<()> {
    let config = load_config(path, algorithm, seed)?;
    let topology = config.topology.clone();
    let quota = config.params.send_quota;
    let out = run(config, mode).with_context(|| format!("{mode} run with {algorithm}"))?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            out.merged.write_to(BufWriter::new(file))?;
            info!(path = %path.display(), "log written");
        }
        None => out.merged.write_to(io::stdout().lock())?,
    }
    println!(
        "{algorithm}: average payload {:.3} bytes per send",
        out.average_payload_bytes()
    );

    if check {
        let report = audit(&out.logs, &topology, quota);
        if !report.is_clean() {
            for v in &report.violations {
                eprintln!("audit: {v}");
            }
            bail!("audit found {} violation(s)", report.violations.len());
        }
        println!(
            "audit: {} entries, {} messages matched, no violations",
            report.entries_checked, report.messages_matched
        );
    }
    Ok(())
}

fn compare(path: &Path, mode: Mode, seed: u64) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for algorithm in AlgorithmKind::ALL {
        let config = load_config(path, algorithm, seed)?;
        let out = run(config, mode).with_context(|| format!("{mode} run with {algorithm}"))?;
        writeln!(stdout, "{}", summary(&out))?;
    }
    Ok(())
}

struct SweepParams {
    l: f64,
    a: f64,
    m: usize,
}

fn sweep(from: usize, to: usize, p: SweepParams, mode: Mode, seed: u64) -> Result<()> {
    if from < 2 || from > to {
        bail!("sweep range {from}..={to} must be non-empty and start at 2 or more");
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "n,naive,sk")?;
    for n in from..=to {
        let params = SimParams {
            node_count: n,
            mean_interarrival_ms: p.l,
            send_bias: p.a,
            send_quota: p.m,
        };
        let topology = Topology::complete(n)?;
        let mut averages = [0.0; 2];
        for (slot, algorithm) in averages.iter_mut().zip(AlgorithmKind::ALL) {
            let config = SimConfig::new(params, topology.clone(), algorithm).with_seed(seed);
            *slot = run(config, mode)
                .with_context(|| format!("n = {n}, {algorithm}"))?
                .average_payload_bytes();
        }
        writeln!(stdout, "{n},{:.3},{:.3}", averages[0], averages[1])?;
        stdout.flush()?;
    }
    Ok(())
}

fn summary(out: &RunOutput) -> String {
    format!(
        "{}: average {:.3} bytes per send over {} entries ({:.1} ms)",
        out.algorithm,
        out.average_payload_bytes(),
        out.merged.entries().len(),
        out.wall_time.as_secs_f64() * 1000.0
    )
}
