// src/bin/ris_dataset.rs
//
// Command-line driver: load a config, generate the SE/EE datasets, print
// a summary. All of the real work lives in the library.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use ris_physics::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use ris_physics::{DatasetGenerator, Objective, RisResult, RunSummary, SimulationConfig};

/// Generate RIS phase-shift training datasets.
#[derive(Parser, Debug)]
#[command(name = "ris_dataset", version)]
struct Cli {
    /// TOML config file; built-in defaults when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the number of scenarios.
    #[arg(long)]
    samples: Option<usize>,

    /// Override the master seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for se_dataset.txt and ee_dataset.txt.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Worker threads (0 = one per core).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// -v debug, -vv trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn build_config(cli: &Cli) -> RisResult<SimulationConfig> {
    let mut cfg = match cli.config {
        Some(ref path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(samples) = cli.samples {
        cfg.samples = samples;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    Ok(cfg)
}

fn print_summary(summary: &RunSummary, cli: &Cli) {
    println!("samples:      {}", summary.samples);
    println!("mean SE:      {:.4} bit/s/Hz", summary.mean_se);
    println!("mean EE:      {:.4} bit/s/Hz/W", summary.mean_ee);
    println!("blocked:      {:.1}%", summary.blocked_fraction * 100.0);
    for objective in Objective::ALL {
        println!("{} not converged: {}", objective, summary.non_converged(objective));
    }
    println!("output:       {}", cli.out_dir.display());
}

fn run(cli: &Cli) -> RisResult<RunSummary> {
    let cfg = build_config(cli)?;
    let generator = DatasetGenerator::new(cfg)?;
    generator.run_to_dir(&cli.out_dir)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = if cli.quiet {
        LogConfig { format: cli.log_format, ..LogConfig::quiet() }
    } else {
        LogConfig {
            level: LogLevel::from_verbosity(cli.verbose),
            format: cli.log_format,
            thread_names: cli.verbose > 1,
            ..Default::default()
        }
    };
    init_logging(&log_config);

    if cli.threads > 0 {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
        {
            tracing::warn!(%err, "could not size the thread pool, using the default");
        }
    }

    match run(&cli) {
        Ok(summary) => {
            print_summary(&summary, &cli);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "dataset generation failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
