//! SPI register-file regression runner.
//!
//! This binary is the single entry point for the harness. It provides:
//! 1. **Run:** Elaborate the bench, apply reset, run the random register test, print statistics.
//! 2. **Probes:** List the probe namespace the binder builds for a configuration.
//! 3. **Regs:** List the expanded register map.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use probebench_core::config::Config;
use probebench_core::verif::RegisterMap;
use probebench_core::{Error, Harness};

#[derive(Parser, Debug)]
#[command(
    name = "probebench",
    author,
    version,
    about = "SPI register-file regression harness",
    long_about = "Elaborate the SPI target, bind the probe namespace, and run a seeded random register test.\n\nConfiguration is JSON (see cfg/bench.json). Without --config the built-in defaults are used.\n\nExamples:\n  probebench run --config cfg/bench.json\n  probebench run --seed 7 --runs 500 --wave run.vcd\n  probebench probes\n  probebench regs --regs cfg/regs.json"
)]
struct Cli {
    /// Log filter (e.g. `info`, `probebench_core=debug`).
    #[arg(long, global = true, env = "PROBEBENCH_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the register read/write regression.
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Seed override.
        #[arg(long, env = "RANDOM_SEED")]
        seed: Option<u64>,

        /// Number of transactions (overrides `general.max_runs`).
        #[arg(short, long)]
        runs: Option<usize>,

        /// Write a VCD of the probe namespace to this file.
        #[arg(short, long)]
        wave: Option<PathBuf>,

        /// Statistics sections to print (`summary`, `registers`); default is all.
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// List the probe aliases bound for this configuration.
    Probes {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// List the expanded register map.
    Regs {
        #[command(flatten)]
        inputs: Inputs,
    },
}

#[derive(clap::Args, Debug)]
struct Inputs {
    /// Bench configuration (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Register map (JSON); overrides `regs_path` from the configuration.
    #[arg(long)]
    regs: Option<PathBuf>,
}

impl Inputs {
    fn load(&self) -> Result<(Config, RegisterMap), Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(regs) = &self.regs {
            config.regs_path.clone_from(regs);
        }
        let regmap = RegisterMap::load(&config.regs_path)?;
        Ok((config, regmap))
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|e| {
        eprintln!("Warning: bad log filter `{}` ({e}); using `info`", cli.log_level);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            inputs,
            seed,
            runs,
            wave,
            stats,
        } => cmd_run(&inputs, seed, runs, wave, &stats),
        Commands::Probes { inputs } => cmd_probes(&inputs),
        Commands::Regs { inputs } => cmd_regs(&inputs),
    };

    if let Err(e) = result {
        eprintln!("\n[!] {e}");
        process::exit(1);
    }
}

/// Runs the regression and prints the statistics.
///
/// The process exits with code 1 on any failure, including scoreboard
/// mismatches and protocol violations.
fn cmd_run(
    inputs: &Inputs,
    seed: Option<u64>,
    runs: Option<usize>,
    wave: Option<PathBuf>,
    sections: &[String],
) -> Result<(), Error> {
    let (mut config, regmap) = inputs.load()?;
    if let Some(seed) = seed {
        config.general.seed = seed;
    }
    if let Some(runs) = runs {
        config.general.max_runs = runs;
    }

    println!("Configuration: {}", inputs.config.as_ref().map_or_else(
        || "built-in defaults".to_string(),
        |p| p.display().to_string(),
    ));
    println!(
        "  Seed: {}  Runs: {}  SCLK: {} MHz  Chip addr: {}  Registers: {}",
        config.general.seed,
        config.general.max_runs,
        config.spi.freq_mhz,
        config.spi.chip_addr,
        regmap.len()
    );
    println!();

    let harness = Harness::new(config, regmap)?;
    println!("[*] {} probe aliases bound", harness.probes().len());

    let report = match wave {
        Some(path) => {
            let file = File::create(&path)?;
            let (report, _) = harness.run_with_wave(BufWriter::new(file))?;
            println!("[*] Waveform written to {}", path.display());
            report
        }
        None => harness.run()?,
    };

    report.stats.print_sections(sections);
    println!(
        "\n[*] PASS: {} transactions, {} reads compared, coverage {:.1}%, seed {}",
        report.runs, report.score.compared, report.coverage, report.seed
    );
    if !report.under_exercised.is_empty() {
        println!(
            "    {} register(s) below min_runs",
            report.under_exercised.writes.len() + report.under_exercised.reads.len()
        );
    }
    Ok(())
}

/// Elaborates the design and prints every probe alias with its source.
fn cmd_probes(inputs: &Inputs) -> Result<(), Error> {
    let (config, regmap) = inputs.load()?;
    let harness = Harness::new(config, regmap)?;
    for alias in harness.probes().iter() {
        println!(
            "{:<28} {:>3}  <- {}",
            alias.name(),
            alias.width(),
            alias.source_path()
        );
    }
    Ok(())
}

/// Prints the expanded register map in address order.
fn cmd_regs(inputs: &Inputs) -> Result<(), Error> {
    let (_, regmap) = inputs.load()?;
    let mut regs: Vec<_> = regmap.iter().collect();
    regs.sort_by_key(|r| r.addr);
    for reg in regs {
        println!(
            "{:#04x}  {:<24} {:>2} bit  {}  reset {:#06x}{}",
            reg.addr,
            reg.name,
            reg.width,
            if reg.writable() { "rw" } else { "ro" },
            reg.reset,
            if reg.unsupported { "  (unsupported)" } else { "" }
        );
    }
    Ok(())
}
