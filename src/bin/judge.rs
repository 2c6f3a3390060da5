//! Reference evaluator for `.arith` circuits.
//!
//! Reads `<circuit>` and its value list `<circuit>.in`, prints one bit string
//! per `output` command and reports the multiplication cost on stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use snarc::{Bn254Fr, EdwardsFr, FieldParams, JudgeConfig, Ristretto255Scalar, judge_file};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Field {
    Bn254,
    Edwards,
    Ristretto255,
}

#[derive(Parser)]
#[command(name = "judge")]
#[command(about = "Evaluate an arithmetic circuit against its value list", long_about = None)]
struct Cli {
    /// Circuit file; values are read from `<circuit>.in`
    circuit: PathBuf,

    /// Field the circuit is evaluated over
    #[arg(long, value_enum, default_value = "bn254")]
    field: Field,

    /// Width of each printed output (overrides SNARC_OUTPUT_WIDTH)
    #[arg(long)]
    output_width: Option<usize>,

    /// Bits checked by split/dload/div_W (overrides SNARC_MAX_WIDTH)
    #[arg(long)]
    max_width: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = JudgeConfig::from_env()?;
    if let Some(width) = cli.output_width {
        config.output_width = width;
    }
    if cli.max_width.is_some() {
        config.max_width = cli.max_width;
    }

    match cli.field {
        Field::Bn254 => run::<Bn254Fr>(&cli.circuit, &config),
        Field::Edwards => run::<EdwardsFr>(&cli.circuit, &config),
        Field::Ristretto255 => run::<Ristretto255Scalar>(&cli.circuit, &config),
    }
}

fn run<P: FieldParams>(circuit: &Path, config: &JudgeConfig) -> Result<()> {
    info!("Judging {:?} over {}", circuit, P::NAME);
    let outcome = judge_file::<P>(circuit, config)
        .with_context(|| format!("failed to judge {}", circuit.display()))?;

    for line in &outcome.outputs {
        println!("{}", line.rendered);
    }
    eprintln!("cost: {}", outcome.cost);
    Ok(())
}
