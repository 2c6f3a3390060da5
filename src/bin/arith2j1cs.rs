//! Compiles an `.arith` circuit and its value list into a `.j1cs` constraint
//! system plus its `.j1cs.in` assignment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use snarc::judge::values_path;
use snarc::snarks::backend::prepare_for_backend;
use snarc::snarks::codec::{write_assignment, write_r1cs_file};
use snarc::snarks::compiler::compile_file;
use snarc::{Bn254Fr, EdwardsFr, FieldParams, JudgeConfig, ProofScheme, Ristretto255Scalar};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Field {
    Bn254,
    Edwards,
    Ristretto255,
}

#[derive(Parser)]
#[command(name = "arith2j1cs")]
#[command(about = "Compile an arithmetic circuit to JSON-Lines R1CS", long_about = None)]
struct Cli {
    /// Circuit file; values are read from `<circuit>.in`
    circuit: PathBuf,

    /// Output path for the constraint system (defaults to <circuit>.j1cs)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field the circuit is compiled over
    #[arg(long, value_enum, default_value = "bn254")]
    field: Field,

    /// Shape the system for a proving scheme (groth16, bctv14a, aurora, fractal, ligero)
    #[arg(long)]
    scheme: Option<ProofScheme>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = cli.output.clone().unwrap_or_else(|| {
        let mut p = cli.circuit.clone();
        p.set_extension("j1cs");
        p
    });
    let config = JudgeConfig::from_env()?;

    match cli.field {
        Field::Bn254 => run::<Bn254Fr>(&cli.circuit, &output, cli.scheme, &config),
        Field::Edwards => run::<EdwardsFr>(&cli.circuit, &output, cli.scheme, &config),
        Field::Ristretto255 => {
            run::<Ristretto255Scalar>(&cli.circuit, &output, cli.scheme, &config)
        }
    }
}

fn run<P: FieldParams>(
    circuit: &Path,
    output: &Path,
    scheme: Option<ProofScheme>,
    config: &JudgeConfig,
) -> Result<()> {
    info!("Compiling {:?} over {}", circuit, P::NAME);
    let mut compiled = compile_file::<P>(circuit, config)
        .with_context(|| format!("failed to compile {}", circuit.display()))?;
    compiled
        .system
        .is_satisfied(&compiled.assignment)
        .context("compiled witness does not satisfy the constraint system")?;

    if let Some(scheme) = scheme {
        prepare_for_backend(scheme, &mut compiled.system, &mut compiled.assignment)?;
        info!("Shaped for {}", scheme);
    }

    write_r1cs_file(output, &compiled.system)?;
    let assignment_path = values_path(output);
    write_assignment(&assignment_path, &compiled.assignment)?;

    info!(
        "Wrote {} constraints ({} primary, {} auxiliary) to {:?}",
        compiled.system.num_constraints(),
        compiled.system.primary_input_size(),
        compiled.system.auxiliary_input_size(),
        output
    );
    info!("Assignment saved to {:?}", assignment_path);
    info!("Judge cost: {}", compiled.outcome.cost);
    Ok(())
}
