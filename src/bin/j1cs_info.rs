//! Show information about a `.j1cs` constraint system.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use snarc::judge::values_path;
use snarc::snarks::backend::{BackendLayout, IopOptions, prepare_for_backend};
use snarc::snarks::codec::{read_assignment, read_r1cs_file};
use snarc::{
    Bn254Fr, CodecConfig, EdwardsFr, FieldParams, ProofScheme, Ristretto255Scalar, WitnessPadding,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Field {
    Bn254,
    Edwards,
    Ristretto255,
}

#[derive(Parser)]
#[command(name = "j1cs_info")]
#[command(about = "Decode a JSON-Lines R1CS and report its dimensions", long_about = None)]
struct Cli {
    /// Constraint system file
    system: PathBuf,

    /// Field the system is decoded over
    #[arg(long, value_enum, default_value = "bn254")]
    field: Field,

    /// Pad the primary input count to 2^k - 1 while decoding
    #[arg(long)]
    pad_instances: bool,

    /// Pad the constraint count to a power of two
    #[arg(long)]
    pad: bool,

    /// Shape the system for a proving scheme; needs the assignment
    #[arg(long)]
    scheme: Option<ProofScheme>,

    /// Check the assignment in `<system>.in`
    #[arg(long)]
    check: bool,

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

    match cli.field {
        Field::Bn254 => run::<Bn254Fr>(&cli),
        Field::Edwards => run::<EdwardsFr>(&cli),
        Field::Ristretto255 => run::<Ristretto255Scalar>(&cli),
    }
}

fn run<P: FieldParams>(cli: &Cli) -> Result<()> {
    let path: &Path = &cli.system;
    let config = CodecConfig {
        pad_instances: cli.pad_instances,
    };
    let mut system = read_r1cs_file::<P>(path, &config)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    if cli.pad {
        system.pad();
    }

    if cli.check || cli.scheme.is_some() {
        let mut assignment = read_assignment::<P>(values_path(path))?;
        if cli.pad_instances {
            assignment.pad_inputs(WitnessPadding::Disabled);
        }
        assignment.validate(&system)?;
        if let Some(scheme) = cli.scheme {
            prepare_for_backend(scheme, &mut system, &mut assignment)?;
            let layout = BackendLayout::for_scheme(scheme);
            info!("Shaped for {} ({:?})", scheme, layout);
            if scheme.is_transparent() {
                info!("IOP options: {:?}", IopOptions::default());
            }
        }
        system
            .is_satisfied(&assignment)
            .context("assignment does not satisfy the constraint system")?;
        println!("Satisfied: yes");
    }

    println!("Field:        {}", P::NAME);
    println!("Constraints:  {}", system.num_constraints());
    println!("Primary:      {}", system.primary_input_size());
    println!("Auxiliary:    {}", system.auxiliary_input_size());
    println!("Variables:    {}", system.num_variables());
    let digest: String = system.digest().iter().map(|b| format!("{b:02x}")).collect();
    println!("Digest:       {digest}");
    Ok(())
}
