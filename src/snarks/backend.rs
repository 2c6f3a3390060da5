//! Seam to external proving systems.
//!
//! Proof generation lives in external libraries (libsnark for the pairing
//! schemes, libiop for the IOP schemes). This module fixes what they are
//! handed: a constraint system dimensioned the way the scheme expects, and
//! envelopes in the formats of [`crate::proof`].

use super::r1cs::{Assignment, ConstraintSystem, WitnessPadding};
use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};
use crate::proof::{ProofEnvelope, ProofScheme, TrustedSetup};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DomainType {
    Affine,
    #[default]
    MultiplicativeCoset,
}

/// Parameters forwarded to libiop's Aurora/Fractal/Ligero provers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IopOptions {
    pub security_parameter: usize,
    pub fri_localization_parameter: usize,
    pub rs_extra_dimensions: usize,
    pub domain_type: DomainType,
    pub make_zk: bool,
}

impl Default for IopOptions {
    fn default() -> Self {
        Self {
            security_parameter: 128,
            fri_localization_parameter: 3,
            rs_extra_dimensions: 2,
            domain_type: DomainType::MultiplicativeCoset,
            make_zk: true,
        }
    }
}

/// How a scheme needs the constraint system shaped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BackendLayout {
    /// Constraint count rounded up to a power of two.
    pub pad_constraints: bool,
    /// Primary input count rounded up to `2^k - 1`.
    pub pad_inputs: bool,
    pub witness: WitnessPadding,
}

impl BackendLayout {
    pub fn for_scheme(scheme: ProofScheme) -> Self {
        match scheme {
            ProofScheme::Groth16 | ProofScheme::Bctv14a => Self {
                pad_constraints: false,
                pad_inputs: false,
                witness: WitnessPadding::Disabled,
            },
            ProofScheme::Aurora | ProofScheme::Ligero => Self {
                pad_constraints: true,
                pad_inputs: true,
                witness: WitnessPadding::Disabled,
            },
            ProofScheme::Fractal => Self {
                pad_constraints: true,
                pad_inputs: true,
                witness: WitnessPadding::ToNextPowerOfTwo,
            },
        }
    }
}

/// Pads `system` and `assignment` in place for `scheme`. Idempotent.
pub fn prepare_for_backend<P: FieldParams>(
    scheme: ProofScheme,
    system: &mut ConstraintSystem<P>,
    assignment: &mut Assignment<P>,
) -> SnarcResult<()> {
    assignment.validate(system)?;
    let layout = BackendLayout::for_scheme(scheme);
    if layout.pad_constraints {
        system.pad();
    }
    if layout.pad_inputs {
        system.pad_inputs();
        assignment.pad_inputs(layout.witness);
        if layout.witness == WitnessPadding::ToNextPowerOfTwo {
            system.pad_auxiliary();
        }
    }
    snarc_debug!(
        "[backend] {}: {} constraints, {} primary, {} auxiliary",
        scheme,
        system.num_constraints(),
        system.primary_input_size(),
        system.auxiliary_input_size()
    );
    assignment.validate(system)
}

/// An external prover/verifier for one scheme.
pub trait ProvingBackend<P: FieldParams> {
    fn scheme(&self) -> ProofScheme;

    /// Key generation; transparent schemes return `None`.
    fn setup(&self, system: &ConstraintSystem<P>) -> SnarcResult<Option<TrustedSetup>>;

    fn prove(
        &self,
        system: &ConstraintSystem<P>,
        assignment: &Assignment<P>,
        setup: Option<&TrustedSetup>,
    ) -> SnarcResult<ProofEnvelope<P>>;

    fn verify(
        &self,
        system: &ConstraintSystem<P>,
        primary_input: &[FieldValue<P>],
        proof: &ProofEnvelope<P>,
        setup: Option<&TrustedSetup>,
    ) -> SnarcResult<bool>;
}

/// Prepares, sets up, proves, pushes the proof through its JSON envelope and
/// verifies it, the way the command-line drivers chain a backend.
pub fn prove_and_verify<P: FieldParams, B: ProvingBackend<P>>(
    backend: &B,
    mut system: ConstraintSystem<P>,
    mut assignment: Assignment<P>,
) -> SnarcResult<bool> {
    let scheme = backend.scheme();
    prepare_for_backend(scheme, &mut system, &mut assignment)?;

    let setup = match backend.setup(&system)? {
        Some(setup) => {
            let json = setup.to_json()?;
            Some(TrustedSetup::from_json(&json, scheme)?)
        }
        None if !scheme.is_transparent() => {
            return Err(SnarcError::backend(
                scheme.as_str(),
                "no trusted setup produced",
            ));
        }
        None => None,
    };

    let proof = backend.prove(&system, &assignment, setup.as_ref())?;
    let decoded = ProofEnvelope::from_json_as(&proof.to_json()?, scheme)?;
    backend.verify(&system, &assignment.primary_input, &decoded, setup.as_ref())
}
