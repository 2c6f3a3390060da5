// snarc: arithmetic circuits to canonical R1CS
//
// This library provides the artifacts that sit between a circuit compiler and
// an external proving system:
//
// 1. **Circuits**: a streaming reader for the line-oriented `.arith` format and
//    a reference interpreter ("judge") computing a circuit's outputs directly.
// 2. **R1CS**: the constraint-system model, a lowering from circuits, and the
//    JSON-Lines codec with the power-of-two padding transparent backends need.
// 3. **Proof envelopes**: scheme-tagged JSON wrappers for opaque pairing-based
//    proofs and structured IOP transcripts.
//
// ```rust
// use snarc::{Bn254Fr, CircuitProgram, JudgeConfig, compile_program, judge_program};
// # fn main() -> Result<(), Box<dyn std::error::Error>> {
// let program: CircuitProgram = "total 3\ninput 0\ninput 1\nmul in 2 < 0 1 > out 1 < 2 >\noutput 2\n".parse()?;
// let values = snarc::read_value_list::<Bn254Fr>("0 3\n1 5\n".as_bytes())?;
//
// let outcome = judge_program(&program, values.clone(), &JudgeConfig::default())?;
// assert_eq!(outcome.outputs[0].value.to_u64(), Some(15));
//
// let compiled = compile_program(&program, values, &JudgeConfig::default())?;
// compiled.system.is_satisfied(&compiled.assignment)?;
// # Ok(())
// # }
// ```

macro_rules! snarc_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*);
    };
}

pub mod errors;
pub mod field;

pub mod circuit;
pub mod judge;
pub mod proof;
pub mod snarks;

pub use circuit::{
    CircuitProgram, CircuitReader, Command, CommandView, Opcode, parse_program, read_value_list,
    read_value_list_file,
};
pub use errors::{SnarcError, SnarcResult};
pub use field::{Bn254Fr, EdwardsFr, FieldParams, FieldValue, Ristretto255Scalar};
pub use judge::{Interpreter, JudgeConfig, JudgeOutcome, judge_file, judge_program};
pub use proof::{ProofEnvelope, ProofScheme, ProofTranscript, TrustedSetup};
pub use snarks::codec::{CodecConfig, decode_r1cs, encode_r1cs};
pub use snarks::compiler::{CompiledCircuit, compile_program};
pub use snarks::r1cs::{Assignment, Constraint, ConstraintSystem, LinearCombination, WitnessPadding};
