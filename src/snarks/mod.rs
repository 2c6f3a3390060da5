//! Rank-1 constraint systems
//!
//! - `r1cs`: the constraint-system model, satisfiability and padding
//! - `codec`: the JSON-Lines (`.j1cs`) encoding and its assignment sidecar
//! - `compiler`: lowering of `.arith` circuits into constraints plus witness
//! - `backend`: the seam to external provers and per-scheme padding

pub mod backend;
pub mod codec;
pub mod compiler;
pub mod r1cs;
