//! Error taxonomy shared by the circuit reader, the judge, the R1CS codec and
//! the proof envelope codec.
//!
//! Every failure aborts the operation that raised it: no program, constraint
//! system or transcript is ever handed back partially populated.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnarcError {
    #[error("malformed header: {details}")]
    MalformedHeader { details: String },

    #[error("found '{found}', expected: {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("{what} index {index} out of range (bound {bound})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("unexpected index in value list: found {found}, expected {expected}")]
    UnexpectedIndex { found: usize, expected: usize },

    #[error("{opcode}: expected {expected}, got {inputs} inputs and {outputs} outputs")]
    ArityMismatch {
        opcode: &'static str,
        expected: &'static str,
        inputs: usize,
        outputs: usize,
    },

    #[error("cannot allocate {requested} {what}")]
    CapacityExceeded { what: &'static str, requested: usize },

    #[error("division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("{context}: found set bit after position {from} (at {position})")]
    SoundnessViolation {
        context: String,
        from: usize,
        position: usize,
    },

    #[error("constraint {constraint} not satisfied: {details}")]
    Unsatisfied { constraint: usize, details: String },

    #[error("scheme mismatch: envelope is '{found}', expected '{expected}'")]
    SchemeMismatch { found: String, expected: String },

    #[error("i/o failure on {path}: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization mismatch: {details}")]
    SerializationMismatch { details: String },

    #[error("backend '{scheme}' failed: {details}")]
    Backend { scheme: String, details: String },
}

pub type SnarcResult<T> = Result<T, SnarcError>;

impl SnarcError {
    pub fn malformed_header(details: impl Into<String>) -> Self {
        Self::MalformedHeader {
            details: details.into(),
        }
    }

    pub fn unexpected_token(found: impl Into<String>, expected: impl Into<String>) -> Self {
        let mut found = found.into();
        while found.ends_with('\n') || found.ends_with('\r') {
            found.pop();
        }
        Self::UnexpectedToken {
            found,
            expected: expected.into(),
        }
    }

    pub fn index_out_of_range(what: &'static str, index: usize, bound: usize) -> Self {
        Self::IndexOutOfRange { what, index, bound }
    }

    pub fn division_by_zero(context: impl Into<String>) -> Self {
        Self::DivisionByZero {
            context: context.into(),
        }
    }

    pub fn soundness_violation(context: impl Into<String>, from: usize, position: usize) -> Self {
        Self::SoundnessViolation {
            context: context.into(),
            from,
            position,
        }
    }

    pub fn unsatisfied(constraint: usize, details: impl Into<String>) -> Self {
        Self::Unsatisfied {
            constraint,
            details: details.into(),
        }
    }

    pub fn scheme_mismatch(found: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::SchemeMismatch {
            found: found.into(),
            expected: expected.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn serialization_mismatch(details: impl Into<String>) -> Self {
        Self::SerializationMismatch {
            details: details.into(),
        }
    }

    pub fn capacity_exceeded(what: &'static str, requested: usize) -> Self {
        Self::CapacityExceeded { what, requested }
    }

    pub fn backend(scheme: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Backend {
            scheme: scheme.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for SnarcError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_mismatch(format!("invalid JSON: {err}"))
    }
}
