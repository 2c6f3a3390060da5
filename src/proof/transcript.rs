//! Structured proofs of the IOP-based backends (Aurora, Fractal, Ligero).
//!
//! Every array keeps the order the prover produced it in; the verifier
//! replays them positionally.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::serde_base64_vec_vec;
use crate::field::{FieldParams, FieldValue};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MembershipProof {
    #[serde(with = "serde_base64_vec_vec")]
    pub auxiliary_hashes: Vec<Vec<u8>>,
    #[serde(with = "serde_base64_vec_vec")]
    pub randomness_hashes: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ProofTranscript<P: FieldParams> {
    /// One vector of field elements per prover round.
    pub prover_messages: Vec<Vec<FieldValue<P>>>,
    /// Merkle roots, one per committed oracle round.
    #[serde(rename = "MT_roots", with = "serde_base64_vec_vec")]
    pub mt_roots: Vec<Vec<u8>>,
    #[serde(deserialize_with = "lenient_positions")]
    pub query_positions: Vec<Vec<u64>>,
    /// Per query round, per position, the oracle values answered.
    pub query_responses: Vec<Vec<Vec<FieldValue<P>>>>,
    #[serde(rename = "MT_leaf_positions", deserialize_with = "lenient_positions")]
    pub mt_leaf_positions: Vec<Vec<u64>>,
    #[serde(rename = "MT_set_membership_proofs")]
    pub mt_set_membership_proofs: Vec<MembershipProof>,
    pub total_depth_without_pruning: u64,
}

impl<P: FieldParams> Default for ProofTranscript<P> {
    fn default() -> Self {
        Self {
            prover_messages: Vec::new(),
            mt_roots: Vec::new(),
            query_positions: Vec::new(),
            query_responses: Vec::new(),
            mt_leaf_positions: Vec::new(),
            mt_set_membership_proofs: Vec::new(),
            total_depth_without_pruning: 0,
        }
    }
}

impl<P: FieldParams> ProofTranscript<P> {
    /// Field elements carried by prover messages and query responses.
    pub fn field_element_count(&self) -> usize {
        let messages: usize = self.prover_messages.iter().map(Vec::len).sum();
        let responses: usize = self
            .query_responses
            .iter()
            .flat_map(|round| round.iter().map(Vec::len))
            .sum();
        messages + responses
    }
}

/// Positions are written as JSON numbers; older provers wrote them as
/// decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Position {
    Number(u64),
    Text(String),
}

impl Position {
    fn into_u64<E: de::Error>(self) -> Result<u64, E> {
        match self {
            Position::Number(n) => Ok(n),
            Position::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid position '{s}'"))),
        }
    }
}

fn lenient_positions<'de, D>(deserializer: D) -> Result<Vec<Vec<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<Vec<Position>>::deserialize(deserializer)?;
    rows.into_iter()
        .map(|row| row.into_iter().map(Position::into_u64).collect())
        .collect()
}
