//! Scheme-tagged JSON envelopes for proofs and trusted setups.
//!
//! Every envelope is a JSON object whose `"type"` names the proving scheme.
//! Pairing-based schemes carry opaque base64 blobs produced by the backend;
//! IOP-based schemes carry a [`ProofTranscript`] with its arrays spelled out.

pub mod transcript;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{SnarcError, SnarcResult};
use crate::field::FieldParams;

pub use transcript::{MembershipProof, ProofTranscript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofScheme {
    Groth16,
    Bctv14a,
    Aurora,
    Fractal,
    Ligero,
}

impl ProofScheme {
    pub const ALL: [ProofScheme; 5] = [
        ProofScheme::Groth16,
        ProofScheme::Bctv14a,
        ProofScheme::Aurora,
        ProofScheme::Fractal,
        ProofScheme::Ligero,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProofScheme::Groth16 => "groth16",
            ProofScheme::Bctv14a => "bctv14a",
            ProofScheme::Aurora => "aurora",
            ProofScheme::Fractal => "fractal",
            ProofScheme::Ligero => "ligero",
        }
    }

    /// IOP-based schemes: no trusted setup, structured transcripts, and
    /// power-of-two dimensioned constraint systems.
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            ProofScheme::Aurora | ProofScheme::Fractal | ProofScheme::Ligero
        )
    }
}

impl fmt::Display for ProofScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofScheme {
    type Err = SnarcError;

    fn from_str(s: &str) -> SnarcResult<Self> {
        ProofScheme::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == s)
            .ok_or_else(|| {
                SnarcError::scheme_mismatch(s, "groth16, bctv14a, aurora, fractal or ligero")
            })
    }
}

/// Proof bytes produced by a pairing-based backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueProof {
    #[serde(rename = "type")]
    pub scheme: ProofScheme,
    #[serde(rename = "proof", with = "serde_base64_vec")]
    pub bytes: Vec<u8>,
}

/// `"type"` written by the libsnark wrapper for either pairing-based scheme.
pub const LIBSNARK_SETUP_TAG: &str = "libsnark";

/// Keys produced by a pairing-based backend's setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedSetup {
    #[serde(rename = "type")]
    pub scheme: ProofScheme,
    #[serde(with = "serde_base64_vec")]
    pub verification_key: Vec<u8>,
    #[serde(with = "serde_base64_vec")]
    pub proving_key: Vec<u8>,
    #[serde(default, with = "serde_base64_vec")]
    pub preprocess_verification_key: Vec<u8>,
}

impl TrustedSetup {
    pub fn to_json(&self) -> SnarcResult<String> {
        if self.scheme.is_transparent() {
            return Err(SnarcError::scheme_mismatch(
                self.scheme.as_str(),
                "a scheme with a trusted setup",
            ));
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a setup tagged with `expected`. Setups written by the libsnark
    /// wrapper carry `"type":"libsnark"` and are taken as `expected` when that
    /// is a pairing-based scheme.
    pub fn from_json(json: &str, expected: ProofScheme) -> SnarcResult<Self> {
        let mut value: Value = serde_json::from_str(json)?;
        let is_libsnark = value.get("type").and_then(Value::as_str) == Some(LIBSNARK_SETUP_TAG);
        if is_libsnark && !expected.is_transparent() {
            value["type"] = Value::from(expected.as_str());
        }
        let scheme = envelope_scheme(&value)?;
        expect_scheme(scheme, expected)?;
        if scheme.is_transparent() {
            return Err(SnarcError::scheme_mismatch(
                scheme.as_str(),
                "a scheme with a trusted setup",
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> SnarcResult<()> {
        write_text(path.as_ref(), &self.to_json()?)
    }

    pub fn read_file(path: impl AsRef<Path>, expected: ProofScheme) -> SnarcResult<Self> {
        Self::from_json(&read_text(path.as_ref())?, expected)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct TranscriptEnvelope<P: FieldParams> {
    #[serde(rename = "type")]
    scheme: ProofScheme,
    #[serde(flatten)]
    transcript: ProofTranscript<P>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofEnvelope<P: FieldParams> {
    Opaque(OpaqueProof),
    Transcript {
        scheme: ProofScheme,
        transcript: ProofTranscript<P>,
    },
}

impl<P: FieldParams> ProofEnvelope<P> {
    pub fn opaque(scheme: ProofScheme, bytes: Vec<u8>) -> SnarcResult<Self> {
        if scheme.is_transparent() {
            return Err(SnarcError::scheme_mismatch(
                scheme.as_str(),
                "a pairing-based scheme",
            ));
        }
        Ok(Self::Opaque(OpaqueProof { scheme, bytes }))
    }

    pub fn transcript(scheme: ProofScheme, transcript: ProofTranscript<P>) -> SnarcResult<Self> {
        if !scheme.is_transparent() {
            return Err(SnarcError::scheme_mismatch(
                scheme.as_str(),
                "an IOP-based scheme",
            ));
        }
        Ok(Self::Transcript { scheme, transcript })
    }

    pub fn scheme(&self) -> ProofScheme {
        match self {
            ProofEnvelope::Opaque(proof) => proof.scheme,
            ProofEnvelope::Transcript { scheme, .. } => *scheme,
        }
    }

    pub fn to_json(&self) -> SnarcResult<String> {
        let json = match self {
            ProofEnvelope::Opaque(proof) => serde_json::to_string(proof)?,
            ProofEnvelope::Transcript { scheme, transcript } => {
                serde_json::to_string(&TranscriptEnvelopeRef {
                    scheme: *scheme,
                    transcript,
                })?
            }
        };
        Ok(json)
    }

    /// Decodes an envelope of whatever scheme its `"type"` names.
    pub fn from_json(json: &str) -> SnarcResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let scheme = envelope_scheme(&value)?;
        Self::from_value(scheme, value)
    }

    /// Decodes an envelope, failing with `SchemeMismatch` unless it is tagged
    /// with `expected`.
    pub fn from_json_as(json: &str, expected: ProofScheme) -> SnarcResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let scheme = envelope_scheme(&value)?;
        expect_scheme(scheme, expected)?;
        Self::from_value(scheme, value)
    }

    fn from_value(scheme: ProofScheme, value: Value) -> SnarcResult<Self> {
        let has_proof_blob = value.get("proof").is_some();
        if scheme.is_transparent() {
            if has_proof_blob {
                return Err(SnarcError::scheme_mismatch(
                    scheme.as_str(),
                    "a structured transcript for an IOP-based scheme",
                ));
            }
            let envelope: TranscriptEnvelope<P> = serde_json::from_value(value)?;
            Ok(Self::Transcript {
                scheme,
                transcript: envelope.transcript,
            })
        } else {
            if !has_proof_blob {
                return Err(SnarcError::scheme_mismatch(
                    scheme.as_str(),
                    "an opaque proof for a pairing-based scheme",
                ));
            }
            Ok(Self::Opaque(serde_json::from_value(value)?))
        }
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> SnarcResult<()> {
        write_text(path.as_ref(), &self.to_json()?)
    }

    pub fn read_file(path: impl AsRef<Path>) -> SnarcResult<Self> {
        Self::from_json(&read_text(path.as_ref())?)
    }

    pub fn read_file_as(path: impl AsRef<Path>, expected: ProofScheme) -> SnarcResult<Self> {
        Self::from_json_as(&read_text(path.as_ref())?, expected)
    }
}

#[derive(Serialize)]
#[serde(bound = "")]
struct TranscriptEnvelopeRef<'a, P: FieldParams> {
    #[serde(rename = "type")]
    scheme: ProofScheme,
    #[serde(flatten)]
    transcript: &'a ProofTranscript<P>,
}

fn envelope_scheme(value: &Value) -> SnarcResult<ProofScheme> {
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SnarcError::serialization_mismatch("envelope has no \"type\" string"))?;
    tag.parse()
}

fn expect_scheme(found: ProofScheme, expected: ProofScheme) -> SnarcResult<()> {
    if found != expected {
        return Err(SnarcError::scheme_mismatch(found.as_str(), expected.as_str()));
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> SnarcResult<()> {
    fs::write(path, text).map_err(|e| SnarcError::io(path, e))
}

fn read_text(path: &Path) -> SnarcResult<String> {
    fs::read_to_string(path).map_err(|e| SnarcError::io(path, e))
}

pub(crate) mod serde_base64_vec {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

pub(crate) mod serde_base64_vec_vec {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(payloads: &Vec<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: Vec<String> = payloads
            .iter()
            .map(|payload| BASE64_STANDARD.encode(payload))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|value| {
                BASE64_STANDARD
                    .decode(value.trim().as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
