//! JSON-Lines encoding of constraint systems (`.j1cs`) and their
//! assignments (`.j1cs.in`).
//!
//! The first line is a header naming the instance, witness and constraint
//! counts; every following line is one constraint:
//!
//! ```text
//! {"r1cs":{"version":"1.0","extension_degree":1,"instance_nb":1,"witness_nb":2,"constraint_nb":1,"field_characteristic":"218882...617"}}
//! {"A":[[1,"1"]],"B":[[2,"1"]],"C":[[3,"1"]]}
//! ```
//!
//! Coefficients are decimal strings. Encoding is byte-stable: the same system
//! always produces the same text.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::r1cs::{Assignment, Constraint, ConstraintSystem, LinearCombination, padded_input_len};
use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};

pub const FORMAT_VERSION: &str = "1.0";

/// Decoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecConfig {
    /// Grow the primary input block to `next_pow2(instance_nb + 1) - 1` while
    /// decoding, shifting witness indices up accordingly.
    pub pad_instances: bool,
}

/// `field_characteristic` as written by current (decimal string) and legacy
/// (bare number) encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldCharacteristic {
    Decimal(String),
    Legacy(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct R1csHeader {
    pub version: String,
    pub extension_degree: u64,
    pub instance_nb: usize,
    pub witness_nb: usize,
    pub constraint_nb: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_characteristic: Option<FieldCharacteristic>,
}

impl R1csHeader {
    pub fn for_system<P: FieldParams>(system: &ConstraintSystem<P>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            extension_degree: 1,
            instance_nb: system.primary_input_size(),
            witness_nb: system.auxiliary_input_size(),
            constraint_nb: system.num_constraints(),
            field_characteristic: Some(FieldCharacteristic::Decimal(
                P::modulus().to_string(),
            )),
        }
    }

    fn check_field<P: FieldParams>(&self) -> SnarcResult<()> {
        if self.extension_degree != 1 {
            return Err(SnarcError::serialization_mismatch(format!(
                "extension degree {} is not supported",
                self.extension_degree
            )));
        }
        if let Some(FieldCharacteristic::Decimal(characteristic)) = &self.field_characteristic {
            if characteristic.trim() != P::modulus().to_string() {
                return Err(SnarcError::serialization_mismatch(format!(
                    "field characteristic {characteristic} does not match {}",
                    P::NAME
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct HeaderLine<'a> {
    r1cs: &'a R1csHeader,
}

#[derive(Serialize)]
#[serde(bound = "")]
struct ConstraintLineRef<'a, P: FieldParams> {
    #[serde(rename = "A")]
    a: &'a LinearCombination<P>,
    #[serde(rename = "B")]
    b: &'a LinearCombination<P>,
    #[serde(rename = "C")]
    c: &'a LinearCombination<P>,
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct ConstraintLine<P: FieldParams> {
    #[serde(rename = "A")]
    a: LinearCombination<P>,
    #[serde(rename = "B")]
    b: LinearCombination<P>,
    #[serde(rename = "C")]
    c: LinearCombination<P>,
}

#[derive(Serialize)]
#[serde(bound = "")]
struct WitnessFileRef<'a, P: FieldParams> {
    inputs: &'a [FieldValue<P>],
    witnesses: &'a [FieldValue<P>],
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct WitnessFile<P: FieldParams> {
    inputs: Vec<FieldValue<P>>,
    witnesses: Vec<FieldValue<P>>,
}

pub fn encode_r1cs<P: FieldParams, W: Write>(
    system: &ConstraintSystem<P>,
    mut writer: W,
) -> SnarcResult<()> {
    let header = R1csHeader::for_system(system);
    let write_err = |e| SnarcError::io("<r1cs output>", e);
    serde_json::to_writer(&mut writer, &HeaderLine { r1cs: &header })?;
    writer.write_all(b"\n").map_err(write_err)?;
    for constraint in system.constraints() {
        let line = ConstraintLineRef {
            a: &constraint.a,
            b: &constraint.b,
            c: &constraint.c,
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n").map_err(write_err)?;
    }
    writer.flush().map_err(write_err)
}

pub fn encode_r1cs_to_string<P: FieldParams>(system: &ConstraintSystem<P>) -> SnarcResult<String> {
    let mut out = Vec::new();
    encode_r1cs(system, &mut out)?;
    String::from_utf8(out).map_err(|e| SnarcError::serialization_mismatch(e.to_string()))
}

/// Parses the header line, with or without the `{"r1cs": ...}` wrapper.
pub fn decode_header(line: &str) -> SnarcResult<R1csHeader> {
    let value: Value = serde_json::from_str(line)?;
    let header = match value {
        Value::Object(mut map) if map.contains_key("r1cs") => map.remove("r1cs").unwrap_or_default(),
        other => other,
    };
    serde_json::from_value(header)
        .map_err(|e| SnarcError::serialization_mismatch(format!("bad header: {e}")))
}

pub fn decode_r1cs<P: FieldParams, R: BufRead>(
    reader: R,
    config: &CodecConfig,
) -> SnarcResult<ConstraintSystem<P>> {
    let mut lines = reader
        .lines()
        .map(|line| line.map_err(|e| SnarcError::io("<r1cs input>", e)))
        .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()));

    let header_line = lines
        .next()
        .ok_or_else(|| SnarcError::serialization_mismatch("missing header"))??;
    let header = decode_header(&header_line)?;
    header.check_field::<P>()?;
    snarc_debug!(
        "[codec] header: {} instances, {} witnesses, {} constraints",
        header.instance_nb,
        header.witness_nb,
        header.constraint_nb
    );

    let mut system = ConstraintSystem::new(header.instance_nb, header.witness_nb);
    for line in lines {
        let line = line?;
        let parsed: ConstraintLine<P> = serde_json::from_str(&line).map_err(|e| {
            SnarcError::serialization_mismatch(format!(
                "constraint {}: {e}",
                system.num_constraints()
            ))
        })?;
        system.add_constraint(Constraint::new(parsed.a, parsed.b, parsed.c))?;
    }

    if system.num_constraints() != header.constraint_nb {
        return Err(SnarcError::serialization_mismatch(format!(
            "header declares {} constraints, found {}",
            header.constraint_nb,
            system.num_constraints()
        )));
    }

    if config.pad_instances {
        let padded = padded_input_len(header.instance_nb);
        let shift = system.remap_primary(padded);
        snarc_debug!(
            "[codec] padded instances {} -> {} (shift {})",
            header.instance_nb,
            padded,
            shift
        );
    }
    Ok(system)
}

pub fn decode_r1cs_str<P: FieldParams>(
    text: &str,
    config: &CodecConfig,
) -> SnarcResult<ConstraintSystem<P>> {
    decode_r1cs(text.as_bytes(), config)
}

pub fn write_r1cs_file<P: FieldParams>(
    path: impl AsRef<Path>,
    system: &ConstraintSystem<P>,
) -> SnarcResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SnarcError::io(path, e))?;
    encode_r1cs(system, BufWriter::new(file))
}

pub fn read_r1cs_file<P: FieldParams>(
    path: impl AsRef<Path>,
    config: &CodecConfig,
) -> SnarcResult<ConstraintSystem<P>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SnarcError::io(path, e))?;
    decode_r1cs(BufReader::new(file), config)
}

/// `{"inputs":[...],"witnesses":[...]}`
pub fn encode_assignment<P: FieldParams, W: Write>(
    assignment: &Assignment<P>,
    mut writer: W,
) -> SnarcResult<()> {
    let file = WitnessFileRef {
        inputs: &assignment.primary_input,
        witnesses: &assignment.auxiliary_input,
    };
    serde_json::to_writer(&mut writer, &file)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| SnarcError::io("<assignment output>", e))
}

pub fn decode_assignment<P: FieldParams, R: BufRead>(reader: R) -> SnarcResult<Assignment<P>> {
    let file: WitnessFile<P> = serde_json::from_reader(reader)?;
    Ok(Assignment::new(file.inputs, file.witnesses))
}

pub fn write_assignment<P: FieldParams>(
    path: impl AsRef<Path>,
    assignment: &Assignment<P>,
) -> SnarcResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SnarcError::io(path, e))?;
    encode_assignment(assignment, BufWriter::new(file))
}

pub fn read_assignment<P: FieldParams>(path: impl AsRef<Path>) -> SnarcResult<Assignment<P>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SnarcError::io(path, e))?;
    decode_assignment(BufReader::new(file))
}

/// Reads an assignment and checks its lengths against `system`.
pub fn load_inputs<P: FieldParams>(
    path: impl AsRef<Path>,
    system: &ConstraintSystem<P>,
) -> SnarcResult<Assignment<P>> {
    let assignment = read_assignment(path)?;
    assignment.validate(system)?;
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Bn254Fr, EdwardsFr};

    type Fv = FieldValue<Bn254Fr>;
    type Lc = LinearCombination<Bn254Fr>;

    const BN254: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    fn three_constraints() -> ConstraintSystem<Bn254Fr> {
        let mul = |a, b, c| Constraint::new(Lc::variable(a), Lc::variable(b), Lc::variable(c));
        ConstraintSystem::with_constraints(
            1,
            3,
            vec![
                mul(1, 1, 2),
                mul(2, 1, 3),
                Constraint::new(
                    Lc::compressed(vec![(3, Fv::one()), (0, Fv::from_u64(5))]),
                    Lc::constant(Fv::one()),
                    Lc::variable(4),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn header_and_rows_are_byte_stable() {
        let system = ConstraintSystem::<Bn254Fr>::with_constraints(
            1,
            2,
            vec![Constraint::new(Lc::variable(1), Lc::variable(2), Lc::variable(3))],
        )
        .unwrap();
        let text = encode_r1cs_to_string(&system).unwrap();
        let expected = format!(
            "{{\"r1cs\":{{\"version\":\"1.0\",\"extension_degree\":1,\"instance_nb\":1,\"witness_nb\":2,\"constraint_nb\":1,\"field_characteristic\":\"{BN254}\"}}}}\n\
             {{\"A\":[[1,\"1\"]],\"B\":[[2,\"1\"]],\"C\":[[3,\"1\"]]}}\n"
        );
        assert_eq!(text, expected);
        assert_eq!(encode_r1cs_to_string(&system).unwrap(), text);
    }

    #[test]
    fn decode_inverts_encode() {
        let system = three_constraints();
        let text = encode_r1cs_to_string(&system).unwrap();
        let decoded: ConstraintSystem<Bn254Fr> =
            decode_r1cs_str(&text, &CodecConfig::default()).unwrap();
        assert_eq!(decoded, system);
    }

    #[test]
    fn pad_after_decode_appends_empty_rows() {
        let text = encode_r1cs_to_string(&three_constraints()).unwrap();
        let mut system: ConstraintSystem<Bn254Fr> =
            decode_r1cs_str(&text, &CodecConfig::default()).unwrap();
        system.pad();
        assert_eq!(system.num_constraints(), 4);
        assert!(system.constraints()[3].is_empty());
        let padded = encode_r1cs_to_string(&system).unwrap();
        assert!(padded.ends_with("{\"A\":[],\"B\":[],\"C\":[]}\n"));
        assert!(padded.contains("\"constraint_nb\":4"));
    }

    #[test]
    fn accepts_bare_and_legacy_headers() {
        let text = "{\"version\":\"1.0\",\"extension_degree\":1,\"instance_nb\":0,\"witness_nb\":1,\"constraint_nb\":1,\"field_characteristic\":1}\n\
                    {\"A\":[[1,\"2\"],[0,\"0\"]],\"B\":[[0,\"1\"]],\"C\":[[0,\"6\"]]}\n";
        let system: ConstraintSystem<Bn254Fr> =
            decode_r1cs_str(text, &CodecConfig::default()).unwrap();
        assert_eq!(system.auxiliary_input_size(), 1);
        assert_eq!(system.constraints()[0].a.terms(), &[(1, Fv::from_u64(2))]);
        system
            .is_satisfied(&Assignment::new(vec![], vec![Fv::from_u64(3)]))
            .unwrap();
    }

    #[test]
    fn header_body_inconsistencies_are_rejected() {
        let cfg = CodecConfig::default();
        let header = |n: usize| {
            format!(
                "{{\"r1cs\":{{\"version\":\"1.0\",\"extension_degree\":1,\"instance_nb\":1,\"witness_nb\":1,\"constraint_nb\":{n}}}}}\n"
            )
        };
        let row = "{\"A\":[[1,\"1\"]],\"B\":[[2,\"1\"]],\"C\":[]}\n";

        let count = format!("{}{row}", header(2));
        assert!(matches!(
            decode_r1cs_str::<Bn254Fr>(&count, &cfg),
            Err(SnarcError::SerializationMismatch { .. })
        ));

        let beyond = format!("{}{{\"A\":[[3,\"1\"]],\"B\":[],\"C\":[]}}\n", header(1));
        assert!(matches!(
            decode_r1cs_str::<Bn254Fr>(&beyond, &cfg),
            Err(SnarcError::SerializationMismatch { .. })
        ));

        assert!(matches!(
            decode_r1cs_str::<Bn254Fr>("", &cfg),
            Err(SnarcError::SerializationMismatch { .. })
        ));

        let ok = format!("{}{row}", header(1));
        assert!(decode_r1cs_str::<Bn254Fr>(&ok, &cfg).is_ok());
    }

    #[test]
    fn foreign_field_is_rejected() {
        let text = encode_r1cs_to_string(&three_constraints()).unwrap();
        assert!(matches!(
            decode_r1cs_str::<EdwardsFr>(&text, &CodecConfig::default()),
            Err(SnarcError::SerializationMismatch { .. })
        ));
    }

    #[test]
    fn pad_instances_remaps_witness_indices() {
        // instance_nb = 2 pads to 3: witness index 3 moves to 4.
        let system = ConstraintSystem::<Bn254Fr>::with_constraints(
            2,
            1,
            vec![Constraint::new(Lc::variable(1), Lc::variable(2), Lc::variable(3))],
        )
        .unwrap();
        let text = encode_r1cs_to_string(&system).unwrap();
        let padded: ConstraintSystem<Bn254Fr> =
            decode_r1cs_str(&text, &CodecConfig { pad_instances: true }).unwrap();
        assert_eq!(padded.primary_input_size(), 3);
        assert_eq!(padded.auxiliary_input_size(), 1);
        let row = &padded.constraints()[0];
        assert_eq!(row.a.terms()[0].0, 1);
        assert_eq!(row.b.terms()[0].0, 2);
        assert_eq!(row.c.terms()[0].0, 4);
    }

    #[test]
    fn assignment_json_shape() {
        let assignment = Assignment::new(vec![Fv::from_u64(7)], vec![Fv::minus_one()]);
        let mut out = Vec::new();
        encode_assignment(&assignment, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\"inputs\":[\"7\"],\"witnesses\":[\"2188824287"));
        let back: Assignment<Bn254Fr> = decode_assignment(text.as_bytes()).unwrap();
        assert_eq!(back, assignment);
    }
}
