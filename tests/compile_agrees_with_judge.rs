use std::fs;

use proptest::prelude::*;

use snarc::circuit::format_value_list;
use snarc::judge::values_path;
use snarc::snarks::codec::{CodecConfig, load_inputs, read_r1cs_file, write_assignment, write_r1cs_file};
use snarc::snarks::compiler::compile_file;
use snarc::{
    Bn254Fr, CircuitProgram, FieldValue, JudgeConfig, SnarcError, compile_program, judge_program,
};
use tempfile::TempDir;

type Fv = FieldValue<Bn254Fr>;

/// Mixes every opcode except field division.
const CIRCUIT: &str = "total 25
input 0
input 1
nizkinput 2
mul in 2 < 0 1 > out 1 < 3 >
add in 2 < 3 2 > out 1 < 4 >
const-mul-5 in 1 < 4 > out 1 < 5 >
const-mul-neg-2 in 1 < 0 > out 1 < 6 >
add in 2 < 5 6 > out 1 < 7 >
zerop in 1 < 1 > out 2 < 8 9 >
split in 1 < 0 > out 8 < 10 11 12 13 14 15 16 17 >
asplit in 1 < 2 > out 4 < 18 19 20 21 >
dload in 3 < 10 1 2 > out 1 < 22 >
div_16 in 2 < 7 1 > out 2 < 23 24 >
output 7
output 9
output 22
output 23
";

fn run(a: u64, b: u64, c: u64) -> (Vec<Fv>, snarc::CompiledCircuit<Bn254Fr>) {
    let program: CircuitProgram = CIRCUIT.parse().unwrap();
    let values = vec![Fv::from_u64(a), Fv::from_u64(b), Fv::from_u64(c)];
    let config = JudgeConfig::default();
    let outcome = judge_program(&program, values.clone(), &config).unwrap();
    let compiled = compile_program(&program, values, &config).unwrap();
    let judged = outcome.outputs.into_iter().map(|line| line.value).collect();
    (judged, compiled)
}

proptest! {
    #[test]
    fn compiled_witness_matches_judge(a in 0u64..256, b in 1u64..16, c in 0u64..6) {
        let (judged, compiled) = run(a, b, c);
        compiled.system.is_satisfied(&compiled.assignment).unwrap();

        // Primary inputs are the `input` wires followed by the outputs.
        let primary = &compiled.assignment.primary_input;
        prop_assert_eq!(primary.len(), 2 + judged.len());
        prop_assert_eq!(&primary[2..], &judged[..]);
        let outputs: Vec<Fv> = compiled.outcome.outputs.iter().map(|line| line.value.clone()).collect();
        prop_assert_eq!(outputs, judged);
    }

    #[test]
    fn any_changed_output_is_rejected(a in 0u64..256, b in 1u64..16, c in 0u64..6, which in 0usize..4) {
        let (_, mut compiled) = run(a, b, c);
        let slot = &mut compiled.assignment.primary_input[2 + which];
        *slot = &*slot + &Fv::one();
        let rejected = matches!(
            compiled.system.is_satisfied(&compiled.assignment),
            Err(SnarcError::Unsatisfied { .. })
        );
        prop_assert!(rejected);
    }
}

#[test]
fn compiled_files_decode_and_verify() {
    let dir = TempDir::new().unwrap();
    let circuit = dir.path().join("mix.arith");
    fs::write(&circuit, CIRCUIT).unwrap();
    let values = format_value_list(&[Fv::from_u64(200), Fv::from_u64(9), Fv::from_u64(3)]);
    fs::write(values_path(&circuit), values).unwrap();

    let compiled = compile_file::<Bn254Fr>(&circuit, &JudgeConfig::default()).unwrap();
    let system_path = dir.path().join("mix.j1cs");
    write_r1cs_file(&system_path, &compiled.system).unwrap();
    write_assignment(values_path(&system_path), &compiled.assignment).unwrap();

    let system = read_r1cs_file::<Bn254Fr>(&system_path, &CodecConfig::default()).unwrap();
    assert_eq!(system, compiled.system);
    let assignment = load_inputs(values_path(&system_path), &system).unwrap();
    system.is_satisfied(&assignment).unwrap();
}

/// Overwrites output `position` with `value` and re-solves the output's
/// binding constraint through its first auxiliary term, so only the
/// constraints of the opcode that produced the output can notice.
fn forge_output(
    compiled: &mut snarc::CompiledCircuit<Bn254Fr>,
    inputs: usize,
    position: usize,
    value: Fv,
) -> usize {
    let primary = compiled.system.primary_input_size();
    let output_var = 1 + inputs + position;
    let (binding, row) = compiled
        .system
        .constraints()
        .iter()
        .enumerate()
        .find(|(_, c)| {
            c.b.terms() == [(0, Fv::one())] && c.a.terms().iter().any(|(idx, _)| *idx == output_var)
        })
        .expect("every output has a binding constraint");
    let (aux_var, aux_coeff) = row
        .a
        .terms()
        .iter()
        .find(|(idx, _)| *idx > primary)
        .cloned()
        .expect("output should depend on an allocated variable");

    compiled.assignment.primary_input[inputs + position] = value;
    let full = compiled.assignment.full_assignment();
    let rest: Fv = row
        .a
        .terms()
        .iter()
        .filter(|(idx, _)| *idx != aux_var)
        .map(|(idx, coeff)| coeff * &full[*idx])
        .sum();
    let solved = (-rest).checked_div(&aux_coeff).unwrap();
    compiled.assignment.auxiliary_input[aux_var - primary - 1] = solved;
    binding
}

fn assert_forgery_rejected(circuit: &str, values: &[u64], position: usize, forged: u64) {
    let program: CircuitProgram = circuit.parse().unwrap();
    let inputs = program.input_wires().len();
    let values = values.iter().copied().map(Fv::from_u64).collect();
    let mut compiled = compile_program(&program, values, &JudgeConfig::default()).unwrap();
    compiled.system.is_satisfied(&compiled.assignment).unwrap();

    let binding = forge_output(&mut compiled, inputs, position, Fv::from_u64(forged));
    match compiled.system.is_satisfied(&compiled.assignment) {
        Err(SnarcError::Unsatisfied { constraint, .. }) => {
            assert_ne!(constraint, binding, "{circuit}: forged output {position} slipped through")
        }
        other => panic!("{circuit}: forged output {position} accepted: {other:?}"),
    }
}

#[test]
fn forged_outputs_are_rejected_for_every_lowered_opcode() {
    let mul = "total 3\ninput 0\ninput 1\nmul in 2 < 0 1 > out 1 < 2 >\noutput 2\n";
    assert_forgery_rejected(mul, &[3, 4], 0, 13);

    let zerop = "total 3\ninput 0\nzerop in 1 < 0 > out 2 < 1 2 >\noutput 1\noutput 2\n";
    assert_forgery_rejected(zerop, &[5], 1, 0);
    assert_forgery_rejected(zerop, &[5], 0, 7);
    assert_forgery_rejected(zerop, &[0], 1, 1);

    let split = "total 4\ninput 0\nsplit in 1 < 0 > out 3 < 1 2 3 >\noutput 1\noutput 2\noutput 3\n";
    assert_forgery_rejected(split, &[5], 1, 1);
    assert_forgery_rejected(split, &[5], 0, 0);

    let asplit = "total 4\ninput 0\nasplit in 1 < 0 > out 3 < 1 2 3 >\noutput 1\noutput 2\noutput 3\n";
    assert_forgery_rejected(asplit, &[2], 2, 0);
    assert_forgery_rejected(asplit, &[2], 0, 1);
    assert_forgery_rejected(asplit, &[7], 1, 1);

    let dload = "total 4\ninput 0\ninput 1\ninput 2\ndload in 3 < 0 1 2 > out 1 < 3 >\noutput 3\n";
    assert_forgery_rejected(dload, &[1, 5, 9], 0, 5);

    let int_div = "total 4\ninput 0\ninput 1\ndiv_8 in 2 < 0 1 > out 2 < 2 3 >\noutput 2\noutput 3\n";
    assert_forgery_rejected(int_div, &[23, 5], 0, 3);
    assert_forgery_rejected(int_div, &[23, 5], 1, 8);

    let field_div = "total 3\ninput 0\ninput 1\ndiv in 2 < 0 1 > out 1 < 2 >\noutput 2\n";
    assert_forgery_rejected(field_div, &[21, 7], 0, 4);
}
