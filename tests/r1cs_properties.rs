use proptest::prelude::*;

use snarc::snarks::codec::{decode_r1cs_str, encode_r1cs_to_string};
use snarc::snarks::r1cs::padded_input_len;
use snarc::{
    Assignment, Bn254Fr, CodecConfig, Constraint, ConstraintSystem, FieldValue, LinearCombination,
    WitnessPadding,
};

type Fv = FieldValue<Bn254Fr>;
type Lc = LinearCombination<Bn254Fr>;

fn lc(num_variables: usize) -> impl Strategy<Value = Lc> {
    prop::collection::vec((0..num_variables, 0u64..1_000), 0..4).prop_map(|terms| {
        Lc::compressed(
            terms
                .into_iter()
                .map(|(idx, coeff)| (idx, Fv::from_u64(coeff)))
                .collect(),
        )
    })
}

fn system() -> impl Strategy<Value = ConstraintSystem<Bn254Fr>> {
    (0usize..6, 0usize..6).prop_flat_map(|(primary, auxiliary)| {
        let n = 1 + primary + auxiliary;
        prop::collection::vec((lc(n), lc(n), lc(n)), 0..9).prop_map(move |rows| {
            let constraints = rows
                .into_iter()
                .map(|(a, b, c)| Constraint::new(a, b, c))
                .collect();
            ConstraintSystem::with_constraints(primary, auxiliary, constraints)
                .expect("indices stay below the variable count")
        })
    })
}

fn values(len: usize) -> Vec<Fv> {
    (1..=len as u64).map(Fv::from_u64).collect()
}

proptest! {
    #[test]
    fn codec_reproduces_the_system(system in system()) {
        let text = encode_r1cs_to_string(&system).unwrap();
        prop_assert_eq!(text.lines().count(), 1 + system.num_constraints());
        let decoded = decode_r1cs_str::<Bn254Fr>(&text, &CodecConfig::default()).unwrap();
        prop_assert_eq!(decoded.digest(), system.digest());
        prop_assert_eq!(decoded, system);
    }

    #[test]
    fn pad_reaches_a_power_of_two_and_is_idempotent(mut system in system()) {
        let before = system.num_constraints();
        system.pad();
        let padded = system.num_constraints();
        prop_assert!(padded.is_power_of_two());
        prop_assert!(padded >= before.max(1));
        prop_assert!(padded < 2 * before.max(1));
        prop_assert!(system.constraints()[before..].iter().all(Constraint::is_empty));

        let snapshot = system.clone();
        system.pad();
        prop_assert_eq!(system, snapshot);
    }

    #[test]
    fn padded_inputs_keep_the_prefix(primary in 0usize..40, auxiliary in 0usize..10) {
        let mut assignment = Assignment::<Bn254Fr>::new(values(primary), values(auxiliary));
        assignment.pad_inputs(WitnessPadding::Disabled);
        let padded = assignment.primary_input.len();
        prop_assert_eq!(padded, padded_input_len(primary));
        prop_assert!((padded + 1).is_power_of_two());
        prop_assert_eq!(&assignment.primary_input[..primary], &values(primary)[..]);
        prop_assert!(assignment.primary_input[primary..].iter().all(Fv::is_zero));
        prop_assert_eq!(assignment.auxiliary_input, values(auxiliary));
    }

    #[test]
    fn padding_inputs_preserves_satisfaction(system in system(), seed in 0u64..1_000) {
        // Make every constraint hold by construction: A * B = C with C := A * B
        // evaluated on a fixed assignment.
        let primary: Vec<Fv> = (0..system.primary_input_size() as u64).map(|i| Fv::from_u64(seed + i)).collect();
        let auxiliary: Vec<Fv> = (0..system.auxiliary_input_size() as u64).map(|i| Fv::from_u64(seed * 3 + i)).collect();
        let mut assignment = Assignment::new(primary, auxiliary);
        let full = assignment.full_assignment();

        let mut satisfied = ConstraintSystem::new(system.primary_input_size(), system.auxiliary_input_size());
        for constraint in system.constraints() {
            let product = constraint.a.evaluate(&full).unwrap() * constraint.b.evaluate(&full).unwrap();
            let c = Lc::constant(product);
            satisfied.add_constraint(Constraint::new(constraint.a.clone(), constraint.b.clone(), c)).unwrap();
        }
        satisfied.is_satisfied(&assignment).unwrap();

        satisfied.pad_inputs();
        assignment.pad_inputs(WitnessPadding::Disabled);
        prop_assert!(satisfied.is_satisfied(&assignment).is_ok());

        satisfied.pad_auxiliary();
        assignment.pad_inputs(WitnessPadding::ToNextPowerOfTwo);
        prop_assert!(satisfied.num_variables().is_power_of_two());
        prop_assert!(satisfied.is_satisfied(&assignment).is_ok());
    }
}

#[test]
fn padding_three_constraints_adds_one_empty_row() {
    let mut system = ConstraintSystem::<Bn254Fr>::new(1, 1);
    for _ in 0..3 {
        system
            .add_constraint(Constraint::new(Lc::variable(1), Lc::variable(2), Lc::variable(2)))
            .unwrap();
    }
    system.pad();
    assert_eq!(system.num_constraints(), 4);
    let last = &system.constraints()[3];
    assert!(last.a.is_empty() && last.b.is_empty() && last.c.is_empty());

    let text = encode_r1cs_to_string(&system).unwrap();
    assert_eq!(text.lines().last(), Some(r#"{"A":[],"B":[],"C":[]}"#));
}
