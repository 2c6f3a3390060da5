use snarc::proof::MembershipProof;
use snarc::{Bn254Fr, FieldValue, ProofEnvelope, ProofScheme, ProofTranscript, SnarcError, TrustedSetup};
use tempfile::TempDir;

type Fv = FieldValue<Bn254Fr>;

fn transcript() -> ProofTranscript<Bn254Fr> {
    ProofTranscript {
        prover_messages: vec![
            vec![Fv::from_u64(3), Fv::from_u64(1), Fv::from_u64(4)],
            vec![Fv::minus_one(), Fv::from_u64(5), Fv::zero()],
        ],
        mt_roots: vec![vec![0xde, 0xad, 0xbe, 0xef]],
        query_positions: vec![vec![9, 2, 6, 5]],
        query_responses: vec![vec![vec![Fv::from_u64(7)], vec![Fv::from_u64(8), Fv::one()]]],
        mt_leaf_positions: vec![vec![4, 1]],
        mt_set_membership_proofs: vec![MembershipProof {
            auxiliary_hashes: vec![vec![1, 2], vec![3]],
            randomness_hashes: vec![],
        }],
        total_depth_without_pruning: 12,
    }
}

#[test]
fn transcript_round_trips_in_order() {
    let envelope = ProofEnvelope::transcript(ProofScheme::Aurora, transcript()).unwrap();
    let json = envelope.to_json().unwrap();
    assert!(json.starts_with(r#"{"type":"aurora""#));

    let decoded = ProofEnvelope::<Bn254Fr>::from_json(&json).unwrap();
    assert_eq!(decoded, envelope);
    match decoded {
        ProofEnvelope::Transcript { scheme, transcript } => {
            assert_eq!(scheme, ProofScheme::Aurora);
            assert_eq!(transcript.prover_messages.len(), 2);
            assert!(transcript.prover_messages.iter().all(|m| m.len() == 3));
            assert_eq!(transcript.mt_roots.len(), 1);
            assert_eq!(transcript.query_positions, vec![vec![9, 2, 6, 5]]);
            assert_eq!(transcript.prover_messages[1][0], Fv::minus_one());
        }
        other => panic!("expected a transcript, got {other:?}"),
    }
}

#[test]
fn envelopes_survive_the_filesystem() {
    let dir = TempDir::new().unwrap();

    let proof_path = dir.path().join("proof.json");
    let envelope = ProofEnvelope::transcript(ProofScheme::Fractal, transcript()).unwrap();
    envelope.write_file(&proof_path).unwrap();
    let decoded = ProofEnvelope::<Bn254Fr>::read_file_as(&proof_path, ProofScheme::Fractal).unwrap();
    assert_eq!(decoded, envelope);

    let opaque_path = dir.path().join("groth16.json");
    let opaque = ProofEnvelope::<Bn254Fr>::opaque(ProofScheme::Groth16, vec![7; 32]).unwrap();
    opaque.write_file(&opaque_path).unwrap();
    assert_eq!(ProofEnvelope::<Bn254Fr>::read_file(&opaque_path).unwrap(), opaque);

    let setup_path = dir.path().join("setup.json");
    let setup = TrustedSetup {
        scheme: ProofScheme::Bctv14a,
        verification_key: vec![1, 2, 3],
        proving_key: vec![4, 5, 6, 7],
        preprocess_verification_key: vec![8],
    };
    setup.write_file(&setup_path).unwrap();
    assert_eq!(TrustedSetup::read_file(&setup_path, ProofScheme::Bctv14a).unwrap(), setup);
}

#[test]
fn scheme_tag_is_enforced() {
    let json = ProofEnvelope::transcript(ProofScheme::Ligero, transcript())
        .unwrap()
        .to_json()
        .unwrap();
    assert!(matches!(
        ProofEnvelope::<Bn254Fr>::from_json_as(&json, ProofScheme::Aurora),
        Err(SnarcError::SchemeMismatch { .. })
    ));
    assert!(matches!(
        ProofEnvelope::<Bn254Fr>::from_json(r#"{"type":"plonk","proof":""}"#),
        Err(SnarcError::SchemeMismatch { .. })
    ));
    assert!(matches!(
        ProofEnvelope::<Bn254Fr>::opaque(ProofScheme::Aurora, vec![]),
        Err(SnarcError::SchemeMismatch { .. })
    ));
}
