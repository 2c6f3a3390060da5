//! Prime moduli the proving backends work over.
//!
//! Moduli are written as little-endian 64-bit limbs (the layout arkworks and
//! libff use for their `BigInt` constants) and expanded into a `BigUint` the
//! first time they are needed.

use num_bigint::BigUint;
use num_traits::Zero;

use super::FieldParams;

/// Builds a `BigUint` from little-endian 64-bit limbs.
pub(crate) fn biguint_from_limbs(limbs: &[u64]) -> BigUint {
    limbs
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, limb| (acc << 64u32) + BigUint::from(*limb))
}

macro_rules! prime_field {
    ($(#[$meta:meta])* $name:ident, $label:literal, [$($limb:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name;

        impl FieldParams for $name {
            const NAME: &'static str = $label;

            fn modulus() -> &'static BigUint {
                static MODULUS: once_cell::sync::Lazy<BigUint> =
                    once_cell::sync::Lazy::new(|| biguint_from_limbs(&[$($limb),+]));
                &MODULUS
            }
        }
    };
}

prime_field!(
    /// Scalar field of BN254 (`alt_bn128` in libff), the default curve of the
    /// pairing-based backends and of Aurora/Fractal over a prime field.
    Bn254Fr,
    "bn254",
    [
        0x43e1_f593_f000_0001,
        0x2833_e848_79b9_7091,
        0xb850_45b6_8181_585d,
        0x3064_4e72_e131_a029,
    ]
);

prime_field!(
    /// Scalar field of the libff Edwards curve (181-bit).
    EdwardsFr,
    "edwards",
    [0x1de5_5327_8000_0001, 0xc4e2_e493_b92e_12cc, 0x0010_357f_274a_8e56]
);

prime_field!(
    /// Scalar field of Ristretto255, used by the bulletproofs backend.
    Ristretto255Scalar,
    "ristretto255",
    [
        0x5812_631a_5cf5_d3ed,
        0x14de_f9de_a2f7_9cd6,
        0x0000_0000_0000_0000,
        0x1000_0000_0000_0000,
    ]
);
