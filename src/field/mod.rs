//! Arbitrary-precision prime field elements.
//!
//! A [`FieldValue`] is a canonical residue modulo the prime named by its
//! [`FieldParams`] marker. The decimal string is the interchange form used by
//! every JSON format in this crate; JSON numbers cannot carry 254-bit residues
//! exactly.
//!
//! The bit decomposition of a value is computed at most once and cached inside
//! the value, so repeated `bit_at` calls in `split`/`output` handling are cheap.

pub mod params;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{SnarcError, SnarcResult};

pub use params::{Bn254Fr, EdwardsFr, Ristretto255Scalar};

/// Compile-time description of a prime field.
pub trait FieldParams:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Send + Sync + 'static
{
    /// Short name used in logs and headers.
    const NAME: &'static str;

    /// The (prime) characteristic.
    fn modulus() -> &'static BigUint;

    /// Number of bits needed to represent the largest residue.
    fn bit_width() -> usize {
        Self::modulus().bits() as usize
    }
}

pub struct FieldValue<P: FieldParams> {
    value: BigUint,
    bits: OnceCell<Vec<bool>>,
    _params: PhantomData<P>,
}

impl<P: FieldParams> FieldValue<P> {
    fn from_reduced(value: BigUint) -> Self {
        Self {
            value,
            bits: OnceCell::new(),
            _params: PhantomData,
        }
    }

    /// Reduces an arbitrary integer into the field.
    pub fn from_biguint(value: BigUint) -> Self {
        let modulus = P::modulus();
        if &value < modulus {
            Self::from_reduced(value)
        } else {
            Self::from_reduced(value % modulus)
        }
    }

    pub fn zero() -> Self {
        Self::from_reduced(BigUint::zero())
    }

    pub fn one() -> Self {
        Self::from_biguint(BigUint::one())
    }

    /// `-1`, i.e. `p - 1`.
    pub fn minus_one() -> Self {
        Self::from_reduced(P::modulus() - BigUint::one())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_biguint(BigUint::from(value))
    }

    pub fn from_bool(bit: bool) -> Self {
        if bit { Self::one() } else { Self::zero() }
    }

    pub fn modulus() -> &'static BigUint {
        P::modulus()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// Parses a base-10 residue. Values at or above the modulus are reduced.
    pub fn from_decimal_string(s: &str) -> SnarcResult<Self> {
        Self::parse_radix(s, 10, "(decimal digits)")
    }

    /// Parses a base-16 residue (no `0x` prefix, either case).
    pub fn from_hex_string(s: &str) -> SnarcResult<Self> {
        Self::parse_radix(s, 16, "(hex digits)")
    }

    fn parse_radix(s: &str, radix: u32, expected: &str) -> SnarcResult<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_digit(radix)) {
            return Err(SnarcError::unexpected_token(s, expected));
        }
        BigUint::parse_bytes(s.as_bytes(), radix)
            .map(Self::from_biguint)
            .ok_or_else(|| SnarcError::unexpected_token(s, expected))
    }

    pub fn to_decimal_string(&self) -> String {
        self.value.to_str_radix(10)
    }

    pub fn to_hex_string(&self) -> String {
        self.value.to_str_radix(16)
    }

    /// Multiplicative inverse; fails on zero.
    pub fn inverse(&self) -> SnarcResult<Self> {
        if self.is_zero() {
            return Err(SnarcError::division_by_zero("field inverse"));
        }
        let modulus = P::modulus();
        let exponent = modulus - BigUint::from(2u32);
        Ok(Self::from_reduced(self.value.modpow(&exponent, modulus)))
    }

    /// `self / divisor`; fails with `DivisionByZero` when the divisor is zero.
    pub fn checked_div(&self, divisor: &Self) -> SnarcResult<Self> {
        if divisor.is_zero() {
            return Err(SnarcError::division_by_zero("field division"));
        }
        Ok(self * &divisor.inverse()?)
    }

    /// Square-and-multiply from the least significant bit of `exponent`,
    /// looking at no more than `bit_limit` exponent bits.
    pub fn raise_to(&self, exponent: &Self, bit_limit: usize) -> Self {
        let mut result = Self::one();
        let mut base = self.clone();
        let limit = bit_limit.min(exponent.bit_len());
        for i in 0..limit {
            if exponent.bit(i) {
                result = &result * &base;
            }
            if i + 1 < limit {
                base = &base * &base;
            }
        }
        result
    }

    /// Little-endian bit decomposition, computed on first use.
    pub fn bits(&self) -> &[bool] {
        self.bits.get_or_init(|| {
            let len = self.value.bits();
            (0..len).map(|i| self.value.bit(i)).collect()
        })
    }

    pub fn bit_len(&self) -> usize {
        self.bits().len()
    }

    /// Bit `i` as a boolean; bits above the value's length are zero.
    pub fn bit(&self, i: usize) -> bool {
        self.bits().get(i).copied().unwrap_or(false)
    }

    /// Bit `i` as a field element (0 or 1).
    pub fn bit_at(&self, i: usize) -> Self {
        Self::from_bool(self.bit(i))
    }

    /// First set bit in `from..to`, if any.
    pub fn first_set_bit_in(&self, from: usize, to: usize) -> Option<usize> {
        let bits = self.bits();
        let end = to.min(bits.len());
        (from..end).find(|&i| bits[i])
    }

    pub fn bits_zero_from(&self, from: usize, to: usize) -> bool {
        self.first_set_bit_in(from, to).is_none()
    }

    /// The low `nbits` bits (capped at 64) as an unsigned integer.
    pub fn low_u64(&self, nbits: usize) -> u64 {
        let nbits = nbits.min(64);
        let mut out = 0u64;
        for i in 0..nbits {
            if self.bit(i) {
                out |= 1u64 << i;
            }
        }
        out
    }

    /// The residue as a `u64`, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Renders the low `width` bits, most significant first.
    pub fn to_bit_string(&self, width: usize) -> String {
        (0..width)
            .rev()
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }
}

impl<P: FieldParams> Clone for FieldValue<P> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            bits: self.bits.clone(),
            _params: PhantomData,
        }
    }
}

impl<P: FieldParams> Default for FieldValue<P> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<P: FieldParams> PartialEq for FieldValue<P> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<P: FieldParams> Eq for FieldValue<P> {}

impl<P: FieldParams> Hash for FieldValue<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<P: FieldParams> fmt::Debug for FieldValue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", P::NAME, self.value)
    }
}

impl<P: FieldParams> fmt::Display for FieldValue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<P: FieldParams> From<u64> for FieldValue<P> {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl<'a, 'b, P: FieldParams> Add<&'b FieldValue<P>> for &'a FieldValue<P> {
    type Output = FieldValue<P>;

    fn add(self, rhs: &'b FieldValue<P>) -> FieldValue<P> {
        let sum = &self.value + &rhs.value;
        let modulus = P::modulus();
        if &sum >= modulus {
            FieldValue::from_reduced(sum - modulus)
        } else {
            FieldValue::from_reduced(sum)
        }
    }
}

impl<'a, 'b, P: FieldParams> Sub<&'b FieldValue<P>> for &'a FieldValue<P> {
    type Output = FieldValue<P>;

    fn sub(self, rhs: &'b FieldValue<P>) -> FieldValue<P> {
        if self.value >= rhs.value {
            FieldValue::from_reduced(&self.value - &rhs.value)
        } else {
            FieldValue::from_reduced(P::modulus() - (&rhs.value - &self.value))
        }
    }
}

impl<'a, 'b, P: FieldParams> Mul<&'b FieldValue<P>> for &'a FieldValue<P> {
    type Output = FieldValue<P>;

    fn mul(self, rhs: &'b FieldValue<P>) -> FieldValue<P> {
        FieldValue::from_biguint(&self.value * &rhs.value)
    }
}

impl<P: FieldParams> Neg for &FieldValue<P> {
    type Output = FieldValue<P>;

    fn neg(self) -> FieldValue<P> {
        if self.is_zero() {
            FieldValue::zero()
        } else {
            FieldValue::from_reduced(P::modulus() - &self.value)
        }
    }
}

impl<P: FieldParams> Neg for FieldValue<P> {
    type Output = FieldValue<P>;

    fn neg(self) -> FieldValue<P> {
        -&self
    }
}

macro_rules! owned_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident) => {
        impl<P: FieldParams> $trait for FieldValue<P> {
            type Output = FieldValue<P>;

            fn $method(self, rhs: FieldValue<P>) -> FieldValue<P> {
                (&self).$method(&rhs)
            }
        }

        impl<'a, P: FieldParams> $trait<&'a FieldValue<P>> for FieldValue<P> {
            type Output = FieldValue<P>;

            fn $method(self, rhs: &'a FieldValue<P>) -> FieldValue<P> {
                (&self).$method(rhs)
            }
        }

        impl<'a, P: FieldParams> $assign_trait<&'a FieldValue<P>> for FieldValue<P> {
            fn $assign_method(&mut self, rhs: &'a FieldValue<P>) {
                *self = (&*self).$method(rhs);
            }
        }

        impl<P: FieldParams> $assign_trait for FieldValue<P> {
            fn $assign_method(&mut self, rhs: FieldValue<P>) {
                *self = (&*self).$method(&rhs);
            }
        }
    };
}

owned_binop!(Add, add, AddAssign, add_assign);
owned_binop!(Sub, sub, SubAssign, sub_assign);
owned_binop!(Mul, mul, MulAssign, mul_assign);

impl<P: FieldParams> std::iter::Sum for FieldValue<P> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<P: FieldParams> Serialize for FieldValue<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de, P: FieldParams> Deserialize<'de> for FieldValue<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_decimal_string(s.trim()).map_err(serde::de::Error::custom)
    }
}
