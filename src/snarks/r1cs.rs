use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};

/// Index of the constant-one variable.
pub const ONE: usize = 0;

/// Sparse `Σ coeff · z[index]` over the full assignment `z = (1, primary, auxiliary)`.
#[derive(Clone, PartialEq, Eq)]
pub struct LinearCombination<P: FieldParams> {
    terms: Vec<(usize, FieldValue<P>)>,
}

impl<P: FieldParams> LinearCombination<P> {
    pub fn zero() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn variable(index: usize) -> Self {
        Self {
            terms: vec![(index, FieldValue::one())],
        }
    }

    pub fn constant(value: FieldValue<P>) -> Self {
        Self::from_terms(vec![(ONE, value)])
    }

    /// Keeps term order as given and drops zero coefficients.
    pub fn from_terms(terms: Vec<(usize, FieldValue<P>)>) -> Self {
        Self {
            terms: terms.into_iter().filter(|(_, c)| !c.is_zero()).collect(),
        }
    }

    /// Sorts by index, merges duplicate indices and drops zero coefficients.
    pub fn compressed(terms: Vec<(usize, FieldValue<P>)>) -> Self {
        Self {
            terms: compress_terms(terms),
        }
    }

    pub fn terms(&self) -> &[(usize, FieldValue<P>)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn max_index(&self) -> Option<usize> {
        self.terms.iter().map(|(idx, _)| *idx).max()
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Self::compressed(terms)
    }

    pub fn minus(&self, other: &Self) -> Self {
        self.plus(&other.scaled(&-FieldValue::one()))
    }

    pub fn scaled(&self, factor: &FieldValue<P>) -> Self {
        Self::from_terms(
            self.terms
                .iter()
                .map(|(idx, coeff)| (*idx, coeff * factor))
                .collect(),
        )
    }

    pub fn evaluate(&self, assignment: &[FieldValue<P>]) -> SnarcResult<FieldValue<P>> {
        let mut acc = FieldValue::zero();
        for (idx, coeff) in &self.terms {
            let value = assignment
                .get(*idx)
                .ok_or_else(|| SnarcError::index_out_of_range("variable", *idx, assignment.len()))?;
            acc += coeff * value;
        }
        Ok(acc)
    }

    pub(crate) fn indices_mut(&mut self) -> impl Iterator<Item = &mut usize> {
        self.terms.iter_mut().map(|(idx, _)| idx)
    }
}

impl<P: FieldParams> Default for LinearCombination<P> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<P: FieldParams> fmt::Debug for LinearCombination<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.terms.iter().map(|(idx, c)| (idx, c.to_decimal_string())))
            .finish()
    }
}

/// `[[index, "decimal"], ...]`
impl<P: FieldParams> Serialize for LinearCombination<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.terms.serialize(serializer)
    }
}

impl<'de, P: FieldParams> Deserialize<'de> for LinearCombination<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let terms = Vec::<(usize, FieldValue<P>)>::deserialize(deserializer)?;
        Ok(Self::from_terms(terms))
    }
}

/// One row `<A, z> * <B, z> = <C, z>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint<P: FieldParams> {
    pub a: LinearCombination<P>,
    pub b: LinearCombination<P>,
    pub c: LinearCombination<P>,
}

impl<P: FieldParams> Constraint<P> {
    pub fn new(a: LinearCombination<P>, b: LinearCombination<P>, c: LinearCombination<P>) -> Self {
        Self { a, b, c }
    }

    /// All three combinations empty; trivially satisfied. Used for padding.
    pub fn empty() -> Self {
        Self::new(
            LinearCombination::zero(),
            LinearCombination::zero(),
            LinearCombination::zero(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty() && self.c.is_empty()
    }

    pub fn evaluate(
        &self,
        assignment: &[FieldValue<P>],
    ) -> SnarcResult<(FieldValue<P>, FieldValue<P>, FieldValue<P>)> {
        Ok((
            self.a.evaluate(assignment)?,
            self.b.evaluate(assignment)?,
            self.c.evaluate(assignment)?,
        ))
    }

    pub fn max_index(&self) -> Option<usize> {
        [self.a.max_index(), self.b.max_index(), self.c.max_index()]
            .into_iter()
            .flatten()
            .max()
    }

    pub fn support(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .a
            .terms()
            .iter()
            .chain(self.b.terms())
            .chain(self.c.terms())
            .map(|(idx, _)| *idx)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    fn indices_mut(&mut self) -> impl Iterator<Item = &mut usize> {
        self.a
            .indices_mut()
            .chain(self.b.indices_mut())
            .chain(self.c.indices_mut())
    }
}

/// Whether [`Assignment::pad_inputs`] also pads the witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessPadding {
    #[default]
    Disabled,
    /// Append zero witnesses until `1 + primary + auxiliary` is a power of two.
    ToNextPowerOfTwo,
}

/// Rank-1 constraint system with libsnark variable numbering: `0` is the
/// constant one, `1..=primary_input_size` the primary inputs, then the
/// auxiliary inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSystem<P: FieldParams> {
    primary_input_size: usize,
    auxiliary_input_size: usize,
    constraints: Vec<Constraint<P>>,
}

impl<P: FieldParams> ConstraintSystem<P> {
    pub fn new(primary_input_size: usize, auxiliary_input_size: usize) -> Self {
        Self {
            primary_input_size,
            auxiliary_input_size,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraints(
        primary_input_size: usize,
        auxiliary_input_size: usize,
        constraints: Vec<Constraint<P>>,
    ) -> SnarcResult<Self> {
        let mut system = Self::new(primary_input_size, auxiliary_input_size);
        system.constraints.reserve(constraints.len());
        for constraint in constraints {
            system.add_constraint(constraint)?;
        }
        Ok(system)
    }

    /// Appends a constraint; every index must name a declared variable.
    pub fn add_constraint(&mut self, constraint: Constraint<P>) -> SnarcResult<()> {
        if let Some(max) = constraint.max_index() {
            if max >= self.num_variables() {
                return Err(SnarcError::serialization_mismatch(format!(
                    "constraint {} references variable {} beyond {}",
                    self.constraints.len(),
                    max,
                    self.num_variables()
                )));
            }
        }
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn primary_input_size(&self) -> usize {
        self.primary_input_size
    }

    pub fn auxiliary_input_size(&self) -> usize {
        self.auxiliary_input_size
    }

    /// Variables including the constant one.
    pub fn num_variables(&self) -> usize {
        1 + self.primary_input_size + self.auxiliary_input_size
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[Constraint<P>] {
        &self.constraints
    }

    /// SHA-256 over the sizes and the sparse rows.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update((self.primary_input_size as u64).to_le_bytes());
        hasher.update((self.auxiliary_input_size as u64).to_le_bytes());
        for constraint in &self.constraints {
            absorb_sparse_row(&mut hasher, &constraint.a);
            absorb_sparse_row(&mut hasher, &constraint.b);
            absorb_sparse_row(&mut hasher, &constraint.c);
        }
        hasher.finalize().into()
    }

    pub fn is_satisfied(&self, assignment: &Assignment<P>) -> SnarcResult<()> {
        assignment.validate(self)?;
        let z = assignment.full_assignment();
        for (idx, c) in self.constraints.iter().enumerate() {
            let (az, bz, cz) = c.evaluate(&z)?;
            if &az * &bz != cz {
                if std::env::var("R1CS_DEBUG_FAIL").is_ok() {
                    snarc_debug!("[r1cs] first failing constraint #{idx}");
                    snarc_debug!("  az={az:?}");
                    snarc_debug!("  bz={bz:?}");
                    snarc_debug!("  cz={cz:?}");

                    let dump_row = |label: &str, row: &LinearCombination<P>| {
                        snarc_debug!("  row {label} (len={}):", row.len());
                        for (var_idx, coeff) in row.terms() {
                            let val = z.get(*var_idx).cloned().unwrap_or_default();
                            snarc_debug!("    idx={var_idx:<6} coeff={coeff:?} val={val:?}");
                        }
                    };
                    dump_row("a", &c.a);
                    dump_row("b", &c.b);
                    dump_row("c", &c.c);
                }
                return Err(SnarcError::unsatisfied(
                    idx,
                    format!("({az}) * ({bz}) != ({cz})"),
                ));
            }
        }
        Ok(())
    }

    /// Appends empty constraints until the count is a power of two.
    pub fn pad(&mut self) {
        let target = next_pow2(self.constraints.len());
        if target > self.constraints.len() {
            snarc_debug!(
                "[r1cs] padding {} constraints to {}",
                self.constraints.len(),
                target
            );
        }
        self.constraints.resize_with(target, Constraint::empty);
    }

    /// Grows the primary input block to `padded_input_len(primary)`, shifting
    /// every auxiliary index up by the added amount. Returns that amount.
    pub fn pad_inputs(&mut self) -> usize {
        let target = padded_input_len(self.primary_input_size);
        self.remap_primary(target)
    }

    /// Grows the auxiliary block so that the variable count is a power of two.
    pub fn pad_auxiliary(&mut self) -> usize {
        let target = next_pow2(self.num_variables()) - 1 - self.primary_input_size;
        let added = target - self.auxiliary_input_size;
        self.auxiliary_input_size = target;
        added
    }

    pub(crate) fn remap_primary(&mut self, padded_primary: usize) -> usize {
        let shift = padded_primary.saturating_sub(self.primary_input_size);
        if shift == 0 {
            return 0;
        }
        let boundary = self.primary_input_size;
        for constraint in &mut self.constraints {
            for idx in constraint.indices_mut() {
                if *idx > boundary {
                    *idx += shift;
                }
            }
        }
        self.primary_input_size = padded_primary;
        shift
    }
}

/// Values for the primary and auxiliary variables (the constant one is implied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<P: FieldParams> {
    pub primary_input: Vec<FieldValue<P>>,
    pub auxiliary_input: Vec<FieldValue<P>>,
}

impl<P: FieldParams> Assignment<P> {
    pub fn new(primary_input: Vec<FieldValue<P>>, auxiliary_input: Vec<FieldValue<P>>) -> Self {
        Self {
            primary_input,
            auxiliary_input,
        }
    }

    pub fn validate(&self, system: &ConstraintSystem<P>) -> SnarcResult<()> {
        if self.primary_input.len() != system.primary_input_size()
            || self.auxiliary_input.len() != system.auxiliary_input_size()
        {
            return Err(SnarcError::serialization_mismatch(format!(
                "assignment has {} primary / {} auxiliary values, system declares {} / {}",
                self.primary_input.len(),
                self.auxiliary_input.len(),
                system.primary_input_size(),
                system.auxiliary_input_size()
            )));
        }
        Ok(())
    }

    /// `(1, primary..., auxiliary...)`
    pub fn full_assignment(&self) -> Vec<FieldValue<P>> {
        let mut assignment =
            Vec::with_capacity(1 + self.primary_input.len() + self.auxiliary_input.len());
        assignment.push(FieldValue::one());
        assignment.extend_from_slice(&self.primary_input);
        assignment.extend_from_slice(&self.auxiliary_input);
        assignment
    }

    /// Zero-pads the primary inputs to `next_pow2(len + 1) - 1`, and the
    /// witness as well when `witness` asks for it.
    pub fn pad_inputs(&mut self, witness: WitnessPadding) {
        let target = padded_input_len(self.primary_input.len());
        self.primary_input.resize(target, FieldValue::zero());
        if witness == WitnessPadding::ToNextPowerOfTwo {
            let total = 1 + self.primary_input.len() + self.auxiliary_input.len();
            let aux_target = next_pow2(total) - 1 - self.primary_input.len();
            self.auxiliary_input.resize(aux_target, FieldValue::zero());
        }
    }
}

/// Smallest power of two `>= n` (1 for 0).
pub fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Primary input length after padding: `next_pow2(len + 1) - 1`.
pub fn padded_input_len(len: usize) -> usize {
    next_pow2(len + 1) - 1
}

fn absorb_sparse_row<P: FieldParams>(hasher: &mut Sha256, row: &LinearCombination<P>) {
    hasher.update((row.len() as u64).to_le_bytes());
    for (idx, coeff) in row.terms() {
        hasher.update((*idx as u64).to_le_bytes());
        let bytes = coeff.as_biguint().to_bytes_le();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
}

fn compress_terms<P: FieldParams>(
    mut terms: Vec<(usize, FieldValue<P>)>,
) -> Vec<(usize, FieldValue<P>)> {
    terms.sort_by_key(|(idx, _)| *idx);
    let mut out: Vec<(usize, FieldValue<P>)> = Vec::with_capacity(terms.len());
    for (idx, coeff) in terms {
        if coeff.is_zero() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.0 == idx {
                last.1 += coeff;
                if last.1.is_zero() {
                    out.pop();
                }
                continue;
            }
        }
        out.push((idx, coeff));
    }
    out
}
