//! Lowering of circuit programs to R1CS.
//!
//! Every wire carries a symbolic linear combination over R1CS variables.
//! `add` and `const-mul` only combine existing combinations; the remaining
//! opcodes allocate fresh variables and constraints. Variable values are
//! taken from the judge, which runs in lock-step with the lowering, so the
//! returned assignment satisfies the system whenever the judge accepts the
//! program.
//!
//! Primary inputs are the `input` wires (in file order) followed by the
//! `output` wires; everything else is auxiliary.

use std::path::Path;

use num_bigint::BigUint;

use super::r1cs::{Assignment, Constraint, ConstraintSystem, LinearCombination, ONE};
use crate::circuit::{CircuitProgram, CommandView, Opcode, read_value_list_file};
use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};
use crate::judge::{Interpreter, JudgeConfig, JudgeOutcome, values_path};

type Lc<P> = LinearCombination<P>;

#[derive(Debug, Clone)]
pub struct CompiledCircuit<P: FieldParams> {
    pub system: ConstraintSystem<P>,
    pub assignment: Assignment<P>,
    /// What the judge printed while producing the witness.
    pub outcome: JudgeOutcome<P>,
}

struct R1csBuilder<P: FieldParams> {
    primary_size: usize,
    primary: Vec<FieldValue<P>>,
    auxiliary: Vec<FieldValue<P>>,
    constraints: Vec<Constraint<P>>,
}

impl<P: FieldParams> R1csBuilder<P> {
    fn new(primary_size: usize) -> Self {
        Self {
            primary_size,
            primary: Vec::with_capacity(primary_size),
            auxiliary: Vec::new(),
            constraints: Vec::new(),
        }
    }

    fn alloc_primary(&mut self, value: FieldValue<P>) -> usize {
        self.primary.push(value);
        self.primary.len()
    }

    fn alloc(&mut self, value: FieldValue<P>) -> usize {
        self.auxiliary.push(value);
        self.primary_size + self.auxiliary.len()
    }

    fn enforce_mul(&mut self, a: Lc<P>, b: Lc<P>, c: Lc<P>) {
        self.constraints.push(Constraint::new(a, b, c));
    }

    /// `lc * 1 = 0`
    fn enforce_zero(&mut self, lc: Lc<P>) {
        self.enforce_mul(lc, Lc::constant(FieldValue::one()), Lc::zero());
    }

    fn enforce_equal(&mut self, left: &Lc<P>, right: &Lc<P>) {
        self.enforce_zero(left.minus(right));
    }

    /// `x * (x - 1) = 0`
    fn enforce_boolean(&mut self, idx: usize) {
        let a = Lc::variable(idx);
        let b = Lc::compressed(vec![(idx, FieldValue::one()), (ONE, FieldValue::minus_one())]);
        self.enforce_mul(a, b, Lc::zero());
    }

    fn alloc_bit(&mut self, bit: bool) -> usize {
        let idx = self.alloc(FieldValue::from_bool(bit));
        self.enforce_boolean(idx);
        idx
    }

    /// Allocates the low `width` bits of `value` as boolean variables and
    /// returns them with their recomposition `Σ 2^i · b_i`.
    fn decompose_to_bits(&mut self, value: &FieldValue<P>, width: usize) -> (Vec<usize>, Lc<P>) {
        let bits: Vec<usize> = (0..width).map(|i| self.alloc_bit(value.bit(i))).collect();
        let terms = bits
            .iter()
            .enumerate()
            .map(|(i, &idx)| (idx, pow2::<P>(i)))
            .collect();
        (bits, Lc::compressed(terms))
    }

    fn finalize(self) -> SnarcResult<(ConstraintSystem<P>, Assignment<P>)> {
        if self.primary.len() != self.primary_size {
            return Err(SnarcError::serialization_mismatch(format!(
                "allocated {} primary inputs, expected {}",
                self.primary.len(),
                self.primary_size
            )));
        }
        let system =
            ConstraintSystem::with_constraints(self.primary_size, self.auxiliary.len(), self.constraints)?;
        Ok((system, Assignment::new(self.primary, self.auxiliary)))
    }
}

fn pow2<P: FieldParams>(i: usize) -> FieldValue<P> {
    FieldValue::from_biguint(BigUint::from(1u8) << i)
}

struct Lowering<'p, P: FieldParams> {
    builder: R1csBuilder<P>,
    judge: Interpreter<P>,
    wires: Vec<Option<Lc<P>>>,
    program: &'p CircuitProgram,
}

impl<'p, P: FieldParams> Lowering<'p, P> {
    fn new(
        program: &'p CircuitProgram,
        values: Vec<FieldValue<P>>,
        config: &JudgeConfig,
    ) -> SnarcResult<Self> {
        let mut judge = Interpreter::new(program.total(), config)?;
        judge.load_values(values)?;
        let inputs = program.input_wires();
        let primary_size = inputs.len() + program.output_wires().len();
        let mut lowering = Self {
            builder: R1csBuilder::new(primary_size),
            judge,
            wires: vec![None; program.total()],
            program,
        };
        for wire in inputs {
            let value = lowering.judge.wire(wire)?.clone();
            let idx = lowering.builder.alloc_primary(value);
            lowering.wires[wire] = Some(Lc::variable(idx));
        }
        Ok(lowering)
    }

    fn run(mut self) -> SnarcResult<CompiledCircuit<P>> {
        let program = self.program;
        for command in program.commands() {
            self.lower(&command.as_view())?;
        }
        let (system, assignment) = self.builder.finalize()?;
        snarc_debug!(
            "[compiler] {} constraints, {} primary, {} auxiliary",
            system.num_constraints(),
            system.primary_input_size(),
            system.auxiliary_input_size()
        );
        Ok(CompiledCircuit {
            system,
            assignment,
            outcome: self.judge.into_outcome(),
        })
    }

    /// Symbolic value of a wire. A wire read before anything wrote it is an
    /// unconstrained witness holding its loaded value.
    fn lc(&mut self, wire: usize) -> SnarcResult<Lc<P>> {
        if let Some(lc) = self.wires.get(wire).cloned().flatten() {
            return Ok(lc);
        }
        let value = self.judge.wire(wire)?.clone();
        let idx = self.builder.alloc(value);
        let lc = Lc::variable(idx);
        self.wires[wire] = Some(lc.clone());
        Ok(lc)
    }

    fn value(&self, wire: usize) -> SnarcResult<FieldValue<P>> {
        self.judge.wire(wire).cloned()
    }

    fn bind(&mut self, wire: usize, lc: Lc<P>) -> SnarcResult<()> {
        let total = self.wires.len();
        let slot = self
            .wires
            .get_mut(wire)
            .ok_or_else(|| SnarcError::index_out_of_range("wire", wire, total))?;
        *slot = Some(lc);
        Ok(())
    }

    /// Allocates `wire`'s current judge value as a fresh auxiliary variable.
    fn alloc_wire(&mut self, wire: usize) -> SnarcResult<usize> {
        let idx = self.builder.alloc(self.value(wire)?);
        self.bind(wire, Lc::variable(idx))?;
        Ok(idx)
    }

    fn lower(&mut self, command: &CommandView<'_>) -> SnarcResult<()> {
        let ins = command.inputs;
        let outs = command.outputs;
        let before: Vec<FieldValue<P>> = ins
            .iter()
            .map(|&w| self.value(w))
            .collect::<SnarcResult<_>>()?;
        let in_lcs: Vec<Lc<P>> = match command.opcode {
            Opcode::Input | Opcode::NizkInput => Vec::new(),
            _ => ins.iter().map(|&w| self.lc(w)).collect::<SnarcResult<_>>()?,
        };
        self.judge.execute(command)?;

        match command.opcode {
            Opcode::Input => {}
            Opcode::NizkInput => {
                if self.wires[ins[0]].is_none() {
                    self.alloc_wire(ins[0])?;
                }
            }
            Opcode::Output => {
                let idx = self.builder.alloc_primary(before[0].clone());
                self.builder.enforce_equal(&in_lcs[0], &Lc::variable(idx));
            }
            Opcode::Add => {
                self.bind(outs[0], in_lcs[0].plus(&in_lcs[1]))?;
            }
            Opcode::ConstMul | Opcode::ConstMulNeg => {
                let hex = command.constant_hex.ok_or_else(|| {
                    SnarcError::unexpected_token(command.opcode.mnemonic(), "(hex constant)")
                })?;
                let mut constant = FieldValue::<P>::from_hex_string(hex)?;
                if command.opcode == Opcode::ConstMulNeg {
                    constant = -constant;
                }
                self.bind(outs[0], in_lcs[0].scaled(&constant))?;
            }
            Opcode::Mul => {
                let o = self.alloc_wire(outs[0])?;
                self.builder
                    .enforce_mul(in_lcs[0].clone(), in_lcs[1].clone(), Lc::variable(o));
            }
            Opcode::Zerop => {
                // x * m = o, x * (1 - o) = 0
                let m = self.alloc_wire(outs[0])?;
                let o = self.alloc_wire(outs[1])?;
                let x = &in_lcs[0];
                self.builder
                    .enforce_mul(x.clone(), Lc::variable(m), Lc::variable(o));
                let not_o = Lc::constant(FieldValue::one()).minus(&Lc::variable(o));
                self.builder.enforce_mul(x.clone(), not_o, Lc::zero());
            }
            Opcode::Split => {
                let (bits, recomposed) = self.builder.decompose_to_bits(&before[0], outs.len());
                self.builder.enforce_equal(&recomposed, &in_lcs[0]);
                for (&wire, idx) in outs.iter().zip(bits) {
                    self.bind(wire, Lc::variable(idx))?;
                }
            }
            Opcode::Asplit => self.lower_asplit(&before[0], &in_lcs[0], outs)?,
            Opcode::Dload => self.lower_dload(&before, &in_lcs, outs[0])?,
            Opcode::IntDiv => {
                let width = command
                    .width
                    .ok_or_else(|| SnarcError::unexpected_token("div", "(division width)"))?
                    as usize;
                self.lower_int_div(&before, &in_lcs, outs, width)?;
            }
            Opcode::FieldDiv => {
                // o * b = a, b * inv(b) = 1
                let o = self.alloc_wire(outs[0])?;
                let inverse = self.builder.alloc(before[1].inverse()?);
                let (a, b) = (&in_lcs[0], &in_lcs[1]);
                self.builder.enforce_mul(Lc::variable(o), b.clone(), a.clone());
                self.builder.enforce_mul(
                    b.clone(),
                    Lc::variable(inverse),
                    Lc::constant(FieldValue::one()),
                );
            }
        }
        Ok(())
    }

    /// `s_j * (x - j) = 0` for each `j`, then with `t = Π (x - j)`:
    /// `t * m = 1 - Σ s` and `t * Σ s = 0`. Exactly one indicator is set
    /// when `x` is in `0..k`, none otherwise.
    fn lower_asplit(
        &mut self,
        x_value: &FieldValue<P>,
        x: &Lc<P>,
        outs: &[usize],
    ) -> SnarcResult<()> {
        let mut sum = Lc::zero();
        for (j, &wire) in outs.iter().enumerate() {
            let s = self.alloc_wire(wire)?;
            let shifted = x.minus(&Lc::constant(FieldValue::from_u64(j as u64)));
            self.builder.enforce_mul(Lc::variable(s), shifted, Lc::zero());
            sum = sum.plus(&Lc::variable(s));
        }
        if outs.is_empty() {
            return Ok(());
        }

        let mut product = x.clone();
        let mut product_value = x_value.clone();
        for j in 1..outs.len() {
            let shift = FieldValue::from_u64(j as u64);
            product_value = &product_value * &(x_value - &shift);
            let t = self.builder.alloc(product_value.clone());
            self.builder
                .enforce_mul(product, x.minus(&Lc::constant(shift)), Lc::variable(t));
            product = Lc::variable(t);
        }

        let helper = if product_value.is_zero() {
            FieldValue::zero()
        } else {
            product_value.inverse()?
        };
        let m = self.builder.alloc(helper);
        let not_hit = Lc::constant(FieldValue::one()).minus(&sum);
        self.builder.enforce_mul(product.clone(), Lc::variable(m), not_hit);
        self.builder.enforce_mul(product, sum, Lc::zero());
        Ok(())
    }

    /// One-hot selector `e` over the sources: `e_j * (sel - j) = 0`,
    /// `Σ e_j = 1`, and the output is `Σ e_j * v_j`.
    fn lower_dload(
        &mut self,
        before: &[FieldValue<P>],
        in_lcs: &[Lc<P>],
        out: usize,
    ) -> SnarcResult<()> {
        let selector = &in_lcs[0];
        let selected = before[0].to_u64();
        let mut indicator_sum = Lc::zero();
        let mut indicators = Vec::with_capacity(in_lcs.len() - 1);
        for j in 0..in_lcs.len() - 1 {
            let e = self
                .builder
                .alloc(FieldValue::from_bool(selected == Some(j as u64)));
            let shifted = selector.minus(&Lc::constant(FieldValue::from_u64(j as u64)));
            self.builder.enforce_mul(Lc::variable(e), shifted, Lc::zero());
            indicator_sum = indicator_sum.plus(&Lc::variable(e));
            indicators.push(e);
        }
        self.builder.enforce_equal(&indicator_sum, &Lc::constant(FieldValue::one()));

        let mut output = Lc::zero();
        for (j, e) in indicators.into_iter().enumerate() {
            let value = if selected == Some(j as u64) {
                before[j + 1].clone()
            } else {
                FieldValue::zero()
            };
            let p = self.builder.alloc(value);
            self.builder
                .enforce_mul(Lc::variable(e), in_lcs[j + 1].clone(), Lc::variable(p));
            output = output.plus(&Lc::variable(p));
        }
        self.bind(out, output)
    }

    /// `q * b = a - r` with `a`, `b`, `q`, `r` and `b - r - 1` all decomposed
    /// into `width` bits, which pins `0 <= r < b` and the operand range the
    /// judge checks.
    fn lower_int_div(
        &mut self,
        before: &[FieldValue<P>],
        in_lcs: &[Lc<P>],
        outs: &[usize],
        width: usize,
    ) -> SnarcResult<()> {
        let (a, b) = (&in_lcs[0], &in_lcs[1]);
        let q_value = self.value(outs[0])?;
        let r_value = self.value(outs[1])?;
        let d_value = &(&before[1] - &r_value) - &FieldValue::one();

        let (_, a_bits) = self.builder.decompose_to_bits(&before[0], width);
        self.builder.enforce_equal(&a_bits, a);
        let (_, b_bits) = self.builder.decompose_to_bits(&before[1], width);
        self.builder.enforce_equal(&b_bits, b);
        let (_, q) = self.builder.decompose_to_bits(&q_value, width);
        let (_, r) = self.builder.decompose_to_bits(&r_value, width);
        let (_, d) = self.builder.decompose_to_bits(&d_value, width);

        self.builder.enforce_mul(q.clone(), b.clone(), a.minus(&r));
        let gap = b
            .minus(&r)
            .minus(&Lc::constant(FieldValue::one()))
            .minus(&d);
        self.builder.enforce_zero(gap);

        self.bind(outs[0], q)?;
        self.bind(outs[1], r)
    }
}

/// Lowers `program` to R1CS, using `values` as the circuit's value list.
pub fn compile_program<P: FieldParams>(
    program: &CircuitProgram,
    values: Vec<FieldValue<P>>,
    config: &JudgeConfig,
) -> SnarcResult<CompiledCircuit<P>> {
    Lowering::new(program, values, config)?.run()
}

/// Compiles `path` with its `<path>.in` value list.
pub fn compile_file<P: FieldParams>(
    path: impl AsRef<Path>,
    config: &JudgeConfig,
) -> SnarcResult<CompiledCircuit<P>> {
    let path = path.as_ref();
    let program = CircuitProgram::from_file(path)?;
    let values = read_value_list_file(values_path(path))?;
    compile_program(&program, values, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Command, read_value_list};
    use crate::field::Bn254Fr;

    type Fv = FieldValue<Bn254Fr>;

    fn compile(text: &str, values: &str) -> CompiledCircuit<Bn254Fr> {
        let program: CircuitProgram = text.parse().expect("circuit should parse");
        let values = read_value_list(values.as_bytes()).expect("values should parse");
        compile_program(&program, values, &JudgeConfig::default()).expect("compile should succeed")
    }

    fn assert_satisfied(compiled: &CompiledCircuit<Bn254Fr>) {
        compiled
            .system
            .is_satisfied(&compiled.assignment)
            .expect("compiled assignment should satisfy the system");
    }

    #[test]
    fn linear_ops_are_free() {
        let compiled = compile(
            "total 4\ninput 0\ninput 1\nadd in 2 < 0 1 > out 1 < 2 >\nconst-mul-3 in 1 < 2 > out 1 < 3 >\noutput 3\n",
            "0 5\n1 a\n",
        );
        assert_eq!(compiled.system.num_constraints(), 1);
        assert_eq!(compiled.system.primary_input_size(), 3);
        assert_eq!(compiled.system.auxiliary_input_size(), 0);
        assert_eq!(compiled.assignment.primary_input[2], Fv::from_u64(45));
        assert_satisfied(&compiled);
    }

    #[test]
    fn mul_allocates_one_constraint() {
        let compiled = compile(
            "total 3\ninput 0\nnizkinput 1\nmul in 2 < 0 1 > out 1 < 2 >\noutput 2\n",
            "0 6\n1 7\n",
        );
        assert_eq!(compiled.system.num_constraints(), 2);
        assert_eq!(compiled.assignment.primary_input, vec![Fv::from_u64(6), Fv::from_u64(42)]);
        assert_satisfied(&compiled);
    }

    #[test]
    fn zerop_split_asplit_dload() {
        let text = "total 16\n\
                    input 0\n\
                    input 1\n\
                    zerop in 1 < 0 > out 2 < 2 3 >\n\
                    split in 1 < 1 > out 4 < 4 5 6 7 >\n\
                    asplit in 1 < 0 > out 3 < 8 9 10 >\n\
                    dload in 4 < 0 4 5 6 > out 1 < 11 >\n\
                    zerop in 1 < 12 > out 2 < 13 14 >\n\
                    output 3\n\
                    output 11\n\
                    output 14\n";
        let compiled = compile(text, "0 2\n1 d\n");
        assert_satisfied(&compiled);
        // 13 = 1101: dload picks bit 2 (value 1)
        assert_eq!(
            compiled.assignment.primary_input,
            vec![
                Fv::from_u64(2),
                Fv::from_u64(13),
                Fv::one(),
                Fv::one(),
                Fv::zero()
            ]
        );
    }

    #[test]
    fn divisions() {
        let compiled = compile(
            "total 6\ninput 0\ninput 1\ndiv_8 in 2 < 0 1 > out 2 < 2 3 >\ndiv in 2 < 0 1 > out 1 < 4 >\noutput 2\noutput 3\n",
            "0 64\n1 7\n",
        );
        assert_satisfied(&compiled);
        let primary = &compiled.assignment.primary_input;
        assert_eq!(primary[2], Fv::from_u64(14));
        assert_eq!(primary[3], Fv::from_u64(2));
        // 5 * 8 boolean constraints, two operand recompositions, the division,
        // the range, two outputs and the field division pair.
        assert_eq!(compiled.system.num_constraints(), 40 + 2 + 2 + 2 + 2);
    }

    #[test]
    fn asplit_indicators_cannot_all_be_zero() {
        let text = "total 4\ninput 0\nasplit in 1 < 0 > out 3 < 1 2 3 >\n";
        let mut compiled = compile(text, "0 2\n");
        assert_satisfied(&compiled);
        assert_eq!(
            compiled.assignment.auxiliary_input[..3],
            [Fv::zero(), Fv::zero(), Fv::one()]
        );

        compiled.assignment.auxiliary_input[2] = Fv::zero();
        assert!(matches!(
            compiled.system.is_satisfied(&compiled.assignment),
            Err(SnarcError::Unsatisfied { .. })
        ));
    }

    #[test]
    fn asplit_out_of_range_sets_no_indicator() {
        let text = "total 4\ninput 0\nasplit in 1 < 0 > out 3 < 1 2 3 >\n";
        let mut compiled = compile(text, "0 7\n");
        assert_satisfied(&compiled);
        assert!(compiled.assignment.auxiliary_input[..3].iter().all(Fv::is_zero));

        compiled.assignment.auxiliary_input[0] = Fv::one();
        assert!(compiled.system.is_satisfied(&compiled.assignment).is_err());
    }

    #[test]
    fn integer_division_range_checks_operands() {
        let text = "total 4\ninput 0\ninput 1\ndiv_4 in 2 < 0 1 > out 2 < 2 3 >\n";
        let compiled = compile(text, "0 9\n1 2\n");
        assert_satisfied(&compiled);
        let has_boolean_on = |idx: usize| {
            compiled.system.constraints().iter().any(|c| {
                c.a.terms() == [(idx, Fv::one())] && c.b.terms().contains(&(idx, Fv::one()))
            })
        };
        // a and b come first among the auxiliary bits, after the two primary inputs.
        assert!((3..11).all(has_boolean_on));
    }

    #[test]
    fn missing_operands_are_errors_not_defaults() {
        let program = CircuitProgram::new(
            2,
            vec![
                Command {
                    opcode: Opcode::ConstMul,
                    inputs: vec![0],
                    outputs: vec![1],
                    constant_hex: None,
                    width: None,
                },
            ],
        )
        .unwrap();
        let err = compile_program::<Bn254Fr>(&program, vec![Fv::one()], &JudgeConfig::default())
            .unwrap_err();
        assert!(matches!(err, SnarcError::UnexpectedToken { .. }));
    }

    #[test]
    fn tampered_witness_is_rejected() {
        let mut compiled = compile(
            "total 3\ninput 0\ninput 1\nmul in 2 < 0 1 > out 1 < 2 >\noutput 2\n",
            "0 3\n1 4\n",
        );
        compiled.assignment.primary_input[2] = Fv::from_u64(13);
        assert!(matches!(
            compiled.system.is_satisfied(&compiled.assignment),
            Err(SnarcError::Unsatisfied { .. })
        ));
    }

    #[test]
    fn judge_failures_abort_compilation() {
        let program: CircuitProgram = "total 4\nsplit in 1 < 0 > out 3 < 1 2 3 >\n".parse().unwrap();
        let err = compile_program(&program, vec![Fv::from_u64(12)], &JudgeConfig::default())
            .unwrap_err();
        assert!(matches!(err, SnarcError::SoundnessViolation { .. }));
    }
}
