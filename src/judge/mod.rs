//! Reference interpreter ("judge") for circuit programs.
//!
//! The judge evaluates commands in file order over a zero-initialised wire
//! array, independently of any constraint system. Its outputs are the ground
//! truth a compiled R1CS is checked against.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::circuit::{CircuitProgram, CircuitReader, CommandView, Opcode, read_value_list_file};
use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};

/// Environment override for [`JudgeConfig::output_width`].
pub const OUTPUT_WIDTH_ENV: &str = "SNARC_OUTPUT_WIDTH";
/// Environment override for [`JudgeConfig::max_width`].
pub const MAX_WIDTH_ENV: &str = "SNARC_MAX_WIDTH";

/// Selector bits read by `dload`.
const DLOAD_SELECTOR_BITS: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeConfig {
    /// Width of the bit string printed for each `output` wire.
    pub output_width: usize,
    /// Bits examined by the `split`/`dload`/`div_<W>` soundness checks.
    /// `None` means the bit width of the field.
    pub max_width: Option<usize>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            output_width: 64,
            max_width: None,
        }
    }
}

impl JudgeConfig {
    /// Defaults, overridden by `SNARC_OUTPUT_WIDTH` / `SNARC_MAX_WIDTH` when set.
    pub fn from_env() -> SnarcResult<Self> {
        let mut config = Self::default();
        if let Some(width) = env_usize(OUTPUT_WIDTH_ENV)? {
            config.output_width = width;
        }
        if let Some(width) = env_usize(MAX_WIDTH_ENV)? {
            config.max_width = Some(width);
        }
        Ok(config)
    }

    pub fn max_width_for<P: FieldParams>(&self) -> usize {
        self.max_width.unwrap_or_else(P::bit_width)
    }
}

fn env_usize(name: &str) -> SnarcResult<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            SnarcError::unexpected_token(raw.as_str(), format!("(unsigned integer in {name})"))
        }),
        Err(_) => Ok(None),
    }
}

/// One `output` command's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine<P: FieldParams> {
    pub wire: usize,
    pub value: FieldValue<P>,
    /// `value` as a fixed-width bit string, most significant bit first.
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeOutcome<P: FieldParams> {
    pub outputs: Vec<OutputLine<P>>,
    pub cost: u64,
}

pub struct Interpreter<P: FieldParams> {
    wires: Vec<FieldValue<P>>,
    output_width: usize,
    max_width: usize,
    cost: u64,
    steps: usize,
    outputs: Vec<OutputLine<P>>,
}

impl<P: FieldParams> Interpreter<P> {
    /// Fails with `CapacityExceeded` when `total` wires cannot be allocated.
    pub fn new(total: usize, config: &JudgeConfig) -> SnarcResult<Self> {
        let mut wires = Vec::new();
        wires
            .try_reserve_exact(total)
            .map_err(|_| SnarcError::capacity_exceeded("wires", total))?;
        wires.resize(total, FieldValue::zero());
        Ok(Self {
            wires,
            output_width: config.output_width,
            max_width: config.max_width_for::<P>(),
            cost: 0,
            steps: 0,
            outputs: Vec::new(),
        })
    }

    /// Seeds wires `0..values.len()` with external input/witness values.
    pub fn load_values(
        &mut self,
        values: impl IntoIterator<Item = FieldValue<P>>,
    ) -> SnarcResult<()> {
        let total = self.wires.len();
        for (index, value) in values.into_iter().enumerate() {
            let slot = self
                .wires
                .get_mut(index)
                .ok_or_else(|| SnarcError::index_out_of_range("value", index, total))?;
            *slot = value;
        }
        Ok(())
    }

    pub fn run(&mut self, program: &CircuitProgram) -> SnarcResult<()> {
        for command in program.commands() {
            self.execute(&command.as_view())?;
        }
        snarc_debug!("[judge] {} commands, cost {}", self.steps, self.cost);
        Ok(())
    }

    /// Runs commands straight off a reader without materialising the program.
    pub fn run_stream<R: BufRead>(&mut self, reader: &mut CircuitReader<R>) -> SnarcResult<()> {
        while let Some(command) = reader.next_command()? {
            self.execute(&command)?;
        }
        snarc_debug!("[judge] {} commands, cost {}", self.steps, self.cost);
        Ok(())
    }

    pub fn execute(&mut self, command: &CommandView<'_>) -> SnarcResult<()> {
        command.check_arity()?;
        let ins = command.inputs;
        let outs = command.outputs;
        match command.opcode {
            Opcode::Input | Opcode::NizkInput => {
                self.wire(ins[0])?;
            }
            Opcode::Output => {
                let value = self.wire(ins[0])?.clone();
                let rendered = value.to_bit_string(self.output_width);
                self.outputs.push(OutputLine {
                    wire: ins[0],
                    value,
                    rendered,
                });
            }
            Opcode::Add => {
                let sum = self.wire(ins[0])? + self.wire(ins[1])?;
                self.set(outs[0], sum)?;
            }
            Opcode::Mul => {
                let product = self.wire(ins[0])? * self.wire(ins[1])?;
                self.set(outs[0], product)?;
                self.cost += 1;
            }
            Opcode::ConstMul | Opcode::ConstMulNeg => {
                let constant = constant_of(command)?;
                let mut product = self.wire(ins[0])? * &constant;
                if command.opcode == Opcode::ConstMulNeg {
                    product = -product;
                }
                self.set(outs[0], product)?;
            }
            Opcode::Zerop => {
                let x = self.wire(ins[0])?;
                let (helper, flag) = if x.is_zero() {
                    (FieldValue::zero(), FieldValue::zero())
                } else {
                    (x.inverse()?, FieldValue::one())
                };
                self.set(outs[0], helper)?;
                self.set(outs[1], flag)?;
                self.cost += 2;
            }
            Opcode::Split => {
                let x = self.wire(ins[0])?.clone();
                let k = outs.len();
                if let Some(position) = x.first_set_bit_in(k, self.max_width) {
                    return Err(SnarcError::soundness_violation("split", k, position));
                }
                for (i, &out) in outs.iter().enumerate() {
                    self.set(out, x.bit_at(i))?;
                }
                self.cost += k as u64 + 1;
            }
            Opcode::Asplit => {
                let x = self.wire(ins[0])?.to_u64();
                for (j, &out) in outs.iter().enumerate() {
                    self.set(out, FieldValue::from_bool(x == Some(j as u64)))?;
                }
                self.cost += outs.len() as u64 + 1;
            }
            Opcode::Dload => {
                let selector = self.unsigned(ins[0], DLOAD_SELECTOR_BITS, "dload selector")?;
                let sources = ins.len() - 1;
                let source = usize::try_from(selector)
                    .ok()
                    .filter(|&s| s < sources)
                    .ok_or_else(|| {
                        SnarcError::index_out_of_range(
                            "dload selector",
                            usize::try_from(selector).unwrap_or(usize::MAX),
                            sources,
                        )
                    })?;
                let value = self.wire(ins[source + 1])?.clone();
                self.set(outs[0], value)?;
            }
            Opcode::IntDiv => {
                let width = command
                    .width
                    .ok_or_else(|| SnarcError::unexpected_token("div", "(division width)"))?
                    as usize;
                let a = self.unsigned(ins[0], width, "integer division dividend")?;
                let b = self.unsigned(ins[1], width, "integer division divisor")?;
                if b == 0 {
                    return Err(SnarcError::division_by_zero(format!("div_{width}")));
                }
                self.set(outs[0], FieldValue::from_u64(a / b))?;
                self.set(outs[1], FieldValue::from_u64(a % b))?;
            }
            Opcode::FieldDiv => {
                let b = self.wire(ins[1])?;
                if b.is_zero() {
                    return Err(SnarcError::division_by_zero("div"));
                }
                let quotient = self.wire(ins[0])?.checked_div(b)?;
                self.set(outs[0], quotient)?;
            }
        }
        self.steps += 1;
        Ok(())
    }

    pub fn wire(&self, index: usize) -> SnarcResult<&FieldValue<P>> {
        self.wires
            .get(index)
            .ok_or_else(|| SnarcError::index_out_of_range("wire", index, self.wires.len()))
    }

    pub fn wires(&self) -> &[FieldValue<P>] {
        &self.wires
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn outputs(&self) -> &[OutputLine<P>] {
        &self.outputs
    }

    pub fn into_outcome(self) -> JudgeOutcome<P> {
        JudgeOutcome {
            outputs: self.outputs,
            cost: self.cost,
        }
    }

    fn set(&mut self, index: usize, value: FieldValue<P>) -> SnarcResult<()> {
        let total = self.wires.len();
        let slot = self
            .wires
            .get_mut(index)
            .ok_or_else(|| SnarcError::index_out_of_range("wire", index, total))?;
        *slot = value;
        Ok(())
    }

    /// Reads a wire as a `width`-bit unsigned integer; any set bit from
    /// `width` up to `max_width` is a soundness violation.
    fn unsigned(&self, index: usize, width: usize, context: &str) -> SnarcResult<u64> {
        let value = self.wire(index)?;
        if let Some(position) = value.first_set_bit_in(width, self.max_width) {
            return Err(SnarcError::soundness_violation(context, width, position));
        }
        Ok(value.low_u64(width))
    }
}

fn constant_of<P: FieldParams>(command: &CommandView<'_>) -> SnarcResult<FieldValue<P>> {
    let hex = command
        .constant_hex
        .ok_or_else(|| SnarcError::unexpected_token(command.opcode.mnemonic(), "(hex constant)"))?;
    FieldValue::from_hex_string(hex)
}

/// Evaluates a parsed program against its value list.
pub fn judge_program<P: FieldParams>(
    program: &CircuitProgram,
    values: Vec<FieldValue<P>>,
    config: &JudgeConfig,
) -> SnarcResult<JudgeOutcome<P>> {
    let mut interpreter = Interpreter::new(program.total(), config)?;
    interpreter.load_values(values)?;
    interpreter.run(program)?;
    Ok(interpreter.into_outcome())
}

/// Evaluates a circuit straight from a reader.
pub fn judge_stream<P: FieldParams, R: BufRead>(
    mut reader: CircuitReader<R>,
    values: Vec<FieldValue<P>>,
    config: &JudgeConfig,
) -> SnarcResult<JudgeOutcome<P>> {
    let total = reader.total()?;
    let mut interpreter = Interpreter::new(total, config)?;
    interpreter.load_values(values)?;
    interpreter.run_stream(&mut reader)?;
    Ok(interpreter.into_outcome())
}

/// Evaluates `path` with the value list stored next to it in `<path>.in`.
pub fn judge_file<P: FieldParams>(
    path: impl AsRef<Path>,
    config: &JudgeConfig,
) -> SnarcResult<JudgeOutcome<P>> {
    let path = path.as_ref();
    let values = read_value_list_file(values_path(path))?;
    judge_stream(CircuitReader::open(path)?, values, config)
}

/// `<circuit>.in`
pub fn values_path(circuit: &Path) -> PathBuf {
    let mut name = circuit.as_os_str().to_owned();
    name.push(".in");
    PathBuf::from(name)
}
