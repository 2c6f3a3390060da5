//! Arithmetic circuits in the line-oriented `.arith` text format.
//!
//! A circuit file declares its wire count on the first non-comment line
//! (`total <N>`) and then lists one command per line. Commands are kept in file
//! order: later commands read wires written by earlier ones, so the order is a
//! data dependency, not a presentation detail.
//!
//! ```text
//! total 4
//! input 0
//! input 1
//! add in 2 < 0 1 > out 1 < 2 >
//! output 2
//! ```

pub mod reader;
pub mod value_list;

use std::path::Path;
use std::str::FromStr;

use crate::errors::{SnarcError, SnarcResult};

pub use reader::{CircuitReader, parse_program};
pub use value_list::{
    ValueListReader, format_value_list, read_value_list, read_value_list_file,
};

/// Largest width accepted by `div_<W>`.
pub const MAX_INT_DIV_WIDTH: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Input,
    NizkInput,
    Add,
    Mul,
    ConstMul,
    ConstMulNeg,
    Zerop,
    Split,
    Output,
    Dload,
    Asplit,
    IntDiv,
    FieldDiv,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Input => "input",
            Opcode::NizkInput => "nizkinput",
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::ConstMul => "const-mul",
            Opcode::ConstMulNeg => "const-mul-neg",
            Opcode::Zerop => "zerop",
            Opcode::Split => "split",
            Opcode::Output => "output",
            Opcode::Dload => "dload",
            Opcode::Asplit => "asplit",
            Opcode::IntDiv => "div_N",
            Opcode::FieldDiv => "div",
        }
    }

    /// Checks the fixed input/output arity of the opcode.
    pub fn check_arity(self, inputs: usize, outputs: usize) -> SnarcResult<()> {
        let (ok, expected) = match self {
            Opcode::Input | Opcode::NizkInput | Opcode::Output => {
                (inputs == 1 && outputs == 0, "1 wire")
            }
            Opcode::Add | Opcode::Mul | Opcode::FieldDiv => {
                (inputs == 2 && outputs == 1, "2 inputs and 1 output")
            }
            Opcode::ConstMul | Opcode::ConstMulNeg => {
                (inputs == 1 && outputs == 1, "1 input and 1 output")
            }
            Opcode::Zerop => (inputs == 1 && outputs == 2, "1 input and 2 outputs"),
            Opcode::Split | Opcode::Asplit => (inputs == 1, "1 input"),
            Opcode::Dload => (inputs > 1 && outputs == 1, "at least 2 inputs and 1 output"),
            Opcode::IntDiv => (inputs == 2 && outputs == 2, "2 inputs and 2 outputs"),
        };
        if ok {
            Ok(())
        } else {
            Err(SnarcError::ArityMismatch {
                opcode: self.mnemonic(),
                expected,
                inputs,
                outputs,
            })
        }
    }
}

/// A command borrowed from the reader's reusable buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandView<'a> {
    pub opcode: Opcode,
    pub inputs: &'a [usize],
    pub outputs: &'a [usize],
    /// Hex constant of `const-mul-<HEX>` / `const-mul-neg-<HEX>`.
    pub constant_hex: Option<&'a str>,
    /// Bit width of `div_<W>`.
    pub width: Option<u32>,
}

impl CommandView<'_> {
    pub fn to_command(&self) -> Command {
        Command {
            opcode: self.opcode,
            inputs: self.inputs.to_vec(),
            outputs: self.outputs.to_vec(),
            constant_hex: self.constant_hex.map(str::to_owned),
            width: self.width,
        }
    }

    pub fn check_arity(&self) -> SnarcResult<()> {
        self.opcode.check_arity(self.inputs.len(), self.outputs.len())
    }

    /// Every wire index the command touches.
    pub fn wires(&self) -> impl Iterator<Item = usize> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub opcode: Opcode,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    pub constant_hex: Option<String>,
    pub width: Option<u32>,
}

impl Command {
    pub fn as_view(&self) -> CommandView<'_> {
        CommandView {
            opcode: self.opcode,
            inputs: &self.inputs,
            outputs: &self.outputs,
            constant_hex: self.constant_hex.as_deref(),
            width: self.width,
        }
    }
}

/// A parsed circuit: the declared wire count and the commands in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitProgram {
    total: usize,
    commands: Vec<Command>,
}

impl CircuitProgram {
    /// Builds a program, rejecting any command that references a wire at or
    /// beyond `total`.
    pub fn new(total: usize, commands: Vec<Command>) -> SnarcResult<Self> {
        for command in &commands {
            check_wires(&command.as_view(), total)?;
        }
        Ok(Self { total, commands })
    }

    pub fn from_file(path: impl AsRef<Path>) -> SnarcResult<Self> {
        let reader = CircuitReader::open(path)?;
        parse_program(reader)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Wires marked with `input`, in file order.
    pub fn input_wires(&self) -> Vec<usize> {
        self.wires_of(Opcode::Input)
    }

    /// Wires marked with `nizkinput`, in file order.
    pub fn nizk_input_wires(&self) -> Vec<usize> {
        self.wires_of(Opcode::NizkInput)
    }

    /// Wires marked with `output`, in file order.
    pub fn output_wires(&self) -> Vec<usize> {
        self.wires_of(Opcode::Output)
    }

    fn wires_of(&self, opcode: Opcode) -> Vec<usize> {
        self.commands
            .iter()
            .filter(|c| c.opcode == opcode)
            .filter_map(|c| c.inputs.first().copied())
            .collect()
    }
}

impl FromStr for CircuitProgram {
    type Err = SnarcError;

    fn from_str(s: &str) -> SnarcResult<Self> {
        parse_program(CircuitReader::new(s.as_bytes()))
    }
}

pub(crate) fn check_wires(command: &CommandView<'_>, total: usize) -> SnarcResult<()> {
    match command.wires().find(|&w| w >= total) {
        Some(index) => Err(SnarcError::index_out_of_range("wire", index, total)),
        None => Ok(()),
    }
}
