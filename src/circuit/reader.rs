//! Streaming, single-pass reader for circuit text.
//!
//! The reader owns one line buffer and two wire-index buffers and reuses them
//! for every line of the file; [`CircuitReader::next_command`] hands out a
//! [`CommandView`] borrowing those buffers, valid until the next call.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{CircuitProgram, CommandView, MAX_INT_DIV_WIDTH, Opcode, check_wires};
use crate::errors::{SnarcError, SnarcResult};

pub struct CircuitReader<R> {
    source: R,
    origin: String,
    line: String,
    line_no: usize,
    total: Option<usize>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

impl CircuitReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> SnarcResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SnarcError::io(path, e))?;
        Ok(Self::with_origin(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> CircuitReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_origin(source, "<circuit>".to_string())
    }

    /// `origin` names the source in I/O errors and debug logs.
    pub fn with_origin(source: R, origin: String) -> Self {
        Self {
            source,
            origin,
            line: String::new(),
            line_no: 0,
            total: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// The declared wire count. Reads the `total` line on first call.
    pub fn total(&mut self) -> SnarcResult<usize> {
        if let Some(total) = self.total {
            return Ok(total);
        }
        if !self.next_significant_line()? {
            return Err(SnarcError::malformed_header("missing 'total <N>' line"));
        }
        let total = parse_total(&self.line)?;
        snarc_debug!("[circuit] {}: total {}", self.origin, total);
        self.total = Some(total);
        Ok(total)
    }

    /// 1-based number of the line most recently read.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Parses the next command, or returns `None` at end of input.
    pub fn next_command(&mut self) -> SnarcResult<Option<CommandView<'_>>> {
        let total = self.total()?;
        if !self.next_significant_line()? {
            return Ok(None);
        }
        let parsed = parse_command_line(&self.line, &mut self.inputs, &mut self.outputs)
            .inspect_err(|err| {
                snarc_debug!("[circuit] {}:{}: {}", self.origin, self.line_no, err);
            })?;
        let view = CommandView {
            opcode: parsed.opcode,
            inputs: &self.inputs,
            outputs: &self.outputs,
            constant_hex: parsed.constant.map(|(start, end)| &self.line[start..end]),
            width: parsed.width,
        };
        check_wires(&view, total)?;
        Ok(Some(view))
    }

    /// Advances to the next line that is neither blank nor a `#` comment.
    fn next_significant_line(&mut self) -> SnarcResult<bool> {
        loop {
            self.line.clear();
            let read = self
                .source
                .read_line(&mut self.line)
                .map_err(|e| SnarcError::io(&self.origin, e))?;
            if read == 0 {
                return Ok(false);
            }
            self.line_no += 1;
            let len = self.line.trim_end_matches(['\n', '\r']).len();
            self.line.truncate(len);
            let trimmed = self.line.trim_start_matches([' ', '\t']);
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Ok(true);
        }
    }
}

/// Reads a whole circuit into an owned program. Fails on the first bad line.
pub fn parse_program<R: BufRead>(mut reader: CircuitReader<R>) -> SnarcResult<CircuitProgram> {
    let total = reader.total()?;
    let mut commands = Vec::new();
    while let Some(view) = reader.next_command()? {
        commands.push(view.to_command());
    }
    snarc_debug!(
        "[circuit] {}: parsed {} commands over {} wires",
        reader.origin,
        commands.len(),
        total
    );
    Ok(CircuitProgram { total, commands })
}

struct ParsedLine {
    opcode: Opcode,
    constant: Option<(usize, usize)>,
    width: Option<u32>,
}

fn parse_total(line: &str) -> SnarcResult<usize> {
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();
    let header =
        |_: SnarcError| SnarcError::malformed_header(format!("expected 'total <N>', found '{line}'"));
    if !cursor.keyword("total") {
        return Err(header(cursor.unexpected("'total'")));
    }
    cursor.require_ws().map_err(header)?;
    let total = cursor.uint().map_err(header)?;
    cursor.finish().map_err(header)?;
    Ok(total)
}

fn parse_command_line(
    line: &str,
    inputs: &mut Vec<usize>,
    outputs: &mut Vec<usize>,
) -> SnarcResult<ParsedLine> {
    inputs.clear();
    outputs.clear();
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();

    let single = [
        ("input", Opcode::Input),
        ("nizkinput", Opcode::NizkInput),
        ("output", Opcode::Output),
    ];
    for (word, opcode) in single {
        if cursor.keyword(word) {
            cursor.require_ws()?;
            inputs.push(cursor.uint()?);
            cursor.finish()?;
            return Ok(ParsedLine {
                opcode,
                constant: None,
                width: None,
            });
        }
    }

    let mut constant = None;
    let mut width = None;
    // Longer prefixes first: `const-mul-neg-` before `const-mul-`, `div_` before `div`.
    let opcode = if cursor.eat("const-mul-neg-") {
        constant = Some(cursor.hex_token()?);
        Opcode::ConstMulNeg
    } else if cursor.eat("const-mul-") {
        constant = Some(cursor.hex_token()?);
        Opcode::ConstMul
    } else if cursor.eat("div_") {
        let start = cursor.pos;
        let bits = cursor.uint()?;
        match u32::try_from(bits) {
            Ok(w) if w <= MAX_INT_DIV_WIDTH => width = Some(w),
            _ => {
                return Err(SnarcError::unexpected_token(
                    &line[start..cursor.pos],
                    format!("(division width at most {MAX_INT_DIV_WIDTH})"),
                ));
            }
        }
        Opcode::IntDiv
    } else {
        let words = [
            ("add", Opcode::Add),
            ("mul", Opcode::Mul),
            ("zerop", Opcode::Zerop),
            ("split", Opcode::Split),
            ("asplit", Opcode::Asplit),
            ("dload", Opcode::Dload),
            ("div", Opcode::FieldDiv),
        ];
        match words.iter().find(|(word, _)| cursor.keyword(word)) {
            Some((_, opcode)) => *opcode,
            None => return Err(SnarcError::unexpected_token(line, "(command)")),
        }
    };

    cursor.require_ws()?;
    cursor.wire_list("in", inputs)?;
    cursor.skip_ws();
    cursor.wire_list("out", outputs)?;
    cursor.finish()?;
    Ok(ParsedLine {
        opcode,
        constant,
        width,
    })
}

/// Byte cursor over one line. Tokens are separated by spaces or tabs.
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn unexpected(&self, expected: &str) -> SnarcError {
        SnarcError::unexpected_token(self.rest(), expected)
    }

    fn skip_ws(&mut self) -> usize {
        let skipped = self.rest().len() - self.rest().trim_start_matches([' ', '\t']).len();
        self.pos += skipped;
        skipped
    }

    fn require_ws(&mut self) -> SnarcResult<()> {
        if self.skip_ws() == 0 {
            return Err(self.unexpected("(whitespace)"));
        }
        Ok(())
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Consumes `word` only when it is followed by whitespace or the end of line.
    fn keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        let matches = rest.strip_prefix(word).is_some_and(|after| {
            after.is_empty() || after.starts_with(' ') || after.starts_with('\t')
        });
        if matches {
            self.pos += word.len();
        }
        matches
    }

    fn expect(&mut self, token: &str) -> SnarcResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{token}'")))
        }
    }

    fn uint(&mut self) -> SnarcResult<usize> {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let value = rest[..len]
            .parse::<usize>()
            .map_err(|_| self.unexpected("(unsigned integer)"))?;
        self.pos += len;
        Ok(value)
    }

    /// A non-empty run of hex digits; returns its byte range in the line.
    fn hex_token(&mut self) -> SnarcResult<(usize, usize)> {
        let rest = self.rest();
        let len = rest.find([' ', '\t']).unwrap_or(rest.len());
        let token = &rest[..len];
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SnarcError::unexpected_token(token, "(hex constant)"));
        }
        let start = self.pos;
        self.pos += len;
        Ok((start, self.pos))
    }

    /// `<keyword> <n> < w1 .. wn >`
    fn wire_list(&mut self, keyword: &str, out: &mut Vec<usize>) -> SnarcResult<()> {
        if !self.keyword(keyword) {
            return Err(self.unexpected(&format!("'{keyword}'")));
        }
        self.require_ws()?;
        let count = self.uint()?;
        self.skip_ws();
        self.expect("<")?;
        for _ in 0..count {
            self.skip_ws();
            out.push(self.uint()?);
        }
        self.skip_ws();
        self.expect(">")
    }

    fn finish(&mut self) -> SnarcResult<()> {
        self.skip_ws();
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(self.unexpected("(end of line)"))
        }
    }
}
