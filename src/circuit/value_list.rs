//! External wire values (`<circuit>.in`): one `<index> <hex>` pair per line,
//! indices strictly ascending from zero.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{SnarcError, SnarcResult};
use crate::field::{FieldParams, FieldValue};

pub struct ValueListReader<R> {
    source: R,
    origin: String,
    line: String,
    next_index: usize,
}

impl<R: BufRead> ValueListReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_origin(source, "<values>".to_string())
    }

    pub fn with_origin(source: R, origin: String) -> Self {
        Self {
            source,
            origin,
            line: String::new(),
            next_index: 0,
        }
    }

    /// The next `(index, hex)` pair, or `None` at end of input.
    pub fn next_entry(&mut self) -> SnarcResult<Option<(usize, &str)>> {
        loop {
            self.line.clear();
            let read = self
                .source
                .read_line(&mut self.line)
                .map_err(|e| SnarcError::io(&self.origin, e))?;
            if read == 0 {
                return Ok(None);
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }

        let mut tokens = self.line.split_ascii_whitespace();
        let index_token = tokens.next().unwrap_or_default();
        let index = index_token
            .parse::<usize>()
            .map_err(|_| SnarcError::unexpected_token(&self.line, "(value index)"))?;
        if index != self.next_index {
            return Err(SnarcError::UnexpectedIndex {
                found: index,
                expected: self.next_index,
            });
        }
        let hex = tokens
            .next()
            .ok_or_else(|| SnarcError::unexpected_token(&self.line, "(hex value)"))?;
        if let Some(extra) = tokens.next() {
            return Err(SnarcError::unexpected_token(extra, "(end of line)"));
        }
        self.next_index += 1;
        Ok(Some((index, hex)))
    }

    /// Reads every remaining value.
    pub fn read_all<P: FieldParams>(mut self) -> SnarcResult<Vec<FieldValue<P>>> {
        let mut values = Vec::new();
        while let Some((_, hex)) = self.next_entry()? {
            values.push(FieldValue::from_hex_string(hex)?);
        }
        snarc_debug!("[values] {}: {} values", self.origin, values.len());
        Ok(values)
    }
}

pub fn read_value_list<P: FieldParams>(source: impl BufRead) -> SnarcResult<Vec<FieldValue<P>>> {
    ValueListReader::new(source).read_all()
}

pub fn read_value_list_file<P: FieldParams>(
    path: impl AsRef<Path>,
) -> SnarcResult<Vec<FieldValue<P>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SnarcError::io(path, e))?;
    ValueListReader::with_origin(BufReader::new(file), path.display().to_string()).read_all()
}

/// Renders values in the `<index> <hex>` format.
pub fn format_value_list<P: FieldParams>(values: &[FieldValue<P>]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{i} {}\n", v.to_hex_string()))
        .collect()
}
