use crate::errors::ParserError;
use crate::model::DecodedTable;
use crate::registry::TableParser;

use super::{build_table, decode_lossy};

/// Last-resort parser: drops undecodable bytes, splits lines, and splits each
/// line on `;` when present, otherwise on `,`. Empty fields are discarded and
/// rows that end up with a different width than the header are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualSplitParser;

impl ManualSplitParser {
    pub const NAME: &'static str = "MANUAL_SPLIT";

    fn split_line(line: &str) -> Vec<String> {
        let delimiter = if line.contains(';') { ';' } else { ',' };
        line.split(delimiter)
            .map(|field| field.trim().trim_matches('"').trim())
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl TableParser for ManualSplitParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, bytes: &[u8]) -> Result<DecodedTable, ParserError> {
        let text = decode_lossy(bytes);
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let headers = match lines.next() {
            Some(line) => Self::split_line(line),
            None => return Err(ParserError::EmptyData { parser: Self::NAME }),
        };
        let width = headers.len();

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let fields = Self::split_line(line);
            if fields.len() == width {
                rows.push(fields);
            } else {
                skipped += 1;
            }
        }

        build_table(Self::NAME, headers, rows, skipped)
    }
}
