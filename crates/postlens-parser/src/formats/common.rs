use std::borrow::Cow;

use crate::errors::ParserError;
use crate::model::{DecodedTable, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1 as browsers interpret it (Windows-1252).
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }
}

pub(crate) fn decode_text<'a>(
    parser: &'static str,
    bytes: &'a [u8],
    encoding: TextEncoding,
) -> Result<Cow<'a, str>, ParserError> {
    match encoding {
        TextEncoding::Utf8 => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            std::str::from_utf8(body)
                .map(Cow::Borrowed)
                .map_err(|err| ParserError::Encoding {
                    parser,
                    message: err.to_string(),
                })
        }
        TextEncoding::Latin1 => {
            let (text, _had_errors) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            Ok(text)
        }
    }
}

/// UTF-8 decode that drops invalid byte sequences instead of failing.
pub(crate) fn decode_lossy(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(body)
        .chars()
        .filter(|ch| *ch != char::REPLACEMENT_CHARACTER)
        .collect()
}

/// Trims a header name and strips stray delimiters, quotes and BOM marks.
pub fn clean_header(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, ',' | ';' | '\u{feff}'))
        .collect::<String>()
        .trim()
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim()
        .to_string()
}

pub(crate) fn build_table(
    parser: &'static str,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped_rows: usize,
) -> Result<DecodedTable, ParserError> {
    let headers: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
    let table = RawTable::from_rows(headers, rows)
        .map_err(|source| ParserError::Table { parser, source })?;
    Ok(DecodedTable {
        table,
        parser,
        skipped_rows,
    })
}
