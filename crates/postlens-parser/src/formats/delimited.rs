use csv::{ReaderBuilder, StringRecord};

use crate::errors::ParserError;
use crate::model::DecodedTable;
use crate::registry::TableParser;

use super::{build_table, decode_text, TextEncoding};

/// csv-backed parser for one delimiter/encoding combination.
///
/// In strict mode a row whose field count differs from the header aborts the
/// parse. In lenient mode such rows (and rows the reader cannot parse) are
/// discarded and counted in [`DecodedTable::skipped_rows`].
#[derive(Debug, Clone)]
pub struct DelimitedParser {
    name: &'static str,
    delimiter: u8,
    encoding: TextEncoding,
    lenient: bool,
}

impl DelimitedParser {
    pub const COMMA_UTF8: &'static str = "COMMA_UTF8";
    pub const SEMICOLON_UTF8: &'static str = "SEMICOLON_UTF8";
    pub const COMMA_LENIENT: &'static str = "COMMA_LENIENT";
    pub const COMMA_LATIN1: &'static str = "COMMA_LATIN1";

    pub fn new(name: &'static str, delimiter: u8, encoding: TextEncoding, lenient: bool) -> Self {
        Self {
            name,
            delimiter,
            encoding,
            lenient,
        }
    }

    pub fn comma_utf8() -> Self {
        Self::new(Self::COMMA_UTF8, b',', TextEncoding::Utf8, false)
    }

    pub fn semicolon_utf8() -> Self {
        Self::new(Self::SEMICOLON_UTF8, b';', TextEncoding::Utf8, false)
    }

    pub fn comma_lenient() -> Self {
        Self::new(Self::COMMA_LENIENT, b',', TextEncoding::Utf8, true)
    }

    pub fn comma_latin1() -> Self {
        Self::new(Self::COMMA_LATIN1, b',', TextEncoding::Latin1, true)
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(self.lenient);
        builder
    }

    fn row_values(record: &StringRecord) -> Vec<String> {
        record.iter().map(str::to_string).collect()
    }
}

impl TableParser for DelimitedParser {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, bytes: &[u8]) -> Result<DecodedTable, ParserError> {
        let text = decode_text(self.name, bytes, self.encoding)?;
        let mut reader = self.reader_builder().from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = match records.next() {
            Some(Ok(record)) => record,
            Some(Err(source)) => {
                return Err(ParserError::Csv {
                    parser: self.name,
                    source,
                })
            }
            None => return Err(ParserError::EmptyData { parser: self.name }),
        };
        let headers = Self::row_values(&header);
        let width = headers.len();

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for (idx, result) in records.enumerate() {
            match result {
                Ok(record) if record.len() == width => rows.push(Self::row_values(&record)),
                Ok(_) if self.lenient => skipped += 1,
                Ok(record) => {
                    return Err(ParserError::FormatMismatch {
                        parser: self.name,
                        reason: format!(
                            "row {} has {} fields, header has {width}",
                            idx + 1,
                            record.len()
                        ),
                    })
                }
                Err(_) if self.lenient => skipped += 1,
                Err(source) => {
                    return Err(ParserError::Csv {
                        parser: self.name,
                        source,
                    })
                }
            }
        }

        build_table(self.name, headers, rows, skipped)
    }
}
