use tracing::{debug, warn};

use crate::errors::{DecodeError, ParserAttempt, ParserError};
use crate::formats::{DelimitedParser, ManualSplitParser};
use crate::model::DecodedTable;

pub trait TableParser {
    fn name(&self) -> &'static str;
    fn parse(&self, bytes: &[u8]) -> Result<DecodedTable, ParserError>;
}

/// Decodes an export using the default parser chain: comma, semicolon,
/// lenient comma, Latin-1, then a manual line split.
pub fn decode_table(bytes: &[u8]) -> Result<DecodedTable, DecodeError> {
    let comma = DelimitedParser::comma_utf8();
    let semicolon = DelimitedParser::semicolon_utf8();
    let lenient = DelimitedParser::comma_lenient();
    let latin1 = DelimitedParser::comma_latin1();
    let manual = ManualSplitParser;
    let parsers: [&dyn TableParser; 5] = [&comma, &semicolon, &lenient, &latin1, &manual];
    decode_with_parsers(bytes, &parsers)
}

/// Returns the first table with at least one row and more than one column.
/// Every parser error and every rejected table falls through to the next
/// parser.
pub fn decode_with_parsers(
    bytes: &[u8],
    parsers: &[&dyn TableParser],
) -> Result<DecodedTable, DecodeError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(bytes) {
            Ok(decoded) if decoded.table.column_count() < 2 => {
                debug!(parser = parser.name(), "rejected single-column table");
                attempts.push(ParserAttempt::new(
                    parser.name(),
                    format!("found {} column(s)", decoded.table.column_count()),
                ));
            }
            Ok(decoded) if decoded.table.row_count() == 0 => {
                debug!(parser = parser.name(), "rejected table without rows");
                attempts.push(ParserAttempt::new(parser.name(), "no data rows"));
            }
            Ok(decoded) => {
                if decoded.skipped_rows > 0 {
                    warn!(
                        parser = decoded.parser,
                        skipped_rows = decoded.skipped_rows,
                        "discarded malformed rows while decoding"
                    );
                }
                debug!(
                    parser = decoded.parser,
                    rows = decoded.table.row_count(),
                    columns = decoded.table.column_count(),
                    "decoded table"
                );
                return Ok(decoded);
            }
            Err(err) => {
                debug!(parser = parser.name(), error = %err, "parser failed");
                attempts.push(ParserAttempt::new(parser.name(), err.to_string()));
            }
        }
    }

    Err(DecodeError::NoUsableTable { attempts })
}
