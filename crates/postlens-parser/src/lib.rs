pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{DecodeError, ParserAttempt, ParserError, TableError};
pub use model::{Cell, Column, DecodedTable, RawTable};
pub use registry::{decode_table, decode_with_parsers, TableParser};

#[cfg(test)]
mod tests;
