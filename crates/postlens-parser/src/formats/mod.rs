mod common;
mod delimited;
mod manual_split;

pub use common::{clean_header, TextEncoding};
pub use delimited::DelimitedParser;
pub use manual_split::ManualSplitParser;

pub(crate) use common::{build_table, decode_lossy, decode_text};
