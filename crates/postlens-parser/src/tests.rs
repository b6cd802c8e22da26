use std::fs;
use std::path::PathBuf;

use crate::errors::{DecodeError, ParserError};
use crate::formats::{clean_header, DelimitedParser, ManualSplitParser};
use crate::model::{Cell, RawTable};
use crate::registry::TableParser;
use crate::{decode_table, decode_with_parsers};

fn fixture(path: &str) -> Vec<u8> {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn decodes_comma_export_with_first_parser() {
    let decoded = decode_table(&fixture("linkedin_export.csv")).expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::COMMA_UTF8);
    assert_eq!(decoded.skipped_rows, 0);
    assert_eq!(
        decoded.table.column_names(),
        [
            "postUrl",
            "postContent",
            "likeCount",
            "commentCount",
            "repostCount",
            "postTimestamp",
            "author"
        ]
    );
    assert_eq!(decoded.table.row_count(), 4);

    let content = decoded.table.column("postContent").unwrap();
    assert_eq!(
        content.cells[0].as_str(),
        Some("Launching our new analytics suite, built with Google Cloud")
    );
    let comments = decoded.table.column("commentCount").unwrap();
    assert!(comments.cells[2].is_empty());
}

#[test]
fn semicolon_export_falls_through_to_semicolon_parser() {
    let decoded = decode_table(&fixture("x_export_semicolon.csv")).expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::SEMICOLON_UTF8);
    assert_eq!(decoded.table.column_count(), 7);
    assert_eq!(decoded.table.row_count(), 3);
    assert_eq!(
        decoded.table.cell(1, 1).and_then(Cell::as_str),
        Some("Product update: faster exports, fewer clicks")
    );
}

#[test]
fn single_column_comma_result_is_rejected_for_semicolon_file() {
    let bytes = b"likeCount;commentCount\n5;2\n";
    let decoded = decode_table(bytes).expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::SEMICOLON_UTF8);
    assert_eq!(decoded.table.column_names(), ["likeCount", "commentCount"]);
    assert_eq!(decoded.table.cell(0, 0).and_then(Cell::as_f64), Some(5.0));
}

#[test]
fn malformed_rows_are_skipped_by_lenient_parser() {
    let decoded = decode_table(&fixture("malformed_rows.csv")).expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::COMMA_LENIENT);
    assert_eq!(decoded.skipped_rows, 1);
    assert_eq!(decoded.table.row_count(), 2);
    let likes = decoded.table.column("likes").unwrap();
    let values: Vec<f64> = likes.cells.iter().filter_map(Cell::as_f64).collect();
    assert_eq!(values, vec![1.0, 7.0]);
}

#[test]
fn strict_comma_parser_reports_ragged_rows() {
    let parser = DelimitedParser::comma_utf8();
    let err = parser
        .parse(&fixture("malformed_rows.csv"))
        .expect_err("strict parser should fail");
    assert!(matches!(err, ParserError::Csv { .. }));
}

#[test]
fn latin1_bytes_fall_back_to_latin1_parser() {
    let bytes = b"author,likes\ncaf\xe9 m\xfcller,3\nna\xefve,4\n";
    let decoded = decode_table(bytes).expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::COMMA_LATIN1);
    let author = decoded.table.column("author").unwrap();
    assert_eq!(author.cells[0].as_str(), Some("café müller"));
    assert_eq!(author.cells[1].as_str(), Some("naïve"));
}

#[test]
fn latin1_export_is_decoded_after_utf8_parsers_fail() {
    let decoded = decode_table(b"author,likes\nCaf\xe9 Ltd,4\nM\xfcller,7\n").expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::COMMA_LATIN1);
    assert_eq!(decoded.table.cell(0, 0).and_then(Cell::as_str), Some("Café Ltd"));
    assert_eq!(decoded.table.cell(1, 0).and_then(Cell::as_str), Some("Müller"));
    assert_eq!(decoded.table.cell(1, 1).and_then(Cell::as_f64), Some(7.0));
}

#[test]
fn utf8_byte_order_mark_is_ignored() {
    let decoded = decode_table(b"\xEF\xBB\xBFlikes,comments\n1,2\n").expect("decode failed");

    assert_eq!(decoded.parser, DelimitedParser::COMMA_UTF8);
    assert_eq!(decoded.table.column_names(), ["likes", "comments"]);
}

#[test]
fn manual_split_handles_mixed_delimiters() {
    let bytes = b"likes;comments\n5,2\n\n7,1\n";
    let decoded = decode_table(bytes).expect("decode failed");

    assert_eq!(decoded.parser, ManualSplitParser::NAME);
    assert_eq!(decoded.table.column_names(), ["likes", "comments"]);
    assert_eq!(decoded.table.row_count(), 2);
    assert_eq!(decoded.table.cell(1, 0).and_then(Cell::as_f64), Some(7.0));
}

#[test]
fn manual_split_drops_invalid_bytes_and_empty_fields() {
    let parser = ManualSplitParser;
    let decoded = parser
        .parse(b"a;;b\n1;\xff2;;\n3;4\n5\n")
        .expect("manual split failed");

    assert_eq!(decoded.table.column_names(), ["a", "b"]);
    assert_eq!(decoded.table.row_count(), 2);
    assert_eq!(decoded.table.cell(0, 1).and_then(Cell::as_str), Some("2"));
    assert_eq!(decoded.skipped_rows, 1);
}

#[test]
fn single_column_input_is_a_decode_error() {
    let err = decode_table(b"just one column\nvalue\nanother value\n").expect_err("should fail");

    let DecodeError::NoUsableTable { attempts } = &err;
    assert_eq!(attempts.len(), 5);
    assert_eq!(
        err.last_attempt().map(|attempt| attempt.parser),
        Some(ManualSplitParser::NAME)
    );
    assert!(err.to_string().contains("MANUAL_SPLIT"));
}

#[test]
fn header_only_input_is_a_decode_error() {
    let err = decode_table(b"likes,comments,reposts\n").expect_err("should fail");
    assert!(err
        .attempts()
        .iter()
        .any(|attempt| attempt.message.contains("no data rows")));
}

#[test]
fn empty_parser_chain_reports_no_attempts() {
    let err = decode_with_parsers(b"a,b\n1,2\n", &[]).expect_err("no parsers configured");
    assert!(err.attempts().is_empty());
    assert!(err.to_string().contains("no parsers were configured"));
}

#[test]
fn headers_are_cleaned_and_disambiguated() {
    let bytes = "\u{feff} likeCount ,likeCount,,\"'repostCount;'\"\n1,2,3,4\n".as_bytes();
    let decoded = decode_table(bytes).expect("decode failed");

    assert_eq!(
        decoded.table.column_names(),
        ["likeCount", "likeCount_2", "column_3", "repostCount"]
    );
    assert_eq!(clean_header(" ;postContent, "), "postContent");
}

#[test]
fn numeric_cells_keep_source_text() {
    let decoded = decode_table(b"post_id,likes\n1234567890123456789,0012\n").expect("decode failed");

    let id = decoded.table.cell(0, 0).unwrap();
    assert!(id.is_number());
    assert_eq!(id.as_str(), Some("1234567890123456789"));
    assert_eq!(decoded.table.cell(0, 1).unwrap().to_string(), "0012");
}

#[test]
fn raw_table_rejects_ragged_rows_and_renames_columns() {
    let err = RawTable::from_rows(["a", "b"], vec![vec!["1"]]).expect_err("ragged row");
    assert!(err.to_string().contains("row 0"));

    let table = RawTable::from_rows(["a", "b"], vec![vec!["1", "x"]]).unwrap();
    let renamed = table.clone().rename_column("a", "likes").unwrap();
    assert_eq!(renamed.column_names(), ["likes", "b"]);
    assert!(table.rename_column("a", "b").is_err());
}

#[test]
fn predominantly_numeric_detection() {
    let table = RawTable::from_rows(
        ["n", "t"],
        vec![
            vec!["1", "x"],
            vec!["two", "3"],
            vec!["3", "y"],
            vec!["", ""],
        ],
    )
    .unwrap();

    assert!(table.column("n").unwrap().is_predominantly_numeric());
    assert!(!table.column("t").unwrap().is_predominantly_numeric());
    assert_eq!(table.column("t").unwrap().distinct_values(), 3);
    assert_eq!(table.column("t").unwrap().filled_count(), 3);
    assert!(!table.column("t").unwrap().has_repeated_values());

    let repeated = RawTable::from_rows(["brand"], vec![vec!["Acme"], vec![""], vec!["Acme"]]).unwrap();
    assert!(repeated.column("brand").unwrap().has_repeated_values());
}

#[test]
fn raw_table_converts_to_string_dataframe() {
    let decoded = decode_table(&fixture("linkedin_export.csv")).expect("decode failed");
    let df = decoded.table.to_dataframe().expect("dataframe conversion failed");

    assert_eq!(df.height(), 4);
    assert_eq!(df.width(), 7);
    assert_eq!(df.get_column_names()[2].as_str(), "likeCount");
    let comments = df.column("commentCount").unwrap();
    assert_eq!(comments.null_count(), 1);
}
