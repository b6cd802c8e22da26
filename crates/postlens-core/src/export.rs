use std::io::Write;

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use tracing::info;

use crate::enricher::EnrichedSet;
use crate::error::Result;
use crate::mapping::ColumnMapping;

/// Derived columns appended after the original ones, in output order.
pub const DERIVED_COLUMNS: [&str; 7] = [
    "total_interactions",
    "engagement_rate",
    "normalized_timestamp",
    "weekday",
    "month",
    "topic_flag",
    "brand",
];

/// Header row for an export of `set`. Original columns that share a name
/// with a derived column get a `_source` suffix.
pub fn output_headers(set: &EnrichedSet) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(set.columns.len() + DERIVED_COLUMNS.len());
    for name in &set.columns {
        let mut candidate = name.clone();
        while DERIVED_COLUMNS.contains(&candidate.as_str())
            || headers.contains(&candidate)
            || (candidate != *name && set.columns.contains(&candidate))
        {
            candidate.push_str("_source");
        }
        headers.push(candidate);
    }
    headers.extend(DERIVED_COLUMNS.iter().map(|name| name.to_string()));
    headers
}

/// The mapping of `set` expressed in exported header names, for re-reading
/// an export.
pub fn exported_mapping(set: &EnrichedSet) -> ColumnMapping {
    let headers = output_headers(set);
    set.mapping
        .iter()
        .fold(ColumnMapping::new(), |mapping, (role, column)| {
            let exported = set
                .columns
                .iter()
                .position(|name| name == column)
                .and_then(|idx| headers.get(idx));
            match exported {
                Some(name) => mapping.with(role, name.clone()),
                None => mapping,
            }
        })
}

/// Writes `set` as comma-delimited text with the original columns first and
/// the derived columns after them.
pub fn write_csv<W: Write>(set: &EnrichedSet, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(output_headers(set))?;

    for record in &set.records {
        let mut row: Vec<String> = record.values.iter().map(|cell| cell.to_string()).collect();
        row.push(record.total_interactions.to_string());
        row.push(
            record
                .engagement_rate
                .map(|rate| rate.to_string())
                .unwrap_or_default(),
        );
        row.push(record.timestamp_label());
        row.push(record.weekday_label().to_string());
        row.push(record.month_label());
        row.push(record.topic_flag.to_string());
        row.push(record.brand.clone());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    info!(rows = set.len(), "wrote enriched csv");
    Ok(())
}

/// Typed frame of `set`: original columns as nullable strings, derived
/// columns as integers, floats, a microsecond datetime and a boolean.
pub fn to_dataframe(set: &EnrichedSet) -> Result<DataFrame> {
    let headers = output_headers(set);
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());

    for (idx, name) in headers.iter().take(set.columns.len()).enumerate() {
        let values: Vec<Option<String>> = set
            .records
            .iter()
            .map(|record| {
                record
                    .values
                    .get(idx)
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| cell.to_string())
            })
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }

    let records = &set.records;
    let totals: Vec<u64> = records.iter().map(|r| r.total_interactions).collect();
    let rates: Vec<Option<f64>> = records.iter().map(|r| r.engagement_rate).collect();
    let timestamps: Vec<Option<i64>> = records
        .iter()
        .map(|r| r.normalized_timestamp.map(|dt| dt.and_utc().timestamp_micros()))
        .collect();
    let weekdays: Vec<&str> = records.iter().map(|r| r.weekday_label()).collect();
    let months: Vec<String> = records.iter().map(|r| r.month_label()).collect();
    let topics: Vec<bool> = records.iter().map(|r| r.topic_flag).collect();
    let brands: Vec<&str> = records.iter().map(|r| r.brand.as_str()).collect();

    let timestamp_series = Series::new("normalized_timestamp".into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    columns.push(Series::new("total_interactions".into(), totals).into());
    columns.push(Series::new("engagement_rate".into(), rates).into());
    columns.push(timestamp_series.into());
    columns.push(Series::new("weekday".into(), weekdays).into());
    columns.push(Series::new("month".into(), months).into());
    columns.push(Series::new("topic_flag".into(), topics).into());
    columns.push(Series::new("brand".into(), brands).into());

    Ok(DataFrame::new(columns)?)
}

/// Writes the frame of `set` as Zstd-compressed Parquet.
pub fn write_parquet<W: Write>(set: &EnrichedSet, writer: W) -> Result<()> {
    let mut df = to_dataframe(set)?;
    ParquetWriter::new(writer)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut df)?;
    info!(rows = df.height(), "wrote enriched parquet");
    Ok(())
}
