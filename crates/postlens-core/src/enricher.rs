use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, Weekday};
use once_cell::sync::Lazy;
use postlens_parser::{Cell, RawTable};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::EnrichmentError;
use crate::mapping::ColumnMapping;
use crate::roles::Role;
use crate::timestamp::{self, YearMonth, UNKNOWN};

static GROUPED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?\d{1,3}(,\d{3})+(\.\d+)?$").expect("grouped number pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOptions {
    pub topic_keyword: String,
    pub include_reposts: bool,
    /// Roles the mapping must provide; interaction roles in the sum are
    /// always required on top of these.
    pub required_roles: Vec<Role>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            topic_keyword: "google".to_string(),
            include_reposts: true,
            required_roles: Role::INTERACTIONS.to_vec(),
        }
    }
}

impl EnrichOptions {
    pub fn summed_roles(&self) -> Vec<Role> {
        if self.include_reposts {
            Role::INTERACTIONS.to_vec()
        } else {
            vec![Role::Likes, Role::Comments]
        }
    }

    pub fn required_roles(&self) -> Vec<Role> {
        let mut roles = self.summed_roles();
        for role in &self.required_roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        roles
    }
}

/// How records of one source table get their brand label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandAssignment {
    Label(String),
    /// Copy the author cell of each row; blank cells and an unmapped author
    /// use `fallback`.
    PerRowAuthor { fallback: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub values: Vec<Cell>,
    pub likes: u64,
    pub comments: u64,
    pub reposts: u64,
    pub views: Option<u64>,
    pub total_interactions: u64,
    pub engagement_rate: Option<f64>,
    pub normalized_timestamp: Option<NaiveDateTime>,
    pub weekday: Option<Weekday>,
    pub month: Option<YearMonth>,
    pub topic_flag: bool,
    pub brand: String,
}

impl EnrichedRecord {
    pub fn timestamp_label(&self) -> String {
        timestamp::format_timestamp(self.normalized_timestamp.as_ref())
    }

    pub fn weekday_label(&self) -> &'static str {
        self.weekday.map(timestamp::weekday_name).unwrap_or(UNKNOWN)
    }

    pub fn month_label(&self) -> String {
        self.month
            .map(|month| month.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Enriched records of one source table, one per input row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSet {
    pub columns: Vec<String>,
    pub mapping: ColumnMapping,
    pub records: Vec<EnrichedRecord>,
}

impl EnrichedSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell of `record` in the column mapped to `role`.
    pub fn role_value<'a>(&self, record: &'a EnrichedRecord, role: Role) -> Option<&'a Cell> {
        let column = self.mapping.get(role)?;
        let idx = self.columns.iter().position(|name| name == column)?;
        record.values.get(idx)
    }
}

/// Coerces a metric cell to a non-negative integer. Fractions truncate,
/// comma-grouped thousands are accepted, everything else is 0.
pub fn coerce_count(cell: &Cell) -> u64 {
    let value = match cell {
        Cell::Number { value, .. } => *value,
        Cell::Text(text) if GROUPED_NUMBER.is_match(text) => {
            text.replace(',', "").parse::<f64>().unwrap_or(0.0)
        }
        _ => return 0,
    };
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

/// Most frequent author value (first seen wins ties), or `default` when the
/// author role is unmapped or has no values.
pub fn primary_brand_label(table: &RawTable, mapping: &ColumnMapping, default: &str) -> String {
    let Some(column) = mapping.get(Role::Author).and_then(|name| table.column(name)) else {
        return default.to_string();
    };

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in column.cells.iter().filter_map(Cell::as_str).enumerate() {
        let entry = counts.entry(value).or_insert((0, idx));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(value, _)| value.to_string())
        .unwrap_or_else(|| default.to_string())
}

struct RoleColumns {
    likes: usize,
    comments: usize,
    reposts: Option<usize>,
    views: Option<usize>,
    timestamp: Option<usize>,
    content: Option<usize>,
    author: Option<usize>,
}

fn resolve_columns(
    table: &RawTable,
    mapping: &ColumnMapping,
    options: &EnrichOptions,
) -> Result<RoleColumns, EnrichmentError> {
    for role in options.required_roles() {
        let column = mapping.get(role).ok_or(EnrichmentError::MissingRole(role))?;
        if table.column_index(column).is_none() {
            return Err(EnrichmentError::MissingColumn {
                role,
                column: column.to_string(),
            });
        }
    }

    let index = |role: Role| mapping.get(role).and_then(|name| table.column_index(name));
    let likes = index(Role::Likes).ok_or(EnrichmentError::MissingRole(Role::Likes))?;
    let comments = index(Role::Comments).ok_or(EnrichmentError::MissingRole(Role::Comments))?;

    Ok(RoleColumns {
        likes,
        comments,
        reposts: index(Role::Reposts),
        views: index(Role::Views),
        timestamp: index(Role::Timestamp),
        content: index(Role::Content),
        author: index(Role::Author),
    })
}

/// Derives the analytic fields for every row of `table`. Irregular cells
/// degrade to 0, "unknown" or absent values; only a mapping that lacks a
/// required role is an error.
pub fn enrich(
    table: &RawTable,
    mapping: &ColumnMapping,
    options: &EnrichOptions,
    brand: &BrandAssignment,
) -> Result<EnrichedSet, EnrichmentError> {
    let cols = resolve_columns(table, mapping, options)?;
    let keyword = options.topic_keyword.to_lowercase();
    let cell = |row: usize, idx: Option<usize>| idx.and_then(|col| table.cell(row, col));

    let mut coerced_cells = 0usize;
    let mut unknown_timestamps = 0usize;
    let mut records = Vec::with_capacity(table.row_count());

    for row in 0..table.row_count() {
        let mut count = |idx: Option<usize>| -> u64 {
            match cell(row, idx) {
                Some(value) => {
                    let coerced = coerce_count(value);
                    if coerced == 0 && !value.is_empty() && value.as_f64() != Some(0.0) {
                        coerced_cells += 1;
                    }
                    coerced
                }
                None => 0,
            }
        };

        let likes = count(Some(cols.likes));
        let comments = count(Some(cols.comments));
        let reposts = count(cols.reposts);
        let views = cols.views.map(|idx| count(Some(idx)));

        let total_interactions = if options.include_reposts {
            likes.saturating_add(comments).saturating_add(reposts)
        } else {
            likes.saturating_add(comments)
        };

        let engagement_rate = match views {
            Some(views) if views > 0 => Some(total_interactions as f64 / views as f64 * 100.0),
            _ => None,
        };

        let normalized_timestamp = cell(row, cols.timestamp)
            .and_then(Cell::as_str)
            .and_then(timestamp::parse_timestamp);
        if cols.timestamp.is_some() && normalized_timestamp.is_none() {
            unknown_timestamps += 1;
        }

        let topic_flag = cell(row, cols.content)
            .and_then(Cell::as_str)
            .map(|text| text.to_lowercase().contains(&keyword))
            .unwrap_or(false);

        let brand = match brand {
            BrandAssignment::Label(label) => label.clone(),
            BrandAssignment::PerRowAuthor { fallback } => cell(row, cols.author)
                .and_then(Cell::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
                .to_string(),
        };

        records.push(EnrichedRecord {
            values: table.row(row),
            likes,
            comments,
            reposts,
            views,
            total_interactions,
            engagement_rate,
            normalized_timestamp,
            weekday: normalized_timestamp.map(|dt| dt.weekday()),
            month: normalized_timestamp.as_ref().map(YearMonth::of),
            topic_flag,
            brand,
        });
    }

    if coerced_cells > 0 {
        warn!(coerced_cells, "non-numeric metric cells coerced to 0");
    }
    if unknown_timestamps > 0 {
        debug!(unknown_timestamps, "timestamps left unknown");
    }
    info!(rows = records.len(), "enriched table");

    Ok(EnrichedSet {
        columns: table.column_names().into_iter().map(str::to_string).collect(),
        mapping: mapping.clone(),
        records,
    })
}
