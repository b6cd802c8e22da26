use std::cmp::Ordering;

use postlens_parser::RawTable;
use tracing::{debug, info};

use crate::mapping::ColumnMapping;
use crate::roles::{Role, RoleSpec, RoleTaxonomy};

pub const EXACT_SCORE: u8 = 3;
pub const SUBSTRING_SCORE: u8 = 2;
pub const PATTERN_SCORE: u8 = 1;

pub const DEFAULT_AUTHOR_CARDINALITY: usize = 50;

/// A column name must be at least this long to match as part of an alias;
/// otherwise names like `a` or `id` would match most roles.
const MIN_CONTAINED_LEN: usize = 3;

/// Lower-cases and drops every non-alphanumeric character.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Score of one column for one role plus the rank of the alias (or pattern)
/// that produced it. Lower rank means earlier declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnScore {
    pub score: u8,
    pub rank: usize,
}

pub fn score_column(spec: &RoleSpec, column: &str) -> Option<ColumnScore> {
    let normalized = normalize_name(column);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<ColumnScore> = None;
    for (rank, alias) in spec.aliases.iter().enumerate() {
        let alias = normalize_name(alias);
        if alias.is_empty() {
            continue;
        }
        let score = if alias == normalized {
            EXACT_SCORE
        } else if normalized.contains(&alias)
            || (normalized.len() >= MIN_CONTAINED_LEN && alias.contains(&normalized))
        {
            SUBSTRING_SCORE
        } else {
            continue;
        };
        if best.map_or(true, |current| score > current.score) {
            best = Some(ColumnScore { score, rank });
        }
    }
    if best.is_some() {
        return best;
    }

    let lowered = column.to_lowercase();
    spec.patterns
        .iter()
        .position(|pattern| pattern.is_match(&lowered))
        .map(|idx| ColumnScore {
            score: PATTERN_SCORE,
            rank: spec.aliases.len() + idx,
        })
}

#[derive(Debug, Clone)]
pub struct SchemaMatcher {
    taxonomy: RoleTaxonomy,
    author_cardinality: usize,
}

impl Default for SchemaMatcher {
    fn default() -> Self {
        Self::new(RoleTaxonomy::default())
    }
}

impl SchemaMatcher {
    pub fn new(taxonomy: RoleTaxonomy) -> Self {
        Self {
            taxonomy,
            author_cardinality: DEFAULT_AUTHOR_CARDINALITY,
        }
    }

    pub fn with_author_cardinality(mut self, threshold: usize) -> Self {
        self.author_cardinality = threshold;
        self
    }

    pub fn taxonomy(&self) -> &RoleTaxonomy {
        &self.taxonomy
    }

    /// Proposes a mapping for every role. Never fails; roles without a
    /// plausible column stay unmapped.
    pub fn detect(&self, table: &RawTable) -> ColumnMapping {
        let names = table.column_names();
        let mut mapping = ColumnMapping::new();

        for spec in self.taxonomy.specs() {
            if let Some(column) = Self::best_column(spec, &names) {
                debug!(role = %spec.role, column, "detected column by name");
                mapping = mapping.with(spec.role, column);
            }
        }

        for role in Role::INTERACTIONS {
            if mapping.is_mapped(role) {
                continue;
            }
            let fallback = table
                .columns()
                .iter()
                .find(|col| mapping.role_of(&col.name).is_none() && col.is_predominantly_numeric());
            if let Some(col) = fallback {
                info!(role = %role, column = %col.name, "falling back to first numeric column");
                mapping = mapping.with(role, col.name.clone());
            }
        }

        if !mapping.is_mapped(Role::Author) {
            let fallback = table.columns().iter().find(|col| {
                mapping.role_of(&col.name).is_none()
                    && !col.is_predominantly_numeric()
                    && col.has_repeated_values()
                    && (1..=self.author_cardinality).contains(&col.distinct_values())
            });
            if let Some(col) = fallback {
                info!(column = %col.name, "using low-cardinality repeating column as author");
                mapping = mapping.with(Role::Author, col.name.clone());
            }
        }

        mapping
    }

    fn best_column<'a>(spec: &RoleSpec, names: &[&'a str]) -> Option<&'a str> {
        let mut best: Option<(ColumnScore, &'a str)> = None;
        for name in names {
            let Some(score) = score_column(spec, name) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((current, current_name)) => {
                    compare_candidates(score, name, current, current_name) == Ordering::Greater
                }
            };
            if better {
                best = Some((score, name));
            }
        }
        best.map(|(_, name)| name)
    }
}

/// Higher score wins, then the earlier alias, then the longer column name.
/// Equal candidates keep the earlier column.
fn compare_candidates(a: ColumnScore, a_name: &str, b: ColumnScore, b_name: &str) -> Ordering {
    a.score
        .cmp(&b.score)
        .then_with(|| b.rank.cmp(&a.rank))
        .then_with(|| a_name.len().cmp(&b_name.len()))
}
