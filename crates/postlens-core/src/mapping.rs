use std::collections::BTreeMap;
use std::str::FromStr;

use postlens_parser::RawTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MappingIncomplete, PipelineError};
use crate::roles::Role;

/// Resolved role -> column assignment for one table. Unmapped roles are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<Role, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    pub fn is_mapped(&self, role: Role) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn with(mut self, role: Role, column: impl Into<String>) -> Self {
        self.columns.insert(role, column.into());
        self
    }

    pub fn without(mut self, role: Role) -> Self {
        self.columns.remove(&role);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.columns.iter().map(|(role, column)| (*role, column.as_str()))
    }

    /// The role a column is assigned to, if any.
    pub fn role_of(&self, column: &str) -> Option<Role> {
        self.iter()
            .find(|(_, mapped)| *mapped == column)
            .map(|(role, _)| role)
    }

    pub fn missing(&self, required: &[Role]) -> Vec<Role> {
        required
            .iter()
            .copied()
            .filter(|role| !self.is_mapped(*role))
            .collect()
    }

    /// Fails with the list of required roles that have no column.
    pub fn validate(&self, required: &[Role]) -> Result<(), MappingIncomplete> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MappingIncomplete { missing })
        }
    }

    /// Applies manual overrides on top of a detected mapping. Every assigned
    /// column must exist in `table`.
    pub fn apply_overrides(
        &self,
        overrides: &MappingOverrides,
        table: &RawTable,
    ) -> Result<ColumnMapping, PipelineError> {
        let mut mapping = self.clone();
        for (role, assignment) in overrides.iter() {
            mapping = match assignment {
                Some(column) => {
                    if table.column(column).is_none() {
                        return Err(PipelineError::UnknownColumn {
                            role,
                            column: column.to_string(),
                        });
                    }
                    debug!(role = %role, column, "applying mapping override");
                    mapping.with(role, column)
                }
                None => {
                    debug!(role = %role, "override unmaps role");
                    mapping.without(role)
                }
            };
        }
        Ok(mapping)
    }
}

/// Manual assignments supplied by the user. `None` explicitly unmaps a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingOverrides {
    assignments: BTreeMap<Role, Option<String>>,
}

impl MappingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, role: Role, column: impl Into<String>) -> Self {
        self.assignments.insert(role, Some(column.into()));
        self
    }

    pub fn unset(mut self, role: Role) -> Self {
        self.assignments.insert(role, None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, Option<&str>)> {
        self.assignments
            .iter()
            .map(|(role, column)| (*role, column.as_deref()))
    }

    /// Parses `role=column` pairs; an empty column (`role=`) unmaps the role.
    pub fn parse_pairs<I, S>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (role, column) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected role=column, got '{pair}'"))?;
            let role = Role::from_str(role)?;
            let column = column.trim();
            overrides = if column.is_empty() {
                overrides.unset(role)
            } else {
                overrides.set(role, column)
            };
        }
        Ok(overrides)
    }
}

/// A secondary table renamed into the primary table's column names.
#[derive(Debug, Clone)]
pub struct TranslatedTable {
    pub table: RawTable,
    pub mapping: ColumnMapping,
}

/// Renames every column that `source` maps to a role into the column name
/// `target` uses for the same role. Roles `target` leaves unmapped keep the
/// source name. The returned mapping points at the renamed columns.
pub fn translate_columns(
    table: RawTable,
    source: &ColumnMapping,
    target: &ColumnMapping,
) -> Result<TranslatedTable, PipelineError> {
    let mut renames: Vec<(String, String)> = Vec::new();
    let mut mapping = ColumnMapping::new();

    for (role, from) in source.iter() {
        if let Some((_, existing)) = renames.iter().find(|(src, _)| src == from) {
            mapping = mapping.with(role, existing.clone());
            continue;
        }
        let wanted = target.get(role).unwrap_or(from);
        let kept_by_other = wanted != from
            && source.iter().any(|(other, col)| {
                col == wanted && target.get(other).map_or(true, |dst| dst == col)
            });
        let taken = kept_by_other || renames.iter().any(|(_, dst)| dst == wanted);
        let to = if taken { from } else { wanted };
        mapping = mapping.with(role, to);
        renames.push((from.to_string(), to.to_string()));
    }
    renames.retain(|(from, to)| from != to);

    // Move clashing unmapped columns out of the way before renaming.
    let mut table = table;
    for (_, to) in &renames {
        let clashes = table.column(to).is_some() && source.role_of(to).is_none();
        if clashes {
            let parked = format!("{to}_source");
            table = table.rename_column(to, &parked)?;
        }
    }

    // Two-phase rename so swapped names do not collide.
    let staged: Vec<(String, String, String)> = renames
        .into_iter()
        .enumerate()
        .map(|(idx, (from, to))| (from, format!("__postlens_staged_{idx}"), to))
        .collect();
    for (from, tmp, _) in &staged {
        table = table.rename_column(from, tmp)?;
    }
    for (_, tmp, to) in &staged {
        table = table.rename_column(tmp, to)?;
    }

    debug!(columns = ?table.column_names(), "translated secondary table");
    Ok(TranslatedTable { table, mapping })
}
