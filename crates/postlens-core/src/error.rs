use std::fmt;

use postlens_parser::{DecodeError, TableError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::roles::Role;

/// Required roles that neither detection nor overrides assigned. The caller
/// can recover by supplying overrides for `missing`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required roles are not mapped: {}", RoleList(.missing))]
pub struct MappingIncomplete {
    pub missing: Vec<Role>,
}

/// Enrichment was invoked with a mapping that does not satisfy the required
/// roles. Callers that validate the mapping first never see this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("enrichment requires role '{0}' but the mapping leaves it unmapped")]
    MissingRole(Role),

    #[error("role '{role}' maps to column '{column}' which the table does not contain")]
    MissingColumn { role: Role, column: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Mapping incomplete: {0}")]
    MappingIncomplete(#[from] MappingIncomplete),

    #[error("Enrichment failed: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("override for role '{role}' names unknown column '{column}'")]
    UnknownColumn { role: Role, column: String },

    #[error("brand '{0}' has no summary")]
    UnknownBrand(String),

    #[error("Table operation failed: {0}")]
    Table(#[from] TableError),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

struct RoleList<'a>(&'a [Role]);

impl fmt::Display for RoleList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, role) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{role}")?;
        }
        Ok(())
    }
}
