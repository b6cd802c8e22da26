pub mod aggregator;
pub mod config;
pub mod enricher;
pub mod error;
pub mod export;
pub mod insights;
pub mod mapping;
pub mod pipeline;
pub mod roles;
pub mod schema_matcher;
pub mod timestamp;

pub use aggregator::{BrandComparison, BrandSummary};
pub use config::{AnalyzerConfig, ConfigError};
pub use enricher::{BrandAssignment, EnrichOptions, EnrichedRecord, EnrichedSet};
pub use error::{EnrichmentError, MappingIncomplete, PipelineError, Result};
pub use mapping::{ColumnMapping, MappingOverrides};
pub use pipeline::{Analysis, Analyzer, Report, SourceInput, SourceKind};
pub use postlens_parser::{Cell, DecodeError, DecodedTable, RawTable};
pub use roles::{Role, RoleTaxonomy};
pub use schema_matcher::SchemaMatcher;
