use postlens_parser::{decode_table, DecodedTable, RawTable};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{compare_to_primary, summarize_brands, BrandComparison, BrandSummary};
use crate::config::AnalyzerConfig;
use crate::enricher::{self, primary_brand_label, BrandAssignment, EnrichedSet};
use crate::error::{PipelineError, Result};
use crate::mapping::{translate_columns, ColumnMapping, MappingOverrides};
use crate::roles::Role;
use crate::schema_matcher::SchemaMatcher;

/// Brand used for competitor rows without an author value.
pub const DEFAULT_COMPETITOR_BRAND: &str = "Competitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Main,
    Competitor,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SourceKind::Main => "main",
            SourceKind::Competitor => "competitor",
        })
    }
}

/// A decoded table with the mapping the matcher proposes for it.
#[derive(Debug, Clone)]
pub struct InspectedSource {
    pub decoded: DecodedTable,
    pub detected: ColumnMapping,
}

/// A table whose mapping covers every required role.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub table: RawTable,
    pub parser: &'static str,
    pub mapping: ColumnMapping,
}

/// Raw bytes of one source plus the user's overrides for it.
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub bytes: &'a [u8],
    pub overrides: &'a MappingOverrides,
}

impl<'a> SourceInput<'a> {
    pub fn new(bytes: &'a [u8], overrides: &'a MappingOverrides) -> Self {
        Self { bytes, overrides }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub main: EnrichedSet,
    pub competitor: Option<EnrichedSet>,
    pub main_parser: &'static str,
    pub competitor_parser: Option<&'static str>,
    pub primary_brand: String,
    pub summaries: Vec<BrandSummary>,
    pub comparisons: Vec<BrandComparison>,
}

impl Report {
    pub fn mapping(&self) -> &ColumnMapping {
        &self.main.mapping
    }
}

#[derive(Debug, Clone)]
pub enum Analysis {
    /// A source still lacks required roles. Call `analyze` again with
    /// overrides covering `missing`.
    AwaitingMapping {
        source: SourceKind,
        mapping: ColumnMapping,
        missing: Vec<Role>,
    },
    Complete(Box<Report>),
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    matcher: SchemaMatcher,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let matcher = config.matcher();
        Self { config, matcher }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn inspect(&self, bytes: &[u8]) -> Result<InspectedSource> {
        let decoded = decode_table(bytes)?;
        let detected = self.matcher.detect(&decoded.table);
        info!(
            parser = decoded.parser,
            rows = decoded.table.row_count(),
            columns = decoded.table.column_count(),
            skipped_rows = decoded.skipped_rows,
            "decoded source"
        );
        Ok(InspectedSource { decoded, detected })
    }

    /// Detected mapping with the overrides applied, before required-role
    /// validation.
    pub fn proposed_mapping(
        &self,
        inspected: &InspectedSource,
        overrides: &MappingOverrides,
    ) -> Result<ColumnMapping> {
        inspected
            .detected
            .apply_overrides(overrides, &inspected.decoded.table)
    }

    /// Applies overrides and checks the required roles. A
    /// `PipelineError::MappingIncomplete` can be retried with more overrides.
    pub fn resolve(
        &self,
        inspected: InspectedSource,
        overrides: &MappingOverrides,
    ) -> Result<ResolvedSource> {
        let mapping = self.proposed_mapping(&inspected, overrides)?;
        self.resolve_with(inspected, mapping)
    }

    fn resolve_with(&self, inspected: InspectedSource, mapping: ColumnMapping) -> Result<ResolvedSource> {
        mapping.validate(&self.config.enrich_options().required_roles())?;
        Ok(ResolvedSource {
            table: inspected.decoded.table,
            parser: inspected.decoded.parser,
            mapping,
        })
    }

    pub fn enrich(&self, resolved: &ResolvedSource, brand: &BrandAssignment) -> Result<EnrichedSet> {
        Ok(enricher::enrich(
            &resolved.table,
            &resolved.mapping,
            &self.config.enrich_options(),
            brand,
        )?)
    }

    /// Brand label for the main source: `label` when given, otherwise the
    /// most frequent author, otherwise the configured default.
    pub fn main_brand(&self, resolved: &ResolvedSource, label: Option<&str>) -> String {
        match label.map(str::trim).filter(|label| !label.is_empty()) {
            Some(label) => label.to_string(),
            None => primary_brand_label(
                &resolved.table,
                &resolved.mapping,
                &self.config.default_brand,
            ),
        }
    }

    pub fn analyze(
        &self,
        main: SourceInput<'_>,
        competitor: Option<SourceInput<'_>>,
        brand: Option<&str>,
    ) -> Result<Analysis> {
        let main_resolved = match self.resolve_or_wait(SourceKind::Main, main)? {
            Ok(resolved) => resolved,
            Err(waiting) => return Ok(waiting),
        };

        let primary_brand = self.main_brand(&main_resolved, brand);
        let main_set = self.enrich(&main_resolved, &BrandAssignment::Label(primary_brand.clone()))?;

        let (competitor_set, competitor_parser) = match competitor {
            Some(input) => {
                let resolved = match self.resolve_or_wait(SourceKind::Competitor, input)? {
                    Ok(resolved) => resolved,
                    Err(waiting) => return Ok(waiting),
                };
                let parser = resolved.parser;
                let translated =
                    translate_columns(resolved.table, &resolved.mapping, &main_resolved.mapping)?;
                let translated = ResolvedSource {
                    table: translated.table,
                    parser,
                    mapping: translated.mapping,
                };
                let set = self.enrich(
                    &translated,
                    &BrandAssignment::PerRowAuthor {
                        fallback: DEFAULT_COMPETITOR_BRAND.to_string(),
                    },
                )?;
                (Some(set), Some(parser))
            }
            None => (None, None),
        };

        let mut sets = vec![&main_set];
        sets.extend(competitor_set.as_ref());
        let summaries = summarize_brands(&sets);
        let comparisons = compare_to_primary(&summaries, &primary_brand)?;

        info!(
            brand = %primary_brand,
            brands = summaries.len(),
            main_rows = main_set.len(),
            competitor_rows = competitor_set.as_ref().map_or(0, EnrichedSet::len),
            "analysis complete"
        );

        Ok(Analysis::Complete(Box::new(Report {
            main: main_set,
            competitor: competitor_set,
            main_parser: main_resolved.parser,
            competitor_parser,
            primary_brand,
            summaries,
            comparisons,
        })))
    }

    fn resolve_or_wait(
        &self,
        kind: SourceKind,
        input: SourceInput<'_>,
    ) -> Result<std::result::Result<ResolvedSource, Analysis>> {
        let inspected = self.inspect(input.bytes)?;
        let proposed = self.proposed_mapping(&inspected, input.overrides)?;
        match self.resolve_with(inspected, proposed.clone()) {
            Ok(resolved) => Ok(Ok(resolved)),
            Err(PipelineError::MappingIncomplete(incomplete)) => {
                warn!(source = %kind, missing = ?incomplete.missing, "mapping incomplete");
                Ok(Err(Analysis::AwaitingMapping {
                    source: kind,
                    mapping: proposed,
                    missing: incomplete.missing,
                }))
            }
            Err(err) => Err(err),
        }
    }
}
