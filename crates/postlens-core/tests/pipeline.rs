use std::fs;
use std::path::PathBuf;

use postlens_core::aggregator::SummaryMetric;
use postlens_core::config::AnalyzerConfig;
use postlens_core::pipeline::{Analysis, Analyzer, Report, SourceInput, SourceKind};
use postlens_core::roles::Role;
use postlens_core::{MappingOverrides, PipelineError};

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../postlens-parser/tests/data")
        .join(name);
    fs::read(&path).unwrap_or_else(|err| panic!("failed to read fixture {}: {}", path.display(), err))
}

fn complete(analysis: Analysis) -> Report {
    match analysis {
        Analysis::Complete(report) => *report,
        Analysis::AwaitingMapping { source, missing, .. } => {
            panic!("expected a complete analysis, {source} source is missing {missing:?}")
        }
    }
}

#[test]
fn main_and_competitor_are_compared() {
    let analyzer = Analyzer::default();
    let none = MappingOverrides::new();
    let main = fixture("linkedin_export.csv");
    let competitor = fixture("x_export_semicolon.csv");

    let report = complete(
        analyzer
            .analyze(
                SourceInput::new(&main, &none),
                Some(SourceInput::new(&competitor, &none)),
                None,
            )
            .unwrap(),
    );

    assert_eq!(report.main_parser, "COMMA_UTF8");
    assert_eq!(report.competitor_parser, Some("SEMICOLON_UTF8"));
    assert_eq!(report.primary_brand, "Acme Corp");
    assert_eq!(report.mapping().get(Role::Likes), Some("likeCount"));

    let competitor_set = report.competitor.as_ref().unwrap();
    assert_eq!(competitor_set.mapping.get(Role::Likes), Some("likeCount"));
    assert_eq!(competitor_set.mapping.get(Role::Author), Some("author"));
    assert_eq!(competitor_set.mapping.get(Role::Views), Some("impression_count"));
    assert!(competitor_set.columns.iter().any(|c| c == "postContent"));
    assert!(competitor_set.records.iter().all(|r| r.brand == "globex"));

    let brands: Vec<&str> = report.summaries.iter().map(|s| s.brand.as_str()).collect();
    assert_eq!(brands, vec!["Acme Corp", "globex"]);

    let acme = &report.summaries[0];
    assert_eq!(acme.post_count, 4);
    assert_eq!(acme.mean_total_interactions, 71.25);
    assert_eq!(acme.mean_engagement_rate, None);
    assert_eq!(acme.topic_share, 0.25);

    let globex = &report.summaries[1];
    assert_eq!(globex.post_count, 3);
    assert_eq!(globex.mean_engagement_rate, Some(5.5));

    assert_eq!(report.comparisons.len(), 1);
    let delta = report.comparisons[0]
        .delta(SummaryMetric::PostCount)
        .unwrap();
    assert_eq!(delta.pct_difference, Some(-25.0));
    let views = report.comparisons[0]
        .delta(SummaryMetric::MeanViews)
        .unwrap();
    assert_eq!(views.pct_difference, None);
}

#[test]
fn semicolon_main_source_uses_semicolon_parser() {
    let analyzer = Analyzer::default();
    let none = MappingOverrides::new();
    let main = fixture("x_export_semicolon.csv");

    let report = complete(
        analyzer
            .analyze(SourceInput::new(&main, &none), None, Some("Globex Inc"))
            .unwrap(),
    );

    assert_eq!(report.main_parser, "SEMICOLON_UTF8");
    assert_eq!(report.primary_brand, "Globex Inc");
    assert!(report.competitor.is_none());
    assert!(report.comparisons.is_empty());
    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.main.records[0].total_interactions, 65);
}

#[test]
fn incomplete_mapping_can_be_completed_with_overrides() {
    let analyzer = Analyzer::default();
    let main = b"title,hearts,notes\nhello,4,two\nbye,5,three\n".to_vec();

    let first = analyzer
        .analyze(SourceInput::new(&main, &MappingOverrides::new()), None, None)
        .unwrap();
    match first {
        Analysis::AwaitingMapping {
            source,
            mapping,
            missing,
        } => {
            assert_eq!(source, SourceKind::Main);
            assert_eq!(missing, vec![Role::Comments, Role::Reposts]);
            assert_eq!(mapping.get(Role::Likes), Some("hearts"));
        }
        Analysis::Complete(_) => panic!("mapping should be incomplete"),
    }

    let overrides = MappingOverrides::parse_pairs(["comments=notes", "reposts=hearts"]).unwrap();
    let report = complete(
        analyzer
            .analyze(SourceInput::new(&main, &overrides), None, None)
            .unwrap(),
    );
    let totals: Vec<u64> = report.main.records.iter().map(|r| r.total_interactions).collect();
    assert_eq!(totals, vec![8, 10]);
    assert_eq!(report.primary_brand, "Main Brand");
}

#[test]
fn resolve_reports_missing_roles_of_the_proposed_mapping() {
    let analyzer = Analyzer::default();
    let main = b"title,hearts,notes\nhello,4,two\nbye,5,three\n".to_vec();
    let overrides = MappingOverrides::parse_pairs(["comments=notes"]).unwrap();

    let inspected = analyzer.inspect(&main).unwrap();
    let proposed = analyzer.proposed_mapping(&inspected, &overrides).unwrap();
    assert_eq!(proposed.get(Role::Likes), Some("hearts"));
    assert_eq!(proposed.get(Role::Comments), Some("notes"));

    let err = analyzer.resolve(inspected, &overrides).unwrap_err();
    match err {
        PipelineError::MappingIncomplete(incomplete) => {
            assert_eq!(incomplete.missing, vec![Role::Reposts]);
        }
        other => panic!("expected an incomplete mapping, got {other}"),
    }

    let analysis = analyzer
        .analyze(SourceInput::new(&main, &overrides), None, None)
        .unwrap();
    match analysis {
        Analysis::AwaitingMapping { mapping, missing, .. } => {
            assert_eq!(mapping, proposed);
            assert_eq!(missing, vec![Role::Reposts]);
        }
        Analysis::Complete(_) => panic!("reposts is still unmapped"),
    }
}

#[test]
fn incomplete_competitor_is_reported_separately() {
    let analyzer = Analyzer::default();
    let none = MappingOverrides::new();
    let main = fixture("linkedin_export.csv");
    let competitor = b"name,score\nx,1\ny,2\n".to_vec();

    let analysis = analyzer
        .analyze(
            SourceInput::new(&main, &none),
            Some(SourceInput::new(&competitor, &none)),
            None,
        )
        .unwrap();
    match analysis {
        Analysis::AwaitingMapping { source, missing, .. } => {
            assert_eq!(source, SourceKind::Competitor);
            assert_eq!(missing, vec![Role::Comments, Role::Reposts]);
        }
        Analysis::Complete(_) => panic!("competitor mapping should be incomplete"),
    }
}

#[test]
fn configured_options_flow_into_the_report() {
    let config = AnalyzerConfig::from_toml_str(
        "include_reposts = false\ntopic_keyword = \"hiring\"\ndefault_brand = \"Us\"",
    )
    .unwrap();
    let analyzer = Analyzer::new(config);
    let none = MappingOverrides::new();
    let main = b"likes,comments,body\n3,4,Hiring now\n1,1,other\n".to_vec();

    let report = complete(
        analyzer
            .analyze(SourceInput::new(&main, &none), None, None)
            .unwrap(),
    );
    assert_eq!(report.primary_brand, "Us");
    assert_eq!(report.main.records[0].total_interactions, 7);
    assert!(report.main.records[0].topic_flag);
    assert!(!report.main.records[1].topic_flag);
}

#[test]
fn undecodable_and_bad_override_inputs_fail() {
    let analyzer = Analyzer::default();
    let none = MappingOverrides::new();

    let single_column = b"only\nvalue\n".to_vec();
    let err = analyzer
        .analyze(SourceInput::new(&single_column, &none), None, None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));

    let main = fixture("linkedin_export.csv");
    let bad = MappingOverrides::new().set(Role::Views, "reach_total");
    let err = analyzer
        .analyze(SourceInput::new(&main, &bad), None, None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownColumn { role: Role::Views, .. }));
}
