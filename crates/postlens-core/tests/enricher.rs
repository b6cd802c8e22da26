use chrono::{NaiveDate, Weekday};
use postlens_core::enricher::{coerce_count, enrich, primary_brand_label, BrandAssignment, EnrichOptions};
use postlens_core::roles::Role;
use postlens_core::schema_matcher::SchemaMatcher;
use postlens_core::{Cell, ColumnMapping, EnrichmentError, RawTable};

fn table<'a>(headers: &[&'a str], rows: Vec<Vec<&'a str>>) -> RawTable {
    RawTable::from_rows(headers.to_vec(), rows).expect("valid table")
}

fn label(name: &str) -> BrandAssignment {
    BrandAssignment::Label(name.to_string())
}

#[test]
fn linkedin_row_is_enriched() {
    let raw = table(
        &["likeCount", "commentCount", "repostCount", "postContent"],
        vec![vec!["5", "2", "1", "hello"]],
    );
    let mapping = SchemaMatcher::default().detect(&raw);
    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap();

    assert_eq!(set.len(), 1);
    let record = &set.records[0];
    assert_eq!((record.likes, record.comments, record.reposts), (5, 2, 1));
    assert_eq!(record.total_interactions, 8);
    assert!(!record.topic_flag);
    assert_eq!(record.views, None);
    assert_eq!(record.engagement_rate, None);
    assert_eq!(record.timestamp_label(), "unknown");
    assert_eq!(record.weekday_label(), "unknown");
    assert_eq!(record.month_label(), "unknown");
    assert_eq!(record.brand, "Acme");
    assert_eq!(
        set.role_value(record, Role::Content).and_then(Cell::as_str),
        Some("hello")
    );
}

#[test]
fn topic_keyword_matches_case_insensitively() {
    let raw = table(
        &["likeCount", "commentCount", "repostCount", "postContent"],
        vec![
            vec!["1", "1", "1", "check out Google's new feature"],
            vec!["1", "1", "1", "nothing to see"],
        ],
    );
    let mapping = SchemaMatcher::default().detect(&raw);

    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap();
    assert!(set.records[0].topic_flag);
    assert!(!set.records[1].topic_flag);

    let options = EnrichOptions {
        topic_keyword: "NOTHING".to_string(),
        ..EnrichOptions::default()
    };
    let set = enrich(&raw, &mapping, &options, &label("Acme")).unwrap();
    assert!(!set.records[0].topic_flag);
    assert!(set.records[1].topic_flag);

    let no_content = mapping.without(Role::Content);
    let set = enrich(&raw, &no_content, &EnrichOptions::default(), &label("Acme")).unwrap();
    assert!(set.records.iter().all(|record| !record.topic_flag));
}

#[test]
fn irregular_metric_cells_become_zero() {
    let raw = table(
        &["likeCount", "commentCount", "repostCount"],
        vec![
            vec!["abc", "2", "1"],
            vec!["-4", "", "NaN"],
            vec!["1,234", "7.9", "inf"],
        ],
    );
    let mapping = SchemaMatcher::default().detect(&raw);
    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap();

    let totals: Vec<(u64, u64, u64, u64)> = set
        .records
        .iter()
        .map(|r| (r.likes, r.comments, r.reposts, r.total_interactions))
        .collect();
    assert_eq!(totals, vec![(0, 2, 1, 3), (0, 0, 0, 0), (1234, 7, 0, 1241)]);
}

#[test]
fn coercion_handles_grouping_and_saturation() {
    assert_eq!(coerce_count(&Cell::from_raw("42")), 42);
    assert_eq!(coerce_count(&Cell::from_raw(" 12.99 ")), 12);
    assert_eq!(coerce_count(&Cell::from_raw("12,345,678")), 12_345_678);
    assert_eq!(coerce_count(&Cell::from_raw("12,34")), 0);
    assert_eq!(coerce_count(&Cell::from_raw("1e30")), u64::MAX);
    assert_eq!(coerce_count(&Cell::Empty), 0);
}

#[test]
fn engagement_requires_nonzero_views() {
    let raw = table(
        &["likes", "comments", "reposts", "impressions"],
        vec![
            vec!["10", "5", "5", "400"],
            vec!["10", "5", "5", "0"],
            vec!["10", "5", "5", "hidden"],
        ],
    );
    let mapping = SchemaMatcher::default().detect(&raw);
    assert_eq!(mapping.get(Role::Views), Some("impressions"));

    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap();
    assert_eq!(set.records[0].views, Some(400));
    assert_eq!(set.records[0].engagement_rate, Some(5.0));
    assert_eq!(set.records[1].views, Some(0));
    assert_eq!(set.records[1].engagement_rate, None);
    assert_eq!(set.records[2].engagement_rate, None);
    assert!(set.records.iter().all(|r| r.total_interactions == 20));
}

#[test]
fn reposts_can_be_left_out_of_the_total() {
    let raw = table(&["likes", "comments"], vec![vec!["3", "4"]]);
    let mapping = SchemaMatcher::default().detect(&raw);

    let err = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap_err();
    assert_eq!(err, EnrichmentError::MissingRole(Role::Reposts));

    let options = EnrichOptions {
        include_reposts: false,
        required_roles: vec![Role::Likes, Role::Comments],
        ..EnrichOptions::default()
    };
    let set = enrich(&raw, &mapping, &options, &label("Acme")).unwrap();
    assert_eq!(set.records[0].reposts, 0);
    assert_eq!(set.records[0].total_interactions, 7);
}

#[test]
fn mapping_pointing_at_missing_column_is_an_error() {
    let raw = table(&["likes", "comments", "reposts"], vec![vec!["1", "1", "1"]]);
    let mapping = ColumnMapping::new()
        .with(Role::Likes, "likes")
        .with(Role::Comments, "comments")
        .with(Role::Reposts, "shares");

    let err = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap_err();
    assert_eq!(
        err,
        EnrichmentError::MissingColumn {
            role: Role::Reposts,
            column: "shares".to_string()
        }
    );
}

#[test]
fn timestamps_derive_weekday_and_month() {
    let raw = table(
        &["likes", "comments", "reposts", "date"],
        vec![
            vec!["1", "1", "1", "2025-03-09T12:00:00Z"],
            vec!["1", "1", "1", "soon"],
        ],
    );
    let mapping = SchemaMatcher::default().detect(&raw);
    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &label("Acme")).unwrap();

    let first = &set.records[0];
    let expected = NaiveDate::from_ymd_opt(2025, 3, 9)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(first.normalized_timestamp, Some(expected));
    assert_eq!(first.weekday, Some(Weekday::Sun));
    assert_eq!(first.weekday_label(), "Sunday");
    assert_eq!(first.month_label(), "2025-03");
    assert_eq!(first.timestamp_label(), "2025-03-09 12:00:00");

    let second = &set.records[1];
    assert_eq!(second.normalized_timestamp, None);
    assert_eq!(second.month_label(), "unknown");
}

#[test]
fn per_row_brand_uses_author_with_fallback() {
    let raw = table(
        &["likes", "comments", "reposts", "author"],
        vec![
            vec!["1", "1", "1", "Globex"],
            vec!["1", "1", "1", ""],
            vec!["1", "1", "1", "Initech"],
        ],
    );
    let mapping = SchemaMatcher::default().detect(&raw);
    let brand = BrandAssignment::PerRowAuthor {
        fallback: "Competitor".to_string(),
    };
    let set = enrich(&raw, &mapping, &EnrichOptions::default(), &brand).unwrap();

    let brands: Vec<&str> = set.records.iter().map(|r| r.brand.as_str()).collect();
    assert_eq!(brands, vec!["Globex", "Competitor", "Initech"]);

    let unmapped = enrich(&raw, &mapping.without(Role::Author), &EnrichOptions::default(), &brand).unwrap();
    assert!(unmapped.records.iter().all(|r| r.brand == "Competitor"));
}

#[test]
fn primary_brand_is_the_most_frequent_author() {
    let raw = table(
        &["likes", "author"],
        vec![
            vec!["1", "Initech"],
            vec!["1", "Acme"],
            vec!["1", "Acme"],
            vec!["1", "Initech"],
            vec!["1", ""],
        ],
    );
    let mapping = ColumnMapping::new().with(Role::Author, "author");

    assert_eq!(primary_brand_label(&raw, &mapping, "Main Brand"), "Initech");
    assert_eq!(
        primary_brand_label(&raw, &ColumnMapping::new(), "Main Brand"),
        "Main Brand"
    );
}
