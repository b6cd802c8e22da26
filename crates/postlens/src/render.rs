use comfy_table::presets::UTF8_FULL;
use comfy_table::{Row, Table};
use postlens_core::aggregator::{BrandComparison, BrandSummary};
use postlens_core::insights::{MonthlyTotal, SegmentStats, WeekdayStats};
use postlens_core::timestamp;
use postlens_core::{Cell, ColumnMapping, EnrichedRecord, EnrichedSet, Role};

const CONTENT_PREVIEW_CHARS: usize = 60;

fn table<H: Into<Row>>(header: H) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn number(value: f64) -> String {
    format!("{value:.2}")
}

fn optional(value: Option<f64>) -> String {
    value.map(number).unwrap_or_else(|| "n/a".to_string())
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:+.1}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn mapping_table(mapping: &ColumnMapping, required: &[Role]) -> Table {
    let mut out = table(["role", "column", "required"]);
    for role in Role::ALL {
        out.add_row(vec![
            role.to_string(),
            mapping.get(role).unwrap_or("-").to_string(),
            if required.contains(&role) { "yes" } else { "" }.to_string(),
        ]);
    }
    out
}

pub fn summaries_table(summaries: &[BrandSummary], primary: &str) -> Table {
    let mut out = table([
        "brand",
        "posts",
        "likes",
        "comments",
        "reposts",
        "views",
        "interactions",
        "engagement %",
        "topic share",
        "posts/week",
        "first post",
        "last post",
    ]);
    for summary in summaries {
        let brand = if summary.brand == primary {
            format!("{} *", summary.brand)
        } else {
            summary.brand.clone()
        };
        out.add_row(vec![
            brand,
            summary.post_count.to_string(),
            number(summary.mean_likes),
            number(summary.mean_comments),
            number(summary.mean_reposts),
            optional(summary.mean_views),
            number(summary.mean_total_interactions),
            optional(summary.mean_engagement_rate),
            format!("{:.0}%", summary.topic_share * 100.0),
            optional(summary.cadence_per_week),
            timestamp::format_timestamp(summary.first_post.as_ref()),
            timestamp::format_timestamp(summary.last_post.as_ref()),
        ]);
    }
    out
}

pub fn comparisons_table(comparisons: &[BrandComparison]) -> Table {
    let mut out = table(["brand", "metric", "value", "primary", "difference"]);
    for comparison in comparisons {
        for delta in &comparison.deltas {
            out.add_row(vec![
                comparison.brand.clone(),
                delta.metric.as_str().to_string(),
                optional(delta.value),
                optional(delta.primary),
                percent(delta.pct_difference),
            ]);
        }
    }
    out
}

fn text_cell(set: &EnrichedSet, record: &EnrichedRecord, role: Role) -> String {
    set.role_value(record, role)
        .and_then(Cell::as_str)
        .unwrap_or_default()
        .to_string()
}

fn content_preview(set: &EnrichedSet, record: &EnrichedRecord) -> String {
    let text = set
        .role_value(record, Role::Content)
        .and_then(Cell::as_str)
        .unwrap_or_default();
    let mut preview: String = text.chars().take(CONTENT_PREVIEW_CHARS).collect();
    if text.chars().count() > CONTENT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

pub fn posts_table(set: &EnrichedSet, records: &[&EnrichedRecord]) -> Table {
    let mut out = table([
        "timestamp", "likes", "comments", "reposts", "total", "topic", "url", "content",
    ]);
    for record in records {
        out.add_row(vec![
            record.timestamp_label(),
            record.likes.to_string(),
            record.comments.to_string(),
            record.reposts.to_string(),
            record.total_interactions.to_string(),
            if record.topic_flag { "yes" } else { "" }.to_string(),
            text_cell(set, record, Role::Url),
            content_preview(set, record),
        ]);
    }
    out
}

pub fn segments_table(segments: &[SegmentStats]) -> Table {
    let mut out = table(["segment", "posts", "mean interactions"]);
    for stats in segments {
        out.add_row(vec![
            stats.segment.label().to_string(),
            stats.post_count.to_string(),
            optional(stats.mean_total_interactions),
        ]);
    }
    out
}

pub fn weekday_table(days: &[WeekdayStats]) -> Table {
    let mut out = table(["weekday", "posts", "likes", "comments", "reposts", "interactions"]);
    for day in days {
        out.add_row(vec![
            day.weekday.clone(),
            day.post_count.to_string(),
            number(day.mean_likes),
            number(day.mean_comments),
            number(day.mean_reposts),
            number(day.mean_total_interactions),
        ]);
    }
    out
}

pub fn monthly_table(months: &[MonthlyTotal]) -> Table {
    let mut out = table(["month", "posts", "interactions"]);
    for month in months {
        out.add_row(vec![
            month.month.clone(),
            month.post_count.to_string(),
            month.total_interactions.to_string(),
        ]);
    }
    out
}

pub fn record_json(set: &EnrichedSet, record: &EnrichedRecord) -> serde_json::Value {
    let text = |role: Role| {
        set.role_value(record, role)
            .and_then(Cell::as_str)
            .map(str::to_string)
    };
    serde_json::json!({
        "url": text(Role::Url),
        "content": text(Role::Content),
        "likes": record.likes,
        "comments": record.comments,
        "reposts": record.reposts,
        "views": record.views,
        "total_interactions": record.total_interactions,
        "engagement_rate": record.engagement_rate,
        "normalized_timestamp": record.timestamp_label(),
        "weekday": record.weekday_label(),
        "month": record.month_label(),
        "topic_flag": record.topic_flag,
        "brand": record.brand,
    })
}
