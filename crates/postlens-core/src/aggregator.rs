use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::enricher::{EnrichedRecord, EnrichedSet};
use crate::error::{PipelineError, Result};

const MICROS_PER_WEEK: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSummary {
    pub brand: String,
    pub post_count: usize,
    pub mean_likes: f64,
    pub mean_comments: f64,
    pub mean_reposts: f64,
    pub mean_views: Option<f64>,
    pub mean_total_interactions: f64,
    pub mean_engagement_rate: Option<f64>,
    /// Fraction of posts carrying the topic flag.
    pub topic_share: f64,
    pub first_post: Option<NaiveDateTime>,
    pub last_post: Option<NaiveDateTime>,
    /// Posts per week between the first and last known timestamp.
    pub cadence_per_week: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMetric {
    PostCount,
    MeanLikes,
    MeanComments,
    MeanReposts,
    MeanViews,
    MeanTotalInteractions,
    MeanEngagementRate,
    TopicShare,
    CadencePerWeek,
}

impl SummaryMetric {
    pub const ALL: [SummaryMetric; 9] = [
        SummaryMetric::PostCount,
        SummaryMetric::MeanLikes,
        SummaryMetric::MeanComments,
        SummaryMetric::MeanReposts,
        SummaryMetric::MeanViews,
        SummaryMetric::MeanTotalInteractions,
        SummaryMetric::MeanEngagementRate,
        SummaryMetric::TopicShare,
        SummaryMetric::CadencePerWeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMetric::PostCount => "post_count",
            SummaryMetric::MeanLikes => "mean_likes",
            SummaryMetric::MeanComments => "mean_comments",
            SummaryMetric::MeanReposts => "mean_reposts",
            SummaryMetric::MeanViews => "mean_views",
            SummaryMetric::MeanTotalInteractions => "mean_total_interactions",
            SummaryMetric::MeanEngagementRate => "mean_engagement_rate",
            SummaryMetric::TopicShare => "topic_share",
            SummaryMetric::CadencePerWeek => "cadence_per_week",
        }
    }
}

impl BrandSummary {
    pub fn metric(&self, metric: SummaryMetric) -> Option<f64> {
        match metric {
            SummaryMetric::PostCount => Some(self.post_count as f64),
            SummaryMetric::MeanLikes => Some(self.mean_likes),
            SummaryMetric::MeanComments => Some(self.mean_comments),
            SummaryMetric::MeanReposts => Some(self.mean_reposts),
            SummaryMetric::MeanViews => self.mean_views,
            SummaryMetric::MeanTotalInteractions => Some(self.mean_total_interactions),
            SummaryMetric::MeanEngagementRate => self.mean_engagement_rate,
            SummaryMetric::TopicShare => Some(self.topic_share),
            SummaryMetric::CadencePerWeek => self.cadence_per_week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: SummaryMetric,
    pub value: Option<f64>,
    pub primary: Option<f64>,
    /// `(value - primary) / primary * 100`; absent when either side is
    /// absent or the primary value is zero.
    pub pct_difference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandComparison {
    pub brand: String,
    pub primary_brand: String,
    pub deltas: Vec<MetricDelta>,
}

impl BrandComparison {
    pub fn delta(&self, metric: SummaryMetric) -> Option<&MetricDelta> {
        self.deltas.iter().find(|delta| delta.metric == metric)
    }
}

pub fn pct_difference(value: Option<f64>, primary: Option<f64>) -> Option<f64> {
    match (value, primary) {
        (Some(value), Some(primary)) if primary != 0.0 => Some((value - primary) / primary * 100.0),
        _ => None,
    }
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Posts per week over the known timestamps; absent with fewer than two
/// distinct timestamps or when the span does not yield a finite rate.
pub fn posting_cadence(timestamps: &[NaiveDateTime]) -> Option<f64> {
    let distinct: BTreeSet<&NaiveDateTime> = timestamps.iter().collect();
    if distinct.len() < 2 {
        return None;
    }
    let first = distinct.first()?;
    let last = distinct.last()?;
    let span = (**last - **first).num_microseconds()?;
    if span <= 0 {
        return None;
    }
    let cadence = (timestamps.len() - 1) as f64 / (span as f64 / MICROS_PER_WEEK);
    cadence.is_finite().then_some(cadence)
}

fn summarize_group(brand: &str, records: &[&EnrichedRecord]) -> BrandSummary {
    let post_count = records.len();
    let timestamps: Vec<NaiveDateTime> = records
        .iter()
        .filter_map(|record| record.normalized_timestamp)
        .collect();

    BrandSummary {
        brand: brand.to_string(),
        post_count,
        mean_likes: mean(records.iter().map(|r| r.likes as f64)).unwrap_or_default(),
        mean_comments: mean(records.iter().map(|r| r.comments as f64)).unwrap_or_default(),
        mean_reposts: mean(records.iter().map(|r| r.reposts as f64)).unwrap_or_default(),
        mean_views: mean(records.iter().filter_map(|r| r.views).map(|v| v as f64)),
        mean_total_interactions: mean(records.iter().map(|r| r.total_interactions as f64))
            .unwrap_or_default(),
        mean_engagement_rate: mean(records.iter().filter_map(|r| r.engagement_rate)),
        topic_share: mean(
            records
                .iter()
                .map(|r| if r.topic_flag { 1.0 } else { 0.0 }),
        )
        .unwrap_or_default(),
        first_post: timestamps.iter().min().copied(),
        last_post: timestamps.iter().max().copied(),
        cadence_per_week: posting_cadence(&timestamps),
    }
}

/// One summary per distinct brand across all sets, in order of first
/// appearance.
pub fn summarize_brands(sets: &[&EnrichedSet]) -> Vec<BrandSummary> {
    let mut groups: Vec<(&str, Vec<&EnrichedRecord>)> = Vec::new();
    for record in sets.iter().flat_map(|set| set.records.iter()) {
        match groups.iter_mut().find(|(brand, _)| *brand == record.brand) {
            Some((_, members)) => members.push(record),
            None => groups.push((record.brand.as_str(), vec![record])),
        }
    }

    groups
        .iter()
        .map(|(brand, members)| {
            let summary = summarize_group(brand, members);
            debug!(
                brand = %summary.brand,
                posts = summary.post_count,
                cadence = ?summary.cadence_per_week,
                "summarized brand"
            );
            summary
        })
        .collect()
}

/// Percentage differences of every other brand against `primary`.
pub fn compare_to_primary(
    summaries: &[BrandSummary],
    primary: &str,
) -> Result<Vec<BrandComparison>> {
    let baseline = summaries
        .iter()
        .find(|summary| summary.brand == primary)
        .ok_or_else(|| PipelineError::UnknownBrand(primary.to_string()))?;

    Ok(summaries
        .iter()
        .filter(|summary| summary.brand != primary)
        .map(|summary| BrandComparison {
            brand: summary.brand.clone(),
            primary_brand: primary.to_string(),
            deltas: SummaryMetric::ALL
                .iter()
                .map(|metric| {
                    let value = summary.metric(*metric);
                    let primary_value = baseline.metric(*metric);
                    MetricDelta {
                        metric: *metric,
                        value,
                        primary: primary_value,
                        pct_difference: pct_difference(value, primary_value),
                    }
                })
                .collect(),
        })
        .collect())
}
