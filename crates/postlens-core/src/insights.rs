use std::collections::BTreeMap;

use chrono::Weekday;
use serde::Serialize;

use crate::enricher::{EnrichedRecord, EnrichedSet};
use crate::timestamp::{self, YearMonth, UNKNOWN};

pub const DEFAULT_HIGH_PERFORMER_THRESHOLD: u64 = 10;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The `n` records with the most interactions. Ties keep input order.
pub fn top_posts(set: &EnrichedSet, n: usize) -> Vec<&EnrichedRecord> {
    let mut records: Vec<&EnrichedRecord> = set.records.iter().collect();
    records.sort_by(|a, b| b.total_interactions.cmp(&a.total_interactions));
    records.truncate(n);
    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    HighTopic,
    HighOther,
    LowTopic,
    LowOther,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::HighTopic,
        Segment::HighOther,
        Segment::LowTopic,
        Segment::LowOther,
    ];

    fn of(record: &EnrichedRecord, threshold: u64) -> Self {
        match (record.total_interactions >= threshold, record.topic_flag) {
            (true, true) => Segment::HighTopic,
            (true, false) => Segment::HighOther,
            (false, true) => Segment::LowTopic,
            (false, false) => Segment::LowOther,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::HighTopic => "high performer, topic",
            Segment::HighOther => "high performer, other",
            Segment::LowTopic => "low performer, topic",
            Segment::LowOther => "low performer, other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub segment: Segment,
    pub post_count: usize,
    pub mean_total_interactions: Option<f64>,
}

/// Splits posts into high/low performers (`total >= threshold`) crossed with
/// the topic flag. All four segments are always returned.
pub fn topic_segments(set: &EnrichedSet, threshold: u64) -> Vec<SegmentStats> {
    Segment::ALL
        .iter()
        .map(|segment| {
            let totals: Vec<u64> = segment_posts(set, *segment, threshold)
                .into_iter()
                .map(|record| record.total_interactions)
                .collect();
            SegmentStats {
                segment: *segment,
                post_count: totals.len(),
                mean_total_interactions: mean(totals.iter().map(|v| *v as f64)),
            }
        })
        .collect()
}

/// Members of one segment in file order.
pub fn segment_posts(set: &EnrichedSet, segment: Segment, threshold: u64) -> Vec<&EnrichedRecord> {
    set.records
        .iter()
        .filter(|record| Segment::of(record, threshold) == segment)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayStats {
    pub weekday: String,
    pub post_count: usize,
    pub mean_likes: f64,
    pub mean_comments: f64,
    pub mean_reposts: f64,
    pub mean_total_interactions: f64,
}

/// Per-weekday means in Monday..Sunday order followed by posts with an
/// unknown timestamp. Days without posts are left out.
pub fn weekday_breakdown(set: &EnrichedSet) -> Vec<WeekdayStats> {
    let buckets = WEEK
        .iter()
        .map(|day| Some(*day))
        .chain(std::iter::once(None));

    buckets
        .filter_map(|day| {
            let members: Vec<&EnrichedRecord> = set
                .records
                .iter()
                .filter(|record| record.weekday == day)
                .collect();
            if members.is_empty() {
                return None;
            }
            let avg = |field: fn(&EnrichedRecord) -> u64| {
                mean(members.iter().map(|record| field(record) as f64)).unwrap_or_default()
            };
            Some(WeekdayStats {
                weekday: day.map(timestamp::weekday_name).unwrap_or(UNKNOWN).to_string(),
                post_count: members.len(),
                mean_likes: avg(|r| r.likes),
                mean_comments: avg(|r| r.comments),
                mean_reposts: avg(|r| r.reposts),
                mean_total_interactions: avg(|r| r.total_interactions),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    pub month: String,
    pub post_count: usize,
    pub total_interactions: u64,
}

/// Summed interactions per calendar month, oldest first, then "unknown".
pub fn monthly_totals(set: &EnrichedSet) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<YearMonth, (usize, u64)> = BTreeMap::new();
    let mut unknown: Option<(usize, u64)> = None;

    for record in &set.records {
        let slot = match record.month {
            Some(month) => by_month.entry(month).or_default(),
            None => unknown.get_or_insert((0, 0)),
        };
        slot.0 += 1;
        slot.1 = slot.1.saturating_add(record.total_interactions);
    }

    by_month
        .into_iter()
        .map(|(month, totals)| (month.to_string(), totals))
        .chain(unknown.map(|totals| (UNKNOWN.to_string(), totals)))
        .map(|(month, (post_count, total_interactions))| MonthlyTotal {
            month,
            post_count,
            total_interactions,
        })
        .collect()
}

/// Pearson correlation between total interactions and comments.
pub fn interaction_correlation(set: &EnrichedSet) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = set
        .records
        .iter()
        .map(|record| (record.total_interactions as f64, record.comments as f64))
        .collect();
    pearson(&pairs)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
