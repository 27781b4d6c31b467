use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::domain::{RecordId, Sample};
use super::scoring::{calculate_hmpi, risk_level, round_hundredths, RiskLevel};

/// A sample annotated with its index and bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSample {
    #[serde(flatten)]
    pub sample: Sample,
    pub hmpi: f64,
    pub risk: RiskLevel,
}

/// Outcome of scoring a batch: samples with a finite index, and the ids of those without.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoredBatch {
    pub scored: Vec<ScoredSample>,
    pub unscorable: Vec<RecordId>,
}

pub fn score_samples<I>(samples: I) -> ScoredBatch
where
    I: IntoIterator<Item = Sample>,
{
    let mut batch = ScoredBatch::default();

    for sample in samples {
        match calculate_hmpi(&sample.readings) {
            Ok(hmpi) => batch.scored.push(ScoredSample {
                risk: risk_level(hmpi),
                hmpi,
                sample,
            }),
            Err(err) => {
                warn!(sample_id = %sample.id, metal = %sample.metal, error = %err, "sample excluded from charts");
                batch.unscorable.push(sample.id);
            }
        }
    }

    batch
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskChartEntry {
    pub name: &'static str,
    pub value: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetalChartEntry {
    pub name: String,
    pub count: usize,
    #[serde(rename = "avgHMPI")]
    pub avg_hmpi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub hmpi: f64,
}

/// Every chart series the dashboard renders, computed from one scored batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub risk_distribution: Vec<RiskChartEntry>,
    pub metal_summary: Vec<MetalChartEntry>,
    pub time_series: Vec<TimeSeriesPoint>,
}

impl ChartData {
    pub fn from_scored(scored: &[ScoredSample]) -> Self {
        Self {
            risk_distribution: risk_distribution(scored),
            metal_summary: metal_summary(scored),
            time_series: time_series(scored),
        }
    }
}

/// Counts per level, always five entries in `RiskLevel::ordered()` order.
pub fn risk_distribution(scored: &[ScoredSample]) -> Vec<RiskChartEntry> {
    let mut counts: HashMap<RiskLevel, usize> = HashMap::new();
    for entry in scored {
        *counts.entry(entry.risk).or_default() += 1;
    }

    RiskLevel::ordered()
        .into_iter()
        .map(|level| RiskChartEntry {
            name: level.label(),
            value: counts.get(&level).copied().unwrap_or(0),
            color: level.color(),
        })
        .collect()
}

/// Count and mean index per metal, in order of first appearance.
pub fn metal_summary(scored: &[ScoredSample]) -> Vec<MetalChartEntry> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();

    for entry in scored {
        let metal = entry.sample.metal.as_str();
        groups
            .entry(metal)
            .or_insert_with(|| {
                order.push(metal);
                Vec::new()
            })
            .push(entry.hmpi);
    }

    order
        .into_iter()
        .filter_map(|metal| {
            let indices = groups.get(metal)?;
            let avg = mean(indices)?;
            Some(MetalChartEntry {
                name: metal.to_string(),
                count: indices.len(),
                avg_hmpi: round_hundredths(avg),
            })
        })
        .collect()
}

/// `(date, hmpi)` pairs ascending by date; equal dates keep their input order.
pub fn time_series(scored: &[ScoredSample]) -> Vec<TimeSeriesPoint> {
    let mut points: Vec<TimeSeriesPoint> = scored
        .iter()
        .map(|entry| TimeSeriesPoint {
            date: entry.sample.date,
            hmpi: entry.hmpi,
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
