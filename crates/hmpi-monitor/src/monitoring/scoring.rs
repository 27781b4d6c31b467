//! Heavy Metal Pollution Index scoring and risk bucketing.
//!
//! `calculate_hmpi` maps a sample's readings to `(Si / Ii) * Mi * 100`, rounded to two
//! decimal places, and `risk_level` buckets the result into one of five ordered levels.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::domain::SampleReadings;

/// Reasons a sample cannot be scored.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("ideal concentration Ii is zero")]
    ZeroIdeal,
    #[error("HMPI is not a finite number")]
    NonFinite,
}

/// Ordered risk categories, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Safe")]
    Safe,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskLevel {
    pub fn ordered() -> [RiskLevel; 5] {
        [
            RiskLevel::Safe,
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::High,
            RiskLevel::VeryHigh,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Safe => "Safe",
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::VeryHigh => "Very High Risk",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::Safe => "#059669",
            RiskLevel::Low => "#65A30D",
            RiskLevel::Moderate => "#D97706",
            RiskLevel::High => "#EA580C",
            RiskLevel::VeryHigh => "#DC2626",
        }
    }
}

/// Level boundaries, checked from the top down. Lower bounds are inclusive.
const THRESHOLDS: [(f64, RiskLevel); 4] = [
    (100.0, RiskLevel::VeryHigh),
    (50.0, RiskLevel::High),
    (25.0, RiskLevel::Moderate),
    (10.0, RiskLevel::Low),
];

/// Classify an index. Total over `f64`: NaN fails every comparison and lands on `Safe`.
pub fn risk_level(index: f64) -> RiskLevel {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| index >= *bound)
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Safe)
}

pub fn calculate_hmpi(readings: &SampleReadings) -> Result<f64, ScoringError> {
    if readings.ii == 0.0 {
        return Err(ScoringError::ZeroIdeal);
    }

    let index = (readings.si / readings.ii) * readings.mi * 100.0;
    if !index.is_finite() {
        return Err(ScoringError::NonFinite);
    }

    Ok(round_hundredths(index))
}

/// Round half away from zero at the hundredths digit of the shortest decimal form of
/// `value`, so `21.005` becomes `21.01` even though its binary value sits just below.
///
/// Magnitudes outside the decimal range fall back to binary rounding.
pub fn round_hundredths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    Decimal::from_str(&value.to_string())
        .ok()
        .map(|decimal| decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_string().parse::<f64>().ok())
        .unwrap_or_else(|| (value * 100.0).round() / 100.0)
}

/// Serializable pairing of an index with its bucket, as returned to dashboard clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub hmpi: f64,
    pub level: RiskLevel,
    pub color: &'static str,
}

impl RiskAssessment {
    pub fn from_index(hmpi: f64) -> Self {
        let level = risk_level(hmpi);
        Self {
            hmpi,
            level,
            color: level.color(),
        }
    }
}

pub fn assess(readings: &SampleReadings) -> Result<RiskAssessment, ScoringError> {
    calculate_hmpi(readings).map(RiskAssessment::from_index)
}
