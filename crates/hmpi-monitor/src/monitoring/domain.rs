use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier assigned by the table store.
///
/// Stores disagree on whether ids are integers or strings; both deserialize into the same
/// textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(value) => Ok(Self(value)),
            Raw::Integer(value) => Ok(Self(value.to_string())),
        }
    }
}

/// Per-project alerting configuration. Updates replace the whole object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub hmpi: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { hmpi: 100.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub threshold: ThresholdConfig,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub threshold: ThresholdConfig,
}

/// The three concentrations HMPI is computed from, all in the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleReadings {
    #[serde(rename = "Si")]
    pub si: f64,
    #[serde(rename = "Ii")]
    pub ii: f64,
    #[serde(rename = "Mi")]
    pub mi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: RecordId,
    pub project_id: RecordId,
    pub metal: String,
    #[serde(flatten)]
    pub readings: SampleReadings,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(deserialize_with = "deserialize_sample_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSample {
    pub project_id: RecordId,
    pub metal: String,
    #[serde(flatten)]
    pub readings: SampleReadings,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(deserialize_with = "deserialize_sample_date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn label(self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: RecordId,
    pub project_id: RecordId,
    pub sample_id: RecordId,
    pub message: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub project_id: RecordId,
    pub sample_id: RecordId,
    pub message: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: RecordId,
    pub name: String,
    pub metal: String,
    pub threshold: f64,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    pub name: String,
    pub metal: String,
    pub threshold: f64,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Parse a sample date given either as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_sample_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn deserialize_sample_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_sample_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sample_uses_capitalized_reading_names() {
        let sample: Sample = serde_json::from_value(json!({
            "id": 17,
            "projectId": "p-1",
            "metal": "Lead",
            "Si": 0.09,
            "Ii": 0.3,
            "Mi": 0.7,
            "date": "2025-01-15T08:30:00Z"
        }))
        .expect("sample decodes");

        assert_eq!(sample.id, RecordId::from("17"));
        assert_eq!(sample.readings.ii, 0.3);
        assert_eq!(sample.date, NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid"));

        let encoded = serde_json::to_value(&sample).expect("sample encodes");
        assert_eq!(encoded["Si"], json!(0.09));
        assert_eq!(encoded["projectId"], json!("p-1"));
        assert_eq!(encoded["date"], json!("2025-01-15"));
    }

    #[test]
    fn project_threshold_defaults_when_absent() {
        let project: Project = serde_json::from_value(json!({
            "id": "p-1",
            "name": "Jharia basin"
        }))
        .expect("project decodes");
        assert_eq!(project.threshold, ThresholdConfig::default());
    }
}
