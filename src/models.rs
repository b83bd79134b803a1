use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const UNKNOWN_BARANGAY: &str = "Unknown";

/// Nutrition status derived from a BMI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKey {
    Underweight,
    Normal,
    Overweight,
    Obese,
    #[default]
    Unknown,
}

impl StatusKey {
    /// Case-insensitive parse. `healthy` is an older spelling of `normal`;
    /// anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "underweight" => Self::Underweight,
            "normal" | "healthy" => Self::Normal,
            "overweight" => Self::Overweight,
            "obese" => Self::Obese,
            _ => Self::Unknown,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Underweight => "underweight",
            Self::Normal => "normal",
            Self::Overweight => "overweight",
            Self::Obese => "obese",
            Self::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
            Self::Unknown => "Unknown",
        }
    }
}

impl<'de> Deserialize<'de> for StatusKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => Self::parse(&raw),
            _ => Self::Unknown,
        })
    }
}

/// One tracked child, as persisted in the storage slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecord {
    #[serde(default, deserialize_with = "id_from_value")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unknown_barangay")]
    pub barangay: String,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default, alias = "weight")]
    pub weight_kg: Option<f64>,
    #[serde(default, alias = "height")]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub status_key: StatusKey,
    #[serde(default, alias = "status")]
    pub status_label: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChildRecord {
    /// Older payloads may carry only the display label; recover the key
    /// from it when the key itself is missing or unrecognized.
    pub fn reconcile_status(&mut self) {
        if self.status_key == StatusKey::Unknown {
            self.status_key = StatusKey::parse(&self.status_label);
        }
    }
}

fn unknown_barangay() -> String {
    UNKNOWN_BARANGAY.to_string()
}

/// Older payloads carry numeric ids; both forms compare as strings.
fn id_from_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => raw,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Free-form record input as submitted by a form or another page.
///
/// Every field is an arbitrary JSON value; `records::build_record` is the only
/// way to turn it into a [`ChildRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInput {
    pub id: Option<Value>,
    pub name: Option<Value>,
    pub barangay: Option<Value>,
    pub age: Option<Value>,
    #[serde(alias = "weight")]
    pub weight_kg: Option<Value>,
    #[serde(alias = "height")]
    pub height_cm: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: u64,
    pub normal: u64,
    pub underweight: u64,
    pub overweight: u64,
    pub obese: u64,
}

impl StatusSummary {
    /// Counts `status` toward the total and, when recognized, its bucket.
    pub fn record(&mut self, status: StatusKey) {
        self.total += 1;
        match status {
            StatusKey::Normal => self.normal += 1,
            StatusKey::Underweight => self.underweight += 1,
            StatusKey::Overweight => self.overweight += 1,
            StatusKey::Obese => self.obese += 1,
            StatusKey::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarangayGroup {
    /// Display name of the first record seen for this group.
    pub name: String,
    #[serde(flatten)]
    pub counts: StatusSummary,
}

pub type BarangayGroups = BTreeMap<String, BarangayGroup>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEntry {
    pub barangay: String,
    pub rate: f64,
    pub count: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub highest_obesity: Option<RiskEntry>,
    pub highest_underweight: Option<RiskEntry>,
}

/// Numeric series handed to the page's chart drawing hooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub normal: Vec<u64>,
    pub underweight: Vec<u64>,
    pub overweight: Vec<u64>,
    pub obese: Vec<u64>,
    pub distribution: StatusSummary,
}

/// Everything the dashboard page paints, keyed by region element id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub text: BTreeMap<&'static str, String>,
    pub html: BTreeMap<&'static str, String>,
    pub charts: ChartSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}
