//! Core domain types for the analysis pipeline
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Snapshot** | A point-in-time bundle of dashboard metrics |
//! | **Period** | The reporting window the snapshot covers |
//! | **Metric identifier** | A dashboard key (`activeUsers`, `retention`, ...) selecting what the prompt mentions |
//! | **Credential** | The user's completion-provider API key |
//! | **Report** | The generated narrative text |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audio::AudioResource;
use crate::format::{mask_secret, serialize_js_number};

// ============================================
// Metrics snapshot
// ============================================

/// A point-in-time bundle of dashboard metrics.
///
/// Field names on the wire match the dashboard's (`activeUsers`,
/// `userGrowthData`, ...), so snapshots exported from it load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub active_users: u64,
    pub new_users: u64,
    /// Retention rate in percent
    pub retention_rate: f64,
    /// Conversion rate in percent
    pub conversion_rate: f64,
    #[serde(default)]
    pub user_growth_data: Vec<GrowthPoint>,
    #[serde(default)]
    pub retention_data: Vec<LabeledValue>,
    #[serde(default)]
    pub subscription_types: Vec<LabeledValue>,
}

/// One point of the user growth series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPoint {
    /// Period label (e.g. "Jan")
    #[serde(rename = "month")]
    pub label: String,
    /// Total users in the period
    #[serde(rename = "usuarios")]
    pub users: u64,
    /// New users in the period
    #[serde(rename = "novos")]
    pub new_users: u64,
}

/// A labeled value in a categorical breakdown (retention buckets, tiers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    pub name: String,
    #[serde(serialize_with = "serialize_js_number")]
    pub value: f64,
    /// Chart color, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ============================================
// Period
// ============================================

/// Reporting window for an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    AllTime,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Yearly,
        Period::AllTime,
    ];

    /// Identifier used on the wire and inside the prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
            Period::AllTime => "alltime",
        }
    }

    /// pt-BR label shown in the period selector.
    pub fn display_name(&self) -> &'static str {
        match self {
            Period::Daily => "Diário",
            Period::Weekly => "Semanal",
            Period::Monthly => "Mensal",
            Period::Yearly => "Anual",
            Period::AllTime => "Histórico",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown period '{}' (expected daily, weekly, monthly, yearly or alltime)",
                    s
                )
            })
    }
}

// ============================================
// Metric identifiers
// ============================================

/// Metrics the prompt builder knows how to render.
///
/// Requests carry raw identifier strings; anything that does not parse into
/// a `MetricKind` renders as an empty line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    ActiveUsers,
    NewUsers,
    RetentionRate,
    ConversionRate,
    UserGrowth,
    Retention,
    Subscriptions,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::ActiveUsers,
        MetricKind::NewUsers,
        MetricKind::RetentionRate,
        MetricKind::ConversionRate,
        MetricKind::UserGrowth,
        MetricKind::Retention,
        MetricKind::Subscriptions,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            MetricKind::ActiveUsers => "activeUsers",
            MetricKind::NewUsers => "newUsers",
            MetricKind::RetentionRate => "retentionRate",
            MetricKind::ConversionRate => "conversionRate",
            MetricKind::UserGrowth => "userGrowth",
            MetricKind::Retention => "retention",
            MetricKind::Subscriptions => "subscriptions",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.id() == id)
    }

    /// Every known identifier, in dashboard order.
    pub fn all_ids() -> Vec<String> {
        Self::ALL.iter().map(|m| m.id().to_string()).collect()
    }
}

// ============================================
// Request / result
// ============================================

/// Parameters for one analysis invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub period: Period,
    pub metrics: MetricsSnapshot,
    /// Metric identifiers in the order they should appear in the prompt
    pub selected_metrics: Vec<String>,
    /// True when the cycle was started automatically rather than by the user
    pub auto_mode: bool,
}

/// Output of one pipeline run.
#[derive(Debug)]
pub struct AnalysisResult {
    pub report: String,
    pub audio: Option<AudioResource>,
    pub period: Period,
    pub generated_at: DateTime<Utc>,
}

// ============================================
// Credential
// ============================================

/// Completion-provider API key.
///
/// `Debug` and `Display` are masked; use [`Credential::expose`] for the raw value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", mask_secret(&self.0))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_secret(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_deserializes_dashboard_shape() {
        let json = r#"{
            "activeUsers": 4567,
            "newUsers": 378,
            "retentionRate": 84,
            "conversionRate": 12.5,
            "userGrowthData": [{"month": "Jan", "usuarios": 4000, "novos": 300}],
            "retentionData": [{"name": "Ativos", "value": 84, "color": "hsl(var(--chart-2))"}],
            "subscriptionTypes": [{"name": "Premium", "value": 60}]
        }"#;
        let snapshot: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.active_users, 4567);
        assert_eq!(snapshot.retention_rate, 84.0);
        assert_eq!(snapshot.user_growth_data[0].label, "Jan");
        assert_eq!(snapshot.user_growth_data[0].new_users, 300);
        assert!(snapshot.subscription_types[0].color.is_none());
    }

    #[test]
    fn test_period_parse_and_labels() {
        assert_eq!("alltime".parse::<Period>().unwrap(), Period::AllTime);
        assert_eq!(Period::Monthly.display_name(), "Mensal");
        assert_eq!(Period::default(), Period::Monthly);
        assert!("hourly".parse::<Period>().is_err());
    }

    #[test]
    fn test_metric_kind_ids() {
        for kind in MetricKind::ALL {
            assert_eq!(MetricKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(MetricKind::from_id("churn"), None);
        assert_eq!(MetricKind::all_ids().len(), 7);
    }

    #[test]
    fn test_credential_is_masked() {
        let credential = Credential::new("sk-proj-1234567890");
        assert_eq!(format!("{:?}", credential), "Credential(sk-...7890)");
        assert_eq!(credential.to_string(), "sk-...7890");
        assert_eq!(credential.expose(), "sk-proj-1234567890");
    }
}
