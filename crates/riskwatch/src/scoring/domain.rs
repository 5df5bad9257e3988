use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Upper bound shared by overall scores, component scores, and confidence.
pub const MAX_SCORE: f64 = 100.0;

pub(crate) fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_SCORE)
    }
}

pub(crate) fn clamp_overall(value: f64) -> u8 {
    clamp_score(value).round() as u8
}

/// Identifier wrapper for the organization that owns scored entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Qualitative direction of a score relative to a prior value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Deteriorating,
}

impl Trend {
    pub const fn label(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Deteriorating => "deteriorating",
        }
    }

    /// Case-insensitive label lookup.
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "improving" => Some(Trend::Improving),
            "stable" => Some(Trend::Stable),
            "deteriorating" => Some(Trend::Deteriorating),
            _ => None,
        }
    }
}

// Unrecognized or non-string trends read as stable.
impl<'de> Deserialize<'de> for Trend {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .and_then(Trend::from_label)
            .unwrap_or_default())
    }
}

/// Short and medium term projections returned alongside a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub next_week: f64,
    pub next_month: f64,
}

/// Assessment produced by the scoring oracle, clamped to the valid score range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub overall: u8,
    pub components: BTreeMap<String, f64>,
    pub confidence: f64,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions>,
    pub explanation: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Named control that lowers an entity's score by a fixed amount when applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMitigation {
    pub name: String,
    pub applied_risk_reduction_score: f64,
}

impl AppliedMitigation {
    pub fn new(name: impl Into<String>, applied_risk_reduction_score: f64) -> Self {
        Self {
            name: name.into(),
            applied_risk_reduction_score,
        }
    }
}

/// Score after mitigation reductions, keeping the pre-reduction value for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRiskScore {
    pub overall: f64,
    pub original_score: u8,
    pub total_risk_reduction: f64,
    pub mitigation_applied: bool,
    pub components: BTreeMap<String, f64>,
    pub confidence: f64,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub fallback: bool,
}

/// Physical site or asset under protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub organization_id: OrganizationId,
    pub name: String,
    pub asset_type: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub mitigations: Vec<AppliedMitigation>,
}

/// Staff member whose exposure contributes to organizational risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: String,
    pub organization_id: OrganizationId,
    pub name: String,
    pub role: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearance_level: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub mitigations: Vec<AppliedMitigation>,
}

/// Planned trip for a member of personnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub id: String,
    pub organization_id: OrganizationId,
    pub traveler_id: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    pub purpose: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub mitigations: Vec<AppliedMitigation>,
}

/// Security incident reported against the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub organization_id: OrganizationId,
    pub title: String,
    pub severity: String,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub mitigations: Vec<AppliedMitigation>,
}

/// Type tag sent to the oracle so it can pick the right assessment model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Asset,
    Personnel,
    Travel,
    Incident,
    Risk,
    Organization,
    Mitigation,
}

impl AssessmentKind {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentKind::Asset => "asset",
            AssessmentKind::Personnel => "personnel",
            AssessmentKind::Travel => "travel",
            AssessmentKind::Incident => "incident",
            AssessmentKind::Risk => "risk",
            AssessmentKind::Organization => "organization",
            AssessmentKind::Mitigation => "mitigation",
        }
    }
}

/// Any entity the engine can score on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScorableEntity {
    Asset(Asset),
    Personnel(Personnel),
    #[serde(rename = "travel")]
    TravelPlan(TravelPlan),
    Incident(Incident),
}

impl ScorableEntity {
    pub fn organization_id(&self) -> &OrganizationId {
        match self {
            ScorableEntity::Asset(asset) => &asset.organization_id,
            ScorableEntity::Personnel(person) => &person.organization_id,
            ScorableEntity::TravelPlan(plan) => &plan.organization_id,
            ScorableEntity::Incident(incident) => &incident.organization_id,
        }
    }

    pub fn kind(&self) -> AssessmentKind {
        match self {
            ScorableEntity::Asset(_) => AssessmentKind::Asset,
            ScorableEntity::Personnel(_) => AssessmentKind::Personnel,
            ScorableEntity::TravelPlan(_) => AssessmentKind::Travel,
            ScorableEntity::Incident(_) => AssessmentKind::Incident,
        }
    }

    pub fn mitigations(&self) -> &[AppliedMitigation] {
        match self {
            ScorableEntity::Asset(asset) => &asset.mitigations,
            ScorableEntity::Personnel(person) => &person.mitigations,
            ScorableEntity::TravelPlan(plan) => &plan.mitigations,
            ScorableEntity::Incident(incident) => &incident.mitigations,
        }
    }

    /// Oracle payload: the variant's own fields with the attribute bag lifted to the top level.
    /// Typed fields win over attribute keys of the same name.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        let (value, attributes) = match self {
            ScorableEntity::Asset(asset) => (serde_json::to_value(asset)?, &asset.attributes),
            ScorableEntity::Personnel(person) => {
                (serde_json::to_value(person)?, &person.attributes)
            }
            ScorableEntity::TravelPlan(plan) => (serde_json::to_value(plan)?, &plan.attributes),
            ScorableEntity::Incident(incident) => {
                (serde_json::to_value(incident)?, &incident.attributes)
            }
        };

        let Value::Object(mut fields) = value else {
            return Ok(value);
        };
        fields.remove("attributes");
        for (key, attribute) in attributes {
            fields
                .entry(key.clone())
                .or_insert_with(|| attribute.clone());
        }
        Ok(Value::Object(fields))
    }
}

/// Five-step ordinal shared by impact and likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    pub const fn index(self) -> usize {
        match self {
            RiskLevel::VeryLow => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::VeryHigh => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized risk level '{0}'")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|ch| match ch {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "very_low" | "verylow" => Ok(RiskLevel::VeryLow),
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "very_high" | "veryhigh" => Ok(RiskLevel::VeryHigh),
            _ => Err(UnknownRiskLevel(raw.to_string())),
        }
    }
}

/// Discrete risk entry as stored upstream. Ratings stay raw so that malformed values can be
/// counted rather than rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub impact: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub likelihood: Option<String>,
}

/// Ratings that are not non-empty strings are kept as absent so the matrix counts them as
/// defaulted instead of rejecting the record.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw),
        _ => None,
    })
}

impl RiskRecord {
    pub fn new(impact: RiskLevel, likelihood: RiskLevel) -> Self {
        Self {
            impact: Some(impact.label().to_string()),
            likelihood: Some(likelihood.label().to_string()),
            ..Self::default()
        }
    }

    pub fn impact_level(&self) -> Option<RiskLevel> {
        self.impact.as_deref().and_then(|raw| raw.parse().ok())
    }

    pub fn likelihood_level(&self) -> Option<RiskLevel> {
        self.likelihood.as_deref().and_then(|raw| raw.parse().ok())
    }
}

/// Entity categories collected when scoring a whole organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Assets,
    Personnel,
    Incidents,
    Risks,
    TravelPlans,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 5] = [
        EntityCategory::Assets,
        EntityCategory::Personnel,
        EntityCategory::Incidents,
        EntityCategory::Risks,
        EntityCategory::TravelPlans,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EntityCategory::Assets => "assets",
            EntityCategory::Personnel => "personnel",
            EntityCategory::Incidents => "incidents",
            EntityCategory::Risks => "risks",
            EntityCategory::TravelPlans => "travel_plans",
        }
    }
}

/// Where the previous score used for trend deltas came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    Supplied,
    Synthesized,
    Unavailable,
    Fallback,
}

/// Organization-wide composite score with trend deltas against a previous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRiskScore {
    pub organization_id: OrganizationId,
    pub score: u8,
    pub previous_score: Option<f64>,
    pub previous_score_source: BaselineSource,
    pub weekly_change: f64,
    pub percentage_change: f64,
    pub components: BTreeMap<String, f64>,
    pub confidence: f64,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub degraded_categories: Vec<EntityCategory>,
    pub fallback: bool,
    pub assessed_at: DateTime<Utc>,
}
