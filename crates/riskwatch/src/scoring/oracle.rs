use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::domain::{
    clamp_overall, clamp_score, AssessmentKind, OrganizationId, Predictions, RiskScore,
    ScorableEntity, Trend,
};
use crate::config::OracleConfig;

/// Request envelope understood by the scoring oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    #[serde(rename = "type")]
    pub kind: AssessmentKind,
    pub data: Value,
    pub organization_id: OrganizationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ScoringRequest {
    pub fn new(kind: AssessmentKind, data: Value, organization_id: OrganizationId) -> Self {
        Self {
            kind,
            data,
            organization_id,
            user_id: None,
        }
    }

    pub fn for_entity(entity: &ScorableEntity) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            entity.kind(),
            entity.payload()?,
            entity.organization_id().clone(),
        ))
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Partial projections as they arrive on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsPayload {
    #[serde(default)]
    pub next_week: Option<f64>,
    #[serde(default)]
    pub next_month: Option<f64>,
}

/// Raw oracle response before clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub score: f64,
    #[serde(default)]
    pub components: Option<BTreeMap<String, f64>>,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub predictions: Option<PredictionsPayload>,
}

impl OracleResponse {
    /// Validate and clamp the response into a `RiskScore`.
    pub fn into_risk_score(self) -> Result<RiskScore, OracleError> {
        if !self.score.is_finite() {
            return Err(OracleError::Malformed(format!(
                "score is not a finite number: {}",
                self.score
            )));
        }

        let overall = clamp_overall(self.score);
        let components = self
            .components
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, clamp_score(value)))
            .collect();
        let current = f64::from(overall);
        let predictions = self.predictions.map(|payload| Predictions {
            next_week: payload.next_week.map_or(current, clamp_score),
            next_month: payload.next_month.map_or(current, clamp_score),
        });

        Ok(RiskScore {
            overall,
            components,
            confidence: clamp_score(self.confidence),
            trend: self.trend.unwrap_or_default(),
            predictions,
            explanation: self.explanation,
            recommendations: self.recommendations.unwrap_or_default(),
        })
    }
}

/// Black-box assessment service. Injected so transports can be swapped or mocked.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score(&self, request: ScoringRequest) -> Result<OracleResponse, OracleError>;
}

/// Error raised when the oracle cannot produce a usable assessment.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle returned status {status}")]
    Status { status: u16 },
    #[error("oracle response malformed: {0}")]
    Malformed(String),
}

/// JSON-over-HTTP oracle client. The request deadline comes from `OracleConfig::timeout`.
pub struct HttpScoringOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScoringOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/score", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScoringOracle for HttpScoringOracle {
    async fn score(&self, request: ScoringRequest) -> Result<OracleResponse, OracleError> {
        debug!(
            endpoint = %self.endpoint,
            kind = request.kind.label(),
            organization_id = %request.organization_id,
            "requesting risk assessment"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<OracleResponse>()
            .await
            .map_err(|err| OracleError::Malformed(err.to_string()))
    }
}
