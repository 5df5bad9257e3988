use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    AssessmentKind, Asset, BaselineSource, EntityCategory, Incident, OrganizationId,
    OrganizationRiskScore, Personnel, RiskRecord, RiskScore, TravelPlan, Trend,
};
use super::oracle::{OracleError, OracleResponse, ScoringOracle, ScoringRequest};
use super::store::{EntityStore, StoreError};
use crate::config::ScoringConfig;

pub const FALLBACK_ORGANIZATION_SCORE: u8 = 42;
pub const FALLBACK_PREVIOUS_SCORE: f64 = 45.0;
pub const FALLBACK_ORGANIZATION_CONFIDENCE: f64 = 60.0;

/// Floor applied to synthesized baselines so trend deltas stay readable for low scores.
pub const SYNTHESIZED_BASELINE_FLOOR: f64 = 10.0;

/// Everything the oracle sees when scoring an organization as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationBundle {
    pub assets: Vec<Asset>,
    pub personnel: Vec<Personnel>,
    pub incidents: Vec<Incident>,
    pub risks: Vec<RiskRecord>,
    pub travel_plans: Vec<TravelPlan>,
}

/// Bundle together with the categories whose read failed and were left empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedBundle {
    pub bundle: OrganizationBundle,
    pub degraded: Vec<EntityCategory>,
}

impl CollectedBundle {
    pub fn all_failed(&self) -> bool {
        self.degraded.len() == EntityCategory::ALL.len()
    }
}

/// Rolls every entity category of an organization into one composite score.
pub struct OrganizationAggregator<S, O> {
    store: Arc<S>,
    oracle: Arc<O>,
    config: ScoringConfig,
}

impl<S, O> OrganizationAggregator<S, O>
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>, config: ScoringConfig) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Read all five categories concurrently and wait for every read to settle.
    pub async fn collect(&self, organization_id: &OrganizationId) -> CollectedBundle {
        let (assets, personnel, incidents, risks, travel_plans) = tokio::join!(
            self.store.assets(organization_id),
            self.store.personnel(organization_id),
            self.store.incidents(organization_id),
            self.store.risk_records(organization_id),
            self.store.travel_plans(organization_id),
        );

        let mut degraded = Vec::new();
        let bundle = OrganizationBundle {
            assets: settle(EntityCategory::Assets, assets, organization_id, &mut degraded),
            personnel: settle(
                EntityCategory::Personnel,
                personnel,
                organization_id,
                &mut degraded,
            ),
            incidents: settle(
                EntityCategory::Incidents,
                incidents,
                organization_id,
                &mut degraded,
            ),
            risks: settle(EntityCategory::Risks, risks, organization_id, &mut degraded),
            travel_plans: settle(
                EntityCategory::TravelPlans,
                travel_plans,
                organization_id,
                &mut degraded,
            ),
        };

        CollectedBundle { bundle, degraded }
    }

    pub async fn score_organization(
        &self,
        organization_id: &OrganizationId,
        previous_score: Option<f64>,
    ) -> OrganizationRiskScore {
        let collected = self.collect(organization_id).await;
        if collected.all_failed() {
            warn!(
                organization_id = %organization_id,
                "every category read failed, returning static organization score"
            );
            return fallback_organization_score(organization_id.clone(), collected.degraded);
        }

        let score = match self.assess(organization_id, &collected.bundle).await {
            Ok(score) => score,
            Err(err) => {
                warn!(
                    organization_id = %organization_id,
                    error = %err,
                    "organization assessment unavailable, returning static organization score"
                );
                return fallback_organization_score(organization_id.clone(), collected.degraded);
            }
        };

        let (previous_score, previous_score_source) =
            self.resolve_baseline(score.overall, previous_score);
        let (weekly_change, percentage_change) = score_changes(score.overall, previous_score);

        info!(
            organization_id = %organization_id,
            score = score.overall,
            weekly_change,
            degraded = collected.degraded.len(),
            "organization assessed"
        );

        OrganizationRiskScore {
            organization_id: organization_id.clone(),
            score: score.overall,
            previous_score,
            previous_score_source,
            weekly_change,
            percentage_change,
            components: score.components,
            confidence: score.confidence,
            trend: score.trend,
            predictions: score.predictions,
            explanation: score.explanation,
            recommendations: score.recommendations,
            degraded_categories: collected.degraded,
            fallback: false,
            assessed_at: Utc::now(),
        }
    }

    async fn assess(
        &self,
        organization_id: &OrganizationId,
        bundle: &OrganizationBundle,
    ) -> Result<RiskScore, OracleError> {
        let data = serde_json::to_value(bundle)
            .map_err(|err| OracleError::Malformed(format!("unable to encode bundle: {err}")))?;
        let request = ScoringRequest::new(
            AssessmentKind::Organization,
            data,
            organization_id.clone(),
        );

        self.oracle
            .score(request)
            .await
            .and_then(OracleResponse::into_risk_score)
    }

    fn resolve_baseline(
        &self,
        score: u8,
        supplied: Option<f64>,
    ) -> (Option<f64>, BaselineSource) {
        match supplied {
            Some(previous) if previous.is_finite() => (Some(previous), BaselineSource::Supplied),
            _ if self.config.synthesize_missing_baseline => (
                Some(synthesize_baseline(score, &mut rand::thread_rng())),
                BaselineSource::Synthesized,
            ),
            _ => (None, BaselineSource::Unavailable),
        }
    }
}

fn settle<T>(
    category: EntityCategory,
    result: Result<Vec<T>, StoreError>,
    organization_id: &OrganizationId,
    degraded: &mut Vec<EntityCategory>,
) -> Vec<T> {
    match result {
        Ok(records) => records,
        Err(err) => {
            warn!(
                organization_id = %organization_id,
                category = category.label(),
                error = %err,
                "category read failed, scoring without it"
            );
            degraded.push(category);
            Vec::new()
        }
    }
}

/// Display-only stand-in for a missing previous score: `max(10, score - [5, 10))`.
pub fn synthesize_baseline<R>(score: u8, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let offset: u8 = rng.gen_range(5..10);
    (f64::from(score) - f64::from(offset)).max(SYNTHESIZED_BASELINE_FLOOR)
}

/// Absolute and relative change against the previous score. No baseline means no change.
pub fn score_changes(score: u8, previous_score: Option<f64>) -> (f64, f64) {
    let Some(previous) = previous_score else {
        return (0.0, 0.0);
    };

    let weekly_change = f64::from(score) - previous;
    let percentage_change = if previous > 0.0 {
        weekly_change / previous * 100.0
    } else {
        0.0
    };
    (weekly_change, percentage_change)
}

/// Renderable result used when the organization cannot be assessed.
pub fn fallback_organization_score(
    organization_id: OrganizationId,
    degraded_categories: Vec<EntityCategory>,
) -> OrganizationRiskScore {
    let score = FALLBACK_ORGANIZATION_SCORE;
    let (weekly_change, percentage_change) = score_changes(score, Some(FALLBACK_PREVIOUS_SCORE));

    let components: BTreeMap<String, f64> = [
        ("ai_assessment", 40.0),
        ("personnel_risk", 45.0),
        ("incident_history", 38.0),
        ("external_events", 50.0),
        ("asset_vulnerabilities", 35.0),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect();

    OrganizationRiskScore {
        organization_id,
        score,
        previous_score: Some(FALLBACK_PREVIOUS_SCORE),
        previous_score_source: BaselineSource::Fallback,
        weekly_change,
        percentage_change,
        components,
        confidence: FALLBACK_ORGANIZATION_CONFIDENCE,
        trend: Trend::Improving,
        predictions: None,
        explanation: "Live organization assessment unavailable; showing a reference risk \
                      posture with reduced confidence."
            .to_string(),
        recommendations: vec![
            "Review access controls for critical assets".to_string(),
            "Confirm travel security briefings for upcoming trips".to_string(),
            "Close out open incidents and record lessons learned".to_string(),
        ],
        degraded_categories,
        fallback: true,
        assessed_at: Utc::now(),
    }
}
