use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{EffectiveRiskScore, RiskScore, ScorableEntity, Trend};
use super::mitigation;
use super::oracle::{OracleError, ScoringOracle, ScoringRequest};

pub const FALLBACK_ENTITY_SCORE: u8 = 50;
pub const FALLBACK_ENTITY_CONFIDENCE: f64 = 60.0;

/// Scores single entities through the oracle and applies their mitigations.
pub struct EntityScoreRequester<O> {
    oracle: Arc<O>,
}

impl<O> EntityScoreRequester<O>
where
    O: ScoringOracle + 'static,
{
    pub fn new(oracle: Arc<O>) -> Self {
        Self { oracle }
    }

    pub async fn score_entity(&self, entity: &ScorableEntity) -> EffectiveRiskScore {
        self.score_with(entity, None).await
    }

    pub async fn score_entity_for_user(
        &self,
        entity: &ScorableEntity,
        user_id: &str,
    ) -> EffectiveRiskScore {
        self.score_with(entity, Some(user_id)).await
    }

    async fn score_with(
        &self,
        entity: &ScorableEntity,
        user_id: Option<&str>,
    ) -> EffectiveRiskScore {
        let raw = match self.assess(entity, user_id).await {
            Ok(score) => {
                debug!(
                    kind = entity.kind().label(),
                    organization_id = %entity.organization_id(),
                    overall = score.overall,
                    "entity assessed"
                );
                score
            }
            Err(err) => {
                warn!(
                    kind = entity.kind().label(),
                    organization_id = %entity.organization_id(),
                    error = %err,
                    "entity assessment unavailable, using baseline score"
                );
                let mut effective = mitigation::reduce(fallback_score(), entity.mitigations());
                effective.fallback = true;
                return effective;
            }
        };

        mitigation::reduce(raw, entity.mitigations())
    }

    async fn assess(
        &self,
        entity: &ScorableEntity,
        user_id: Option<&str>,
    ) -> Result<RiskScore, OracleError> {
        let mut request = ScoringRequest::for_entity(entity)
            .map_err(|err| OracleError::Malformed(format!("unable to encode entity: {err}")))?;
        if let Some(user_id) = user_id {
            request = request.with_user(user_id);
        }

        self.oracle.score(request).await?.into_risk_score()
    }
}

/// Baseline used when the oracle cannot be reached.
pub fn fallback_score() -> RiskScore {
    RiskScore {
        overall: FALLBACK_ENTITY_SCORE,
        components: BTreeMap::new(),
        confidence: FALLBACK_ENTITY_CONFIDENCE,
        trend: Trend::Stable,
        predictions: None,
        explanation: "Risk assessment unavailable; showing a baseline score with reduced \
                      confidence."
            .to_string(),
        recommendations: Vec::new(),
    }
}
