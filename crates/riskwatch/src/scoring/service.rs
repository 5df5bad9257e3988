use std::sync::Arc;

use super::aggregator::OrganizationAggregator;
use super::domain::{
    EffectiveRiskScore, OrganizationId, OrganizationRiskScore, RiskRecord, ScorableEntity,
};
use super::matrix::RiskMatrix;
use super::oracle::ScoringOracle;
use super::requester::EntityScoreRequester;
use super::store::{EntityStore, StoreError};
use crate::config::ScoringConfig;

/// Service composing the entity requester, organization aggregator, and matrix builder.
pub struct RiskScoringService<S, O> {
    store: Arc<S>,
    requester: EntityScoreRequester<O>,
    aggregator: OrganizationAggregator<S, O>,
}

impl<S, O> RiskScoringService<S, O>
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>, config: ScoringConfig) -> Self {
        let requester = EntityScoreRequester::new(oracle.clone());
        let aggregator = OrganizationAggregator::new(store.clone(), oracle, config);

        Self {
            store,
            requester,
            aggregator,
        }
    }

    pub async fn score_entity(&self, entity: &ScorableEntity) -> EffectiveRiskScore {
        self.requester.score_entity(entity).await
    }

    pub async fn score_entity_for_user(
        &self,
        entity: &ScorableEntity,
        user_id: &str,
    ) -> EffectiveRiskScore {
        self.requester.score_entity_for_user(entity, user_id).await
    }

    pub async fn score_organization(
        &self,
        organization_id: &OrganizationId,
        previous_score: Option<f64>,
    ) -> OrganizationRiskScore {
        self.aggregator
            .score_organization(organization_id, previous_score)
            .await
    }

    pub fn build_matrix(&self, records: &[RiskRecord]) -> RiskMatrix {
        RiskMatrix::build(records)
    }

    /// Matrix over the organization's stored risk records. Store failures are returned.
    pub async fn organization_matrix(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<RiskMatrix, RiskServiceError> {
        let records = self.store.risk_records(organization_id).await?;
        Ok(RiskMatrix::build(&records))
    }
}

/// Error raised by the risk scoring service.
#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
