use async_trait::async_trait;

use super::domain::{Asset, Incident, OrganizationId, Personnel, RiskRecord, TravelPlan};

/// Read contract the engine needs from persistence. Each category is fetched independently.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn assets(&self, organization_id: &OrganizationId) -> Result<Vec<Asset>, StoreError>;

    async fn personnel(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Personnel>, StoreError>;

    async fn incidents(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Incident>, StoreError>;

    async fn risk_records(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RiskRecord>, StoreError>;

    async fn travel_plans(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<TravelPlan>, StoreError>;
}

/// Error enumeration for store reads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entity store unavailable: {0}")]
    Unavailable(String),
    #[error("entity store query failed: {0}")]
    Query(String),
}
