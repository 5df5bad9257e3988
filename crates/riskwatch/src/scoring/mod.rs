//! Risk scoring and mitigation aggregation.
//!
//! Entities are scored one at a time through the [`ScoringOracle`] and reduced by their applied
//! mitigations; organizations are scored by reading every entity category concurrently and
//! submitting the combined bundle. Oracle and store failures degrade to labelled fallback scores
//! instead of errors, so a caller always has something to render.

pub mod aggregator;
pub mod domain;
pub mod matrix;
pub mod mitigation;
pub mod oracle;
pub mod requester;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use aggregator::{
    fallback_organization_score, CollectedBundle, OrganizationAggregator, OrganizationBundle,
};
pub use domain::{
    AppliedMitigation, AssessmentKind, Asset, BaselineSource, EffectiveRiskScore, EntityCategory,
    Incident, OrganizationId, OrganizationRiskScore, Personnel, Predictions, RiskLevel,
    RiskRecord, RiskScore, ScorableEntity, TravelPlan, Trend,
};
pub use matrix::{build_matrix, cell_severity, RiskMatrix, RiskMatrixView, Severity};
pub use mitigation::reduce;
pub use oracle::{HttpScoringOracle, OracleError, OracleResponse, ScoringOracle, ScoringRequest};
pub use requester::{fallback_score, EntityScoreRequester};
pub use router::risk_router;
pub use service::{RiskScoringService, RiskServiceError};
pub use store::{EntityStore, StoreError};
