use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{OrganizationId, RiskRecord, ScorableEntity};
use super::oracle::ScoringOracle;
use super::service::{RiskScoringService, RiskServiceError};
use super::store::EntityStore;

/// Header carrying the requesting user, forwarded to the oracle when present.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationScoreQuery {
    #[serde(default)]
    pub previous_score: Option<f64>,
}

/// Router builder exposing the scoring engine over HTTP.
pub fn risk_router<S, O>(service: Arc<RiskScoringService<S, O>>) -> Router
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    Router::new()
        .route(
            "/api/v1/risk/entities/score",
            post(score_entity_handler::<S, O>),
        )
        .route(
            "/api/v1/risk/organizations/:organization_id/score",
            get(organization_score_handler::<S, O>),
        )
        .route("/api/v1/risk/matrix", post(matrix_handler::<S, O>))
        .route(
            "/api/v1/risk/organizations/:organization_id/matrix",
            get(organization_matrix_handler::<S, O>),
        )
        .with_state(service)
}

pub(crate) async fn score_entity_handler<S, O>(
    State(service): State<Arc<RiskScoringService<S, O>>>,
    headers: HeaderMap,
    axum::Json(entity): axum::Json<ScorableEntity>,
) -> Response
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let score = match user_id {
        Some(user_id) => service.score_entity_for_user(&entity, user_id).await,
        None => service.score_entity(&entity).await,
    };

    (StatusCode::OK, axum::Json(score)).into_response()
}

pub(crate) async fn organization_score_handler<S, O>(
    State(service): State<Arc<RiskScoringService<S, O>>>,
    Path(organization_id): Path<String>,
    Query(query): Query<OrganizationScoreQuery>,
) -> Response
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    let organization_id = OrganizationId(organization_id);
    let score = service
        .score_organization(&organization_id, query.previous_score)
        .await;

    (StatusCode::OK, axum::Json(score)).into_response()
}

pub(crate) async fn matrix_handler<S, O>(
    State(service): State<Arc<RiskScoringService<S, O>>>,
    axum::Json(records): axum::Json<Vec<RiskRecord>>,
) -> Response
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    let matrix = service.build_matrix(&records);
    (StatusCode::OK, axum::Json(matrix.view())).into_response()
}

pub(crate) async fn organization_matrix_handler<S, O>(
    State(service): State<Arc<RiskScoringService<S, O>>>,
    Path(organization_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    O: ScoringOracle + 'static,
{
    let organization_id = OrganizationId(organization_id);
    match service.organization_matrix(&organization_id).await {
        Ok(matrix) => (StatusCode::OK, axum::Json(matrix.view())).into_response(),
        Err(RiskServiceError::Store(error)) => {
            warn!(organization_id = %organization_id, error = %error, "risk records unavailable");
            let payload = json!({
                "organization_id": organization_id.0,
                "error": error.to_string(),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}
