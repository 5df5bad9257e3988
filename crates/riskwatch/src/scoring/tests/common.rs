use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::ScoringConfig;
use crate::scoring::domain::{
    AppliedMitigation, Asset, EntityCategory, Incident, OrganizationId, Personnel, RiskLevel,
    RiskRecord, RiskScore, ScorableEntity, TravelPlan, Trend,
};
use crate::scoring::oracle::{
    OracleError, OracleResponse, PredictionsPayload, ScoringOracle, ScoringRequest,
};
use crate::scoring::store::{EntityStore, StoreError};
use crate::scoring::RiskScoringService;

pub(super) fn org() -> OrganizationId {
    OrganizationId::new("org-acme")
}

pub(super) fn raw_score(overall: u8) -> RiskScore {
    let mut components = BTreeMap::new();
    components.insert("physical_security".to_string(), 62.0);
    components.insert("location_risk".to_string(), 48.0);

    RiskScore {
        overall,
        components,
        confidence: 85.0,
        trend: Trend::Deteriorating,
        predictions: None,
        explanation: "Perimeter controls are dated".to_string(),
        recommendations: vec!["Replace badge readers".to_string()],
    }
}

pub(super) fn mitigations(reductions: &[f64]) -> Vec<AppliedMitigation> {
    reductions
        .iter()
        .enumerate()
        .map(|(index, reduction)| AppliedMitigation::new(format!("control-{index}"), *reduction))
        .collect()
}

pub(super) fn oracle_response(score: f64) -> OracleResponse {
    let mut components = BTreeMap::new();
    components.insert("ai_assessment".to_string(), 70.0);
    components.insert("personnel_risk".to_string(), 55.0);

    OracleResponse {
        score,
        components: Some(components),
        confidence: 82.0,
        explanation: "Elevated exposure in regional offices".to_string(),
        recommendations: Some(vec!["Audit visitor access".to_string()]),
        trend: Some(Trend::Deteriorating),
        predictions: Some(PredictionsPayload {
            next_week: Some(score + 2.0),
            next_month: None,
        }),
    }
}

pub(super) fn asset(reductions: &[f64]) -> Asset {
    let mut attributes = BTreeMap::new();
    attributes.insert("floor_count".to_string(), json!(12));
    attributes.insert("name".to_string(), json!("shadowed by typed field"));

    Asset {
        id: "asset-hq".to_string(),
        organization_id: org(),
        name: "Headquarters".to_string(),
        asset_type: "office".to_string(),
        location: "Rotterdam".to_string(),
        criticality: Some("high".to_string()),
        attributes,
        mitigations: mitigations(reductions),
    }
}

pub(super) fn personnel() -> Personnel {
    Personnel {
        id: "person-1".to_string(),
        organization_id: org(),
        name: "Dana Reyes".to_string(),
        role: "Regional Director".to_string(),
        department: "Operations".to_string(),
        clearance_level: Some("secret".to_string()),
        attributes: BTreeMap::new(),
        mitigations: Vec::new(),
    }
}

pub(super) fn travel_plan() -> TravelPlan {
    TravelPlan {
        id: "trip-7".to_string(),
        organization_id: org(),
        traveler_id: "person-1".to_string(),
        destination: "Lagos".to_string(),
        departure_date: NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"),
        return_date: Some(NaiveDate::from_ymd_opt(2026, 11, 9).expect("valid date")),
        purpose: "Supplier audit".to_string(),
        attributes: BTreeMap::new(),
        mitigations: mitigations(&[5.0]),
    }
}

pub(super) fn incident() -> Incident {
    Incident {
        id: "inc-3".to_string(),
        organization_id: org(),
        title: "Tailgating at loading dock".to_string(),
        severity: "medium".to_string(),
        status: "open".to_string(),
        occurred_at: Utc
            .with_ymd_and_hms(2026, 9, 14, 8, 30, 0)
            .single()
            .expect("valid timestamp"),
        attributes: BTreeMap::new(),
        mitigations: Vec::new(),
    }
}

pub(super) fn risk_records() -> Vec<RiskRecord> {
    vec![
        RiskRecord::new(RiskLevel::VeryHigh, RiskLevel::High),
        RiskRecord::new(RiskLevel::Low, RiskLevel::Medium),
    ]
}

pub(super) fn asset_entity(reductions: &[f64]) -> ScorableEntity {
    ScorableEntity::Asset(asset(reductions))
}

/// Oracle double that replays one outcome and records every request.
pub(super) struct ScriptedOracle {
    outcome: Result<OracleResponse, u16>,
    requests: Mutex<Vec<ScoringRequest>>,
}

impl ScriptedOracle {
    pub(super) fn responding(response: OracleResponse) -> Self {
        Self {
            outcome: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(status: u16) -> Self {
        Self {
            outcome: Err(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requests(&self) -> Vec<ScoringRequest> {
        self.requests.lock().expect("oracle mutex poisoned").clone()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn score(&self, request: ScoringRequest) -> Result<OracleResponse, OracleError> {
        self.requests
            .lock()
            .expect("oracle mutex poisoned")
            .push(request);
        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(status) => Err(OracleError::Status { status: *status }),
        }
    }
}

/// In-memory store with per-category failure injection.
#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) assets: Vec<Asset>,
    pub(super) personnel: Vec<Personnel>,
    pub(super) incidents: Vec<Incident>,
    pub(super) risks: Vec<RiskRecord>,
    pub(super) travel_plans: Vec<TravelPlan>,
    pub(super) failing: Vec<EntityCategory>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn populated() -> Self {
        Self {
            assets: vec![asset(&[10.0])],
            personnel: vec![personnel()],
            incidents: vec![incident()],
            risks: risk_records(),
            travel_plans: vec![travel_plan()],
            ..Self::default()
        }
    }

    pub(super) fn failing(mut self, categories: &[EntityCategory]) -> Self {
        self.failing = categories.to_vec();
        self
    }

    pub(super) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read<T: Clone>(
        &self,
        category: EntityCategory,
        organization_id: &OrganizationId,
        records: &[T],
    ) -> Result<Vec<T>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&category) {
            return Err(StoreError::Unavailable(format!(
                "{} offline",
                category.label()
            )));
        }
        if organization_id != &org() {
            return Ok(Vec::new());
        }
        Ok(records.to_vec())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn assets(&self, organization_id: &OrganizationId) -> Result<Vec<Asset>, StoreError> {
        self.read(EntityCategory::Assets, organization_id, &self.assets)
    }

    async fn personnel(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Personnel>, StoreError> {
        self.read(EntityCategory::Personnel, organization_id, &self.personnel)
    }

    async fn incidents(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Incident>, StoreError> {
        self.read(EntityCategory::Incidents, organization_id, &self.incidents)
    }

    async fn risk_records(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RiskRecord>, StoreError> {
        self.read(EntityCategory::Risks, organization_id, &self.risks)
    }

    async fn travel_plans(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<TravelPlan>, StoreError> {
        self.read(EntityCategory::TravelPlans, organization_id, &self.travel_plans)
    }
}

pub(super) fn no_synthesis() -> ScoringConfig {
    ScoringConfig {
        synthesize_missing_baseline: false,
    }
}

pub(super) fn build_service(
    store: MemoryStore,
    oracle: ScriptedOracle,
) -> (
    RiskScoringService<MemoryStore, ScriptedOracle>,
    Arc<MemoryStore>,
    Arc<ScriptedOracle>,
) {
    let store = Arc::new(store);
    let oracle = Arc::new(oracle);
    let service = RiskScoringService::new(store.clone(), oracle.clone(), ScoringConfig::default());
    (service, store, oracle)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("valid json")
}
