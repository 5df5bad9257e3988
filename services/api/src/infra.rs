use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use riskwatch::scoring::{
    AppliedMitigation, Asset, EntityStore, Incident, OrganizationId, Personnel, RiskLevel,
    RiskRecord, StoreError, TravelPlan,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

pub(crate) const DEMO_ORGANIZATION: &str = "org-demo";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct OrganizationRecords {
    pub(crate) assets: Vec<Asset>,
    pub(crate) personnel: Vec<Personnel>,
    pub(crate) incidents: Vec<Incident>,
    pub(crate) risks: Vec<RiskRecord>,
    pub(crate) travel_plans: Vec<TravelPlan>,
}

/// Entity store backed by a process-local map, keyed by organization.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEntityStore {
    organizations: Arc<Mutex<HashMap<OrganizationId, OrganizationRecords>>>,
}

impl InMemoryEntityStore {
    pub(crate) fn seeded() -> Self {
        let store = Self::default();
        store.replace(
            OrganizationId::new(DEMO_ORGANIZATION),
            demo_records(&OrganizationId::new(DEMO_ORGANIZATION)),
        );
        store
    }

    pub(crate) fn replace(&self, organization_id: OrganizationId, records: OrganizationRecords) {
        let mut guard = self
            .organizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(organization_id, records);
    }

    fn read<T, F>(&self, organization_id: &OrganizationId, select: F) -> Vec<T>
    where
        F: FnOnce(&OrganizationRecords) -> Vec<T>,
    {
        let guard = self
            .organizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(organization_id).map(select).unwrap_or_default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn assets(&self, organization_id: &OrganizationId) -> Result<Vec<Asset>, StoreError> {
        Ok(self.read(organization_id, |records| records.assets.clone()))
    }

    async fn personnel(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Personnel>, StoreError> {
        Ok(self.read(organization_id, |records| records.personnel.clone()))
    }

    async fn incidents(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Incident>, StoreError> {
        Ok(self.read(organization_id, |records| records.incidents.clone()))
    }

    async fn risk_records(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RiskRecord>, StoreError> {
        Ok(self.read(organization_id, |records| records.risks.clone()))
    }

    async fn travel_plans(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<TravelPlan>, StoreError> {
        Ok(self.read(organization_id, |records| records.travel_plans.clone()))
    }
}

pub(crate) fn demo_records(organization_id: &OrganizationId) -> OrganizationRecords {
    let mut datacenter_attributes = BTreeMap::new();
    datacenter_attributes.insert("tier".to_string(), json!(3));
    datacenter_attributes.insert("shared_building".to_string(), json!(true));

    let assets = vec![
        Asset {
            id: "asset-hq".to_string(),
            organization_id: organization_id.clone(),
            name: "Headquarters".to_string(),
            asset_type: "office".to_string(),
            location: "Amsterdam".to_string(),
            criticality: Some("high".to_string()),
            attributes: BTreeMap::new(),
            mitigations: vec![
                AppliedMitigation::new("Badge access control", 12.0),
                AppliedMitigation::new("24/7 reception", 6.0),
            ],
        },
        Asset {
            id: "asset-dc".to_string(),
            organization_id: organization_id.clone(),
            name: "Primary datacenter".to_string(),
            asset_type: "datacenter".to_string(),
            location: "Frankfurt".to_string(),
            criticality: Some("critical".to_string()),
            attributes: datacenter_attributes,
            mitigations: vec![AppliedMitigation::new("Mantrap entry", 15.0)],
        },
    ];

    let personnel = vec![Personnel {
        id: "person-ceo".to_string(),
        organization_id: organization_id.clone(),
        name: "Executive officer".to_string(),
        role: "Chief Executive".to_string(),
        department: "Leadership".to_string(),
        clearance_level: Some("executive".to_string()),
        attributes: BTreeMap::new(),
        mitigations: vec![AppliedMitigation::new("Executive protection detail", 20.0)],
    }];

    let incidents = vec![Incident {
        id: "inc-1042".to_string(),
        organization_id: organization_id.clone(),
        title: "Phishing campaign targeting finance".to_string(),
        severity: "medium".to_string(),
        status: "contained".to_string(),
        occurred_at: Utc
            .with_ymd_and_hms(2026, 9, 30, 14, 5, 0)
            .single()
            .unwrap_or_else(Utc::now),
        attributes: BTreeMap::new(),
        mitigations: Vec::new(),
    }];

    let travel_plans = vec![TravelPlan {
        id: "trip-88".to_string(),
        organization_id: organization_id.clone(),
        traveler_id: "person-ceo".to_string(),
        destination: "Nairobi".to_string(),
        departure_date: NaiveDate::from_ymd_opt(2026, 11, 12).unwrap_or(NaiveDate::MIN),
        return_date: NaiveDate::from_ymd_opt(2026, 11, 16),
        purpose: "Regional partner summit".to_string(),
        attributes: BTreeMap::new(),
        mitigations: vec![AppliedMitigation::new("Secure ground transport", 10.0)],
    }];

    let mut risks = vec![
        RiskRecord::new(RiskLevel::VeryHigh, RiskLevel::Medium),
        RiskRecord::new(RiskLevel::High, RiskLevel::High),
        RiskRecord::new(RiskLevel::Medium, RiskLevel::Low),
        RiskRecord::new(RiskLevel::Low, RiskLevel::VeryLow),
    ];
    let titles = [
        "Datacenter power loss",
        "Executive kidnapping while travelling",
        "Office break-in",
        "Lost visitor badge",
    ];
    for (index, (record, title)) in risks.iter_mut().zip(titles).enumerate() {
        record.id = Some(format!("risk-{}", index + 1));
        record.organization_id = Some(organization_id.clone());
        record.title = Some(title.to_string());
    }

    OrganizationRecords {
        assets,
        personnel,
        incidents,
        risks,
        travel_plans,
    }
}

pub(crate) fn parse_organization(raw: &str) -> Result<OrganizationId, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("organization id must not be empty".to_string());
    }
    Ok(OrganizationId::new(trimmed))
}
