use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Barrier;

use super::common::*;
use crate::config::ScoringConfig;
use crate::scoring::aggregator::{
    score_changes, synthesize_baseline, OrganizationAggregator, FALLBACK_ORGANIZATION_SCORE,
};
use crate::scoring::domain::{
    AssessmentKind, Asset, BaselineSource, EntityCategory, Incident, OrganizationId, Personnel,
    RiskRecord, TravelPlan, Trend,
};
use crate::scoring::store::{EntityStore, StoreError};

fn aggregator(
    store: MemoryStore,
    oracle: ScriptedOracle,
    config: ScoringConfig,
) -> (
    OrganizationAggregator<MemoryStore, ScriptedOracle>,
    Arc<MemoryStore>,
    Arc<ScriptedOracle>,
) {
    let store = Arc::new(store);
    let oracle = Arc::new(oracle);
    (
        OrganizationAggregator::new(store.clone(), oracle.clone(), config),
        store,
        oracle,
    )
}

#[tokio::test]
async fn organization_score_surfaces_oracle_assessment() {
    let (aggregator, store, oracle) = aggregator(
        MemoryStore::populated(),
        ScriptedOracle::responding(oracle_response(58.0)),
        no_synthesis(),
    );

    let score = aggregator.score_organization(&org(), Some(50.0)).await;

    assert_eq!(store.reads(), 5);
    assert_eq!(score.score, 58);
    assert_eq!(score.previous_score, Some(50.0));
    assert_eq!(score.previous_score_source, BaselineSource::Supplied);
    assert_eq!(score.weekly_change, 8.0);
    assert!((score.percentage_change - 16.0).abs() < 1e-9);
    assert_eq!(score.trend, Trend::Deteriorating);
    assert_eq!(score.components["ai_assessment"], 70.0);
    assert_eq!(score.recommendations, vec!["Audit visitor access".to_string()]);
    assert!(score.degraded_categories.is_empty());
    assert!(!score.fallback);

    let requests = oracle.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, AssessmentKind::Organization);
    assert_eq!(requests[0].organization_id, org());
}

#[tokio::test]
async fn bundle_contains_every_category() {
    let (aggregator, _, oracle) = aggregator(
        MemoryStore::populated(),
        ScriptedOracle::responding(oracle_response(58.0)),
        no_synthesis(),
    );

    aggregator.score_organization(&org(), Some(60.0)).await;

    let data = &oracle.requests()[0].data;
    assert_eq!(data["assets"][0]["id"], "asset-hq");
    assert_eq!(data["personnel"][0]["id"], "person-1");
    assert_eq!(data["incidents"][0]["id"], "inc-3");
    assert_eq!(data["risks"].as_array().map(Vec::len), Some(2));
    assert_eq!(data["travelPlans"][0]["destination"], "Lagos");
}

#[tokio::test]
async fn failed_category_reads_become_empty_collections() {
    let store = MemoryStore::populated()
        .failing(&[EntityCategory::Incidents, EntityCategory::TravelPlans]);
    let (aggregator, _, oracle) = aggregator(
        store,
        ScriptedOracle::responding(oracle_response(33.0)),
        no_synthesis(),
    );

    let collected = aggregator.collect(&org()).await;
    assert_eq!(
        collected.degraded,
        vec![EntityCategory::Incidents, EntityCategory::TravelPlans]
    );
    assert!(collected.bundle.incidents.is_empty());
    assert!(collected.bundle.travel_plans.is_empty());
    assert_eq!(collected.bundle.assets.len(), 1);

    let score = aggregator.score_organization(&org(), Some(30.0)).await;
    assert!(!score.fallback);
    assert_eq!(score.score, 33);
    assert_eq!(score.degraded_categories.len(), 2);
    assert_eq!(oracle.requests().len(), 1);
}

#[tokio::test]
async fn all_reads_failing_returns_static_fallback_without_calling_oracle() {
    let store = MemoryStore::populated().failing(&EntityCategory::ALL);
    let (aggregator, store, oracle) = aggregator(
        store,
        ScriptedOracle::responding(oracle_response(90.0)),
        ScoringConfig::default(),
    );

    let score = aggregator.score_organization(&org(), None).await;

    assert_eq!(store.reads(), 5);
    assert!(oracle.requests().is_empty());
    assert!(score.fallback);
    assert_eq!(score.score, FALLBACK_ORGANIZATION_SCORE);
    assert_eq!(score.degraded_categories, EntityCategory::ALL.to_vec());
}

#[tokio::test]
async fn oracle_failure_returns_static_fallback() {
    let (aggregator, _, _) = aggregator(
        MemoryStore::populated(),
        ScriptedOracle::failing(502),
        ScoringConfig::default(),
    );

    let score = aggregator.score_organization(&org(), Some(70.0)).await;

    assert!(score.fallback);
    assert_eq!(score.score, 42);
    assert_eq!(score.previous_score, Some(45.0));
    assert_eq!(score.previous_score_source, BaselineSource::Fallback);
    assert_eq!(score.weekly_change, -3.0);
    assert!((score.percentage_change + 6.666_666).abs() < 0.001);
    assert_eq!(score.trend, Trend::Improving);
    assert_eq!(score.components.len(), 5);
    assert!(!score.recommendations.is_empty());
    assert_eq!(score.organization_id, org());
}

#[tokio::test]
async fn missing_baseline_is_synthesized_and_labelled() {
    let (aggregator, _, _) = aggregator(
        MemoryStore::populated(),
        ScriptedOracle::responding(oracle_response(58.0)),
        ScoringConfig::default(),
    );

    let score = aggregator.score_organization(&org(), None).await;

    assert_eq!(score.previous_score_source, BaselineSource::Synthesized);
    let previous = score.previous_score.expect("baseline synthesized");
    assert!((48.0..=53.0).contains(&previous), "got {previous}");
    assert!(score.weekly_change >= 5.0 && score.weekly_change <= 10.0);
}

#[tokio::test]
async fn missing_baseline_without_synthesis_reports_no_change() {
    let (aggregator, _, _) = aggregator(
        MemoryStore::populated(),
        ScriptedOracle::responding(oracle_response(58.0)),
        no_synthesis(),
    );

    let score = aggregator.score_organization(&org(), None).await;

    assert_eq!(score.previous_score, None);
    assert_eq!(score.previous_score_source, BaselineSource::Unavailable);
    assert_eq!(score.weekly_change, 0.0);
    assert_eq!(score.percentage_change, 0.0);
}

#[test]
fn synthesized_baseline_respects_the_floor() {
    let mut rng = StdRng::seed_from_u64(7);
    for score in [0_u8, 12, 15, 20, 64, 100] {
        for _ in 0..32 {
            let baseline = synthesize_baseline(score, &mut rng);
            assert!(baseline >= 10.0);
            if score >= 20 {
                let offset = f64::from(score) - baseline;
                assert!((5.0..10.0).contains(&offset), "offset {offset}");
            }
        }
    }
}

#[test]
fn percentage_change_is_zero_for_non_positive_baselines() {
    assert_eq!(score_changes(30, Some(0.0)), (30.0, 0.0));
    assert_eq!(score_changes(30, Some(40.0)), (-10.0, -25.0));
    assert_eq!(score_changes(30, None), (0.0, 0.0));
}

/// Store whose reads only complete once all five are in flight together.
struct RendezvousStore {
    barrier: Barrier,
}

impl RendezvousStore {
    async fn arrive(&self) {
        self.barrier.wait().await;
    }
}

#[async_trait]
impl EntityStore for RendezvousStore {
    async fn assets(&self, _org: &OrganizationId) -> Result<Vec<Asset>, StoreError> {
        self.arrive().await;
        Ok(Vec::new())
    }

    async fn personnel(&self, _org: &OrganizationId) -> Result<Vec<Personnel>, StoreError> {
        self.arrive().await;
        Ok(Vec::new())
    }

    async fn incidents(&self, _org: &OrganizationId) -> Result<Vec<Incident>, StoreError> {
        self.arrive().await;
        Ok(Vec::new())
    }

    async fn risk_records(&self, _org: &OrganizationId) -> Result<Vec<RiskRecord>, StoreError> {
        self.arrive().await;
        Ok(Vec::new())
    }

    async fn travel_plans(&self, _org: &OrganizationId) -> Result<Vec<TravelPlan>, StoreError> {
        self.arrive().await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn category_reads_run_concurrently() {
    let store = Arc::new(RendezvousStore {
        barrier: Barrier::new(EntityCategory::ALL.len()),
    });
    let oracle = Arc::new(ScriptedOracle::responding(oracle_response(25.0)));
    let aggregator = OrganizationAggregator::new(store, oracle, no_synthesis());

    let score = tokio::time::timeout(
        Duration::from_secs(5),
        aggregator.score_organization(&org(), Some(25.0)),
    )
    .await
    .expect("reads would deadlock if issued sequentially");

    assert_eq!(score.score, 25);
    assert_eq!(score.weekly_change, 0.0);
}
