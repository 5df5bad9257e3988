use crate::infra::{demo_records, parse_organization, InMemoryEntityStore, DEMO_ORGANIZATION};
use clap::Args;
use riskwatch::config::AppConfig;
use riskwatch::error::AppError;
use riskwatch::scoring::{
    EffectiveRiskScore, HttpScoringOracle, OrganizationId, OrganizationRiskScore, RiskLevel,
    RiskMatrix, RiskRecord, RiskScoringService, ScorableEntity,
};
use riskwatch::telemetry;
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct MatrixArgs {
    /// Risk record export (.json array, otherwise CSV with impact/likelihood columns)
    #[arg(long)]
    pub(crate) input: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Organization to score. Defaults to the seeded demo organization.
    #[arg(long, value_parser = parse_organization)]
    pub(crate) organization: Option<OrganizationId>,
    /// Previous organization score used for trend deltas
    #[arg(long)]
    pub(crate) previous_score: Option<f64>,
    /// Override the configured scoring oracle base URL
    #[arg(long)]
    pub(crate) oracle_url: Option<String>,
}

pub(crate) fn run_matrix_report(args: MatrixArgs) -> Result<(), AppError> {
    let records = load_risk_records(&args.input)?;
    let matrix = RiskMatrix::build(&records);
    print!("{}", render_matrix(&matrix));
    Ok(())
}

pub(crate) async fn run_organization_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        organization,
        previous_score,
        oracle_url,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(oracle_url) = oracle_url {
        config.oracle.base_url = oracle_url;
    }
    telemetry::init(&config.telemetry)?;

    let organization_id =
        organization.unwrap_or_else(|| OrganizationId::new(DEMO_ORGANIZATION));
    let store = Arc::new(InMemoryEntityStore::seeded());
    let oracle = Arc::new(HttpScoringOracle::new(&config.oracle)?);
    let service = RiskScoringService::new(store, oracle, config.scoring);

    println!("Organization risk posture ({organization_id})");
    let posture = service
        .score_organization(&organization_id, previous_score)
        .await;
    print!("{}", render_organization(&posture));

    println!("\nEntity scores");
    for entity in demo_entities(&organization_id) {
        let score = service.score_entity(&entity).await;
        println!("{}", render_entity(&entity, &score));
    }

    println!("\nRisk matrix");
    match service.organization_matrix(&organization_id).await {
        Ok(matrix) => print!("{}", render_matrix(&matrix)),
        Err(err) => println!("  Risk records unavailable: {err}"),
    }

    Ok(())
}

fn demo_entities(organization_id: &OrganizationId) -> Vec<ScorableEntity> {
    let records = demo_records(organization_id);
    let mut entities = Vec::new();
    entities.extend(records.assets.into_iter().map(ScorableEntity::Asset));
    entities.extend(records.personnel.into_iter().map(ScorableEntity::Personnel));
    entities.extend(records.travel_plans.into_iter().map(ScorableEntity::TravelPlan));
    entities.extend(records.incidents.into_iter().map(ScorableEntity::Incident));
    entities
}

pub(crate) fn load_risk_records(path: &Path) -> Result<Vec<RiskRecord>, AppError> {
    let file = std::fs::File::open(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_reader(file)
            .map_err(|err| AppError::Input(format!("{}: {err}", path.display())))
    } else {
        parse_risk_records_csv(file)
            .map_err(|err| AppError::Input(format!("{}: {err}", path.display())))
    }
}

pub(crate) fn parse_risk_records_csv<R: Read>(reader: R) -> Result<Vec<RiskRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader.deserialize().collect()
}

pub(crate) fn render_matrix(matrix: &RiskMatrix) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  impact \\ likelihood   VL   L    M    H    VH");
    for impact in RiskLevel::ALL.iter().rev() {
        let _ = write!(out, "  {:<21}", impact.label());
        for likelihood in RiskLevel::ALL {
            let count = matrix.count(*impact, likelihood);
            let severity = riskwatch::scoring::cell_severity(*impact, likelihood);
            let marker = severity.label().chars().next().unwrap_or(' ').to_ascii_uppercase();
            let _ = write!(out, " {count:>2}{marker}  ");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "  {} record(s), {} with defaulted ratings",
        matrix.total(),
        matrix.defaulted()
    );
    out
}

fn render_organization(score: &OrganizationRiskScore) -> String {
    let mut out = String::new();
    let label = if score.fallback { " (reference posture)" } else { "" };
    let _ = writeln!(
        out,
        "- Score {} / 100{} | trend {} | confidence {:.0}%",
        score.score,
        label,
        score.trend.label(),
        score.confidence
    );
    match score.previous_score {
        Some(previous) => {
            let _ = writeln!(
                out,
                "- Change {:+.1} ({:+.1}%) vs previous {:.1} [{:?}]",
                score.weekly_change, score.percentage_change, previous, score.previous_score_source
            );
        }
        None => {
            let _ = writeln!(out, "- No previous score available");
        }
    }
    if !score.degraded_categories.is_empty() {
        let categories: Vec<&str> = score
            .degraded_categories
            .iter()
            .map(|category| category.label())
            .collect();
        let _ = writeln!(out, "- Missing data: {}", categories.join(", "));
    }
    for (component, value) in &score.components {
        let _ = writeln!(out, "  - {component}: {value:.1}");
    }
    let _ = writeln!(out, "- {}", score.explanation);
    for recommendation in &score.recommendations {
        let _ = writeln!(out, "  * {recommendation}");
    }
    out
}

fn render_entity(entity: &ScorableEntity, score: &EffectiveRiskScore) -> String {
    let mut line = format!(
        "- [{}] {:.1} (raw {}",
        entity.kind().label(),
        score.overall,
        score.original_score
    );
    if score.mitigation_applied {
        let _ = write!(line, ", -{:.1} from mitigations", score.total_risk_reduction);
    }
    line.push(')');
    if score.fallback {
        line.push_str(" baseline");
    }
    line
}
