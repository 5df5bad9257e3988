use super::domain::{AppliedMitigation, EffectiveRiskScore, RiskScore};

/// Sum of the reductions that count. Negative or non-finite values contribute nothing.
pub fn total_reduction(mitigations: &[AppliedMitigation]) -> f64 {
    mitigations
        .iter()
        .map(|mitigation| mitigation.applied_risk_reduction_score)
        .filter(|reduction| reduction.is_finite() && *reduction > 0.0)
        .sum()
}

/// Apply mitigations to a raw score. The effective score floors at zero.
pub fn reduce(raw: RiskScore, mitigations: &[AppliedMitigation]) -> EffectiveRiskScore {
    let total_risk_reduction = total_reduction(mitigations);
    let original_score = raw.overall;
    let overall = (f64::from(original_score) - total_risk_reduction).max(0.0);

    EffectiveRiskScore {
        overall,
        original_score,
        total_risk_reduction,
        mitigation_applied: total_risk_reduction > 0.0,
        components: raw.components,
        confidence: raw.confidence,
        trend: raw.trend,
        predictions: raw.predictions,
        explanation: raw.explanation,
        recommendations: raw.recommendations,
        fallback: false,
    }
}
