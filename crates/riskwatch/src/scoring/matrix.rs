use serde::{Deserialize, Serialize};

use super::domain::{RiskLevel, RiskRecord};

pub const MATRIX_SIZE: usize = 5;

/// Rating assumed when a record's impact or likelihood is missing or unrecognized.
pub const DEFAULT_LEVEL: RiskLevel = RiskLevel::Medium;

/// Band assigned to a matrix cell from its multiplicative score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn from_score(score: usize) -> Self {
        match score {
            0..=4 => Severity::Low,
            5..=9 => Severity::Medium,
            10..=16 => Severity::High,
            _ => Severity::Critical,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

pub const fn cell_score(impact: RiskLevel, likelihood: RiskLevel) -> usize {
    (impact.index() + 1) * (likelihood.index() + 1)
}

pub const fn cell_severity(impact: RiskLevel, likelihood: RiskLevel) -> Severity {
    Severity::from_score(cell_score(impact, likelihood))
}

/// Impact by likelihood count grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrix {
    cells: [[u32; MATRIX_SIZE]; MATRIX_SIZE],
    total: usize,
    defaulted: usize,
}

impl Default for RiskMatrix {
    fn default() -> Self {
        Self {
            cells: [[0; MATRIX_SIZE]; MATRIX_SIZE],
            total: 0,
            defaulted: 0,
        }
    }
}

impl RiskMatrix {
    pub fn build(records: &[RiskRecord]) -> Self {
        let mut matrix = Self::default();
        for record in records {
            matrix.insert(record);
        }
        matrix
    }

    /// Count a record, falling back to medium for any rating that does not parse.
    pub fn insert(&mut self, record: &RiskRecord) {
        let impact = record.impact_level();
        let likelihood = record.likelihood_level();
        if impact.is_none() || likelihood.is_none() {
            self.defaulted += 1;
        }

        let impact = impact.unwrap_or(DEFAULT_LEVEL);
        let likelihood = likelihood.unwrap_or(DEFAULT_LEVEL);
        self.cells[impact.index()][likelihood.index()] += 1;
        self.total += 1;
    }

    pub fn count(&self, impact: RiskLevel, likelihood: RiskLevel) -> u32 {
        self.cells[impact.index()][likelihood.index()]
    }

    pub fn cells(&self) -> &[[u32; MATRIX_SIZE]; MATRIX_SIZE] {
        &self.cells
    }

    /// Number of records counted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Records with at least one rating replaced by the default.
    pub fn defaulted(&self) -> usize {
        self.defaulted
    }

    pub fn severity_at(&self, impact_index: usize, likelihood_index: usize) -> Option<Severity> {
        let impact = RiskLevel::from_index(impact_index)?;
        let likelihood = RiskLevel::from_index(likelihood_index)?;
        Some(cell_severity(impact, likelihood))
    }

    pub fn view(&self) -> RiskMatrixView {
        let severity = RiskLevel::ALL.map(|impact| {
            RiskLevel::ALL.map(|likelihood| cell_severity(impact, likelihood))
        });

        RiskMatrixView {
            cells: self.cells,
            severity,
            total: self.total,
            defaulted: self.defaulted,
        }
    }
}

pub fn build_matrix(records: &[RiskRecord]) -> RiskMatrix {
    RiskMatrix::build(records)
}

/// Serializable matrix with per-cell severity bands for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrixView {
    pub cells: [[u32; MATRIX_SIZE]; MATRIX_SIZE],
    pub severity: [[Severity; MATRIX_SIZE]; MATRIX_SIZE],
    pub total: usize,
    pub defaulted: usize,
}
