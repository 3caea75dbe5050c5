//! Core data models for account reconciliation.
//!
//! This module contains the record types flowing through the pipeline:
//! reference rows, input rows, match outcomes, enrichment facts and the
//! per-run statistics.

use serde::Serialize;

use crate::error::{ReconcileError, Result};
use crate::similarity::Score;

// ============================================================================
// Type Aliases
// ============================================================================

/// Status-priority rank. Higher is more important.
pub type PriorityRank = i32;

/// Rank of a missing or unlisted account status; below every listed label.
pub const UNRANKED: PriorityRank = 0;

/// Display value for an unresolved site identifier.
pub const NOT_FOUND: &str = "not found";

// ============================================================================
// Tabular Models
// ============================================================================

/// Named-column table as handed over by a loader. Blank cells are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Position of a named column; a missing column is a schema violation.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ReconcileError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }
}

// ============================================================================
// Reference Models
// ============================================================================

/// Row of the canonical companies-with-websites directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanyRecord {
    pub name: String,
    pub name_norm: String, // Derived via normalize_name, never displayed
    pub country: String,   // Empty when the source row has none
    pub site: String,      // Join key for every secondary table
    pub priority: PriorityRank,
}

// ============================================================================
// Input Models
// ============================================================================

/// One entry of the user-supplied list, with every original column kept for output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRow {
    pub name: Option<String>, // None when the name cell is NULL/blank
    pub fields: Vec<(String, Option<String>)>,
}

impl InputRow {
    /// Row that only carries a company name.
    pub fn named(name: &str) -> Self {
        InputRow {
            name: Some(name.to_string()),
            fields: Vec::new(),
        }
    }
}

/// How a query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStage {
    Exact,
    TokenSet,
    Partial,
}

impl MatchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStage::Exact => "exact",
            MatchStage::TokenSet => "token_set",
            MatchStage::Partial => "partial",
        }
    }
}

/// Winning reference entry for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub site: String,
    pub stage: MatchStage,
    pub score: Score,     // 100 for exact matches
    pub position: usize,  // Index of the winning entry in the reference index
}

/// Candidate offered for human review; never affects resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub score: Score,
}

/// Result of running the match cascade for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub resolution: Option<Resolution>,
    pub suggestions: Vec<Suggestion>,
}

impl MatchOutcome {
    pub fn not_found() -> Self {
        MatchOutcome::default()
    }

    pub fn site(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.site.as_str())
    }

    pub fn stage(&self) -> Option<MatchStage> {
        self.resolution.as_ref().map(|r| r.stage)
    }
}

/// Input name after normalization and resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub raw_name: String,
    pub name_norm: String,
    pub outcome: MatchOutcome,
}

// ============================================================================
// Enrichment Models
// ============================================================================

/// Per-product relationship derived from won/opportunity facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProductStatus {
    Customer,
    Partner,
    Free,
}

impl ProductStatus {
    /// Customer if a won record exists, else Partner if an opportunity exists, else Free.
    pub fn derive(won: Option<&str>, opportunity: Option<&str>) -> Self {
        if won.is_some() {
            ProductStatus::Customer
        } else if opportunity.is_some() {
            ProductStatus::Partner
        } else {
            ProductStatus::Free
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Customer => "Customer",
            ProductStatus::Partner => "Partner",
            ProductStatus::Free => "Free",
        }
    }
}

/// Won/opportunity facts for one product line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFacts {
    pub line: String,
    pub won: Option<String>,
    pub opportunity: Option<String>,
    pub status: ProductStatus,
}

/// Facts looked up for a resolved site. `None` always means "no row", never "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentFacts {
    pub owner: Option<String>,
    pub account_status: Option<String>,
    pub products: Vec<ProductFacts>,
}

// ============================================================================
// Output Models
// ============================================================================

/// One output row per input row, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRow {
    pub input: InputRow,
    pub query: QueryRow,
    pub facts: EnrichmentFacts,
    pub error: Option<String>, // Set for malformed input rows only
}

impl EnrichedRow {
    pub fn site(&self) -> Option<&str> {
        self.query.outcome.site()
    }

    /// Site identifier as shown in reports.
    pub fn site_display(&self) -> &str {
        self.site().unwrap_or(NOT_FOUND)
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run matching statistics.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MatchingStats {
    pub country: String,
    pub reference_rows: usize,

    pub total_rows: usize,
    pub exact_matches: usize,
    pub token_set_matches: usize,
    pub partial_matches: usize,
    pub not_found: usize,
    pub empty_names: usize, // Normalized to "", skipped by the cascade
    pub failed_rows: usize, // Missing raw name

    pub elapsed_seconds: f64,
}

impl MatchingStats {
    pub fn total_matches(&self) -> usize {
        self.exact_matches + self.token_set_matches + self.partial_matches
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            100.0 * self.total_matches() as f64 / self.total_rows as f64
        }
    }

    /// Count one finished row.
    pub fn record(&mut self, row: &EnrichedRow) {
        self.total_rows += 1;
        if row.error.is_some() {
            self.failed_rows += 1;
            return;
        }
        match row.query.outcome.stage() {
            Some(MatchStage::Exact) => self.exact_matches += 1,
            Some(MatchStage::TokenSet) => self.token_set_matches += 1,
            Some(MatchStage::Partial) => self.partial_matches += 1,
            None => {
                self.not_found += 1;
                if row.query.name_norm.is_empty() {
                    self.empty_names += 1;
                }
            }
        }
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            log::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
