//! Reconciliation pipeline: normalize → resolve → enrich, one output row per
//! input row, in input order.
//!
//! The reference index and enrichment tables are immutable snapshots owned by
//! the pipeline, so rows are matched in parallel without locking. Results are
//! only handed back once the whole batch has finished.

use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::enrich::Enricher;
use crate::error::{Result, Threshold};
use crate::index::ReferenceIndex;
use crate::matcher::resolve;
use crate::models::{CompanyRecord, EnrichedRow, InputRow, MatchOutcome, MatchingStats, QueryRow};
use crate::normalize::{normalize_name, strip_parentheticals};
use crate::progress::{create_progress_bar, log_progress};

/// Error text attached to rows without a usable company name.
pub const MISSING_NAME: &str = "missing company name";

const LOG_INTERVAL: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub country: String,
    pub threshold: Threshold,
    pub strip_parentheticals: bool,
    pub suggestions: bool,
}

impl PipelineOptions {
    pub fn new(country: &str, threshold: Threshold) -> Self {
        PipelineOptions {
            country: country.to_string(),
            threshold,
            strip_parentheticals: false,
            suggestions: false,
        }
    }
}

pub struct Pipeline {
    index: ReferenceIndex,
    enricher: Enricher,
    options: PipelineOptions,
}

impl Pipeline {
    /// Build the country's reference index once; it is reused for every row.
    pub fn new(records: &[CompanyRecord], enricher: Enricher, options: PipelineOptions) -> Self {
        let index = ReferenceIndex::build(records, &options.country);
        if index.is_empty() {
            log::warn!(
                "No reference rows for country '{}'; every row will be not found",
                options.country
            );
        } else {
            log::info!("Reference index for '{}': {} rows", options.country, index.len());
        }
        Pipeline {
            index,
            enricher,
            options,
        }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn failed_row(&self, row: &InputRow) -> EnrichedRow {
        EnrichedRow {
            input: row.clone(),
            query: QueryRow {
                raw_name: row.name.clone().unwrap_or_default(),
                name_norm: String::new(),
                outcome: MatchOutcome::not_found(),
            },
            facts: self.enricher.absent(),
            error: Some(MISSING_NAME.to_string()),
        }
    }

    /// Reconcile a single input row.
    pub fn process_row(&self, row: &InputRow) -> EnrichedRow {
        let Some(raw_name) = row.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            log::warn!("Input row without a company name: {:?}", row.fields);
            return self.failed_row(row);
        };

        let name_norm = if self.options.strip_parentheticals {
            normalize_name(&strip_parentheticals(raw_name))
        } else {
            normalize_name(raw_name)
        };

        let outcome = resolve(
            &name_norm,
            &self.index,
            self.options.threshold,
            self.options.suggestions,
        );
        if outcome.resolution.is_none() {
            log::debug!("No match for '{}' (normalized '{}')", raw_name, name_norm);
        }
        let facts = self.enricher.enrich(outcome.site());

        EnrichedRow {
            input: row.clone(),
            query: QueryRow {
                raw_name: raw_name.to_string(),
                name_norm,
                outcome,
            },
            facts,
            error: None,
        }
    }

    /// Reconcile every row in parallel, preserving input order.
    pub fn run(&self, rows: &[InputRow]) -> (Vec<EnrichedRow>, MatchingStats) {
        let start = Instant::now();
        let total = rows.len() as u64;
        let pb = create_progress_bar(total, "Matching companies");
        let done = AtomicU64::new(0);

        let results: Vec<EnrichedRow> = rows
            .par_iter()
            .map(|row| {
                let result = self.process_row(row);
                pb.inc(1);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                log_progress("match", n, total, LOG_INTERVAL);
                result
            })
            .collect();

        let mut stats = MatchingStats {
            country: self.options.country.clone(),
            reference_rows: self.index.len(),
            ..Default::default()
        };
        for row in &results {
            stats.record(row);
        }
        stats.elapsed_seconds = start.elapsed().as_secs_f64();

        pb.finish_with_message(format!(
            "Matched {}/{} companies ({:.1}%)",
            stats.total_matches(),
            stats.total_rows,
            stats.match_rate()
        ));
        (results, stats)
    }
}

/// One-shot reconciliation of `rows` against `records` for `country`.
/// A threshold outside 0..=100 is rejected before any row is touched.
pub fn run(
    rows: &[InputRow],
    country: &str,
    threshold: i64,
    records: &[CompanyRecord],
    enricher: Enricher,
) -> Result<Vec<EnrichedRow>> {
    let options = PipelineOptions::new(country, Threshold::new(threshold)?);
    let (results, _) = Pipeline::new(records, enricher, options).run(rows);
    Ok(results)
}

// ============================================================================
// TESTS
// ============================================================================
