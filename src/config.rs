//! Run configuration.
//!
//! Every field has a default so a partial JSON file only overrides what it
//! names. Columns are referenced by header name and validated when tables are
//! loaded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{self, ReconcileError, Threshold};
use crate::index::{StatusVocabulary, DEFAULT_STATUS_LABELS};

/// Canonical companies-with-websites directory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReferenceSchema {
    pub table: String,
    pub name_column: String,
    pub country_column: String,
    pub site_column: String,
    pub status_column: String,
}

impl Default for ReferenceSchema {
    fn default() -> Self {
        ReferenceSchema {
            table: "companies".to_string(),
            name_column: "Account Name".to_string(),
            country_column: "Primary Country".to_string(),
            site_column: "Website".to_string(),
            status_column: "Account Status".to_string(),
        }
    }
}

/// User-supplied company list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputSchema {
    pub table: String,
    pub name_column: String,
}

impl Default for InputSchema {
    fn default() -> Self {
        InputSchema {
            table: "input".to_string(),
            name_column: "EMPRESA".to_string(),
        }
    }
}

/// Accounts report: owner and account status per site.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountsSchema {
    pub table: String,
    pub id_column: String,
    pub owner_column: String,
    pub status_column: String,
}

impl Default for AccountsSchema {
    fn default() -> Self {
        AccountsSchema {
            table: "newacc".to_string(),
            id_column: "Website".to_string(),
            owner_column: "Account Owner".to_string(),
            status_column: "Account Status".to_string(),
        }
    }
}

/// One single-fact secondary table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub id_column: String,
    pub fact_column: String,
}

impl TableSchema {
    fn report(table: &str) -> Self {
        TableSchema {
            table: table.to_string(),
            id_column: "Website".to_string(),
            fact_column: "Opportunity Name".to_string(),
        }
    }
}

/// Product line with its won and open-opportunity reports.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProductLineSchema {
    pub name: String,
    pub won: TableSchema,
    pub opportunity: TableSchema,
}

impl ProductLineSchema {
    fn new(name: &str, won: &str, opportunity: &str) -> Self {
        ProductLineSchema {
            name: name.to_string(),
            won: TableSchema::report(won),
            opportunity: TableSchema::report(opportunity),
        }
    }
}

pub fn default_product_lines() -> Vec<ProductLineSchema> {
    vec![
        ProductLineSchema::new("WAF", "wafwon", "wafopps"),
        ProductLineSchema::new("API", "apiwon", "apiopps"),
        ProductLineSchema::new("GC", "gcwon", "gcopps"),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcileConfig {
    pub threshold: i64,
    pub strip_parentheticals: bool,
    pub suggestions: bool,
    pub status_vocabulary: Vec<String>,
    pub reference: ReferenceSchema,
    pub input: InputSchema,
    pub accounts: AccountsSchema,
    pub products: Vec<ProductLineSchema>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            threshold: Threshold::default().get() as i64,
            strip_parentheticals: false,
            suggestions: false,
            status_vocabulary: DEFAULT_STATUS_LABELS.iter().map(|s| s.to_string()).collect(),
            reference: ReferenceSchema::default(),
            input: InputSchema::default(),
            accounts: AccountsSchema::default(),
            products: default_product_lines(),
        }
    }
}

impl ReconcileConfig {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn threshold(&self) -> error::Result<Threshold> {
        Threshold::new(self.threshold)
    }

    pub fn vocabulary(&self) -> error::Result<StatusVocabulary> {
        StatusVocabulary::new(&self.status_vocabulary[..])
    }

    /// Fail fast on configuration that can never produce a valid run.
    pub fn validate(&self) -> error::Result<()> {
        self.threshold()?;
        self.vocabulary()?;
        let mut seen: Vec<&str> = Vec::new();
        for product in &self.products {
            if seen.contains(&product.name.as_str()) {
                return Err(ReconcileError::DuplicateProductLine(product.name.clone()));
            }
            seen.push(&product.name);
        }
        Ok(())
    }

    /// Every secondary table the run reads, accounts first, without repeats.
    pub fn secondary_tables(&self) -> Vec<&str> {
        let mut tables = vec![self.accounts.table.as_str()];
        for product in &self.products {
            for table in [product.won.table.as_str(), product.opportunity.table.as_str()] {
                if !tables.contains(&table) {
                    tables.push(table);
                }
            }
        }
        tables
    }
}
