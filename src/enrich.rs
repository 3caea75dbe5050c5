//! Enrichment of resolved sites from secondary report tables.
//!
//! Each report is reduced at load time to a site → fact map. The first row
//! for a site is authoritative, so loaders must preserve source row order.

use rustc_hash::FxHashMap;

use crate::config::{AccountsSchema, ProductLineSchema, TableSchema};
use crate::error::{ReconcileError, Result};
use crate::models::{EnrichmentFacts, ProductFacts, ProductStatus, RawTable};

// ============================================================================
// Fact Tables
// ============================================================================

/// Snapshot of one fact column keyed by site identifier.
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    name: String,
    facts: FxHashMap<String, Option<String>>,
}

impl FactTable {
    /// Reduce `raw` to site → fact, validating both columns exist.
    pub fn from_raw(raw: &RawTable, id_column: &str, fact_column: &str) -> Result<Self> {
        let id_idx = raw.column_index(id_column)?;
        let fact_idx = raw.column_index(fact_column)?;

        let mut facts: FxHashMap<String, Option<String>> = FxHashMap::default();
        for row in 0..raw.rows.len() {
            let Some(site) = raw.cell(row, id_idx) else {
                continue;
            };
            // First occurrence wins, even when its fact cell is blank
            facts
                .entry(site.to_string())
                .or_insert_with(|| raw.cell(row, fact_idx).map(str::to_string));
        }

        Ok(FactTable {
            name: raw.name.clone(),
            facts,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fact for `site`; `None` when no row exists or the first row's cell is blank.
    pub fn lookup(&self, site: &str) -> Option<&str> {
        self.facts.get(site).and_then(|f| f.as_deref())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Won and open-opportunity reports for one product line.
#[derive(Debug, Clone)]
pub struct ProductLine {
    pub name: String,
    pub won: FactTable,
    pub opportunity: FactTable,
}

// ============================================================================
// Enricher
// ============================================================================

/// Immutable enrichment snapshot shared by every row of a run.
#[derive(Debug, Clone)]
pub struct Enricher {
    owners: FactTable,
    statuses: FactTable,
    products: Vec<ProductLine>,
}

fn find_table<'a>(tables: &'a [RawTable], name: &str) -> Result<&'a RawTable> {
    tables
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| ReconcileError::MissingTable(name.to_string()))
}

fn fact_table(tables: &[RawTable], schema: &TableSchema) -> Result<FactTable> {
    FactTable::from_raw(find_table(tables, &schema.table)?, &schema.id_column, &schema.fact_column)
}

impl Enricher {
    pub fn new(owners: FactTable, statuses: FactTable, products: Vec<ProductLine>) -> Result<Self> {
        for (i, product) in products.iter().enumerate() {
            if products[..i].iter().any(|p| p.name == product.name) {
                return Err(ReconcileError::DuplicateProductLine(product.name.clone()));
            }
        }
        Ok(Enricher {
            owners,
            statuses,
            products,
        })
    }

    /// Build from loaded tables, validating every configured table and column.
    pub fn from_tables(
        tables: &[RawTable],
        accounts: &AccountsSchema,
        products: &[ProductLineSchema],
    ) -> Result<Self> {
        let accounts_raw = find_table(tables, &accounts.table)?;
        let owners =
            FactTable::from_raw(accounts_raw, &accounts.id_column, &accounts.owner_column)?;
        let statuses =
            FactTable::from_raw(accounts_raw, &accounts.id_column, &accounts.status_column)?;

        let lines = products
            .iter()
            .map(|p| {
                Ok(ProductLine {
                    name: p.name.clone(),
                    won: fact_table(tables, &p.won)?,
                    opportunity: fact_table(tables, &p.opportunity)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Enricher::new(owners, statuses, lines)
    }

    pub fn product_lines(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|p| p.name.as_str())
    }

    /// Facts for a resolved site. `None` short-circuits to all-absent facts
    /// (every product Free) without consulting any table.
    pub fn enrich(&self, site: Option<&str>) -> EnrichmentFacts {
        let Some(site) = site else {
            return self.absent();
        };

        let products = self
            .products
            .iter()
            .map(|line| {
                let won = line.won.lookup(site);
                let opportunity = line.opportunity.lookup(site);
                ProductFacts {
                    line: line.name.clone(),
                    won: won.map(str::to_string),
                    opportunity: opportunity.map(str::to_string),
                    status: ProductStatus::derive(won, opportunity),
                }
            })
            .collect();

        EnrichmentFacts {
            owner: self.owners.lookup(site).map(str::to_string),
            account_status: self.statuses.lookup(site).map(str::to_string),
            products,
        }
    }

    /// All facts absent, product lines listed as Free.
    pub fn absent(&self) -> EnrichmentFacts {
        EnrichmentFacts {
            owner: None,
            account_status: None,
            products: self
                .products
                .iter()
                .map(|line| ProductFacts {
                    line: line.name.clone(),
                    won: None,
                    opportunity: None,
                    status: ProductStatus::Free,
                })
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
