//! Country-partitioned reference index and status-priority ranking.

use rustc_hash::FxHashMap;

use crate::error::{ReconcileError, Result};
use crate::models::{CompanyRecord, PriorityRank, UNRANKED};
use crate::normalize::normalize_name;

// ============================================================================
// Status Vocabulary
// ============================================================================

/// Ordered account-status labels, most important first.
///
/// The first label ranks `len`, the last ranks 1; anything else is `UNRANKED`.
/// Labels compare trimmed and case-insensitively.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    labels: Vec<String>,
    ranks: FxHashMap<String, PriorityRank>,
}

pub const DEFAULT_STATUS_LABELS: &[&str] = &[
    "Customer",
    "Partner",
    "Open Opportunity",
    "Prospect",
    "Former Customer",
    "Lead",
];

fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

impl StatusVocabulary {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let mut ranks = FxHashMap::default();
        let total = labels.len() as PriorityRank;
        for (i, label) in labels.iter().enumerate() {
            let key = label_key(label.as_ref());
            if key.is_empty() {
                return Err(ReconcileError::EmptyVocabularyLabel);
            }
            // Repeated labels keep their first (higher) rank
            ranks.entry(key).or_insert(total - i as PriorityRank);
        }
        Ok(StatusVocabulary {
            labels: labels.iter().map(|l| l.as_ref().trim().to_string()).collect(),
            ranks,
        })
    }

    pub fn rank(&self, status: Option<&str>) -> PriorityRank {
        status
            .and_then(|s| self.ranks.get(&label_key(s)).copied())
            .unwrap_or(UNRANKED)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        // Built-in labels are non-empty
        StatusVocabulary::new(DEFAULT_STATUS_LABELS).unwrap()
    }
}

impl CompanyRecord {
    /// Build a reference record, deriving the normalized name and priority rank.
    /// The country is stored trimmed.
    pub fn new(
        name: &str,
        country: &str,
        site: &str,
        status: Option<&str>,
        vocabulary: &StatusVocabulary,
    ) -> Self {
        CompanyRecord {
            name: name.to_string(),
            name_norm: normalize_name(name),
            country: country.trim().to_string(),
            site: site.to_string(),
            priority: vocabulary.rank(status),
        }
    }
}

// ============================================================================
// Reference Index
// ============================================================================

/// Positionally aligned view of one country's reference rows, in source order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    names: Vec<String>,
    sites: Vec<String>,
    ranks: Vec<PriorityRank>,
    display_names: Vec<String>,
}

impl ReferenceIndex {
    /// Keep the rows whose country equals `country`, preserving source order.
    pub fn build(records: &[CompanyRecord], country: &str) -> Self {
        let country = country.trim();
        let mut index = ReferenceIndex::default();
        for record in records.iter().filter(|r| r.country == country) {
            index.names.push(record.name_norm.clone());
            index.sites.push(record.site.clone());
            index.ranks.push(record.priority);
            index.display_names.push(record.name.clone());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn ranks(&self) -> &[PriorityRank] {
        &self.ranks
    }

    pub fn display_name(&self, position: usize) -> &str {
        &self.display_names[position]
    }
}

/// Distinct non-empty countries, sorted.
pub fn available_countries(records: &[CompanyRecord]) -> Vec<String> {
    let mut countries: Vec<String> = records
        .iter()
        .map(|r| r.country.as_str())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    countries.sort();
    countries.dedup();
    countries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, country: &str, site: &str, status: Option<&str>) -> CompanyRecord {
        CompanyRecord::new(name, country, site, status, &StatusVocabulary::default())
    }

    #[test]
    fn test_vocabulary_ranks_first_label_highest() {
        let vocab = StatusVocabulary::new(&["Customer", "Partner", "Prospect"]).unwrap();
        assert_eq!(vocab.rank(Some("Customer")), 3);
        assert_eq!(vocab.rank(Some("Partner")), 2);
        assert_eq!(vocab.rank(Some("Prospect")), 1);
    }

    #[test]
    fn test_vocabulary_unranked_below_listed() {
        let vocab = StatusVocabulary::new(&["Customer", "Prospect"]).unwrap();
        assert_eq!(vocab.rank(None), UNRANKED);
        assert_eq!(vocab.rank(Some("Churned")), UNRANKED);
        assert!(vocab.rank(Some("Prospect")) > UNRANKED);
    }

    #[test]
    fn test_vocabulary_case_insensitive() {
        let vocab = StatusVocabulary::new(&["Customer"]).unwrap();
        assert_eq!(vocab.rank(Some("  customer ")), 1);
    }

    #[test]
    fn test_vocabulary_rejects_empty_label() {
        assert_eq!(
            StatusVocabulary::new(&["Customer", " "]).unwrap_err(),
            ReconcileError::EmptyVocabularyLabel
        );
    }

    #[test]
    fn test_vocabulary_duplicate_keeps_first_rank() {
        let vocab = StatusVocabulary::new(&["Customer", "Prospect", "customer"]).unwrap();
        assert_eq!(vocab.rank(Some("Customer")), 3);
    }

    #[test]
    fn test_build_index_filters_country_and_keeps_order() {
        let records = vec![
            record("Acme do Brasil Ltda", "Brazil", "acme.com.br", Some("Customer")),
            record("Acme Mexico", "Mexico", "acme.mx", None),
            record("Beta SA", "Brazil", "beta.com.br", None),
        ];
        let index = ReferenceIndex::build(&records, "Brazil");
        assert_eq!(index.len(), 2);
        assert_eq!(index.names(), &["acme do brasil".to_string(), "beta".to_string()]);
        assert_eq!(index.sites(), &["acme.com.br".to_string(), "beta.com.br".to_string()]);
        assert_eq!(index.ranks()[1], UNRANKED);
        assert_eq!(index.display_name(0), "Acme do Brasil Ltda");
    }

    #[test]
    fn test_build_index_unknown_country_is_empty() {
        let records = vec![record("Acme", "Brazil", "acme.com", None)];
        assert!(ReferenceIndex::build(&records, "Chile").is_empty());
    }

    #[test]
    fn test_padded_country_is_listed_and_indexed() {
        let records = vec![
            record("Acme", " Brazil ", "acme.com", None),
            record("Beta", "Brazil", "beta.com", None),
        ];
        assert_eq!(available_countries(&records), vec!["Brazil"]);
        assert_eq!(ReferenceIndex::build(&records, "Brazil").len(), 2);
        assert_eq!(ReferenceIndex::build(&records, "Brazil ").len(), 2);
    }

    #[test]
    fn test_available_countries() {
        let records = vec![
            record("A", "Mexico", "a.mx", None),
            record("B", "", "b.com", None),
            record("C", "Brazil", "c.com.br", None),
            record("D", "Mexico", "d.mx", None),
        ];
        assert_eq!(available_countries(&records), vec!["Brazil", "Mexico"]);
    }
}
