//! Account reconciliation library: fuzzy-match company names against a
//! reference directory and enrich them with CRM report facts.

pub mod config;
pub mod enrich;
pub mod error;
pub mod index;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod safety;
pub mod similarity;
pub mod store;
