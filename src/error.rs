//! Contract violations raised by the reconciliation core.
//!
//! Data-quality problems (unmatched names, missing facts, blank rows) are never
//! errors; these variants only cover callers breaking the engine's contract.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("similarity threshold must be within 0..=100, got {0}")]
    InvalidThreshold(i64),

    #[error("table '{table}' has no column named '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("table '{0}' was not provided")]
    MissingTable(String),

    #[error("product line '{0}' is configured more than once")]
    DuplicateProductLine(String),

    #[error("status vocabulary contains an empty label")]
    EmptyVocabularyLabel,
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Similarity threshold validated to the inclusive 0..=100 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold(u8);

impl Threshold {
    pub fn new(value: i64) -> Result<Self> {
        if (0..=100).contains(&value) {
            Ok(Threshold(value as u8))
        } else {
            Err(ReconcileError::InvalidThreshold(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold(85)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_bounds() {
        assert_eq!(Threshold::new(0).unwrap().get(), 0);
        assert_eq!(Threshold::new(100).unwrap().get(), 100);
        assert_eq!(
            Threshold::new(-1),
            Err(ReconcileError::InvalidThreshold(-1))
        );
        assert_eq!(
            Threshold::new(101),
            Err(ReconcileError::InvalidThreshold(101))
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = ReconcileError::MissingColumn {
            table: "wafwon".to_string(),
            column: "Website".to_string(),
        };
        assert_eq!(err.to_string(), "table 'wafwon' has no column named 'Website'");
    }
}
