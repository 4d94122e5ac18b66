//! Fetching department tables from the enrollment board
//!
//! The query engine only sees the [`Fetcher`] trait. Page-specific details
//! (form postbacks, element ids, table layout) stay inside [`portal`] and
//! [`parse`].

pub mod parse;
pub mod portal;

pub use portal::{PortalConfig, PortalFetcher};

use std::collections::BTreeMap;
use thiserror::Error;

use crate::data::DepartmentTable;

/// Errors that abort a whole fetch cycle, or a single department within one
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed or timed out
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An element the page layout relies on is absent
    #[error("Expected page element not found: {0}")]
    MissingElement(&'static str),

    /// The configured exam type is not offered by the site
    #[error("Exam type '{0}' is not offered by the site")]
    ExamTypeUnavailable(String),

    /// The board re-rendered another department than the one requested
    #[error("Board did not switch to department '{0}'")]
    SelectionIgnored(String),

    /// A CSS selector failed to compile
    #[error("Invalid selector '{0}'")]
    Selector(String),
}

/// Result of one fetch cycle over every department
///
/// `failed` lists departments whose table could not be read this cycle.
/// Their previous tables should be kept by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Department name to its freshly read table
    pub tables: BTreeMap<String, DepartmentTable>,
    /// Departments that were skipped this cycle
    pub failed: Vec<String>,
}

impl FetchOutcome {
    /// Number of departments the cycle tried to read
    pub fn attempted(&self) -> usize {
        self.tables.len() + self.failed.len()
    }
}

/// Source of per-department student tables
///
/// Implementations run one full, sequential cycle per call. A department that
/// fails is reported in [`FetchOutcome::failed`]; an `Err` means nothing
/// usable was read at all.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Reads every department's table in rank order
    async fn fetch_all(&self) -> Result<FetchOutcome, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempted_counts_tables_and_failures() {
        let mut outcome = FetchOutcome::default();
        assert_eq!(outcome.attempted(), 0);

        outcome.tables.insert("CS".to_string(), Vec::new());
        outcome.failed.push("EE".to_string());
        outcome.failed.push("ME".to_string());

        assert_eq!(outcome.attempted(), 3);
    }

    #[test]
    fn test_fetch_error_messages() {
        let err = FetchError::MissingElement("dgUserList");
        assert!(err.to_string().contains("dgUserList"));

        let err = FetchError::ExamTypeUnavailable("abc".to_string());
        assert!(err.to_string().contains("'abc'"));

        let err = FetchError::SelectionIgnored("d2".to_string());
        assert!(err.to_string().contains("'d2'"));
    }
}
