//! # Domain Entities
//!
//! Entities are the "Nouns" of our application. They are simple data
//! structures (structs) that represent the things we are working with:
//! Tables, Pages, Requests, and Outcomes.
//!
//! We use the `serde` crate (Serialize/Deserialize) to allow these structs
//! to be easily converted to/from JSON or YAML.

use serde::{Deserialize, Serialize};

/// `TableDescriptor` identifies one logical table to extract.
///
/// The `name` must be unique within a run; it also names the destination
/// file. The `query_source` is a path to a SQL file that the extractor
/// resolves and executes with named bind parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    /// Path to the SQL text for this table. The original deployment's
    /// configs call this `sql_file`, so both spellings are accepted.
    #[serde(alias = "sql_file")]
    pub query_source: String,
}

/// `Page` is one bounded batch of rows returned by a single extractor call.
///
/// Rows are row-major and stringly-typed: every source value is normalized
/// to a string (or NULL) by the extractor before it reaches the core, so
/// the sink never needs to know about source column types.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The offset this page was fetched at.
    pub offset: u64,
    /// Column names, in select order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Page {
    /// An empty page is the success-terminating condition of a table run.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// `PageRequest` is a "To-Do" item for the extractor: everything needed to
/// fetch one page of one table. A fresh request is built each loop
/// iteration; offsets advance monotonically by `page_size` starting at 0.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub table: TableDescriptor,
    pub offset: u64,
    pub page_size: u64,
    pub filter_value: String,
}

/// Terminal status of one table run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
}

/// `TableRunOutcome` is the "Report Card" for one table run.
///
/// Exactly one outcome is produced per table per run. A `Failed` outcome
/// always carries a human-readable reason in `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRunOutcome {
    pub table_name: String,
    /// How many pages were written to the destination.
    pub pages: u64,
    /// How many rows were written across those pages.
    pub rows: u64,
    /// How long the run took (in seconds).
    pub duration: f64,
    pub status: RunStatus,
    /// If the run failed, this contains the reason why.
    pub error: Option<String>,
}

impl TableRunOutcome {
    /// Helper to create a successful outcome.
    pub fn success(table_name: String, pages: u64, rows: u64, duration: f64) -> Self {
        Self {
            table_name,
            pages,
            rows,
            duration,
            status: RunStatus::Success,
            error: None,
        }
    }

    /// Helper to create a failure outcome. `pages` and `rows` count the
    /// writes that succeeded before the run terminated.
    pub fn failure(table_name: String, pages: u64, rows: u64, duration: f64, error: String) -> Self {
        Self {
            table_name,
            pages,
            rows,
            duration,
            status: RunStatus::Failed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let ok = TableRunOutcome::success("ORDERS".to_string(), 3, 250, 1.2);
        assert!(ok.is_success());
        assert_eq!(ok.error, None);

        let bad = TableRunOutcome::failure("ORDERS".to_string(), 1, 100, 0.4, "boom".to_string());
        assert!(!bad.is_success());
        assert_eq!(bad.error.as_deref(), Some("boom"));
        assert_eq!(bad.pages, 1);
    }

    #[test]
    fn test_table_descriptor_accepts_sql_file_alias() {
        let yaml = r#"
name: "ORDERS"
sql_file: "sql/orders.sql"
"#;
        let t: TableDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.name, "ORDERS");
        assert_eq!(t.query_source, "sql/orders.sql");
    }

    #[test]
    fn test_page_emptiness() {
        let empty = Page {
            offset: 300,
            columns: vec!["ID".to_string()],
            rows: vec![],
        };
        assert!(empty.is_empty());
        assert_eq!(empty.row_count(), 0);

        let full = Page {
            offset: 0,
            columns: vec!["ID".to_string()],
            rows: vec![vec![Some("1".to_string())]],
        };
        assert!(!full.is_empty());
        assert_eq!(full.row_count(), 1);
    }
}
