//! Infrastructure adapter for fetching pages of rows from Oracle.

use crate::domain::entities::{Page, PageRequest};
use crate::domain::errors::{EtlError, Result};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::ports::page_extractor::PageExtractor;
use base64::{engine::general_purpose, Engine as _};
use oracle::sql_type::{OracleType, Timestamp, ToSql};
use r2d2::Pool;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

/// Concrete implementation of `PageExtractor` for Oracle databases.
///
/// This adapter loads the table's SQL text from disk (cached per path),
/// executes it with `:filter_value`, `:offset` and `:page_size` as named
/// bind parameters, and normalizes every Oracle value into a string
/// (Base64 for RAW/BLOB, a fixed `YYYY-MM-DD HH:MM:SS.ffffff` layout for
/// date/timestamp types) so the core never sees source column types.
///
/// Connections come from a shared r2d2 pool, so concurrent table runs are
/// bounded by the pool size. A pool-acquisition failure surfaces as a
/// fetch error on the page that needed the connection.
pub struct OraclePageExtractor {
    pool: Pool<OracleConnectionManager>,
    prefetch_rows: u32,
    query_cache: Mutex<HashMap<String, Arc<String>>>,
}

impl OraclePageExtractor {
    /// Creates a new OraclePageExtractor over a shared connection pool.
    pub fn new(pool: Pool<OracleConnectionManager>, prefetch_rows: u32) -> Self {
        Self {
            pool,
            prefetch_rows,
            query_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a query source path to its SQL text, caching per path.
    /// Every loop iteration for a table re-requests the same source, so
    /// the disk is only hit once per file.
    fn load_query(&self, path: &str) -> Result<Arc<String>> {
        let mut cache = self
            .query_cache
            .lock()
            .map_err(|_| EtlError::ConfigError("query cache poisoned".to_string()))?;
        if let Some(sql) = cache.get(path) {
            return Ok(sql.clone());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::IoError(std::io::Error::new(
                e.kind(),
                format!("query source {}: {}", path, e),
            )))?;
        let sql = Arc::new(text);
        cache.insert(path.to_string(), sql.clone());
        Ok(sql)
    }

    fn format_value(&self, row: &oracle::Row, i: usize, otype: &OracleType) -> Result<Option<String>> {
        match otype {
            OracleType::Number(_, _)
            | OracleType::Int64
            | OracleType::Float(_)
            | OracleType::BinaryFloat
            | OracleType::BinaryDouble => {
                let v: Option<String> = row.get(i)?;
                Ok(v)
            }
            OracleType::Date
            | OracleType::Timestamp(_)
            | OracleType::TimestampTZ(_)
            | OracleType::TimestampLTZ(_) => {
                let v: Option<Timestamp> = row.get(i)?;
                Ok(v.map(|ts| format_timestamp(&ts)))
            }
            OracleType::Raw(_) | OracleType::BLOB => {
                let v: Option<Vec<u8>> = row.get(i)?;
                Ok(v.map(|b| general_purpose::STANDARD.encode(b)))
            }
            _ => {
                let v: Option<String> = row.get(i)?;
                Ok(v)
            }
        }
    }
}

impl PageExtractor for OraclePageExtractor {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let table = request.table.name.clone();
        let fetch_err = |reason: String| EtlError::FetchError {
            table: table.clone(),
            reason,
        };

        let sql = self
            .load_query(&request.table.query_source)
            .map_err(|e| fetch_err(e.to_string()))?;

        let conn = self
            .pool
            .get()
            .map_err(|e| fetch_err(format!("connection acquisition failed: {}", e)))?;

        let mut stmt = conn
            .statement(sql.as_str())
            .prefetch_rows(self.prefetch_rows)
            .build()
            .map_err(|e| fetch_err(e.to_string()))?;

        // Bound values travel as binds, never as spliced query text.
        let offset = request.offset as i64;
        let page_size = request.page_size as i64;
        let rows = stmt
            .query_named(&[
                ("filter_value", &request.filter_value as &dyn ToSql),
                ("offset", &offset as &dyn ToSql),
                ("page_size", &page_size as &dyn ToSql),
            ])
            .map_err(|e| fetch_err(e.to_string()))?;

        let col_infos = rows.column_info();
        let col_types: Vec<OracleType> =
            col_infos.iter().map(|c| c.oracle_type().clone()).collect();
        let col_names: Vec<String> = col_infos.iter().map(|c| c.name().to_string()).collect();

        let mut data: Vec<Vec<Option<String>>> = Vec::new();
        for row_res in rows {
            let row = row_res.map_err(|e| fetch_err(e.to_string()))?;
            let mut record = Vec::with_capacity(col_types.len());
            for (i, otype) in col_types.iter().enumerate() {
                record.push(
                    self.format_value(&row, i, otype)
                        .map_err(|e| fetch_err(e.to_string()))?,
                );
            }
            data.push(record);
        }

        Ok(Page {
            offset: request.offset,
            columns: col_names,
            rows: data,
        })
    }
}

fn format_timestamp(ts: &Timestamp) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        ts.nanosecond() / 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_timestamp() {
        let ts = Timestamp::new(2023, 10, 27, 14, 30, 45, 123456000).unwrap();
        assert_eq!(format_timestamp(&ts), "2023-10-27 14:30:45.123456");

        let ts2 = Timestamp::new(2024, 1, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts2), "2024-01-01 00:00:00.000000");
    }

    fn extractor() -> OraclePageExtractor {
        let manager = OracleConnectionManager::new("user", "pass", "//localhost:1521/XE");
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(0))
            .build_unchecked(manager);
        OraclePageExtractor::new(pool, 5000)
    }

    #[test]
    fn test_load_query_caches_per_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "SELECT * FROM orders WHERE entry_date = :filter_value \
             OFFSET :offset ROWS FETCH NEXT :page_size ROWS ONLY"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let ex = extractor();
        let first = ex.load_query(&path).unwrap();
        assert!(first.contains(":page_size"));

        // A second load must come from the cache, not the file.
        std::fs::remove_file(&path).unwrap();
        let second = ex.load_query(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_query_source_is_an_error() {
        let ex = extractor();
        let err = ex.load_query("/nonexistent/orders.sql").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/orders.sql"));
    }
}
