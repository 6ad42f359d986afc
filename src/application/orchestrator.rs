//! The core application logic that orchestrates the overall ETL run.
//!
//! This module fans table runs out across a bounded worker pool, waits for
//! every run to reach a terminal outcome, and aggregates the results into
//! a run report.

use crate::application::table_loader::TableLoader;
use crate::config::AppConfig;
use crate::domain::entities::TableRunOutcome;
use crate::domain::errors::{EtlError, Result};
use crate::ports::page_extractor::PageExtractor;
use crate::ports::page_sink::PageSink;
use log::info;
use rayon::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates the end-to-end extraction of all configured tables.
pub struct EtlOrchestrator {
    extractor: Arc<dyn PageExtractor>,
    sink: Arc<dyn PageSink>,
    config: AppConfig,
}

impl EtlOrchestrator {
    /// Creates a new EtlOrchestrator with the provided capabilities.
    pub fn new(
        extractor: Arc<dyn PageExtractor>,
        sink: Arc<dyn PageSink>,
        config: AppConfig,
    ) -> Self {
        Self {
            extractor,
            sink,
            config,
        }
    }

    /// Entry point for running the full ETL process.
    ///
    /// Submits one Table Loader run per configured table to a worker pool
    /// bounded at the configured concurrency limit. Table runs are fully
    /// isolated: a failure in one never cancels or affects a sibling
    /// (no fail-fast), and per-table failures are data in the returned
    /// outcomes, never an `Err` from this method. The returned sequence is
    /// ordered by the configured table order, not by completion order.
    pub fn run(&self) -> Result<Vec<TableRunOutcome>> {
        let start_time = Instant::now();
        self.config.validate()?;

        let concurrency_limit = self.config.etl.concurrency_limit();
        let page_size = self.config.etl.page_size;
        let filter_value = self.config.etl.filter_value.clone();
        let output_dir = self.config.etl.output_dir.clone();

        info!(
            "Starting ETL run: {} tables, page size {}, {} workers",
            self.config.tables.len(),
            page_size,
            concurrency_limit
        );

        // A dedicated pool rather than rayon's global one, so the bound
        // is exactly the configured limit even when tests run in parallel.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency_limit)
            .build()
            .map_err(|e| EtlError::ConfigError(format!("worker pool setup failed: {}", e)))?;

        let loader = TableLoader::new(self.extractor.clone(), self.sink.clone());

        // `collect` on a par_iter preserves input order regardless of
        // which worker finishes first.
        let outcomes: Vec<TableRunOutcome> = pool.install(|| {
            self.config
                .tables
                .par_iter()
                .map(|table| {
                    info!("Processing table {}", table.name);
                    let destination = format!("{}/{}.parquet", output_dir, table.name);
                    loader.run(table, &filter_value, page_size, &destination)
                })
                .collect()
        });

        self.generate_report(&outcomes, start_time.elapsed().as_secs_f64())?;

        Ok(outcomes)
    }

    fn generate_report(&self, outcomes: &[TableRunOutcome], duration_secs: f64) -> Result<()> {
        let success = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - success;
        let total_rows: u64 = outcomes.iter().map(|o| o.rows).sum();
        let total_pages: u64 = outcomes.iter().map(|o| o.pages).sum();

        let report = json!({
            "summary": {
                "total_tables": outcomes.len(),
                "success": success,
                "failed": failed,
                "total_rows": total_rows,
                "total_pages": total_pages,
                "total_duration_seconds": duration_secs,
            },
            "details": outcomes
        });

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let report_path = format!("{}/report_{}.json", self.config.etl.output_dir, timestamp);

        std::fs::create_dir_all(&self.config.etl.output_dir)?;
        let file = std::fs::File::create(report_path).map_err(EtlError::IoError)?;
        serde_json::to_writer_pretty(file, &report)
            .map_err(|e| EtlError::ReportError(e.to_string()))?;

        Ok(())
    }
}
