//! # Paged SQL-to-Parquet ETL Runner
//!
//! A multi-threaded utility that extracts relational tables one fixed-size
//! page at a time and persists each page into a Parquet file, one file per
//! table.
//!
//! This application follows the **Hexagonal Architecture** (Ports and
//! Adapters) to maintain a strict separation between the pagination core
//! and the database/file-format infrastructure.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::orchestrator::EtlOrchestrator;
use crate::config::{AppConfig, CliArgs};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::oracle_page_extractor::OraclePageExtractor;
use crate::infrastructure::parquet::parquet_page_sink::ParquetPageSink;
use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match AppConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let conn_str = config.database.get_connection_string();
    let password = config
        .database
        .password
        .clone()
        .or_else(|| std::env::var("ORACLE_PASSWORD").ok())
        .unwrap_or_default();

    let concurrency_limit = config.etl.concurrency_limit();
    info!("Worker pool bounded at {} concurrent table runs", concurrency_limit);

    // One spare connection beyond the worker count so a metadata lookup
    // never starves a running table. Connections are established lazily so
    // an unreachable database surfaces as a per-table fetch failure, not a
    // startup crash.
    let manager = OracleConnectionManager::new(&config.database.username, &password, &conn_str);
    let pool = r2d2::Pool::builder()
        .max_size((concurrency_limit + 1) as u32)
        .min_idle(Some(0))
        .build_unchecked(manager);

    let prefetch = config.etl.prefetch_rows.unwrap_or(5000);
    let extractor = Arc::new(OraclePageExtractor::new(pool, prefetch));
    let sink = Arc::new(ParquetPageSink::new(config.etl.parquet_compression.clone()));

    // 5. Run Orchestrator
    let orchestrator = EtlOrchestrator::new(extractor, sink, config);

    info!("Starting ETL process...");
    match orchestrator.run() {
        Ok(outcomes) => {
            let success_count = outcomes.iter().filter(|o| o.is_success()).count();
            info!(
                "ETL finished. {}/{} tables successful.",
                success_count,
                outcomes.len()
            );
            for outcome in outcomes.iter().filter(|o| !o.is_success()) {
                error!(
                    "Table {} failed: {}",
                    outcome.table_name,
                    outcome.error.as_deref().unwrap_or("unknown reason")
                );
            }
            if success_count != outcomes.len() {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Orchestrator failed: {}", e);
            process::exit(1);
        }
    }
}
