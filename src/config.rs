use crate::domain::entities::TableDescriptor;
use crate::domain::errors::{EtlError, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub etl: EtlConfig,
    pub tables: Vec<TableDescriptor>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub service: String,
}

impl DatabaseConfig {
    /// Builds the Oracle easy-connect string (`//host:port/service`).
    pub fn get_connection_string(&self) -> String {
        format!("//{}:{}/{}", self.host, self.port, self.service)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EtlConfig {
    pub page_size: u64,
    pub thread_pool_size: Option<usize>,
    pub output_dir: String,
    /// Shared bind value passed to every table's query (e.g. an entry date).
    pub filter_value: String,
    pub prefetch_rows: Option<u32>,
    pub parquet_compression: Option<String>,
}

impl EtlConfig {
    /// Resolved worker-pool bound. When the config does not pin a size we
    /// default to 50% of the available cores, but always at least 1.
    pub fn concurrency_limit(&self) -> usize {
        self.thread_pool_size
            .unwrap_or_else(|| std::cmp::max(1, num_cpus::get() / 2))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: String,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(short, long)]
    pub output: Option<String>,
    #[arg(long)]
    pub filter_value: Option<String>,
    #[arg(long)]
    pub page_size: Option<u64>,
    #[arg(short, long)]
    pub parallel: Option<usize>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| EtlError::ConfigError(format!("invalid JSON config: {}", e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| EtlError::ConfigError(format!("invalid YAML config: {}", e)))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username { self.database.username = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(h) = &args.host { self.database.host = h.clone(); }
        if let Some(s) = &args.service { self.database.service = s.clone(); }
        if let Some(o) = &args.output { self.etl.output_dir = o.clone(); }
        if let Some(v) = &args.filter_value { self.etl.filter_value = v.clone(); }
        if let Some(p) = args.page_size { self.etl.page_size = p; }
        if let Some(p) = args.parallel { self.etl.thread_pool_size = Some(p); }
    }

    /// Structural validation, performed before any table run starts.
    ///
    /// A violation here is fatal: the run never begins and no table
    /// produces an outcome.
    pub fn validate(&self) -> Result<()> {
        if self.etl.page_size == 0 {
            return Err(EtlError::ConfigError(
                "page_size must be a positive integer".to_string(),
            ));
        }
        if self.etl.thread_pool_size == Some(0) {
            return Err(EtlError::ConfigError(
                "thread_pool_size must be a positive integer".to_string(),
            ));
        }
        if self.etl.output_dir.is_empty() {
            return Err(EtlError::ConfigError("output_dir must be set".to_string()));
        }
        if self.tables.is_empty() {
            return Err(EtlError::ConfigError(
                "at least one table must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.name.is_empty() {
                return Err(EtlError::ConfigError(
                    "table names must be non-empty".to_string(),
                ));
            }
            if !seen.insert(table.name.as_str()) {
                return Err(EtlError::ConfigError(format!(
                    "duplicate table name: {}",
                    table.name
                )));
            }
        }
        Ok(())
    }
}
