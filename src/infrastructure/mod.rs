pub mod oracle;
pub mod parquet;
