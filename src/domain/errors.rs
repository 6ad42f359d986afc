// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core error definitions for the ETL runner.
//!
//! This module provides a centralized `EtlError` enum and a `Result` type
//! used throughout the application to handle configuration, database, and
//! file-format errors.

use thiserror::Error;

/// Error types encountered during an ETL run.
///
/// `FetchError` and `WriteError` are table-scoped: they terminate one
/// table's pagination loop and are converted into a `Failed` outcome at
/// the Table Loader boundary. `ConfigError` is the only kind that aborts
/// the whole run, and it can only occur before any table run has started.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Fetch failed for {table}: {reason}")]
    FetchError { table: String, reason: String },

    #[error("Write failed for {destination}: {reason}")]
    WriteError { destination: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Oracle error: {0}")]
    OracleError(String),

    #[error("Report generation failed: {0}")]
    ReportError(String),
}

impl From<oracle::Error> for EtlError {
    fn from(e: oracle::Error) -> Self {
        EtlError::OracleError(e.to_string())
    }
}

/// A specialized Result type for the ETL runner.
pub type Result<T> = std::result::Result<T, EtlError>;
