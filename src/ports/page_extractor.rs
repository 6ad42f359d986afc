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

//! # Extractor Port
//!
//! In Hexagonal Architecture, a **Port** is like a "Slot" or a "Contract".
//!
//! This Port defines what it means to "fetch one page" from a relational
//! source. It doesn't care IF the source is Oracle, SQL Server, or a Mock
//! for testing. Any struct that implements `PageExtractor` can be driven
//! by the Table Loader.

use crate::domain::entities::{Page, PageRequest};
use crate::domain::errors::Result;

/// `PageExtractor` is a **Trait**. Think of it as an Interface.
///
/// We add `: Send + Sync` here. This is a Rust requirement for types
/// that are shared across multiple worker threads.
pub trait PageExtractor: Send + Sync {
    /// Fetches one page of rows for the request's table.
    ///
    /// The offset, page size, and filter value must reach the database as
    /// named bind parameters, never by interpolation into the query text.
    /// A returned page may be empty; an empty page means the table is
    /// exhausted. Fails with `EtlError::FetchError` on connection, query,
    /// or query-source problems.
    fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}
