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

//! Port defining the interface for persisting pages into columnar files.

use crate::domain::entities::Page;
use crate::domain::errors::Result;

/// Port for durably appending pages of rows to a destination file.
///
/// Repeated `write_page` calls for the same destination accumulate rows in
/// a single output file; they never overwrite earlier pages. Within one
/// run a destination is only ever written by the single table run that
/// owns it, so writes to one destination are strictly sequential.
pub trait PageSink: Send + Sync {
    /// Appends one page of rows to the named destination.
    ///
    /// Fails with `EtlError::WriteError` on I/O or encoding problems.
    fn write_page(&self, destination: &str, page: &Page) -> Result<()>;

    /// Closes the destination, making everything written so far durable
    /// and readable. Calling this on a destination that never received a
    /// page is a no-op: a table with zero rows produces no file.
    fn finish(&self, destination: &str) -> Result<()>;
}
