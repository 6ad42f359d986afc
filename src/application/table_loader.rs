//! The per-table pagination loop.
//!
//! A `TableLoader` drives one table from offset 0 to termination: it pulls
//! pages from the extractor and pushes them to the sink until an empty
//! page is observed (success) or a fetch/write error occurs (failure).
//! Errors never escape this module; they become `Failed` outcomes.

use crate::domain::entities::{PageRequest, TableDescriptor, TableRunOutcome};
use crate::ports::page_extractor::PageExtractor;
use crate::ports::page_sink::PageSink;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Instant;

/// Drives a single table's pagination loop to completion.
///
/// The loader depends only on the two port traits, never on a concrete
/// backend, and holds no per-table state: one loader instance is shared
/// by all table runs in a run.
pub struct TableLoader {
    extractor: Arc<dyn PageExtractor>,
    sink: Arc<dyn PageSink>,
}

impl TableLoader {
    pub fn new(extractor: Arc<dyn PageExtractor>, sink: Arc<dyn PageSink>) -> Self {
        Self { extractor, sink }
    }

    /// Runs one table to a terminal outcome.
    ///
    /// Offsets issued to the extractor are 0, page_size, 2*page_size, ...
    /// with no gaps or repeats. The loop always probes one page past the
    /// last non-empty page; the empty page is the only success-terminating
    /// condition. There are no retries: any fetch or write failure is
    /// terminal for this table, and pages already written stay on disk
    /// (at-least-once-partial, never rolled back).
    pub fn run(
        &self,
        table: &TableDescriptor,
        filter_value: &str,
        page_size: u64,
        destination: &str,
    ) -> TableRunOutcome {
        let start_time = Instant::now();
        let mut offset: u64 = 0;
        let mut pages: u64 = 0;
        let mut rows: u64 = 0;

        loop {
            let request = PageRequest {
                table: table.clone(),
                offset,
                page_size,
                filter_value: filter_value.to_string(),
            };

            let page = match self.extractor.fetch_page(&request) {
                Ok(p) => p,
                Err(e) => {
                    error!("Fetch failed for {} at offset {}: {}", table.name, offset, e);
                    // Close out whatever already landed so prior pages
                    // stay readable; the close error is secondary here.
                    let _ = self.sink.finish(destination);
                    return TableRunOutcome::failure(
                        table.name.clone(),
                        pages,
                        rows,
                        start_time.elapsed().as_secs_f64(),
                        e.to_string(),
                    );
                }
            };

            if page.is_empty() {
                debug!(
                    "{}: empty page at offset {}, table exhausted",
                    table.name, page.offset
                );
                return match self.sink.finish(destination) {
                    Ok(()) => {
                        info!(
                            "{}: completed with {} rows in {} pages",
                            table.name, rows, pages
                        );
                        TableRunOutcome::success(
                            table.name.clone(),
                            pages,
                            rows,
                            start_time.elapsed().as_secs_f64(),
                        )
                    }
                    Err(e) => {
                        error!("Close failed for {}: {}", table.name, e);
                        TableRunOutcome::failure(
                            table.name.clone(),
                            pages,
                            rows,
                            start_time.elapsed().as_secs_f64(),
                            e.to_string(),
                        )
                    }
                };
            }

            let page_rows = page.row_count() as u64;
            if let Err(e) = self.sink.write_page(destination, &page) {
                error!("Write failed for {} at offset {}: {}", table.name, offset, e);
                let _ = self.sink.finish(destination);
                return TableRunOutcome::failure(
                    table.name.clone(),
                    pages,
                    rows,
                    start_time.elapsed().as_secs_f64(),
                    e.to_string(),
                );
            }

            pages += 1;
            rows += page_rows;
            offset += page_size;
        }
    }
}
