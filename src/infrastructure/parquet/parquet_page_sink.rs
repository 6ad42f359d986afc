//! Infrastructure adapter for accumulating pages into Parquet files.

use crate::domain::entities::Page;
use crate::domain::errors::{EtlError, Result};
use crate::ports::page_sink::PageSink;
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression as ParquetCompression;
use parquet::file::properties::WriterProperties;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Open writer state for one destination file.
///
/// The schema is fixed by the first page; the writer sits behind its own
/// lock so that writes to different destinations never contend. Only the
/// table run that owns a destination writes to it, so this inner lock is
/// uncontended in practice.
struct DestinationWriter {
    schema: Arc<Schema>,
    writer: Mutex<Option<ArrowWriter<File>>>,
}

/// Concrete implementation of `PageSink` writing one Parquet file per
/// destination.
///
/// The writer for a destination is opened lazily on the first page, so a
/// table that turns out to be empty leaves no file behind. Every page
/// becomes one record batch in the same file; `finish` closes the writer
/// and writes the Parquet footer. All columns are nullable Utf8, matching
/// the stringly-typed pages the extractor produces.
///
/// The registry lock is held only to look up or create a destination's
/// writer handle, never across batch encoding or file I/O, so concurrent
/// table runs stream to their own files independently.
pub struct ParquetPageSink {
    compression: Option<String>,
    writers: Mutex<HashMap<String, Arc<DestinationWriter>>>,
}

impl ParquetPageSink {
    /// Creates a new ParquetPageSink. `compression` names a Parquet codec
    /// (snappy when absent).
    pub fn new(compression: Option<String>) -> Self {
        Self {
            compression,
            writers: Mutex::new(HashMap::new()),
        }
    }

    fn map_compression(&self) -> ParquetCompression {
        match self
            .compression
            .as_deref()
            .unwrap_or("snappy")
            .to_lowercase()
            .as_str()
        {
            "snappy" => ParquetCompression::SNAPPY,
            "gzip" => ParquetCompression::GZIP(Default::default()),
            "lzo" => ParquetCompression::LZO,
            "brotli" => ParquetCompression::BROTLI(Default::default()),
            "lz4" => ParquetCompression::LZ4,
            "zstd" => ParquetCompression::ZSTD(Default::default()),
            "none" => ParquetCompression::UNCOMPRESSED,
            _ => ParquetCompression::SNAPPY,
        }
    }

    fn open_writer(&self, destination: &str, page: &Page) -> Result<Arc<DestinationWriter>> {
        let write_err = |reason: String| EtlError::WriteError {
            destination: destination.to_string(),
            reason,
        };

        if let Some(parent) = Path::new(destination).parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let fields: Vec<Field> = page
            .columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let file = File::create(destination).map_err(|e| write_err(e.to_string()))?;
        let props = WriterProperties::builder()
            .set_compression(self.map_compression())
            .build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
            .map_err(|e| write_err(e.to_string()))?;

        Ok(Arc::new(DestinationWriter {
            schema,
            writer: Mutex::new(Some(writer)),
        }))
    }

    /// Fetches the destination's writer handle, creating it on the first
    /// page. The registry lock is released before the caller touches the
    /// writer itself.
    fn writer_for(&self, destination: &str, page: &Page) -> Result<Arc<DestinationWriter>> {
        let mut writers = self.writers.lock().map_err(|_| EtlError::WriteError {
            destination: destination.to_string(),
            reason: "writer registry poisoned".to_string(),
        })?;

        match writers.entry(destination.to_string()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(v) => {
                let dest = self.open_writer(destination, page)?;
                v.insert(dest.clone());
                Ok(dest)
            }
        }
    }
}

impl PageSink for ParquetPageSink {
    fn write_page(&self, destination: &str, page: &Page) -> Result<()> {
        let write_err = |reason: String| EtlError::WriteError {
            destination: destination.to_string(),
            reason,
        };

        let dest = self.writer_for(destination, page)?;

        // Transpose the row-major page into one StringArray per column.
        // Missing trailing values in a ragged row become NULLs rather
        // than a panic.
        let arrays: Vec<ArrayRef> = (0..page.columns.len())
            .map(|col| {
                let values: Vec<Option<String>> = page
                    .rows
                    .iter()
                    .map(|row| row.get(col).cloned().flatten())
                    .collect();
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();

        let batch = RecordBatch::try_new(dest.schema.clone(), arrays)
            .map_err(|e| write_err(e.to_string()))?;

        let mut writer = dest
            .writer
            .lock()
            .map_err(|_| write_err("writer poisoned".to_string()))?;
        match writer.as_mut() {
            Some(w) => w.write(&batch).map_err(|e| write_err(e.to_string())),
            None => Err(write_err("destination already closed".to_string())),
        }
    }

    fn finish(&self, destination: &str) -> Result<()> {
        let write_err = |reason: String| EtlError::WriteError {
            destination: destination.to_string(),
            reason,
        };

        // No entry means the table produced zero pages: nothing to close,
        // and no file was ever created.
        let dest = {
            let mut writers = self
                .writers
                .lock()
                .map_err(|_| write_err("writer registry poisoned".to_string()))?;
            match writers.remove(destination) {
                Some(dest) => dest,
                None => return Ok(()),
            }
        };

        let mut writer = dest
            .writer
            .lock()
            .map_err(|_| write_err("writer poisoned".to_string()))?;
        if let Some(w) = writer.take() {
            w.close().map_err(|e| write_err(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn page_of(offset: u64, rows: usize) -> Page {
        Page {
            offset,
            columns: vec!["ID".to_string(), "NAME".to_string()],
            rows: (0..rows)
                .map(|i| {
                    let id = offset + i as u64;
                    vec![Some(id.to_string()), Some(format!("row-{}", id))]
                })
                .collect(),
        }
    }

    fn read_rows(dest: &str) -> usize {
        let file = File::open(dest).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        reader.map(|batch| batch.unwrap().num_rows()).sum()
    }

    #[test]
    fn test_map_compression() {
        assert_eq!(
            ParquetPageSink::new(None).map_compression(),
            ParquetCompression::SNAPPY
        );
        assert_eq!(
            ParquetPageSink::new(Some("zstd".to_string())).map_compression(),
            ParquetCompression::ZSTD(Default::default())
        );
        assert_eq!(
            ParquetPageSink::new(Some("none".to_string())).map_compression(),
            ParquetCompression::UNCOMPRESSED
        );
        assert_eq!(
            ParquetPageSink::new(Some("invalid".to_string())).map_compression(),
            ParquetCompression::SNAPPY
        );
    }

    #[test]
    fn test_pages_accumulate_in_one_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir
            .path()
            .join("ORDERS.parquet")
            .to_str()
            .unwrap()
            .to_string();

        let sink = ParquetPageSink::new(None);
        sink.write_page(&dest, &page_of(0, 100)).unwrap();
        sink.write_page(&dest, &page_of(100, 40)).unwrap();
        sink.finish(&dest).unwrap();

        assert_eq!(read_rows(&dest), 140);
    }

    #[test]
    fn test_null_values_survive_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir
            .path()
            .join("NULLS.parquet")
            .to_str()
            .unwrap()
            .to_string();

        let page = Page {
            offset: 0,
            columns: vec!["ID".to_string()],
            rows: vec![vec![Some("1".to_string())], vec![None]],
        };

        let sink = ParquetPageSink::new(None);
        sink.write_page(&dest, &page).unwrap();
        sink.finish(&dest).unwrap();

        let file = File::open(&dest).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).null_count(), 1);
    }

    #[test]
    fn test_ragged_rows_become_nulls_not_panics() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir
            .path()
            .join("RAGGED.parquet")
            .to_str()
            .unwrap()
            .to_string();

        // Second row is one value short of the column list.
        let page = Page {
            offset: 0,
            columns: vec!["ID".to_string(), "NAME".to_string()],
            rows: vec![
                vec![Some("1".to_string()), Some("alpha".to_string())],
                vec![Some("2".to_string())],
            ],
        };

        let sink = ParquetPageSink::new(None);
        sink.write_page(&dest, &page).unwrap();
        sink.finish(&dest).unwrap();

        let file = File::open(&dest).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).null_count(), 0);
        assert_eq!(batch.column(1).null_count(), 1);
    }

    #[test]
    fn test_finish_without_writes_creates_no_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir
            .path()
            .join("EMPTY.parquet")
            .to_str()
            .unwrap()
            .to_string();

        let sink = ParquetPageSink::new(None);
        sink.finish(&dest).unwrap();
        assert!(!Path::new(&dest).exists());
    }

    #[test]
    fn test_finish_makes_rows_durable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir
            .path()
            .join("CLOSED.parquet")
            .to_str()
            .unwrap()
            .to_string();

        let sink = ParquetPageSink::new(None);
        sink.write_page(&dest, &page_of(0, 10)).unwrap();
        sink.finish(&dest).unwrap();

        assert_eq!(read_rows(&dest), 10);
    }

    #[test]
    fn test_independent_destinations_write_concurrently() {
        let temp_dir = tempfile::tempdir().unwrap();
        let big = temp_dir
            .path()
            .join("BIG.parquet")
            .to_str()
            .unwrap()
            .to_string();
        let small = temp_dir
            .path()
            .join("SMALL.parquet")
            .to_str()
            .unwrap()
            .to_string();

        // Gzip keeps the big write busy long enough for the other thread
        // to land several small writes in the meantime.
        let sink = Arc::new(ParquetPageSink::new(Some("gzip".to_string())));
        let big_in_flight = Arc::new(AtomicBool::new(false));
        let big_done = Arc::new(AtomicBool::new(false));

        let writer_sink = sink.clone();
        let writer_started = big_in_flight.clone();
        let writer_done = big_done.clone();
        let big_dest = big.clone();
        let handle = std::thread::spawn(move || {
            writer_started.store(true, Ordering::SeqCst);
            writer_sink.write_page(&big_dest, &page_of(0, 300_000)).unwrap();
            writer_done.store(true, Ordering::SeqCst);
        });

        while !big_in_flight.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        // Writes to the other destination must proceed while the big
        // write is still running; a registry-wide lock would queue every
        // one of them behind it.
        let mut landed_during_big = 0u64;
        let mut offset = 0u64;
        while !big_done.load(Ordering::SeqCst) {
            sink.write_page(&small, &page_of(offset, 1)).unwrap();
            offset += 1;
            if !big_done.load(Ordering::SeqCst) {
                landed_during_big += 1;
            }
        }
        handle.join().unwrap();

        assert!(
            landed_during_big >= 1,
            "no write to an independent destination completed while another \
             table's write was in flight"
        );

        sink.finish(&big).unwrap();
        sink.finish(&small).unwrap();
        assert_eq!(read_rows(&big), 300_000);
        assert_eq!(read_rows(&small), offset as usize);
    }
}
