pub mod parquet_page_sink;
