pub mod page_extractor;
pub mod page_sink;
