pub mod connection_manager;
pub mod oracle_page_extractor;
