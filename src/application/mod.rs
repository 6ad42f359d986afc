pub mod orchestrator;
pub mod table_loader;
