pub mod certificates;
pub mod data_sources;
