pub mod cache;
pub mod enrichment;
pub mod factory;
pub mod repositories;
pub mod sink;
