pub mod export;
pub mod filter;
pub mod provenance;
pub mod recorder;
