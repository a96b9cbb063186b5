// src/services/mod.rs
pub mod cache;
pub mod fetcher;
pub mod financials;
pub mod importer;
pub mod metrics;
pub mod number;
pub mod profile;
pub mod report;
pub mod share_count;
