//! Identity resolution and market valuation for scraped used-firearm listings.
//!
//! Raw listings are fingerprinted, valued, resolved against the stored inventory
//! projection once per scrape pass, and appended to a per-fingerprint price log that
//! feeds the trend and deal views.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod fingerprint;
pub mod ingest;
pub mod resolver;
pub mod runner;
pub mod state;
pub mod types;
