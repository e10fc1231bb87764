//! Shared health state for the /health endpoint.
//! Updated by the engine after every pass, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// False after a pass failed, true again after the next successful one.
    pub storage_ok: AtomicBool,
    /// Nanosecond timestamp of the last completed pass, successful or not (0 = none).
    pub last_pass_at_ns: AtomicU64,
    pub passes_ok: AtomicU64,
    pub passes_failed: AtomicU64,
    /// Fingerprints touched by the last successful pass.
    pub last_pass_listings: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            storage_ok: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn record_pass_ok(&self, at_ns: u64, listings: u64) {
        self.storage_ok.store(true, Ordering::Relaxed);
        self.last_pass_at_ns.store(at_ns, Ordering::Relaxed);
        self.last_pass_listings.store(listings, Ordering::Relaxed);
        self.passes_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_failed(&self, at_ns: u64) {
        self.storage_ok.store(false, Ordering::Relaxed);
        self.last_pass_at_ns.store(at_ns, Ordering::Relaxed);
        self.passes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn storage_ok(&self) -> bool {
        self.storage_ok.load(Ordering::Relaxed)
    }

    pub fn last_pass_at_ns(&self) -> u64 {
        self.last_pass_at_ns.load(Ordering::Relaxed)
    }

    pub fn passes_ok(&self) -> u64 {
        self.passes_ok.load(Ordering::Relaxed)
    }

    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }

    pub fn last_pass_listings(&self) -> u64 {
        self.last_pass_listings.load(Ordering::Relaxed)
    }
}
