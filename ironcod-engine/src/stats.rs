/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Framer counters.
//!
//! Written by the framer thread, read from anywhere.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the control loop.
#[derive(Debug, Default)]
pub struct FramerStats {
    events_processed: AtomicU64,
    events_rejected: AtomicU64,
    timers_armed: AtomicU64,
    timers_cancelled: AtomicU64,
    timeouts_delivered: AtomicU64,
    handler_failures: AtomicU64,
    anomalies: AtomicU64,
}

impl FramerStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_armed(&self) {
        self.timers_armed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.timers_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.timeouts_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            timers_armed: self.timers_armed.load(Ordering::Relaxed),
            timers_cancelled: self.timers_cancelled.load(Ordering::Relaxed),
            timeouts_delivered: self.timeouts_delivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
        }
    }
}

/// Copy of the framer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Session events applied, including ignored duplicates.
    pub events_processed: u64,
    /// Session events dropped because they failed.
    pub events_rejected: u64,
    /// Timeouts armed.
    pub timers_armed: u64,
    /// Timeouts cancelled before expiry.
    pub timers_cancelled: u64,
    /// Timeouts delivered to the handler, successfully or not.
    pub timeouts_delivered: u64,
    /// Handler calls that returned an error or panicked.
    pub handler_failures: u64,
    /// Internal inconsistencies that were discarded.
    pub anomalies: u64,
}
