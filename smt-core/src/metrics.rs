// SPDX-License-Identifier: MIT
//
// SMT Data Interaction Client

//! Client-side request metrics

use crate::Error;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const LATENCY_WINDOW: usize = 1000;

/// Counters shared by every clone of a client
#[derive(Clone)]
pub struct ClientMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    // Public client calls and their failures
    operations_total: AtomicU64,
    operations_failed: AtomicU64,

    // POSTs actually attempted
    requests_total: AtomicU64,

    // Failures by origin
    local_rejections: AtomicU64,
    server_errors: AtomicU64,
    transport_failures: AtomicU64,

    samples_sent: AtomicU64,

    // Latency tracking (microseconds)
    request_latencies: RwLock<Vec<u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub operations_total: u64,
    pub operations_failed: u64,
    pub requests_total: u64,
    pub local_rejections: u64,
    pub server_errors: u64,
    pub transport_failures: u64,
    pub samples_sent: u64,
    pub latency_p50_micros: Option<u64>,
    pub latency_p99_micros: Option<u64>,
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                operations_total: AtomicU64::new(0),
                operations_failed: AtomicU64::new(0),
                requests_total: AtomicU64::new(0),
                local_rejections: AtomicU64::new(0),
                server_errors: AtomicU64::new(0),
                transport_failures: AtomicU64::new(0),
                samples_sent: AtomicU64::new(0),
                request_latencies: RwLock::new(Vec::with_capacity(LATENCY_WINDOW)),
            }),
        }
    }

    /// Record a finished client call, successful or not
    pub fn record_operation(&self) {
        self.inner.operations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a POST about to be sent
    pub fn record_request(&self) {
        self.inner.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the latency of a completed round-trip
    pub fn record_latency(&self, latency_micros: u64) {
        let mut latencies = self.inner.request_latencies.write();
        latencies.push(latency_micros);
        if latencies.len() > LATENCY_WINDOW {
            latencies.drain(0..LATENCY_WINDOW / 2);
        }
    }

    pub fn record_samples_sent(&self, count: usize) {
        self.inner.samples_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a failed operation, classified by where it failed
    pub fn record_failure(&self, error: &Error) {
        self.inner.operations_failed.fetch_add(1, Ordering::Relaxed);

        let counter = match error {
            e if e.is_local() => &self.inner.local_rejections,
            Error::Transport(_) => &self.inner.transport_failures,
            _ => &self.inner.server_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn operations_total(&self) -> u64 {
        self.inner.operations_total.load(Ordering::Relaxed)
    }

    pub fn operations_failed(&self) -> u64 {
        self.inner.operations_failed.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.inner.requests_total.load(Ordering::Relaxed)
    }

    pub fn samples_sent(&self) -> u64 {
        self.inner.samples_sent.load(Ordering::Relaxed)
    }

    pub fn latency_percentile(&self, percentile: f64) -> Option<u64> {
        let latencies = self.inner.request_latencies.read();
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() as f64 * percentile).ceil() as usize).min(sorted.len() - 1);
        Some(sorted[index])
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
            operations_total: self.operations_total(),
            operations_failed: self.operations_failed(),
            requests_total: self.requests_total(),
            local_rejections: self.inner.local_rejections.load(Ordering::Relaxed),
            server_errors: self.inner.server_errors.load(Ordering::Relaxed),
            transport_failures: self.inner.transport_failures.load(Ordering::Relaxed),
            samples_sent: self.samples_sent(),
            latency_p50_micros: self.latency_percentile(0.50),
            latency_p99_micros: self.latency_percentile(0.99),
        }
    }
}
