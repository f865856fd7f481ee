//! Timing interceptor for measuring statement execution time.

use super::interceptor::Interceptor;
use super::invocation::{Invocation, Reply};
use super::kind::ComponentResult;
use super::signature::Signature;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Result of timing a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingResult {
    /// Execution time in nanoseconds.
    pub duration_ns: u64,
    /// Execution time in microseconds.
    pub duration_us: u64,
    /// Execution time in milliseconds.
    pub duration_ms: u64,
}

impl TimingResult {
    /// Create from a duration.
    pub fn from_nanos(ns: u64) -> Self {
        Self {
            duration_ns: ns,
            duration_us: ns / 1000,
            duration_ms: ns / 1_000_000,
        }
    }
}

/// Interceptor that measures execution time of intercepted calls.
///
/// Times `Executor::update` and `Executor::query` by default. Failed calls
/// are timed too and counted separately.
#[derive(Debug)]
pub struct TimingInterceptor {
    signatures: Vec<Signature>,
    /// Total execution time in nanoseconds.
    total_time_ns: AtomicU64,
    /// Number of calls timed.
    call_count: AtomicU64,
    /// Number of calls that failed.
    failure_count: AtomicU64,
    /// Duration of the most recent call.
    last_time_ns: AtomicU64,
}

impl TimingInterceptor {
    /// Create a new timing interceptor.
    pub fn new() -> Self {
        Self::with_signatures(vec![Signature::executor("update"), Signature::executor("query")])
    }

    /// Create a timing interceptor for custom operations.
    pub fn with_signatures(signatures: Vec<Signature>) -> Self {
        Self {
            signatures,
            total_time_ns: AtomicU64::new(0),
            call_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_time_ns: AtomicU64::new(0),
        }
    }

    /// Get the total execution time in nanoseconds.
    pub fn total_time_ns(&self) -> u64 {
        self.total_time_ns.load(Ordering::Relaxed)
    }

    /// Get the total execution time in microseconds.
    pub fn total_time_us(&self) -> u64 {
        self.total_time_ns() / 1000
    }

    /// Get the total execution time in milliseconds.
    pub fn total_time_ms(&self) -> u64 {
        self.total_time_ns() / 1_000_000
    }

    /// Get the number of calls timed.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the number of failed calls.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Timing of the most recent call.
    pub fn last(&self) -> TimingResult {
        TimingResult::from_nanos(self.last_time_ns.load(Ordering::Relaxed))
    }

    /// Get the average execution time in nanoseconds.
    pub fn avg_time_ns(&self) -> u64 {
        let count = self.call_count();
        if count == 0 {
            0
        } else {
            self.total_time_ns() / count
        }
    }

    /// Get the average execution time in microseconds.
    pub fn avg_time_us(&self) -> u64 {
        self.avg_time_ns() / 1000
    }

    /// Reset timing statistics.
    pub fn reset(&self) {
        self.total_time_ns.store(0, Ordering::SeqCst);
        self.call_count.store(0, Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.last_time_ns.store(0, Ordering::SeqCst);
    }
}

impl Default for TimingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for TimingInterceptor {
    fn signatures(&self) -> Vec<Signature> {
        self.signatures.clone()
    }

    fn intercept(&self, invocation: Invocation) -> ComponentResult<Reply> {
        let start = Instant::now();

        let result = invocation.proceed();

        let elapsed_ns = start.elapsed().as_nanos() as u64;
        self.total_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        self.last_time_ns.store(elapsed_ns, Ordering::Relaxed);
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    fn name(&self) -> &'static str {
        "TimingInterceptor"
    }
}
