use regex::Regex;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI64, Ordering};

/// Skews at or below this are noise and not worth correcting.
pub const MIN_SKEW_MS: i64 = 100;
/// Skews at or above this are not plausibly clock drift.
pub const MAX_SKEW_MS: i64 = 30_000;

static REQ_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"req_timestamp\[(-?\d+)\]").expect("valid regex"));
static SERVER_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"server_timestamp\[(-?\d+)\]").expect("valid regex"));

/// Timestamps extracted from a recv-window rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkewReport {
    pub request_ms: i64,
    pub server_ms: i64,
}

impl SkewReport {
    /// Parse `req_timestamp[...]` and `server_timestamp[...]` out of an error message.
    pub fn parse(message: &str) -> Option<Self> {
        let request_ms = capture_i64(&REQ_TIMESTAMP, message)?;
        let server_ms = capture_i64(&SERVER_TIMESTAMP, message)?;
        Some(Self {
            request_ms,
            server_ms,
        })
    }

    /// Positive when the server clock is ahead of ours
    pub fn skew_ms(&self) -> i64 {
        self.server_ms - self.request_ms
    }
}

fn capture_i64(pattern: &Regex, message: &str) -> Option<i64> {
    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkewDecision {
    /// Message carries no timestamp pair
    NotClockError,
    /// Offset adjusted by `skew_ms`; the request should be retried
    Applied { skew_ms: i64 },
    /// Skew detected but outside the plausible band; left uncorrected
    OutOfBand { skew_ms: i64 },
}

/// Persistent per-client offset added to every signed timestamp
#[derive(Debug, Default)]
pub struct ClockSkewCompensator {
    offset_ms: AtomicI64,
}

impl ClockSkewCompensator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    /// Local time corrected by the learned offset
    pub fn adjust(&self, local_ms: i64) -> i64 {
        local_ms + self.offset_ms()
    }

    /// Inspect an exchange error message and correct the offset if it reports drift.
    ///
    /// The request timestamp in the message already includes the current
    /// offset, so the measured skew is added on top of it.
    pub fn observe(&self, message: &str) -> SkewDecision {
        let Some(report) = SkewReport::parse(message) else {
            return SkewDecision::NotClockError;
        };

        let skew_ms = report.skew_ms();
        let magnitude = skew_ms.abs();
        if magnitude <= MIN_SKEW_MS || magnitude >= MAX_SKEW_MS {
            log::warn!(
                "Clock skew of {}ms (request {}, server {}) outside correctable range {}..{}ms; not applying",
                skew_ms,
                report.request_ms,
                report.server_ms,
                MIN_SKEW_MS,
                MAX_SKEW_MS
            );
            return SkewDecision::OutOfBand { skew_ms };
        }

        let previous = self.offset_ms.fetch_add(skew_ms, Ordering::Relaxed);
        log::warn!(
            "Clock skew of {}ms detected; timestamp offset now {}ms",
            skew_ms,
            previous + skew_ms
        );
        SkewDecision::Applied { skew_ms }
    }
}
