// crates/quality-gate-core/src/core/time.rs
// ============================================================================
// Module: Quality Gate Time Model
// Description: Canonical timestamps and the injected clock capability.
// Purpose: Keep engine decisions replayable by never reading wall-clock time directly.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every timer decision in the engine (review gating, fast-approval
//! detection, stale-review archival) reads time through the [`Clock`]
//! capability. Production wiring injects [`SystemClock`]; tests inject a
//! manual clock so timer boundaries are exact rather than sleep-based.
//! Timestamps are unix epoch milliseconds with a stable wire form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used across all persisted records.
///
/// # Invariants
/// - Values are unix epoch milliseconds; ordering follows integer ordering.
/// - No monotonicity is enforced by the type; stores stamp rows from one clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp advanced by the provided duration (saturating).
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Returns the timestamp moved back by the provided duration (saturating).
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }

    /// Returns elapsed whole seconds from `earlier` to `self`, clamped at zero.
    #[must_use]
    pub const fn seconds_since(self, earlier: Self) -> i64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta / 1_000 }
    }

    /// Renders the timestamp as an RFC3339 string for human-facing records.
    ///
    /// Falls back to the raw millisecond value when the timestamp is outside
    /// the representable datetime range.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let nanos = i128::from(self.0).saturating_mul(1_000_000);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .and_then(|datetime| datetime.format(&Rfc3339).ok())
            .unwrap_or_else(|| format!("unix_millis:{}", self.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Clock Capability
// ============================================================================

/// Clock capability injected into engines and stores.
///
/// # Invariants
/// - Implementations must be monotone enough for audit ordering; the engine
///   tolerates equal consecutive readings but not backward jumps mid-operation.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock implementation used in production wiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_unix_millis(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}
