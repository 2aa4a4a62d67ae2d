//! Wall-clock reconstruction from a steady clock base (spec §9 design note).
//!
//! Two clocks are read once, at process start: `SystemTime` (for the epoch
//! offset) and `Instant` (immune to clock jumps). Every subsequent `now_in_nano()`
//! reconstructs wall-clock time as `base.system_ns + (Instant::now() - base.instant)`,
//! so a leap-second adjustment or NTP step never moves the reactor's clock backward
//! mid-run. A `TimeReset` lets a late-joining engine resynchronize its base against
//! the process that published it.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch. i64 gives ~292 years of range.
pub type Nanos = i64;

pub const NANOS_PER_MICRO: i64 = 1_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Captured once at engine startup; never mutated except by an explicit `TimeReset`.
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    system_ns: Nanos,
    instant: Instant,
}

impl TimeBase {
    /// Record `(system_ns, steady_instant)` now.
    pub fn capture() -> Self {
        let system_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as i64;
        Self {
            system_ns,
            instant: Instant::now(),
        }
    }

    /// Reconstruct wall-clock nanoseconds from the steady offset since capture.
    pub fn now_in_nano(&self) -> Nanos {
        self.system_ns + self.instant.elapsed().as_nanos() as i64
    }

    /// Resynchronize against a `TimeReset` announcement from another process.
    pub fn reset(&mut self, observed_system_ns: Nanos) {
        self.system_ns = observed_system_ns;
        self.instant = Instant::now();
    }
}

/// Convenience free function equivalent to a process-global `TimeBase`, used by
/// call sites (page codec, writer) that do not carry their own base and only need
/// "now" for a `gen_time`/`trigger_time` default. Each call re-reads `SystemTime`;
/// hot paths should prefer an owned `TimeBase`.
pub fn now_in_nano() -> Nanos {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64
}

/// A small stable hash of a nanosecond timestamp, used to fold a writer's start
/// time into `current_frame_uid` (spec §4.3) so two writers that race-open their
/// very first page still mint distinguishable frame ids.
pub fn nano_hashed(nanos: Nanos) -> u32 {
    let bytes = nanos.to_le_bytes();
    crate::ids::hash_str_32(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_in_nano_is_monotone_non_decreasing() {
        let base = TimeBase::capture();
        let a = base.now_in_nano();
        let b = base.now_in_nano();
        assert!(b >= a);
    }

    #[test]
    fn reset_rebinds_the_base_without_going_backward_relative_to_itself() {
        let mut base = TimeBase::capture();
        let before = base.now_in_nano();
        base.reset(before + 10 * NANOS_PER_SEC);
        let after = base.now_in_nano();
        assert!(after >= before + 10 * NANOS_PER_SEC);
    }
}
