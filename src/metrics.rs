//! Process-wide counters for the world core.
//! Cheap relaxed atomics; read with [`snapshot`] for status output and tests.
use std::sync::atomic::{AtomicU64, Ordering};

static SESSIONS_OPENED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_CLOSED: AtomicU64 = AtomicU64::new(0);
static STIMULI_DELIVERED: AtomicU64 = AtomicU64::new(0);
static STIMULI_DROPPED: AtomicU64 = AtomicU64::new(0);
static WRITES_DROPPED: AtomicU64 = AtomicU64::new(0);
static TAKES: AtomicU64 = AtomicU64::new(0);
static DROPS: AtomicU64 = AtomicU64::new(0);
static INTERACTIONS_REJECTED: AtomicU64 = AtomicU64::new(0);
static INVARIANT_VIOLATIONS: AtomicU64 = AtomicU64::new(0);

pub fn inc_sessions_opened() {
    SESSIONS_OPENED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sessions_closed() {
    SESSIONS_CLOSED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_stimuli_delivered() {
    STIMULI_DELIVERED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_stimuli_dropped() {
    STIMULI_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_writes_dropped() {
    WRITES_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_takes() {
    TAKES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_drops() {
    DROPS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_interactions_rejected() {
    INTERACTIONS_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_invariant_violations() {
    INVARIANT_VIOLATIONS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub stimuli_delivered: u64,
    pub stimuli_dropped: u64,
    /// Replies discarded because a client stopped reading.
    pub writes_dropped: u64,
    pub takes: u64,
    pub drops: u64,
    pub interactions_rejected: u64,
    pub invariant_violations: u64,
}

impl MetricsSnapshot {
    /// Sessions that have been opened but not yet torn down.
    pub fn sessions_active(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        sessions_opened: SESSIONS_OPENED.load(Ordering::Relaxed),
        sessions_closed: SESSIONS_CLOSED.load(Ordering::Relaxed),
        stimuli_delivered: STIMULI_DELIVERED.load(Ordering::Relaxed),
        stimuli_dropped: STIMULI_DROPPED.load(Ordering::Relaxed),
        writes_dropped: WRITES_DROPPED.load(Ordering::Relaxed),
        takes: TAKES.load(Ordering::Relaxed),
        drops: DROPS.load(Ordering::Relaxed),
        interactions_rejected: INTERACTIONS_REJECTED.load(Ordering::Relaxed),
        invariant_violations: INVARIANT_VIOLATIONS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic() {
        let before = snapshot();
        inc_takes();
        inc_drops();
        inc_stimuli_delivered();
        inc_writes_dropped();
        let after = snapshot();
        assert!(after.takes > before.takes);
        assert!(after.drops > before.drops);
        assert!(after.stimuli_delivered > before.stimuli_delivered);
        assert!(after.writes_dropped > before.writes_dropped);
    }

    #[test]
    fn active_sessions_never_underflow() {
        let snap = MetricsSnapshot {
            sessions_opened: 1,
            sessions_closed: 3,
            ..Default::default()
        };
        assert_eq!(snap.sessions_active(), 0);
    }
}
