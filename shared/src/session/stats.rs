use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub encode_tasks_started: u64,
    pub batches_sent: u64,
    pub batches_received: u64,
    pub trees_sent: u64,
    pub trees_received: u64,
}

#[derive(Default)]
pub(crate) struct StatCounters {
    pub encode_tasks_started: AtomicU64,
    pub batches_sent: AtomicU64,
    pub batches_received: AtomicU64,
    pub trees_sent: AtomicU64,
    pub trees_received: AtomicU64,
}

impl StatCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            encode_tasks_started: self.encode_tasks_started.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            trees_sent: self.trees_sent.load(Ordering::Relaxed),
            trees_received: self.trees_received.load(Ordering::Relaxed),
        }
    }
}
