use std::{thread, time::Duration};

/// Contains config properties shared by both ends of a session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Number of units accumulated before a batch is handed to the peer
    pub batch_size: usize,
    /// Deadline of every round trip, outbound RPCs and inbound batch waits alike
    pub timeout: Duration,
    /// Size of the worker pool that encodes trees for the peer
    pub worker_threads: usize,
    /// Batches an encode task may run ahead of the peer's pulls
    pub pending_batches: usize,
    /// Whether the refs this side hands out are held weakly, so that values
    /// dropped from every tree do not stay alive for the life of the session
    pub weak_local_refs: bool,
    /// Logs every unit sent and received at trace level
    pub trace_units: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            timeout: Duration::from_secs(30),
            worker_threads: thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(4),
            pending_batches: 4,
            weak_local_refs: true,
            trace_units: false,
        }
    }
}
