use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::sample::Sample;

/// Append-only collection of per-worker sample batches.
#[derive(Debug, Default)]
pub struct SampleStore {
    batches: Mutex<Vec<Vec<Sample>>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one worker's batch. Called once per worker, after its quota is exhausted.
    pub fn append(&self, batch: Vec<Sample>) {
        if batch.is_empty() {
            return;
        }
        self.batches.lock().push(batch);
    }

    pub fn len(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Takes every sample out of the store, flattening the batches in append order.
    pub fn drain(&self) -> Vec<Sample> {
        let batches = std::mem::take(&mut *self.batches.lock());
        let mut out = Vec::with_capacity(batches.iter().map(Vec::len).sum());
        for batch in batches {
            out.extend(batch);
        }
        out
    }
}

/// Counters shared by every worker of one run.
#[derive(Debug, Default)]
pub struct RunCounters {
    failed: AtomicU64,
    completed: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests that returned a non-2xx status or never got a response.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Requests issued so far, successful or not.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}
