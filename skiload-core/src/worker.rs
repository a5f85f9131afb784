use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Phase, TimeWindow};
use crate::executor::{
    LIFT_RIDES_PATH, LiftRide, RequestExecutor, SKIER_DAY_VERTICAL_PATH, VerticalQuery,
};
use crate::sample::{RequestMethod, Sample, TRANSPORT_ERROR_STATUS};
use crate::signal::FinishGuard;
use crate::store::{RunCounters, SampleStore};

/// Inclusive skier id range owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub low: u32,
    pub high: u32,
}

impl IdRange {
    /// Number of ids in the range; never zero.
    pub fn size(&self) -> u32 {
        self.high - self.low + 1
    }
}

/// Splits `1..=total` into `parts` contiguous ranges of `total / parts` ids; the last range
/// also takes the remainder.
///
/// Callers validate `parts > 0` and `total >= parts`.
pub fn partition(total: u32, parts: u32) -> Vec<IdRange> {
    if parts == 0 || total < parts {
        return Vec::new();
    }
    let size = total / parts;
    (0..parts)
        .map(|i| {
            let low = i * size + 1;
            let high = if i + 1 == parts { total } else { low + size - 1 };
            IdRange { low, high }
        })
        .collect()
}

/// Request-shape constants shared by every worker of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub resort_id: Arc<str>,
    pub ski_day: u32,
    /// Lift ids are drawn from `0..lift_count`.
    pub lift_count: u32,
}

/// One worker's slice of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAssignment {
    pub phase: Phase,
    /// 0-based index within the phase.
    pub worker: u32,
    pub skiers: IdRange,
    pub time_window: TimeWindow,
    pub writes: u32,
    pub reads: u32,
}

pub(crate) struct Worker<E> {
    pub(crate) assignment: WorkAssignment,
    pub(crate) workload: Arc<Workload>,
    pub(crate) executor: Arc<E>,
    pub(crate) store: Arc<SampleStore>,
    pub(crate) counters: Arc<RunCounters>,
    /// Requests issued by every worker of this phase.
    pub(crate) phase_requests: Arc<AtomicU64>,
}

impl<E: RequestExecutor> Worker<E> {
    /// Issues the write quota, then the read quota, then hands the batch to the store.
    ///
    /// `done` is dropped last, so the phase only sees this worker as finished once its
    /// samples are visible in the store.
    pub(crate) async fn run(self, done: FinishGuard) {
        let _done = done;
        let a = &self.assignment;
        let mut rng = StdRng::from_entropy();
        let mut batch = Vec::with_capacity(a.writes as usize + a.reads as usize);

        let write_path: Arc<str> = Arc::from(LIFT_RIDES_PATH);
        let read_path: Arc<str> = Arc::from(SKIER_DAY_VERTICAL_PATH);

        for _ in 0..a.writes {
            let ride = LiftRide {
                resort_id: self.workload.resort_id.to_string(),
                day_id: self.workload.ski_day,
                skier_id: rng.gen_range(a.skiers.low..=a.skiers.high),
                time: rng.gen_range(a.time_window.low..=a.time_window.high),
                lift_id: rng.gen_range(0..self.workload.lift_count),
            };
            let sample = self
                .timed(RequestMethod::Post, &write_path, self.executor.write(&ride))
                .await;
            batch.push(sample);
        }

        for _ in 0..a.reads {
            let query = VerticalQuery {
                resort_id: self.workload.resort_id.to_string(),
                day_id: self.workload.ski_day,
                skier_id: rng.gen_range(a.skiers.low..=a.skiers.high),
            };
            let sample = self
                .timed(RequestMethod::Get, &read_path, self.executor.read(&query))
                .await;
            batch.push(sample);
        }

        self.store.append(batch);
    }

    async fn timed<F, Err>(&self, method: RequestMethod, path: &Arc<str>, request: F) -> Sample
    where
        F: Future<Output = Result<u16, Err>>,
        Err: Display,
    {
        let start_time_ms = epoch_millis();
        let started = Instant::now();
        let result = request.await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let status = match result {
            Ok(status) => {
                if !(200..300).contains(&status) {
                    self.counters.record_failed();
                    tracing::warn!(
                        phase = %self.assignment.phase,
                        worker = self.assignment.worker,
                        %method,
                        %path,
                        status,
                        "request returned non-2xx status"
                    );
                }
                status
            }
            Err(err) => {
                self.counters.record_failed();
                tracing::warn!(
                    phase = %self.assignment.phase,
                    worker = self.assignment.worker,
                    %method,
                    %path,
                    error = %err,
                    "request failed"
                );
                TRANSPORT_ERROR_STATUS
            }
        };

        self.counters.record_completed();
        self.phase_requests.fetch_add(1, Ordering::Relaxed);

        Sample {
            method,
            path: path.clone(),
            start_time_ms,
            latency_ms,
            status,
        }
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
