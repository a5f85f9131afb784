use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::config::PhaseSpec;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::progress::PhaseEvent;
use crate::signal::PhaseSignal;
use crate::store::{RunCounters, SampleStore};
use crate::worker::{WorkAssignment, Worker, Workload, partition};

/// Spawns the workers of a phase onto the current tokio runtime.
pub struct PhaseOrchestrator<E> {
    executor: Arc<E>,
    workload: Arc<Workload>,
    skier_count: u32,
    store: Arc<SampleStore>,
    counters: Arc<RunCounters>,
}

impl<E: RequestExecutor> PhaseOrchestrator<E> {
    pub fn new(
        executor: Arc<E>,
        workload: Arc<Workload>,
        skier_count: u32,
        store: Arc<SampleStore>,
        counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            executor,
            workload,
            skier_count,
            store,
            counters,
        }
    }

    /// Partitions the skier ids across `spec.thread_count` workers and spawns one task per
    /// range. Returns as soon as every task is spawned.
    pub fn launch(&self, spec: PhaseSpec) -> Result<PhaseHandle> {
        spec.validate(self.skier_count)?;

        let signal = PhaseSignal::new();
        let requests = Arc::new(AtomicU64::new(0));
        let ranges = partition(self.skier_count, spec.thread_count);

        let tasks = ranges
            .into_iter()
            .zip(0u32..)
            .map(|(skiers, worker)| {
                let w = Worker {
                    assignment: WorkAssignment {
                        phase: spec.phase,
                        worker,
                        skiers,
                        time_window: spec.time_window,
                        writes: spec.writes_per_worker,
                        reads: spec.reads_per_worker,
                    },
                    workload: self.workload.clone(),
                    executor: self.executor.clone(),
                    store: self.store.clone(),
                    counters: self.counters.clone(),
                    phase_requests: requests.clone(),
                };
                let done = signal.guard();
                tokio::spawn(w.run(done))
            })
            .collect();

        tracing::debug!(
            phase = %spec.phase,
            threads = spec.thread_count,
            trigger_threshold = spec.trigger_threshold,
            "phase launched"
        );

        Ok(PhaseHandle {
            spec,
            signal,
            tasks,
            requests,
            launched_at: Instant::now(),
        })
    }
}

/// A running phase. Both waits observe the same finished-worker count.
#[derive(Debug)]
pub struct PhaseHandle {
    spec: PhaseSpec,
    signal: PhaseSignal,
    tasks: Vec<JoinHandle<()>>,
    requests: Arc<AtomicU64>,
    launched_at: Instant,
}

impl PhaseHandle {
    pub fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    /// Workers that have finished their quota (or unwound).
    pub fn finished(&self) -> u32 {
        self.signal.finished()
    }

    pub fn requests_completed(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Cheap, clonable view used to report progress from another task.
    pub fn probe(&self) -> PhaseProbe {
        PhaseProbe {
            spec: self.spec,
            signal: self.signal.clone(),
            requests: self.requests.clone(),
        }
    }

    /// Resolves once `trigger_threshold` workers have finished; immediately for 0.
    pub async fn wait_trigger(&self) {
        self.signal.wait_for(self.spec.trigger_threshold).await;
        tracing::debug!(
            phase = %self.spec.phase,
            finished = self.signal.finished(),
            "phase trigger reached"
        );
    }

    /// Waits for every worker, then joins their tasks. A panicked worker surfaces here as
    /// an error; its siblings have still run to completion.
    ///
    /// Returns the time since launch.
    pub async fn wait_completion(self) -> Result<Duration> {
        self.signal.wait_for(self.spec.thread_count).await;
        for task in self.tasks {
            task.await?;
        }
        let elapsed = self.launched_at.elapsed();
        tracing::debug!(
            phase = %self.spec.phase,
            requests = self.requests.load(Ordering::Relaxed),
            elapsed_ms = elapsed.as_millis() as u64,
            "phase completed"
        );
        Ok(elapsed)
    }
}

#[derive(Debug, Clone)]
pub struct PhaseProbe {
    spec: PhaseSpec,
    signal: PhaseSignal,
    requests: Arc<AtomicU64>,
}

impl PhaseProbe {
    pub fn is_done(&self) -> bool {
        self.signal.finished() >= self.spec.thread_count
    }

    pub fn requests_completed(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PhaseEvent {
        PhaseEvent::Progress {
            phase: self.spec.phase,
            requests_completed: self.requests.load(Ordering::Relaxed),
            expected_requests: self.spec.expected_requests(),
            workers_finished: self.signal.finished(),
            thread_count: self.spec.thread_count,
        }
    }
}
