use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{Phase, PhaseSpec, RunConfig};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::phase::{PhaseOrchestrator, PhaseProbe};
use crate::progress::{PhaseEvent, ProgressFn};
use crate::sample::Sample;
use crate::stats::{RunStatistics, RunTotals, StatisticsEngine};
use crate::store::{RunCounters, SampleStore};
use crate::worker::Workload;

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: Phase,
    /// From launch until the last worker finished.
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub specs: [PhaseSpec; 3],
    pub phases: Vec<PhaseTiming>,
    pub statistics: RunStatistics,
    /// Every recorded sample, in worker batch order.
    pub samples: Vec<Sample>,
}

/// Runs warmup, peak and cooldown with overlapping starts, then reduces the samples.
pub struct RunController<E> {
    config: RunConfig,
    executor: Arc<E>,
    progress: Option<ProgressFn>,
    progress_interval: Duration,
}

impl<E: RequestExecutor> RunController<E> {
    pub fn new(config: RunConfig, executor: Arc<E>) -> Self {
        Self {
            config,
            executor,
            progress: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        // Any invalid phase aborts before a single worker exists.
        let specs = self.config.phase_specs()?;

        let store = Arc::new(SampleStore::new());
        let counters = Arc::new(RunCounters::new());
        let workload = Arc::new(Workload {
            resort_id: Arc::from(self.config.resort_id.as_str()),
            ski_day: self.config.ski_day,
            lift_count: self.config.lift_count,
        });
        let orchestrator = PhaseOrchestrator::new(
            self.executor.clone(),
            workload,
            self.config.skier_count,
            store.clone(),
            counters.clone(),
        );

        let probes: Arc<Mutex<Vec<PhaseProbe>>> = Arc::new(Mutex::new(Vec::new()));
        // Dropped on every return path, including early errors below.
        let ticker = self.progress.as_ref().map(|progress| {
            ProgressTicker::spawn(progress.clone(), probes.clone(), self.progress_interval)
        });

        let started = Instant::now();
        let mut running = Vec::with_capacity(specs.len());
        for spec in specs {
            let handle = orchestrator.launch(spec)?;
            probes.lock().push(handle.probe());
            self.emit(PhaseEvent::Launched {
                phase: spec.phase,
                thread_count: spec.thread_count,
                trigger_threshold: spec.trigger_threshold,
                expected_requests: spec.expected_requests(),
                elapsed: started.elapsed(),
            });

            if !spec.phase.is_final() {
                handle.wait_trigger().await;
                self.emit(PhaseEvent::Triggered {
                    phase: spec.phase,
                    workers_finished: handle.finished(),
                    elapsed: started.elapsed(),
                });
            }
            running.push(handle);
        }

        // Cooldown first, then every earlier phase; each wait is independent so a failed
        // phase does not leave later ones unobserved.
        let mut phases = Vec::with_capacity(running.len());
        let mut first_err: Option<Error> = None;
        for handle in running.into_iter().rev() {
            let phase = handle.spec().phase;
            let probe = handle.probe();
            match handle.wait_completion().await {
                Ok(elapsed) => {
                    phases.push(PhaseTiming { phase, elapsed });
                    self.emit(PhaseEvent::Completed {
                        phase,
                        requests_completed: probe.requests_completed(),
                        phase_elapsed: elapsed,
                        elapsed: started.elapsed(),
                    });
                }
                Err(err) => {
                    tracing::error!(%phase, error = %err, "phase did not complete cleanly");
                    first_err.get_or_insert(err);
                }
            }
        }
        let wall_time = started.elapsed();

        if let Some(ticker) = ticker {
            ticker.stop().await;
        }
        if let Some(err) = first_err {
            return Err(err);
        }
        phases.sort_by_key(|t| t.phase);

        let totals = RunTotals {
            total_requests: specs.iter().map(PhaseSpec::expected_requests).sum(),
            failed_requests: counters.failed(),
        };
        let samples = store.drain();
        tracing::debug!(
            samples = samples.len(),
            failed = totals.failed_requests,
            wall_ms = wall_time.as_millis() as u64,
            "all phases completed"
        );

        // Endpoint groups are reduced on scoped OS threads; keep them off the async workers.
        let (samples, statistics) = tokio::task::spawn_blocking(move || {
            let statistics = StatisticsEngine.compute(&samples, totals, wall_time);
            (samples, statistics)
        })
        .await?;

        Ok(RunReport {
            specs,
            phases,
            statistics: statistics?,
            samples,
        })
    }

    fn emit(&self, event: PhaseEvent) {
        if let Some(progress) = &self.progress {
            (progress)(event);
        }
    }
}

/// Periodically reports a snapshot of every phase that still has running workers.
///
/// The task is aborted when the ticker is dropped.
struct ProgressTicker {
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    fn spawn(progress: ProgressFn, probes: Arc<Mutex<Vec<PhaseProbe>>>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let active: Vec<PhaseEvent> = probes
                    .lock()
                    .iter()
                    .filter(|p| !p.is_done())
                    .map(PhaseProbe::snapshot)
                    .collect();
                for event in active {
                    (progress)(event);
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Aborts the task and waits until no further snapshot can be emitted.
    async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
