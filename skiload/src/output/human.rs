use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::format_duration;
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &skiload_core::RunConfig, specs: &[skiload_core::PhaseSpec]) {
        println!("target: {}", cfg.target);
        println!(
            "resort: {} day={} skiers={} lifts={}",
            cfg.resort_id, cfg.ski_day, cfg.skier_count, cfg.lift_count
        );
        for s in specs {
            println!(
                "phase: {} threads={} trigger={} minutes={}..={} writes/worker={} reads/worker={}",
                s.phase,
                s.thread_count,
                s.trigger_threshold,
                s.time_window.low,
                s.time_window.high,
                s.writes_per_worker,
                s.reads_per_worker
            );
        }
        if !specs.is_empty() {
            println!();
        }
    }

    fn progress(&self) -> Option<skiload_core::ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |ev| match ev {
            skiload_core::PhaseEvent::Launched {
                phase,
                thread_count,
                expected_requests,
                ..
            } => {
                progress.launch(phase, expected_requests, format!("workers=0/{thread_count}"));
            }
            skiload_core::PhaseEvent::Progress {
                phase,
                requests_completed,
                workers_finished,
                thread_count,
                ..
            } => {
                progress.update(
                    phase,
                    requests_completed,
                    format!("workers={workers_finished}/{thread_count}"),
                );
            }
            skiload_core::PhaseEvent::Triggered {
                phase,
                workers_finished,
                elapsed,
            } => {
                progress.message(
                    phase,
                    format!(
                        "workers={workers_finished} triggered at {}",
                        format_duration(elapsed)
                    ),
                );
            }
            skiload_core::PhaseEvent::Completed {
                phase,
                requests_completed,
                phase_elapsed,
                ..
            } => {
                progress.complete(
                    phase,
                    requests_completed,
                    format!("done in {}", format_duration(phase_elapsed)),
                );
            }
        }))
    }

    fn print_summary(
        &self,
        statistics: &skiload_core::RunStatistics,
        phases: &[skiload_core::PhaseTiming],
    ) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(statistics, phases));
        Ok(())
    }
}
