use std::time::Duration;

use crate::config::Phase;

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    /// Every worker of the phase has been spawned.
    Launched {
        phase: Phase,
        thread_count: u32,
        trigger_threshold: u32,
        expected_requests: u64,
        /// Since the run started.
        elapsed: Duration,
    },
    /// Periodic snapshot while the phase still has running workers.
    Progress {
        phase: Phase,
        requests_completed: u64,
        expected_requests: u64,
        workers_finished: u32,
        thread_count: u32,
    },
    /// Enough workers finished to release the next phase.
    Triggered {
        phase: Phase,
        workers_finished: u32,
        elapsed: Duration,
    },
    Completed {
        phase: Phase,
        requests_completed: u64,
        /// Since the phase was launched.
        phase_elapsed: Duration,
        elapsed: Duration,
    },
}

impl PhaseEvent {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Launched { phase, .. }
            | Self::Progress { phase, .. }
            | Self::Triggered { phase, .. }
            | Self::Completed { phase, .. } => *phase,
        }
    }
}

pub type ProgressFn = std::sync::Arc<dyn Fn(PhaseEvent) + Send + Sync + 'static>;
