use crate::config::Phase;
use crate::histogram::HistogramError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid target address: `{0}`")]
    InvalidTarget(String),

    #[error("`resort_id` must not be empty")]
    InvalidResortId,

    #[error("`lift_count` must be a positive integer")]
    InvalidLiftCount,

    #[error("`trigger_percent` must be within 1..=100 (got {0})")]
    InvalidTriggerPercent(u32),

    #[error("{phase} phase has no workers (raise `max_threads` to at least 4)")]
    ZeroThreads { phase: Phase },

    #[error("{phase} phase trigger threshold {threshold} exceeds its {threads} workers")]
    InvalidTriggerThreshold {
        phase: Phase,
        threshold: u32,
        threads: u32,
    },

    #[error("{phase} phase time window {low}..={high} is empty")]
    InvalidTimeWindow { phase: Phase, low: u32, high: u32 },

    #[error("{phase} phase needs at least one skier per worker ({skiers} skiers, {threads} workers)")]
    TooFewSkiers {
        phase: Phase,
        skiers: u32,
        threads: u32,
    },

    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed sample row {line}: {reason}")]
    MalformedSample { line: usize, reason: String },
}

impl Error {
    /// `true` for errors caused by the run configuration rather than by the run itself.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_)
                | Self::InvalidResortId
                | Self::InvalidLiftCount
                | Self::InvalidTriggerPercent(_)
                | Self::ZeroThreads { .. }
                | Self::InvalidTriggerThreshold { .. }
                | Self::InvalidTimeWindow { .. }
                | Self::TooFewSkiers { .. }
        )
    }
}
