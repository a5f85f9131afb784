#![forbid(unsafe_code)]

mod config;
mod error;
mod executor;
mod histogram;
mod phase;
mod progress;
mod run;
mod sample;
mod signal;
mod sink;
mod stats;
mod store;
mod worker;

pub use config::{Phase, PhasePlan, PhaseSpec, RunConfig, TimeWindow, trigger_threshold};
pub use error::{Error, Result};
pub use executor::{
    ExecutorError, HttpExecutor, LIFT_RIDES_PATH, LiftRide, RequestExecutor,
    SKIER_DAY_VERTICAL_PATH, VerticalQuery,
};
pub use histogram::{CountingHistogram, HistogramError, LatencyBound, MAX_LATENCY_BOUND_MS};
pub use phase::{PhaseHandle, PhaseOrchestrator, PhaseProbe};
pub use progress::{PhaseEvent, ProgressFn};
pub use run::{PhaseTiming, RunController, RunReport};
pub use sample::{EndpointKey, RequestMethod, Sample, TRANSPORT_ERROR_STATUS};
pub use signal::{FinishGuard, PhaseSignal};
pub use sink::{CSV_HEADER, CsvSampleSink, SampleSink, read_csv, read_samples, write_csv};
pub use stats::{EndpointStats, RunStatistics, RunTotals, StatisticsEngine};
pub use store::{RunCounters, SampleStore};
pub use worker::{IdRange, WorkAssignment, Workload, partition};
