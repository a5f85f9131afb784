use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &skiload_core::RunConfig, _specs: &[skiload_core::PhaseSpec]) {}

    fn progress(&self) -> Option<skiload_core::ProgressFn> {
        Some(Arc::new(move |ev| {
            if let Some(line) = build_phase_line(&ev) {
                emit_json_line(&line);
            }
        }))
    }

    fn print_summary(
        &self,
        statistics: &skiload_core::RunStatistics,
        phases: &[skiload_core::PhaseTiming],
    ) -> anyhow::Result<()> {
        let line = build_summary_line(statistics, phases);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPhaseLine {
    pub kind: &'static str,
    pub phase: String,
    pub event: &'static str,
    pub elapsed_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers_finished: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_completed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_elapsed_ms: Option<u64>,
}

impl JsonPhaseLine {
    fn new(phase: skiload_core::Phase, event: &'static str, elapsed: std::time::Duration) -> Self {
        Self {
            kind: "phase",
            phase: phase.to_string(),
            event,
            elapsed_ms: millis(elapsed),
            thread_count: None,
            trigger_threshold: None,
            expected_requests: None,
            workers_finished: None,
            requests_completed: None,
            phase_elapsed_ms: None,
        }
    }
}

/// Periodic progress snapshots are not emitted; stdout carries lifecycle lines only.
fn build_phase_line(ev: &skiload_core::PhaseEvent) -> Option<JsonPhaseLine> {
    use skiload_core::PhaseEvent;

    match *ev {
        PhaseEvent::Launched {
            phase,
            thread_count,
            trigger_threshold,
            expected_requests,
            elapsed,
        } => Some(JsonPhaseLine {
            thread_count: Some(thread_count),
            trigger_threshold: Some(trigger_threshold),
            expected_requests: Some(expected_requests),
            ..JsonPhaseLine::new(phase, "start", elapsed)
        }),
        PhaseEvent::Triggered {
            phase,
            workers_finished,
            elapsed,
        } => Some(JsonPhaseLine {
            workers_finished: Some(workers_finished),
            ..JsonPhaseLine::new(phase, "trigger", elapsed)
        }),
        PhaseEvent::Completed {
            phase,
            requests_completed,
            phase_elapsed,
            elapsed,
        } => Some(JsonPhaseLine {
            requests_completed: Some(requests_completed),
            phase_elapsed_ms: Some(millis(phase_elapsed)),
            ..JsonPhaseLine::new(phase, "finish", elapsed)
        }),
        PhaseEvent::Progress { .. } => None,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub totals: JsonTotals,
    pub phases: Vec<JsonPhaseTiming>,
    pub endpoints: Vec<JsonEndpointSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub successful_requests_total: u64,
    pub failed_requests_total: u64,
    pub wall_time_ms: u64,
    pub throughput_per_sec: f64,
    pub success_throughput_per_sec: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPhaseTiming {
    pub phase: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonEndpointSummary {
    pub method: String,
    pub path: String,
    pub count: u64,
    pub mean_ms: f64,
    pub median_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub max_ms: u64,
}

fn build_summary_line(
    statistics: &skiload_core::RunStatistics,
    phases: &[skiload_core::PhaseTiming],
) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        totals: JsonTotals {
            requests_total: statistics.total_requests,
            successful_requests_total: statistics.successful_requests(),
            failed_requests_total: statistics.failed_requests,
            wall_time_ms: millis(statistics.wall_time),
            throughput_per_sec: finite_or_zero(statistics.throughput_per_sec()),
            success_throughput_per_sec: finite_or_zero(statistics.success_throughput_per_sec()),
        },
        phases: phases
            .iter()
            .map(|p| JsonPhaseTiming {
                phase: p.phase.to_string(),
                elapsed_ms: millis(p.elapsed),
            })
            .collect(),
        endpoints: statistics
            .endpoints
            .iter()
            .map(|(key, s)| JsonEndpointSummary {
                method: key.method.to_string(),
                path: key.path.to_string(),
                count: s.count,
                mean_ms: finite_or_zero(s.mean_ms),
                median_ms: s.median_ms,
                p99_ms: s.p99_ms,
                max_ms: s.max_ms,
            })
            .collect(),
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
