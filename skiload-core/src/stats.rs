use std::collections::BTreeMap;
use std::time::Duration;

use ahash::AHashMap;

use crate::error::Result;
use crate::histogram::{CountingHistogram, HistogramError, LatencyBound, MAX_LATENCY_BOUND_MS};
use crate::sample::{EndpointKey, Sample};

/// Latency summary of one endpoint, in milliseconds.
///
/// `median_ms` and `p99_ms` are `None` when the endpoint's maximum latency exceeds
/// [`MAX_LATENCY_BOUND_MS`]; count, mean and max are always reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointStats {
    pub count: u64,
    pub mean_ms: f64,
    pub median_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub max_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub total_requests: u64,
    /// Non-2xx responses plus transport errors.
    pub failed_requests: u64,
    pub wall_time: Duration,
    pub endpoints: BTreeMap<EndpointKey, EndpointStats>,
}

impl RunStatistics {
    pub fn successful_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.failed_requests)
    }

    pub fn throughput_per_sec(&self) -> f64 {
        per_sec(self.total_requests, self.wall_time)
    }

    pub fn success_throughput_per_sec(&self) -> f64 {
        per_sec(self.successful_requests(), self.wall_time)
    }
}

fn per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Run-wide counts that do not come from the samples themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub total_requests: u64,
    pub failed_requests: u64,
}

/// Reduces raw samples into per-endpoint latency statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Statistics for a live run: totals come from the run's configuration and counters.
    pub fn compute(
        &self,
        samples: &[Sample],
        totals: RunTotals,
        wall_time: Duration,
    ) -> Result<RunStatistics> {
        Ok(RunStatistics {
            total_requests: totals.total_requests,
            failed_requests: totals.failed_requests,
            wall_time,
            endpoints: self.endpoint_stats(samples)?,
        })
    }

    /// Statistics for a previously recorded sample set, where the samples are the only
    /// source of truth. Wall time spans from the earliest start to the latest completion.
    pub fn compute_recorded(&self, samples: &[Sample]) -> Result<RunStatistics> {
        let failed_requests = samples.iter().filter(|s| !s.is_success()).count() as u64;
        let first_start = samples.iter().map(|s| s.start_time_ms).min();
        let last_end = samples
            .iter()
            .map(|s| s.start_time_ms.saturating_add(s.latency_ms))
            .max();
        let wall_time = match (first_start, last_end) {
            (Some(first), Some(last)) => Duration::from_millis(last.saturating_sub(first)),
            _ => Duration::ZERO,
        };

        self.compute(
            samples,
            RunTotals {
                total_requests: samples.len() as u64,
                failed_requests,
            },
            wall_time,
        )
    }

    /// Groups samples by endpoint and summarizes each group on its own scoped thread.
    pub fn endpoint_stats(&self, samples: &[Sample]) -> Result<BTreeMap<EndpointKey, EndpointStats>> {
        let mut groups: AHashMap<EndpointKey, Vec<u64>> = AHashMap::new();
        for sample in samples {
            groups
                .entry(sample.endpoint())
                .or_default()
                .push(sample.latency_ms);
        }

        let computed: Vec<(EndpointKey, std::result::Result<Option<EndpointStats>, HistogramError>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = groups
                    .iter()
                    .map(|(key, latencies)| {
                        let key = key.clone();
                        scope.spawn(move || {
                            let stats = summarize(&key, latencies);
                            (key, stats)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            });

        let mut out = BTreeMap::new();
        for (key, result) in computed {
            if let Some(stats) = result? {
                out.insert(key, stats);
            }
        }
        Ok(out)
    }
}

fn summarize(
    key: &EndpointKey,
    latencies: &[u64],
) -> std::result::Result<Option<EndpointStats>, HistogramError> {
    let Some(bound) = LatencyBound::observe(latencies.iter().copied()) else {
        return Ok(None);
    };

    let (median_ms, p99_ms) = match CountingHistogram::new(bound) {
        Ok(mut histogram) => {
            for &latency in latencies {
                histogram.record(latency)?;
            }
            (histogram.median(), histogram.p99())
        }
        // Only this endpoint loses its percentiles; run totals and other endpoints stand.
        Err(HistogramError::BoundTooLarge(max_ms)) => {
            tracing::error!(
                endpoint = %key,
                max_ms,
                bound_ms = MAX_LATENCY_BOUND_MS,
                "latency exceeds histogram bound, median and p99 not reported"
            );
            (None, None)
        }
        Err(err) => return Err(err),
    };

    let sum: u128 = latencies.iter().map(|&l| u128::from(l)).sum();
    let count = bound.observed();

    Ok(Some(EndpointStats {
        count,
        mean_ms: sum as f64 / count as f64,
        median_ms,
        p99_ms,
        max_ms: bound.max(),
    }))
}
