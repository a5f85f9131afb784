//! Exact latency percentiles over small integer (millisecond) values.
//!
//! A [`CountingHistogram`] holds one counter per possible latency value, so it needs the
//! largest value up front. Building one is therefore a two-pass computation: a
//! [`LatencyBound`] is observed first and the histogram is sized from it.

/// Largest bound a histogram may be sized to (one hour, in milliseconds).
pub const MAX_LATENCY_BOUND_MS: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistogramError {
    #[error("latency {latency}ms exceeds the histogram bound of {bound}ms")]
    OutOfBounds { latency: u64, bound: u64 },

    #[error("latency bound {0}ms exceeds the supported maximum of {MAX_LATENCY_BOUND_MS}ms")]
    BoundTooLarge(u64),
}

/// Maximum latency of an observed set of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyBound {
    max: u64,
    observed: u64,
}

impl LatencyBound {
    /// Scans `latencies` once. Returns `None` when there are none.
    pub fn observe<I>(latencies: I) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut bound: Option<Self> = None;
        for latency in latencies {
            let b = bound.get_or_insert(Self { max: 0, observed: 0 });
            b.max = b.max.max(latency);
            b.observed += 1;
        }
        bound
    }

    #[must_use]
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Number of latencies the bound was observed over.
    #[must_use]
    pub fn observed(&self) -> u64 {
        self.observed
    }
}

#[derive(Debug, Clone)]
pub struct CountingHistogram {
    counts: Vec<u64>,
    total: u64,
}

impl CountingHistogram {
    pub fn new(bound: LatencyBound) -> Result<Self, HistogramError> {
        if bound.max > MAX_LATENCY_BOUND_MS {
            return Err(HistogramError::BoundTooLarge(bound.max));
        }
        // Bounded by MAX_LATENCY_BOUND_MS above, so this fits in usize.
        let len = bound.max as usize + 1;
        Ok(Self {
            counts: vec![0; len],
            total: 0,
        })
    }

    /// Observes the bound of `latencies`, then fills a histogram with them.
    pub fn from_latencies(latencies: &[u64]) -> Result<Option<Self>, HistogramError> {
        let Some(bound) = LatencyBound::observe(latencies.iter().copied()) else {
            return Ok(None);
        };
        let mut histogram = Self::new(bound)?;
        for &latency in latencies {
            histogram.record(latency)?;
        }
        Ok(Some(histogram))
    }

    /// Counts one latency. Values above the bound are rejected, never clamped.
    pub fn record(&mut self, latency: u64) -> Result<(), HistogramError> {
        let bound = self.max();
        let slot = usize::try_from(latency)
            .ok()
            .and_then(|idx| self.counts.get_mut(idx))
            .ok_or(HistogramError::OutOfBounds { latency, bound })?;
        *slot += 1;
        self.total += 1;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The bound the histogram was sized to.
    #[must_use]
    pub fn max(&self) -> u64 {
        (self.counts.len() - 1) as u64
    }

    /// Smallest latency whose cumulative count reaches `ceil(n / 2)`. For even `n` this is
    /// the upper of the two middle values.
    #[must_use]
    pub fn median(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        let target = self.total.div_ceil(2);
        let mut cumulative = 0u64;
        for (latency, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return Some(latency as u64);
            }
        }
        None
    }

    /// Scans down from the bound and returns the first latency at which the count of
    /// strictly smaller samples drops to `round(n * 0.99)` or below.
    #[must_use]
    pub fn p99(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        let target = (self.total as f64 * 0.99).round() as u64;
        let mut remaining = self.total;
        for (latency, &count) in self.counts.iter().enumerate().rev() {
            remaining -= count;
            if remaining <= target {
                return Some(latency as u64);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(latencies: &[u64]) -> CountingHistogram {
        match CountingHistogram::from_latencies(latencies) {
            Ok(Some(h)) => h,
            Ok(None) => panic!("expected a histogram for {} latencies", latencies.len()),
            Err(e) => panic!("unexpected histogram error: {e}"),
        }
    }

    #[test]
    fn bound_is_none_for_no_samples() {
        assert_eq!(LatencyBound::observe(Vec::<u64>::new()), None);
        assert!(matches!(CountingHistogram::from_latencies(&[]), Ok(None)));
    }

    #[test]
    fn bound_tracks_max_and_count() {
        let bound = LatencyBound::observe([3, 9, 0, 9])
            .unwrap_or_else(|| panic!("expected a bound"));
        assert_eq!(bound.max(), 9);
        assert_eq!(bound.observed(), 4);
    }

    #[test]
    fn max_is_the_bound() {
        let h = histogram(&[5, 1, 42, 7]);
        assert_eq!(h.max(), 42);
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn median_of_odd_count_is_the_middle_value() {
        let h = histogram(&[9, 1, 5, 3, 7]);
        assert_eq!(h.median(), Some(5));
    }

    #[test]
    fn median_of_even_count_takes_the_upper_rule() {
        // ceil(4 / 2) = 2: the second smallest value reaches the target.
        let h = histogram(&[1, 2, 3, 4]);
        assert_eq!(h.median(), Some(2));

        let h = histogram(&[10, 10, 20, 20, 20, 30]);
        assert_eq!(h.median(), Some(20));
    }

    #[test]
    fn median_of_single_sample() {
        let h = histogram(&[0]);
        assert_eq!(h.median(), Some(0));
        assert_eq!(h.p99(), Some(0));
        assert_eq!(h.max(), 0);
    }

    #[test]
    fn p99_of_uniform_hundred_values() {
        let latencies: Vec<u64> = (1..=100).cycle().take(1000).collect();
        let h = histogram(&latencies);
        assert_eq!(h.median(), Some(50));
        assert_eq!(h.p99(), Some(100));
        assert_eq!(h.max(), 100);
    }

    #[test]
    fn p99_ignores_a_single_outlier_in_a_large_set() {
        let mut latencies = vec![10u64; 999];
        latencies.push(5_000);
        let h = histogram(&latencies);
        assert_eq!(h.p99(), Some(10));
        assert_eq!(h.max(), 5_000);
    }

    #[test]
    fn p99_never_decreases_as_slow_samples_arrive() {
        let mut latencies: Vec<u64> = (0..200).map(|i| i % 50).collect();
        let mut last = 0u64;
        for slow in 0..30u64 {
            latencies.push(100 + slow * 10);
            let p99 = histogram(&latencies)
                .p99()
                .unwrap_or_else(|| panic!("expected p99"));
            assert!(p99 >= last, "p99 went from {last} to {p99}");
            last = p99;
        }
        assert!(last >= 100);
    }

    #[test]
    fn recording_above_bound_fails_loudly() {
        let bound = LatencyBound::observe([1, 2, 3]).unwrap_or_else(|| panic!("expected bound"));
        let mut h = CountingHistogram::new(bound).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            h.record(4),
            Err(HistogramError::OutOfBounds {
                latency: 4,
                bound: 3
            })
        );
        assert!(h.is_empty());
    }

    #[test]
    fn empty_histogram_reports_no_percentiles() {
        let bound = LatencyBound::observe([7]).unwrap_or_else(|| panic!("expected bound"));
        let h = CountingHistogram::new(bound).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(h.median(), None);
        assert_eq!(h.p99(), None);
    }

    #[test]
    fn refuses_unbounded_allocation() {
        let bound = LatencyBound::observe([MAX_LATENCY_BOUND_MS + 1])
            .unwrap_or_else(|| panic!("expected bound"));
        assert!(matches!(
            CountingHistogram::new(bound),
            Err(HistogramError::BoundTooLarge(_))
        ));
    }
}
