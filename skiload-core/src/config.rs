use std::time::Duration;

use crate::error::{Error, Result};

/// The three load phases of a run, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Warmup,
    Peak,
    Cooldown,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Warmup, Phase::Peak, Phase::Cooldown];

    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Cooldown)
    }
}

/// Inclusive bounds of the "minute of the day" stamped on lift rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub low: u32,
    pub high: u32,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }
}

/// Per-phase workload constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasePlan {
    pub time_window: TimeWindow,
    pub writes_per_worker: u32,
    pub reads_per_worker: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Base address of the lift-ride API, e.g. `http://127.0.0.1:8080`.
    pub target: String,
    /// Peak concurrency; warmup and cooldown run a quarter of it.
    pub max_threads: u32,
    /// Skier ids `1..=skier_count` are partitioned across the workers of each phase.
    pub skier_count: u32,
    /// Lift ids are drawn from `0..lift_count`.
    pub lift_count: u32,
    pub resort_id: String,
    pub ski_day: u32,
    /// Share of a phase's workers (rounded up) that must finish before the next phase starts.
    pub trigger_percent: u32,
    pub request_timeout: Option<Duration>,
    pub warmup: PhasePlan,
    pub peak: PhasePlan,
    pub cooldown: PhasePlan,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target: "http://127.0.0.1:8080".to_string(),
            max_threads: 64,
            skier_count: 20_000,
            lift_count: 40,
            resort_id: "SilverMt".to_string(),
            ski_day: 1,
            trigger_percent: 10,
            request_timeout: None,
            warmup: PhasePlan {
                time_window: TimeWindow::new(1, 90),
                writes_per_worker: 100,
                reads_per_worker: 5,
            },
            peak: PhasePlan {
                time_window: TimeWindow::new(91, 360),
                writes_per_worker: 100,
                reads_per_worker: 5,
            },
            cooldown: PhasePlan {
                time_window: TimeWindow::new(361, 420),
                writes_per_worker: 100,
                reads_per_worker: 10,
            },
        }
    }
}

impl RunConfig {
    pub fn plan(&self, phase: Phase) -> &PhasePlan {
        match phase {
            Phase::Warmup => &self.warmup,
            Phase::Peak => &self.peak,
            Phase::Cooldown => &self.cooldown,
        }
    }

    pub fn thread_count(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Warmup | Phase::Cooldown => self.max_threads / 4,
            Phase::Peak => self.max_threads,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.phase_specs().map(|_| ())
    }

    /// Derives and validates the spec of every phase.
    ///
    /// Nothing is launched when any phase is invalid, so a bad config never produces a
    /// partial run.
    pub fn phase_specs(&self) -> Result<[PhaseSpec; 3]> {
        let target = self.target.trim();
        let has_host = target
            .strip_prefix("http://")
            .or_else(|| target.strip_prefix("https://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_host {
            return Err(Error::InvalidTarget(self.target.clone()));
        }
        if self.resort_id.trim().is_empty() {
            return Err(Error::InvalidResortId);
        }
        if self.lift_count == 0 {
            return Err(Error::InvalidLiftCount);
        }
        if !(1..=100).contains(&self.trigger_percent) {
            return Err(Error::InvalidTriggerPercent(self.trigger_percent));
        }

        let specs = Phase::ALL.map(|phase| {
            let plan = self.plan(phase);
            let thread_count = self.thread_count(phase);
            let trigger_threshold = if phase.is_final() {
                0
            } else {
                trigger_threshold(thread_count, self.trigger_percent)
            };

            PhaseSpec {
                phase,
                thread_count,
                time_window: plan.time_window,
                writes_per_worker: plan.writes_per_worker,
                reads_per_worker: plan.reads_per_worker,
                trigger_threshold,
            }
        });

        for spec in &specs {
            spec.validate(self.skier_count)?;
        }

        Ok(specs)
    }
}

/// `ceil(thread_count * percent / 100)`.
#[must_use]
pub fn trigger_threshold(thread_count: u32, percent: u32) -> u32 {
    let scaled = u64::from(thread_count) * u64::from(percent);
    let threshold = scaled.div_ceil(100);
    u32::try_from(threshold).unwrap_or(u32::MAX).min(thread_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub thread_count: u32,
    pub time_window: TimeWindow,
    pub writes_per_worker: u32,
    pub reads_per_worker: u32,
    /// Finished workers needed before the next phase may start; 0 for the final phase.
    pub trigger_threshold: u32,
}

impl PhaseSpec {
    pub fn validate(&self, skier_count: u32) -> Result<()> {
        if self.thread_count == 0 {
            return Err(Error::ZeroThreads { phase: self.phase });
        }
        if self.trigger_threshold > self.thread_count {
            return Err(Error::InvalidTriggerThreshold {
                phase: self.phase,
                threshold: self.trigger_threshold,
                threads: self.thread_count,
            });
        }
        if self.time_window.low > self.time_window.high {
            return Err(Error::InvalidTimeWindow {
                phase: self.phase,
                low: self.time_window.low,
                high: self.time_window.high,
            });
        }
        if skier_count < self.thread_count {
            return Err(Error::TooFewSkiers {
                phase: self.phase,
                skiers: skier_count,
                threads: self.thread_count,
            });
        }
        Ok(())
    }

    /// Requests this phase is configured to issue across all of its workers.
    #[must_use]
    pub fn expected_requests(&self) -> u64 {
        u64::from(self.thread_count)
            * (u64::from(self.writes_per_worker) + u64::from(self.reads_per_worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(cfg: &RunConfig) -> [PhaseSpec; 3] {
        cfg.phase_specs()
            .unwrap_or_else(|e| panic!("expected valid config: {e}"))
    }

    #[test]
    fn trigger_threshold_rounds_up() {
        assert_eq!(trigger_threshold(37, 10), 4);
        assert_eq!(trigger_threshold(40, 10), 4);
        assert_eq!(trigger_threshold(41, 10), 5);
        assert_eq!(trigger_threshold(1, 10), 1);
        assert_eq!(trigger_threshold(16, 100), 16);
    }

    #[test]
    fn default_config_derives_quarter_full_quarter_threads() {
        let cfg = RunConfig::default();
        let [warmup, peak, cooldown] = specs(&cfg);

        assert_eq!(warmup.thread_count, 16);
        assert_eq!(peak.thread_count, 64);
        assert_eq!(cooldown.thread_count, 16);

        assert_eq!(warmup.trigger_threshold, 2);
        assert_eq!(peak.trigger_threshold, 7);
        assert_eq!(cooldown.trigger_threshold, 0);

        assert_eq!(warmup.time_window, TimeWindow::new(1, 90));
        assert_eq!(cooldown.reads_per_worker, 10);
    }

    #[test]
    fn expected_requests_multiplies_threads_by_quota() {
        let cfg = RunConfig::default();
        let total: u64 = specs(&cfg).iter().map(PhaseSpec::expected_requests).sum();
        assert_eq!(total, 16 * 105 + 64 * 105 + 16 * 110);
    }

    #[test]
    fn fewer_than_four_threads_leaves_warmup_empty() {
        let cfg = RunConfig {
            max_threads: 3,
            ..RunConfig::default()
        };
        match cfg.phase_specs() {
            Err(Error::ZeroThreads { phase }) => assert_eq!(phase, Phase::Warmup),
            other => panic!("expected ZeroThreads, got {other:?}"),
        }
    }

    #[test]
    fn rejects_inverted_time_window() {
        let mut cfg = RunConfig::default();
        cfg.peak.time_window = TimeWindow::new(360, 91);
        match cfg.phase_specs() {
            Err(Error::InvalidTimeWindow { phase, low, high }) => {
                assert_eq!(phase, Phase::Peak);
                assert_eq!((low, high), (360, 91));
            }
            other => panic!("expected InvalidTimeWindow, got {other:?}"),
        }
    }

    #[test]
    fn rejects_more_threads_than_skiers() {
        let cfg = RunConfig {
            max_threads: 64,
            skier_count: 32,
            ..RunConfig::default()
        };
        match cfg.phase_specs() {
            Err(Error::TooFewSkiers { phase, .. }) => assert_eq!(phase, Phase::Peak),
            other => panic!("expected TooFewSkiers, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_trigger_percent_and_lifts() {
        let cfg = RunConfig {
            trigger_percent: 0,
            ..RunConfig::default()
        };
        assert!(matches!(
            cfg.phase_specs(),
            Err(Error::InvalidTriggerPercent(0))
        ));

        let cfg = RunConfig {
            lift_count: 0,
            ..RunConfig::default()
        };
        assert!(matches!(cfg.phase_specs(), Err(Error::InvalidLiftCount)));
    }

    #[test]
    fn rejects_targets_without_http_scheme_or_host() {
        for target in ["", "   ", "localhost:8080", "ftp://host", "http://"] {
            let cfg = RunConfig {
                target: target.to_string(),
                ..RunConfig::default()
            };
            assert!(
                matches!(cfg.phase_specs(), Err(Error::InvalidTarget(_))),
                "accepted {target:?}"
            );
        }
    }

    #[test]
    fn rejects_blank_resort_id_but_accepts_spaces_inside() {
        let cfg = RunConfig {
            resort_id: "  ".to_string(),
            ..RunConfig::default()
        };
        assert!(matches!(cfg.phase_specs(), Err(Error::InvalidResortId)));
        assert!(Error::InvalidResortId.is_config_error());

        let cfg = RunConfig {
            resort_id: "Silver Mt".to_string(),
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn spec_validation_rejects_threshold_above_threads() {
        let spec = PhaseSpec {
            phase: Phase::Warmup,
            thread_count: 4,
            time_window: TimeWindow::new(1, 90),
            writes_per_worker: 1,
            reads_per_worker: 0,
            trigger_threshold: 5,
        };
        assert!(matches!(
            spec.validate(100),
            Err(Error::InvalidTriggerThreshold { threshold: 5, threads: 4, .. })
        ));
    }

    #[test]
    fn phase_names_round_trip_through_strum() {
        assert_eq!(Phase::Cooldown.to_string(), "cooldown");
        assert_eq!("peak".parse::<Phase>().ok(), Some(Phase::Peak));
    }
}
