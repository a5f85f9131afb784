use std::collections::BTreeMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use skiload_core::Phase;

/// One bar per phase, sized by the phase's expected request count.
pub(crate) struct HumanProgress {
    inner: Mutex<Inner>,
}

struct Inner {
    multi: MultiProgress,
    bars: BTreeMap<Phase, ProgressBar>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        let multi = MultiProgress::new();
        multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));

        Self {
            inner: Mutex::new(Inner {
                multi,
                bars: BTreeMap::new(),
            }),
        }
    }

    pub(crate) fn launch(&self, phase: Phase, expected_requests: u64, message: String) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pb = inner.multi.add(ProgressBar::new(expected_requests));
        pb.set_style(bar_style());
        pb.set_prefix(format!("{phase:<8}"));
        pb.set_message(message);
        if let Some(old) = inner.bars.insert(phase, pb) {
            old.finish_and_clear();
        }
    }

    pub(crate) fn update(&self, phase: Phase, requests_completed: u64, message: String) {
        self.with_bar(phase, |pb| {
            pb.set_position(requests_completed.min(pb.length().unwrap_or(u64::MAX)));
            pb.set_message(message);
        });
    }

    pub(crate) fn message(&self, phase: Phase, message: String) {
        self.with_bar(phase, |pb| pb.set_message(message));
    }

    pub(crate) fn complete(&self, phase: Phase, requests_completed: u64, message: String) {
        self.with_bar(phase, |pb| {
            pb.set_position(requests_completed);
            pb.finish_with_message(message);
        });
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for (_, pb) in std::mem::take(&mut inner.bars) {
            pb.finish_and_clear();
        }

        let _ = inner.multi.clear();
    }

    fn with_bar(&self, phase: Phase, f: impl FnOnce(&ProgressBar)) {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pb) = inner.bars.get(&phase) {
            f(pb);
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
