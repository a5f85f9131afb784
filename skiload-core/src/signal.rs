use tokio::sync::watch;

/// Count of finished workers in one phase, observable at any threshold.
///
/// One event serves both the trigger wait and the completion wait: each worker bumps the
/// counter exactly once, so any threshold below `thread_count` resolves strictly before
/// completion does.
#[derive(Debug, Clone)]
pub struct PhaseSignal {
    tx: watch::Sender<u32>,
}

impl PhaseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn finished(&self) -> u32 {
        *self.tx.borrow()
    }

    fn finish_one(&self) {
        self.tx.send_modify(|n| *n = n.saturating_add(1));
    }

    /// Returns a guard that reports the worker as finished when dropped, including on unwind.
    pub fn guard(&self) -> FinishGuard {
        FinishGuard {
            signal: self.clone(),
        }
    }

    /// Resolves once at least `threshold` workers have finished. Immediate for 0.
    pub async fn wait_for(&self, threshold: u32) {
        if threshold == 0 {
            return;
        }
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n >= threshold).await;
    }
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct FinishGuard {
    signal: PhaseSignal,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.signal.finish_one();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn zero_threshold_resolves_immediately() {
        let signal = PhaseSignal::new();
        tokio::time::timeout(Duration::from_millis(50), signal.wait_for(0))
            .await
            .unwrap_or_else(|_| panic!("zero threshold should not wait"));
    }

    #[tokio::test]
    async fn waiters_resolve_at_their_threshold() {
        let signal = PhaseSignal::new();
        let guards: Vec<FinishGuard> = (0..5).map(|_| signal.guard()).collect();

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait_for(3).await })
        };

        let mut guards = guards.into_iter();
        drop(guards.next());
        drop(guards.next());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(signal.finished(), 2);

        drop(guards.next());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap_or_else(|_| panic!("waiter should resolve at 3"))
            .unwrap_or_else(|e| panic!("waiter task failed: {e}"));
        assert_eq!(signal.finished(), 3);
    }

    #[tokio::test]
    async fn guard_signals_when_the_task_panics() {
        let signal = PhaseSignal::new();
        let guard = signal.guard();
        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("worker blew up");
        });
        assert!(task.await.is_err());
        assert_eq!(signal.finished(), 1);
    }
}
